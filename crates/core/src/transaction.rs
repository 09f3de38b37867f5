//! Transactions under the unspent-output model.

use crate::hash::hash_hex;
use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::reward::reward_amount;
use crate::validation::Validation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of transaction, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Transfer spending previous outputs.
    #[default]
    Regular,
    /// Block reward paid to the miner; has no inputs.
    Fee,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Regular => write!(f, "REGULAR"),
            TransactionType::Fee => write!(f, "FEE"),
        }
    }
}

/// A transaction on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(rename = "type", default)]
    pub tx_type: TransactionType,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default = "crate::now_millis")]
    pub timestamp: i64,
    /// Required when decoding, like [`crate::Block::hash`].
    pub hash: String,
    /// Spent outputs. Always `None` for FEE transactions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_inputs: Option<Vec<TransactionInput>>,
    #[serde(default)]
    pub tx_outputs: Vec<TransactionOutput>,
}

impl Transaction {
    /// Create a transaction stamped with the current time.
    pub fn new(
        tx_type: TransactionType,
        tx_inputs: Option<Vec<TransactionInput>>,
        tx_outputs: Vec<TransactionOutput>,
    ) -> Self {
        Self::with_timestamp(tx_type, crate::now_millis(), tx_inputs, tx_outputs)
    }

    /// Create a transaction with an explicit timestamp.
    pub fn with_timestamp(
        tx_type: TransactionType,
        timestamp: i64,
        tx_inputs: Option<Vec<TransactionInput>>,
        tx_outputs: Vec<TransactionOutput>,
    ) -> Self {
        Self {
            tx_type,
            timestamp,
            hash: String::new(),
            tx_inputs,
            tx_outputs,
        }
        .normalized()
    }

    /// Create a REGULAR transfer.
    pub fn transfer(tx_inputs: Vec<TransactionInput>, tx_outputs: Vec<TransactionOutput>) -> Self {
        Self::new(TransactionType::Regular, Some(tx_inputs), tx_outputs)
    }

    /// Create the FEE transaction paying `txo` as a block reward.
    pub fn from_reward(txo: TransactionOutput) -> Self {
        Self::new(TransactionType::Fee, None, vec![txo])
    }

    /// Fill in a missing hash and stamp every output with the final hash.
    ///
    /// Applied by the constructors and to decoded payloads. A hash that is
    /// already present is kept as-is, so a tampered payload still fails
    /// validation.
    pub fn normalized(mut self) -> Self {
        if self.hash.is_empty() {
            self.hash = self.get_hash();
        }
        for txo in &mut self.tx_outputs {
            txo.tx = self.hash.clone();
        }
        self
    }

    pub fn get_hash(&self) -> String {
        let from = match &self.tx_inputs {
            Some(inputs) if !inputs.is_empty() => inputs
                .iter()
                .map(|txi| txi.signature.as_str())
                .collect::<Vec<_>>()
                .join(","),
            _ => String::new(),
        };
        let to = self
            .tx_outputs
            .iter()
            .map(TransactionOutput::get_hash)
            .collect::<Vec<_>>()
            .join(",");
        hash_hex(&format!("{}{}{}{}", self.tx_type, self.timestamp, to, from))
    }

    /// Inputs minus outputs; zero when there are no inputs.
    ///
    /// Saturates instead of overflowing on out-of-range amounts.
    pub fn get_fee(&self) -> i64 {
        match &self.tx_inputs {
            Some(inputs) if !inputs.is_empty() => {
                let input_sum = inputs
                    .iter()
                    .fold(0i64, |sum, txi| sum.saturating_add(txi.amount));
                let output_sum = self
                    .tx_outputs
                    .iter()
                    .fold(0i64, |sum, txo| sum.saturating_add(txo.amount));
                input_sum.saturating_sub(output_sum)
            }
            _ => 0,
        }
    }

    /// Whether this is a FEE transaction.
    pub fn is_fee(&self) -> bool {
        self.tx_type == TransactionType::Fee
    }

    /// Validate the transaction on its own.
    ///
    /// `total_fees` is what a FEE transaction may claim on top of the
    /// reward for `difficulty`. Amount sums that overflow are invalid.
    pub fn is_valid(&self, difficulty: u32, total_fees: i64) -> Validation {
        if self.hash != self.get_hash() {
            return Validation::fail("Invalid hash");
        }

        if self.tx_outputs.is_empty() || self.tx_outputs.iter().any(|txo| !txo.is_valid().success()) {
            return Validation::fail("Invalid txOutputs");
        }
        let Some(output_sum) = checked_total(self.tx_outputs.iter().map(|txo| txo.amount)) else {
            return Validation::fail("Invalid txOutputs");
        };

        match self.tx_inputs.as_ref().filter(|inputs| !inputs.is_empty()) {
            Some(inputs) => {
                let failures: Vec<String> = inputs
                    .iter()
                    .map(TransactionInput::is_valid)
                    .filter(|v| !v.success())
                    .map(|v| v.message().to_string())
                    .collect();
                if !failures.is_empty() {
                    return Validation::fail(format!("Invalid txInputs: {}", failures.join(", ")));
                }

                let Some(input_sum) = checked_total(inputs.iter().map(|txi| txi.amount)) else {
                    return Validation::fail("Invalid txInputs: amount overflow");
                };
                if input_sum < output_sum {
                    return Validation::fail("Invalid txInputs: insufficient funds");
                }
            }
            None if !self.is_fee() => {
                return Validation::fail("Invalid txInputs: inputs are required");
            }
            None => {}
        }

        if self.tx_outputs.iter().any(|txo| txo.tx != self.hash) {
            return Validation::fail("Invalid txOutputs: invalid tx hash");
        }

        if self.is_fee() {
            let has_inputs = self.tx_inputs.as_ref().is_some_and(|inputs| !inputs.is_empty());
            if has_inputs || self.tx_outputs.len() != 1 {
                return Validation::fail("Invalid fee transaction");
            }
            if output_sum > reward_amount(difficulty).saturating_add(total_fees) {
                return Validation::fail("Invalid reward amount");
            }
        }

        Validation::ok()
    }
}

/// Sum of `amounts`, or `None` on overflow.
fn checked_total(mut amounts: impl Iterator<Item = i64>) -> Option<i64> {
    amounts.try_fold(0i64, i64::checked_add)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Keypair;

    fn funded_input(keypair: &Keypair, amount: i64) -> TransactionInput {
        TransactionInput::new(keypair.address(), amount, "prev").signed(keypair)
    }

    #[test]
    fn test_valid_transfer() {
        let keypair = Keypair::generate();
        let tx = Transaction::transfer(
            vec![funded_input(&keypair, 10)],
            vec![TransactionOutput::new("wallet2", 9)],
        );

        assert_eq!(tx.tx_type, TransactionType::Regular);
        assert!(tx.is_valid(1, 10).success());
        assert_eq!(tx.get_fee(), 1);
    }

    #[test]
    fn test_outputs_stamped_with_hash() {
        let tx = Transaction::from_reward(TransactionOutput::new("miner", 10));
        assert!(!tx.hash.is_empty());
        assert!(tx.tx_outputs.iter().all(|txo| txo.tx == tx.hash));
        assert!(tx.tx_inputs.is_none());
    }

    #[test]
    fn test_copy_keeps_hash() {
        let keypair = Keypair::generate();
        let tx = Transaction::transfer(
            vec![funded_input(&keypair, 10)],
            vec![TransactionOutput::new("wallet2", 10)],
        );
        let copy = tx.clone().normalized();
        assert_eq!(copy.hash, tx.hash);
        assert_eq!(copy.get_hash(), tx.hash);
    }

    #[test]
    fn test_tampered_hash_rejected() {
        let mut tx = Transaction::from_reward(TransactionOutput::new("miner", 10));
        tx.timestamp += 1;
        assert_eq!(tx.is_valid(1, 0).message(), "Invalid hash");
    }

    #[test]
    fn test_empty_outputs_rejected() {
        let tx = Transaction::new(TransactionType::Regular, None, vec![]);
        assert_eq!(tx.is_valid(1, 0).message(), "Invalid txOutputs");
    }

    #[test]
    fn test_invalid_output_rejected() {
        let tx = Transaction::new(
            TransactionType::Regular,
            None,
            vec![TransactionOutput::new("wallet2", -10)],
        );
        assert_eq!(tx.is_valid(1, 0).message(), "Invalid txOutputs");
    }

    #[test]
    fn test_invalid_inputs_aggregated() {
        let keypair = Keypair::generate();
        let unsigned = TransactionInput::new(keypair.address(), 5, "prev");
        let negative = funded_input(&keypair, -1);
        let tx = Transaction::transfer(
            vec![unsigned, negative],
            vec![TransactionOutput::new("wallet2", 1)],
        );

        let v = tx.is_valid(1, 0);
        assert!(!v.success());
        assert_eq!(
            v.message(),
            "Invalid txInputs: Signature and previous TX are required, Amount must be greater than 0"
        );
    }

    #[test]
    fn test_insufficient_funds_rejected() {
        let keypair = Keypair::generate();
        let tx = Transaction::transfer(
            vec![funded_input(&keypair, 5)],
            vec![TransactionOutput::new("wallet2", 6)],
        );
        assert_eq!(
            tx.is_valid(1, 0).message(),
            "Invalid txInputs: insufficient funds"
        );
        assert_eq!(tx.get_fee(), -1);
    }

    #[test]
    fn test_restamped_output_rejected() {
        let mut tx = Transaction::from_reward(TransactionOutput::new("miner", 10));
        tx.tx_outputs[0].tx = "other".to_string();
        assert_eq!(
            tx.is_valid(1, 0).message(),
            "Invalid txOutputs: invalid tx hash"
        );
    }

    #[test]
    fn test_reward_bound() {
        let reward = reward_amount(2);
        let tx = Transaction::from_reward(TransactionOutput::new("miner", reward + 1));
        assert!(tx.is_valid(2, 1).success());
        assert_eq!(tx.is_valid(2, 0).message(), "Invalid reward amount");
    }

    #[test]
    fn test_fee_without_inputs_is_zero() {
        let tx = Transaction::from_reward(TransactionOutput::new("miner", 10));
        assert_eq!(tx.get_fee(), 0);
    }

    #[test]
    fn test_wire_shape() {
        let tx = Transaction::from_reward(TransactionOutput::new("miner", 10));
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["type"], "FEE");
        assert!(json.get("txInputs").is_none());
        assert_eq!(json["txOutputs"][0]["toAddress"], "miner");
        assert_eq!(json["txOutputs"][0]["tx"], tx.hash.as_str());

        let decoded: Transaction = serde_json::from_value(json).unwrap();
        assert_eq!(decoded.normalized(), tx);
    }

    #[test]
    fn test_missing_hash_is_decode_error() {
        let json = serde_json::json!({
            "type": "REGULAR",
            "timestamp": 1,
            "txOutputs": [{ "toAddress": "wallet2", "amount": 3 }]
        });
        assert!(serde_json::from_value::<Transaction>(json).is_err());
    }

    #[test]
    fn test_decoded_outputs_restamped() {
        let tx = Transaction::from_reward(TransactionOutput::new("miner", 10));
        let mut json = serde_json::to_value(&tx).unwrap();
        json["txOutputs"][0]["tx"] = serde_json::Value::from("");

        let decoded: Transaction = serde_json::from_value(json).unwrap();
        let decoded = decoded.normalized();
        assert_eq!(decoded.tx_outputs[0].tx, tx.hash);
        assert!(decoded.is_valid(1, 0).success());
    }

    #[test]
    fn test_fee_with_extra_output_rejected() {
        let tx = Transaction::new(
            TransactionType::Fee,
            None,
            vec![
                TransactionOutput::new("miner", 1),
                TransactionOutput::new("thief", 1_000_000_000),
            ],
        );
        assert_eq!(tx.is_valid(2, 1).message(), "Invalid fee transaction");
    }

    #[test]
    fn test_fee_with_inputs_rejected() {
        let keypair = Keypair::generate();
        let tx = Transaction::new(
            TransactionType::Fee,
            Some(vec![funded_input(&keypair, 10)]),
            vec![TransactionOutput::new("miner", 10)],
        );
        assert_eq!(tx.is_valid(2, 1).message(), "Invalid fee transaction");
    }

    #[test]
    fn test_regular_without_inputs_rejected() {
        let tx = Transaction::new(
            TransactionType::Regular,
            None,
            vec![TransactionOutput::new("rich", 1_000_000_000)],
        );
        assert_eq!(
            tx.is_valid(1, 0).message(),
            "Invalid txInputs: inputs are required"
        );

        let empty = Transaction::transfer(vec![], vec![TransactionOutput::new("rich", 1)]);
        assert!(!empty.is_valid(1, 0).success());
    }

    #[test]
    fn test_output_overflow_rejected() {
        let keypair = Keypair::generate();
        let tx = Transaction::transfer(
            vec![funded_input(&keypair, 10)],
            vec![
                TransactionOutput::new("wallet2", i64::MAX),
                TransactionOutput::new("wallet3", i64::MAX),
                TransactionOutput::new("wallet4", 3),
            ],
        );
        assert_eq!(tx.is_valid(1, 0).message(), "Invalid txOutputs");
        assert_eq!(tx.get_fee(), 10 - i64::MAX);
    }

    #[test]
    fn test_input_overflow_rejected() {
        let keypair = Keypair::generate();
        let tx = Transaction::transfer(
            vec![funded_input(&keypair, i64::MAX), funded_input(&keypair, 1)],
            vec![TransactionOutput::new("wallet2", 1)],
        );
        assert_eq!(
            tx.is_valid(1, 0).message(),
            "Invalid txInputs: amount overflow"
        );
        assert_eq!(tx.get_fee(), i64::MAX - 1);
    }

    #[test]
    fn test_reward_bound_saturates() {
        let tx = Transaction::from_reward(TransactionOutput::new("miner", i64::MAX));
        assert!(tx.is_valid(2, i64::MAX).success());
    }
}
