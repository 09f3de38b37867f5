//! Transaction outputs.

use crate::hash::hash_hex;
use crate::validation::Validation;
use serde::{Deserialize, Serialize};

/// A spendable amount assigned to an address.
///
/// `tx` is the hash of the owning transaction. It is stamped by the
/// transaction constructors and is what later inputs reference as
/// `previous_tx`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutput {
    #[serde(default)]
    pub to_address: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub tx: String,
}

impl TransactionOutput {
    /// Create an output that has not been stamped with its transaction yet.
    pub fn new(to_address: impl Into<String>, amount: i64) -> Self {
        Self {
            to_address: to_address.into(),
            amount,
            tx: String::new(),
        }
    }

    pub fn get_hash(&self) -> String {
        hash_hex(&format!("{}{}", self.to_address, self.amount))
    }

    pub fn is_valid(&self) -> Validation {
        if self.amount < 1 {
            return Validation::fail("Invalid amount");
        }
        if self.to_address.is_empty() {
            return Validation::fail("Invalid address");
        }
        Validation::ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_output() {
        let txo = TransactionOutput::new("wallet1", 10);
        assert!(txo.is_valid().success());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let txo = TransactionOutput::new("wallet1", 0);
        assert_eq!(txo.is_valid().message(), "Invalid amount");

        let txo = TransactionOutput::new("wallet1", -5);
        assert!(!txo.is_valid().success());
    }

    #[test]
    fn test_empty_address_rejected() {
        let txo = TransactionOutput::new("", 10);
        assert_eq!(txo.is_valid().message(), "Invalid address");
    }

    #[test]
    fn test_hash_ignores_owning_tx() {
        let a = TransactionOutput::new("wallet1", 10);
        let mut b = a.clone();
        b.tx = "abc".to_string();
        assert_eq!(a.get_hash(), b.get_hash());
        assert_ne!(a.get_hash(), TransactionOutput::new("wallet1", 11).get_hash());
    }

    #[test]
    fn test_defaults() {
        let txo = TransactionOutput::default();
        assert_eq!(txo.amount, 0);
        assert!(txo.to_address.is_empty());
        assert!(txo.tx.is_empty());
    }
}
