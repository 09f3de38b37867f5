//! Transaction inputs and signing.

use crate::crypto::{verify_hex, Keypair};
use crate::hash::{hash, Hash};
use crate::output::TransactionOutput;
use crate::validation::Validation;
use serde::{Deserialize, Serialize};

/// A signed claim redeeming a prior output.
///
/// The signature covers `(from_address, amount, previous_tx)` and is checked
/// against `from_address` read as a hex public key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInput {
    #[serde(default)]
    pub from_address: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub previous_tx: String,
    /// Hex-encoded signature, empty while unsigned.
    #[serde(default)]
    pub signature: String,
}

impl TransactionInput {
    /// Create an unsigned input.
    pub fn new(from_address: impl Into<String>, amount: i64, previous_tx: impl Into<String>) -> Self {
        Self {
            from_address: from_address.into(),
            amount,
            previous_tx: previous_tx.into(),
            signature: String::new(),
        }
    }

    /// Build an unsigned input that spends `txo` in full.
    pub fn from_txo(txo: &TransactionOutput) -> Self {
        Self::new(txo.to_address.clone(), txo.amount, txo.tx.clone())
    }

    fn digest(&self) -> Hash {
        hash(format!("{}{}{}", self.from_address, self.amount, self.previous_tx).as_bytes())
    }

    pub fn get_hash(&self) -> String {
        self.digest().to_hex()
    }

    /// Sign the input with the given keypair.
    pub fn sign(&mut self, keypair: &Keypair) {
        self.signature = keypair.sign_hash(&self.digest()).to_hex();
    }

    /// Create a signed input.
    pub fn signed(mut self, keypair: &Keypair) -> Self {
        self.sign(keypair);
        self
    }

    pub fn is_valid(&self) -> Validation {
        if self.previous_tx.is_empty() || self.signature.is_empty() {
            return Validation::fail("Signature and previous TX are required");
        }
        if self.amount < 1 {
            return Validation::fail("Amount must be greater than 0");
        }
        match verify_hex(&self.from_address, &self.get_hash(), &self.signature) {
            Ok(()) => Validation::ok(),
            Err(_) => Validation::fail("Invalid tx input signature"),
        }
    }
}
