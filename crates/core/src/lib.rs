//! Core ledger primitives for tallychain.
//!
//! This crate provides the fundamental types of the ledger:
//! - Cryptographic primitives (hashing, signing, wallet keys)
//! - The uniform [`Validation`] result
//! - Transaction inputs, outputs and transactions
//! - Blocks and proof-of-work mining
//! - The block reward schedule

pub mod block;
pub mod crypto;
pub mod hash;
pub mod input;
pub mod output;
pub mod reward;
pub mod transaction;
pub mod validation;

// Re-export commonly used types at the crate root
pub use block::{Block, BlockInfo};
pub use crypto::{CryptoError, Keypair, PublicKey, Signature};
pub use hash::{hash, hash_hex, meets_difficulty, Hash, H256};
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use reward::reward_amount;
pub use transaction::{Transaction, TransactionType};
pub use validation::Validation;

/// Current Unix time in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
