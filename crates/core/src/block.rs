//! Blocks and proof-of-work.

use crate::hash::{hash_hex, meets_difficulty};
use crate::transaction::Transaction;
use crate::validation::Validation;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Snapshot of what the next block must look like, handed to miners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    pub index: i64,
    pub previous_hash: String,
    pub difficulty: u32,
    pub max_difficulty: u32,
    pub fee_per_tx: i64,
    pub transactions: Vec<Transaction>,
}

/// A block of transactions.
///
/// `hash` is required when decoding: a payload without it is structurally
/// malformed rather than merely invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub previous_hash: String,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(default = "crate::now_millis")]
    pub timestamp: i64,
    #[serde(default)]
    pub nonce: u64,
    /// Address of the wallet that mined the block.
    #[serde(default)]
    pub miner: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    pub hash: String,
}

impl Block {
    /// Create a new unmined block.
    pub fn new(index: i64, previous_hash: impl Into<String>, transactions: Vec<Transaction>) -> Self {
        let mut block = Self {
            index,
            previous_hash: previous_hash.into(),
            timestamp: crate::now_millis(),
            nonce: 0,
            miner: String::new(),
            transactions,
            hash: String::new(),
        };
        block.hash = block.get_hash();
        block
    }

    /// Start a block from the chain's next-block snapshot.
    pub fn from_block_info(info: &BlockInfo) -> Self {
        Self::new(info.index, info.previous_hash.clone(), info.transactions.clone())
    }

    /// Normalize a decoded block: fill a missing hash and normalize every
    /// transaction.
    pub fn normalized(mut self) -> Self {
        self.transactions = self
            .transactions
            .into_iter()
            .map(Transaction::normalized)
            .collect();
        if self.hash.is_empty() {
            self.hash = self.get_hash();
        }
        self
    }

    pub fn get_hash(&self) -> String {
        let txs: String = self.transactions.iter().map(|tx| tx.hash.as_str()).collect();
        hash_hex(&format!(
            "{}{}{}{}{}{}",
            self.index, self.previous_hash, self.timestamp, txs, self.nonce, self.miner
        ))
    }

    /// Search for a nonce whose hash has `difficulty` leading zeros.
    ///
    /// Blocks the calling thread until a nonce is found. Use
    /// [`Block::mine_until`] when the search must be abandonable.
    pub fn mine(&mut self, difficulty: u32, miner: &str) {
        let never = AtomicBool::new(false);
        self.mine_until(difficulty, miner, &never);
    }

    /// Like [`Block::mine`], but gives up as soon as `stop` is set.
    ///
    /// Returns `true` when a valid nonce was found. A stopped block keeps
    /// whatever nonce it reached and fails proof-of-work validation.
    pub fn mine_until(&mut self, difficulty: u32, miner: &str, stop: &AtomicBool) -> bool {
        self.miner = miner.to_string();
        loop {
            if stop.load(Ordering::Relaxed) {
                return false;
            }
            self.nonce += 1;
            self.hash = self.get_hash();
            if meets_difficulty(&self.hash, difficulty) {
                return true;
            }
        }
    }

    /// Number of FEE transactions in the block.
    pub fn fee_tx_count(&self) -> usize {
        self.transactions.iter().filter(|tx| tx.is_fee()).count()
    }

    /// Validate the block against its predecessor.
    ///
    /// Transaction failures are combined into one message; the structural
    /// checks that follow stop at the first failure.
    pub fn is_valid(
        &self,
        previous_hash: &str,
        previous_index: i64,
        difficulty: u32,
        total_fees: i64,
    ) -> Validation {
        if !self.transactions.is_empty() {
            if self.fee_tx_count() > 1 {
                return Validation::fail("Invalid fee transaction");
            }

            let failures: Vec<String> = self
                .transactions
                .iter()
                .map(|tx| tx.is_valid(difficulty, total_fees))
                .filter(|v| !v.success())
                .map(|v| v.message().to_string())
                .collect();
            if !failures.is_empty() {
                return Validation::fail(format!(
                    "Invalid block due to invalid tx: {}",
                    failures.join(", ")
                ));
            }
        }

        if self.index.checked_sub(1) != Some(previous_index) {
            return Validation::fail("Invalid index");
        }
        if self.previous_hash != previous_hash {
            return Validation::fail("Invalid previous hash");
        }
        if self.transactions.is_empty() {
            return Validation::fail("Invalid data");
        }
        if self.timestamp < 1 {
            return Validation::fail("Invalid timestamp");
        }
        if self.nonce == 0 || self.miner.is_empty() {
            return Validation::fail("Invalid miner");
        }
        if self.hash != self.get_hash() || !meets_difficulty(&self.hash, difficulty) {
            return Validation::fail("Invalid hash");
        }

        Validation::ok()
    }
}
