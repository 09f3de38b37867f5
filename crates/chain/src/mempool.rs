//! Transaction mempool for pending transactions.
//!
//! The mempool keeps accepted transactions in arrival order until a block
//! that includes them is added to the chain.

use std::collections::{HashMap, HashSet};
use tallychain_core::Transaction;
use thiserror::Error;

/// Errors that can occur during mempool operations.
#[derive(Debug, Error)]
pub enum MempoolError {
    #[error("transaction already in mempool")]
    DuplicateTransaction,

    #[error("mempool is full (capacity: {0})")]
    MempoolFull(usize),

    #[error("block transactions not found in mempool ({missing} of {expected})")]
    UnknownTransactions { expected: usize, missing: usize },
}

pub type Result<T> = std::result::Result<T, MempoolError>;

/// Configuration for the mempool.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct MempoolConfig {
    /// Maximum number of transactions in the mempool.
    pub max_transactions: usize,
}

impl Default for MempoolConfig {
    fn default() -> Self {
        Self {
            max_transactions: 10_000,
        }
    }
}

/// Transaction mempool.
pub struct Mempool {
    /// Configuration.
    config: MempoolConfig,
    /// Pending transactions, oldest first.
    transactions: Vec<Transaction>,
    /// Set of transaction hashes for fast lookup.
    tx_hashes: HashSet<String>,
    /// Number of pending transactions spending from each address.
    by_sender: HashMap<String, usize>,
}

impl Mempool {
    /// Create a new mempool with default configuration.
    pub fn new() -> Self {
        Self::with_config(MempoolConfig::default())
    }

    /// Create a new mempool with the given configuration.
    pub fn with_config(config: MempoolConfig) -> Self {
        Self {
            config,
            transactions: Vec::new(),
            tx_hashes: HashSet::new(),
            by_sender: HashMap::new(),
        }
    }

    /// Get the number of transactions in the mempool.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Check if the mempool is empty.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Check if a transaction is in the mempool.
    pub fn contains(&self, tx_hash: &str) -> bool {
        self.tx_hashes.contains(tx_hash)
    }

    /// Position of a transaction in arrival order.
    pub fn position(&self, tx_hash: &str) -> Option<usize> {
        if !self.contains(tx_hash) {
            return None;
        }
        self.transactions.iter().position(|tx| tx.hash == tx_hash)
    }

    /// All pending transactions, oldest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The `limit` oldest pending transactions.
    pub fn oldest(&self, limit: usize) -> Vec<Transaction> {
        self.transactions.iter().take(limit).cloned().collect()
    }

    /// Whether a pending transaction already spends from `address`.
    pub fn has_pending_from(&self, address: &str) -> bool {
        self.by_sender.contains_key(address)
    }

    /// Add a transaction to the mempool.
    pub fn add(&mut self, tx: Transaction) -> Result<()> {
        if self.contains(&tx.hash) {
            return Err(MempoolError::DuplicateTransaction);
        }
        if self.transactions.len() >= self.config.max_transactions {
            return Err(MempoolError::MempoolFull(self.config.max_transactions));
        }

        for sender in senders(&tx) {
            *self.by_sender.entry(sender).or_default() += 1;
        }
        self.tx_hashes.insert(tx.hash.clone());
        self.transactions.push(tx);

        Ok(())
    }

    /// Drop the transactions a new block includes.
    ///
    /// Every hash must be pending (removed + retained == current length);
    /// otherwise nothing is removed. Returns the number removed.
    pub fn reconcile(&mut self, included: &[String]) -> Result<usize> {
        let wanted: HashSet<&str> = included.iter().map(String::as_str).collect();
        let retained = self
            .transactions
            .iter()
            .filter(|tx| !wanted.contains(tx.hash.as_str()))
            .count();

        if retained + included.len() != self.transactions.len() {
            return Err(MempoolError::UnknownTransactions {
                expected: included.len(),
                missing: (retained + included.len()).saturating_sub(self.transactions.len()),
            });
        }

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.transactions)
            .into_iter()
            .partition(|tx| wanted.contains(tx.hash.as_str()));

        for tx in &removed {
            self.tx_hashes.remove(&tx.hash);
            for sender in senders(tx) {
                if let Some(count) = self.by_sender.get_mut(&sender) {
                    *count -= 1;
                    if *count == 0 {
                        self.by_sender.remove(&sender);
                    }
                }
            }
        }
        self.transactions = kept;

        Ok(removed.len())
    }
}

impl Default for Mempool {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct addresses a transaction spends from.
fn senders(tx: &Transaction) -> HashSet<String> {
    tx.tx_inputs
        .iter()
        .flatten()
        .map(|txi| txi.from_address.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallychain_core::{Keypair, TransactionInput, TransactionOutput};

    fn transfer(keypair: &Keypair, amount: i64) -> Transaction {
        let txi = TransactionInput::new(keypair.address(), amount, "prev").signed(keypair);
        Transaction::transfer(vec![txi], vec![TransactionOutput::new("wallet2", amount)])
    }

    #[test]
    fn test_mempool_add_and_position() {
        let mut mempool = Mempool::new();
        let keypair = Keypair::generate();
        let tx = transfer(&keypair, 10);

        assert!(mempool.add(tx.clone()).is_ok());
        assert_eq!(mempool.len(), 1);
        assert!(mempool.contains(&tx.hash));
        assert_eq!(mempool.position(&tx.hash), Some(0));
        assert!(mempool.has_pending_from(&keypair.address()));
        assert_eq!(mempool.position("missing"), None);
    }

    #[test]
    fn test_mempool_duplicate_rejected() {
        let mut mempool = Mempool::new();
        let tx = transfer(&Keypair::generate(), 10);

        assert!(mempool.add(tx.clone()).is_ok());
        assert!(matches!(
            mempool.add(tx),
            Err(MempoolError::DuplicateTransaction)
        ));
    }

    #[test]
    fn test_mempool_oldest_first() {
        let mut mempool = Mempool::new();
        let txs: Vec<_> = (1..=3).map(|i| transfer(&Keypair::generate(), i)).collect();
        for tx in &txs {
            mempool.add(tx.clone()).unwrap();
        }

        assert_eq!(mempool.oldest(2), txs[..2].to_vec());
        assert_eq!(mempool.oldest(10).len(), 3);
    }

    #[test]
    fn test_mempool_capacity_limit() {
        let mut mempool = Mempool::with_config(MempoolConfig {
            max_transactions: 1,
        });

        assert!(mempool.add(transfer(&Keypair::generate(), 1)).is_ok());
        assert!(matches!(
            mempool.add(transfer(&Keypair::generate(), 2)),
            Err(MempoolError::MempoolFull(1))
        ));
    }

    #[test]
    fn test_reconcile_removes_included() {
        let mut mempool = Mempool::new();
        let keypair = Keypair::generate();
        let tx1 = transfer(&keypair, 1);
        let tx2 = transfer(&Keypair::generate(), 2);
        mempool.add(tx1.clone()).unwrap();
        mempool.add(tx2.clone()).unwrap();

        assert_eq!(mempool.reconcile(&[tx1.hash.clone()]).unwrap(), 1);
        assert_eq!(mempool.transactions(), &[tx2]);
        assert!(!mempool.contains(&tx1.hash));
        assert!(!mempool.has_pending_from(&keypair.address()));
    }

    #[test]
    fn test_reconcile_unknown_leaves_pool_untouched() {
        let mut mempool = Mempool::new();
        let tx = transfer(&Keypair::generate(), 1);
        mempool.add(tx.clone()).unwrap();

        let result = mempool.reconcile(&[tx.hash.clone(), "unknown".to_string()]);
        assert!(matches!(
            result,
            Err(MempoolError::UnknownTransactions { expected: 2, missing: 1 })
        ));
        assert_eq!(mempool.transactions(), &[tx]);
    }

    #[test]
    fn test_reconcile_duplicate_hash_rejected() {
        let mut mempool = Mempool::new();
        let tx = transfer(&Keypair::generate(), 1);
        mempool.add(tx.clone()).unwrap();

        assert!(mempool.reconcile(&[tx.hash.clone(), tx.hash.clone()]).is_err());
        assert_eq!(mempool.len(), 1);
    }
}
