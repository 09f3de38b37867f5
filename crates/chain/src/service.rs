//! Shared ledger handle for a transport layer.
//!
//! [`LedgerService`] serializes every call behind one lock so reads and
//! writes see a consistent chain. Inbound payloads are JSON; a payload that
//! does not decode is reported apart from one the ledger rejects.

use crate::blockchain::{Blockchain, BlockchainConfig, TransactionSearch};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use tallychain_core::{Block, BlockInfo, Transaction, TransactionOutput, Validation};
use thiserror::Error;

/// Errors returned for submitted payloads.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("rejected: {}", .0.message())]
    Rejected(Validation),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Chain summary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStatus {
    pub number_of_blocks: usize,
    pub is_valid: Validation,
    pub last_block: Block,
}

/// Mempool summary.
#[derive(Debug, Clone, Serialize)]
pub struct PendingSummary {
    /// Transactions the next block would take.
    pub next: Vec<Transaction>,
    /// All pending transactions.
    pub total: usize,
}

/// What a wallet needs to build a transfer.
#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub balance: i64,
    pub fee: i64,
    pub utxo: Vec<TransactionOutput>,
}

/// Cloneable handle to one ledger.
#[derive(Clone)]
pub struct LedgerService {
    inner: Arc<Mutex<Blockchain>>,
}

impl LedgerService {
    /// Start a ledger whose genesis block rewards `miner`.
    pub fn new(miner: &str) -> Self {
        Self::from_blockchain(Blockchain::new(miner))
    }

    pub fn with_config(miner: &str, config: BlockchainConfig) -> Self {
        Self::from_blockchain(Blockchain::with_config(miner, config))
    }

    pub fn from_blockchain(blockchain: Blockchain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(blockchain)),
        }
    }

    /// Run `f` against the ledger while holding the lock.
    pub fn with_ledger<R>(&self, f: impl FnOnce(&Blockchain) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn status(&self) -> ChainStatus {
        let blockchain = self.inner.lock();
        ChainStatus {
            number_of_blocks: blockchain.len(),
            is_valid: blockchain.is_valid(),
            last_block: blockchain.get_last_block().clone(),
        }
    }

    /// Look a block up by index when `key` is all digits, else by hash.
    pub fn block(&self, key: &str) -> Option<Block> {
        let blockchain = self.inner.lock();
        if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
            let index = key.parse::<usize>().ok()?;
            blockchain.get_block_by_index(index).cloned()
        } else {
            blockchain.get_block(key).cloned()
        }
    }

    pub fn next_block(&self) -> Option<BlockInfo> {
        self.inner.lock().get_next_block()
    }

    /// Decode and append a mined block.
    pub fn submit_block(&self, payload: &str) -> Result<Block> {
        let block: Block = serde_json::from_str(payload)?;
        let block = block.normalized();

        let validation = self.inner.lock().add_block(block.clone());
        if validation.success() {
            Ok(block)
        } else {
            Err(LedgerError::Rejected(validation))
        }
    }

    pub fn transaction(&self, hash: &str) -> TransactionSearch {
        self.inner.lock().get_transaction(hash)
    }

    pub fn pending(&self) -> PendingSummary {
        let blockchain = self.inner.lock();
        PendingSummary {
            next: blockchain
                .mempool()
                .oldest(blockchain.config().tx_per_block),
            total: blockchain.mempool().len(),
        }
    }

    /// Decode and admit a transaction to the mempool.
    pub fn submit_transaction(&self, payload: &str) -> Result<Transaction> {
        let tx: Transaction = serde_json::from_str(payload)?;
        let tx = tx.normalized();

        let validation = self.inner.lock().add_transaction(tx.clone());
        if validation.success() {
            Ok(tx)
        } else {
            Err(LedgerError::Rejected(validation))
        }
    }

    pub fn wallet(&self, address: &str) -> WalletSummary {
        let blockchain = self.inner.lock();
        let utxo = blockchain.get_utxo(address);
        WalletSummary {
            balance: utxo
                .iter()
                .fold(0i64, |sum, txo| sum.saturating_add(txo.amount)),
            fee: blockchain.get_fee_per_tx(),
            utxo,
        }
    }
}
