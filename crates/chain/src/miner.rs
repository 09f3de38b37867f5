//! Proof-of-work mining off the ledger lock.
//!
//! A [`Miner`] turns a [`BlockInfo`] snapshot into a candidate block that
//! pays its own reward, then searches for a nonce on a dedicated thread.
//! The returned [`MiningHandle`] can stop the search at any time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tallychain_core::{reward_amount, Block, BlockInfo, Transaction, TransactionOutput};
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while waiting for a mining job.
#[derive(Debug, Error)]
pub enum MinerError {
    #[error("mining worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, MinerError>;

/// A wallet that mines blocks.
#[derive(Debug, Clone)]
pub struct Miner {
    address: String,
}

impl Miner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Build the unmined block for `info`.
    ///
    /// The snapshot's transactions are followed by one FEE transaction
    /// claiming the reward for `info.difficulty` plus the per-block fee.
    pub fn prepare(&self, info: &BlockInfo) -> Block {
        let reward = reward_amount(info.difficulty).saturating_add(info.fee_per_tx);
        let mut block = Block::from_block_info(info);
        block
            .transactions
            .push(Transaction::from_reward(TransactionOutput::new(
                self.address.clone(),
                reward,
            )));
        block.hash = block.get_hash();
        block
    }

    /// Prepare a block for `info` and start mining it.
    pub fn start(&self, info: &BlockInfo) -> MiningHandle {
        MiningHandle::spawn(self.prepare(info), info.difficulty, self.address.clone())
    }
}

/// A running nonce search.
///
/// Dropping the handle without joining cancels the search.
pub struct MiningHandle {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<Option<Block>>>,
}

impl MiningHandle {
    /// Mine `block` at `difficulty` on a new thread.
    pub fn spawn(mut block: Block, difficulty: u32, miner: String) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();

        info!(index = block.index, difficulty, %miner, "mining started");
        let worker = thread::spawn(move || {
            if block.mine_until(difficulty, &miner, &flag) {
                info!(index = block.index, hash = %block.hash, nonce = block.nonce, "mined block");
                Some(block)
            } else {
                debug!(index = block.index, nonce = block.nonce, "mining cancelled");
                None
            }
        });

        Self {
            stop,
            worker: Some(worker),
        }
    }

    /// Ask the worker to stop. It returns at its next nonce.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Whether the worker has returned.
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map_or(true, |worker| worker.is_finished())
    }

    /// Wait for the worker. `None` means the search was cancelled.
    pub fn join(mut self) -> Result<Option<Block>> {
        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| MinerError::WorkerPanicked),
            None => Ok(None),
        }
    }
}

impl Drop for MiningHandle {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.cancel();
        }
    }
}
