//! Main ledger orchestration.
//!
//! [`Blockchain`] owns the block list and the mempool. Every mutation is
//! validated first and applied only when all checks pass, so a rejected
//! block or transaction leaves both untouched.

use crate::mempool::{Mempool, MempoolConfig};
use serde::{Deserialize, Serialize};
use tallychain_core::{
    reward_amount, Block, BlockInfo, Transaction, TransactionInput, TransactionOutput, Validation,
};
use tracing::{debug, info, warn};

/// Blockchain configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BlockchainConfig {
    /// Maximum transactions offered in a block template.
    pub tx_per_block: usize,
    /// Chain length per step of difficulty.
    pub difficulty_factor: usize,
    /// Ceiling advertised to miners in [`BlockInfo`].
    pub max_difficulty: u32,
    /// Fee a miner may claim per block on top of the reward.
    pub fee_per_tx: i64,
    /// Mempool configuration.
    pub mempool: MempoolConfig,
}

impl Default for BlockchainConfig {
    fn default() -> Self {
        Self {
            tx_per_block: 2,
            difficulty_factor: 5,
            max_difficulty: 62,
            fee_per_tx: 1,
            mempool: MempoolConfig::default(),
        }
    }
}

/// Where a transaction was found.
///
/// Indices are `-1` when the transaction is not in that location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSearch {
    pub mempool_index: i64,
    pub block_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Transaction>,
}

impl TransactionSearch {
    fn not_found() -> Self {
        Self {
            mempool_index: -1,
            block_index: -1,
            transaction: None,
        }
    }
}

/// The authoritative chain of blocks plus its mempool.
pub struct Blockchain {
    /// Blocks, genesis first. Never empty.
    blocks: Vec<Block>,
    /// Pending transactions.
    mempool: Mempool,
    /// Configuration.
    config: BlockchainConfig,
}

impl Blockchain {
    /// Create a chain whose genesis block rewards `miner`.
    pub fn new(miner: &str) -> Self {
        Self::with_config(miner, BlockchainConfig::default())
    }

    /// Create a chain with the given configuration.
    pub fn with_config(miner: &str, config: BlockchainConfig) -> Self {
        let mempool = Mempool::with_config(config.mempool.clone());
        let mut blockchain = Self {
            blocks: Vec::new(),
            mempool,
            config,
        };
        let genesis = blockchain.create_genesis(miner);
        info!(hash = %genesis.hash, miner, "created genesis block");
        blockchain.blocks.push(genesis);
        blockchain
    }

    fn create_genesis(&self, miner: &str) -> Block {
        let difficulty = self.difficulty_at(1);
        let reward = Transaction::from_reward(TransactionOutput::new(miner, reward_amount(difficulty)));

        let mut genesis = Block::new(0, "", vec![reward]);
        genesis.mine(difficulty, miner);
        genesis
    }

    /// The configuration in use.
    pub fn config(&self) -> &BlockchainConfig {
        &self.config
    }

    /// All blocks, genesis first.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks including genesis.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Pairs with [`Blockchain::len`]; a chain built by `new` holds genesis.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Pending transactions.
    pub fn mempool(&self) -> &Mempool {
        &self.mempool
    }

    /// The tip of the chain.
    pub fn get_last_block(&self) -> &Block {
        self.blocks
            .last()
            .expect("chain always holds the genesis block")
    }

    /// Get a block by hash.
    pub fn get_block(&self, hash: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.hash == hash)
    }

    /// Get a block by index.
    pub fn get_block_by_index(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    /// Difficulty for a chain holding `len` blocks.
    pub fn difficulty_at(&self, len: usize) -> u32 {
        let steps = len.div_ceil(self.config.difficulty_factor.max(1));
        u32::try_from(steps + 1).unwrap_or(u32::MAX)
    }

    /// Difficulty the next block must be mined at.
    pub fn get_difficulty(&self) -> u32 {
        self.difficulty_at(self.blocks.len())
    }

    pub fn get_fee_per_tx(&self) -> i64 {
        self.config.fee_per_tx
    }

    pub fn get_reward_amount(difficulty: u32) -> i64 {
        reward_amount(difficulty)
    }

    /// Template for the next block, or `None` while the mempool is empty.
    pub fn get_next_block(&self) -> Option<BlockInfo> {
        if self.mempool.is_empty() {
            return None;
        }

        let last = self.get_last_block();
        Some(BlockInfo {
            index: self.blocks.len() as i64,
            previous_hash: last.hash.clone(),
            difficulty: self.get_difficulty(),
            max_difficulty: self.config.max_difficulty,
            fee_per_tx: self.get_fee_per_tx(),
            transactions: self.mempool.oldest(self.config.tx_per_block),
        })
    }

    /// Admit a transaction to the mempool.
    ///
    /// On success the message carries the transaction hash.
    pub fn add_transaction(&mut self, tx: Transaction) -> Validation {
        let validation = self.check_transaction(&tx);
        if !validation.success() {
            warn!(hash = %tx.hash, reason = validation.message(), "rejected transaction");
            return validation;
        }

        let hash = tx.hash.clone();
        if let Err(err) = self.mempool.add(tx) {
            warn!(%hash, %err, "rejected transaction");
            return Validation::fail(format!("Invalid tx: {err}"));
        }

        debug!(%hash, pending = self.mempool.len(), "accepted transaction");
        Validation::ok_with(hash)
    }

    fn check_transaction(&self, tx: &Transaction) -> Validation {
        if let Some(inputs) = tx.tx_inputs.as_ref().filter(|inputs| !inputs.is_empty()) {
            if inputs
                .iter()
                .any(|txi| self.mempool.has_pending_from(&txi.from_address))
            {
                return Validation::fail("This wallet has a pending transaction");
            }

            for txi in inputs {
                let utxo = self.get_utxo(&txi.from_address);
                let unspent = utxo
                    .iter()
                    .any(|txo| txo.tx == txi.previous_tx && txo.amount >= txi.amount);
                if !unspent {
                    return Validation::fail("Invalid tx: the TXO is already spent or nonexistent");
                }
            }
        }

        let validation = tx.is_valid(self.get_difficulty(), self.get_fee_per_tx());
        if !validation.success() {
            return Validation::fail(format!("Invalid tx: {}", validation.message()));
        }

        if self.is_mined(&tx.hash) {
            return Validation::fail("Duplicated tx in blockchain");
        }

        if tx.is_fee() {
            return Validation::fail("Invalid tx: fee transactions are only accepted in blocks");
        }

        Validation::ok()
    }

    fn is_mined(&self, tx_hash: &str) -> bool {
        self.blocks
            .iter()
            .any(|block| block.transactions.iter().any(|tx| tx.hash == tx_hash))
    }

    /// Append a mined block.
    ///
    /// The block is checked against the same snapshot [`get_next_block`]
    /// hands to miners. Its non-FEE transactions must all be pending; they
    /// leave the mempool as the block is appended. On success the message
    /// carries the block hash.
    ///
    /// [`get_next_block`]: Blockchain::get_next_block
    pub fn add_block(&mut self, block: Block) -> Validation {
        let Some(next) = self.get_next_block() else {
            warn!(hash = %block.hash, "rejected block: empty mempool");
            return Validation::fail("There is no next block info");
        };

        let validation = block.is_valid(
            &next.previous_hash,
            next.index - 1,
            next.difficulty,
            next.fee_per_tx,
        );
        if !validation.success() {
            warn!(hash = %block.hash, reason = validation.message(), "rejected block");
            return Validation::fail(format!("Invalid block: {}", validation.message()));
        }

        let included: Vec<String> = block
            .transactions
            .iter()
            .filter(|tx| !tx.is_fee())
            .map(|tx| tx.hash.clone())
            .collect();
        if let Err(err) = self.mempool.reconcile(&included) {
            warn!(hash = %block.hash, %err, "rejected block");
            return Validation::fail("Invalid tx in block: mempool");
        }

        let hash = block.hash.clone();
        debug!(%hash, index = block.index, txs = block.transactions.len(), "accepted block");
        self.blocks.push(block);
        Validation::ok_with(hash)
    }

    /// Revalidate every block against its predecessor, tip first.
    ///
    /// Each block is checked at the difficulty the chain required when it
    /// was appended.
    pub fn is_valid(&self) -> Validation {
        for i in (1..self.blocks.len()).rev() {
            let current = &self.blocks[i];
            let previous = &self.blocks[i - 1];
            let validation = current.is_valid(
                &previous.hash,
                previous.index,
                self.difficulty_at(i),
                self.get_fee_per_tx(),
            );
            if !validation.success() {
                return Validation::fail(format!("Invalid block #{i}: {}", validation.message()));
            }
        }
        Validation::ok()
    }

    /// Find a transaction in the mempool, then in the blocks.
    pub fn get_transaction(&self, hash: &str) -> TransactionSearch {
        if let Some(position) = self.mempool.position(hash) {
            return TransactionSearch {
                mempool_index: position as i64,
                block_index: -1,
                transaction: self.mempool.transactions().get(position).cloned(),
            };
        }

        for (index, block) in self.blocks.iter().enumerate() {
            if let Some(tx) = block.transactions.iter().find(|tx| tx.hash == hash) {
                return TransactionSearch {
                    mempool_index: -1,
                    block_index: index as i64,
                    transaction: Some(tx.clone()),
                };
            }
        }

        TransactionSearch::not_found()
    }

    /// Inputs spent from `address` in mined blocks.
    pub fn get_tx_inputs(&self, address: &str) -> Vec<TransactionInput> {
        self.blocks
            .iter()
            .flat_map(|block| &block.transactions)
            .flat_map(|tx| tx.tx_inputs.iter().flatten())
            .filter(|txi| txi.from_address == address)
            .cloned()
            .collect()
    }

    /// Outputs paid to `address` in mined blocks.
    pub fn get_tx_outputs(&self, address: &str) -> Vec<TransactionOutput> {
        self.blocks
            .iter()
            .flat_map(|block| &block.transactions)
            .flat_map(|tx| &tx.tx_outputs)
            .filter(|txo| txo.to_address == address)
            .cloned()
            .collect()
    }

    /// Unspent outputs of `address`.
    ///
    /// Each mined input cancels one output of the same amount. Outputs are
    /// not matched by `previous_tx`, so two equal outputs are interchangeable.
    pub fn get_utxo(&self, address: &str) -> Vec<TransactionOutput> {
        let mut outputs = self.get_tx_outputs(address);
        for txi in self.get_tx_inputs(address) {
            if let Some(position) = outputs.iter().position(|txo| txo.amount == txi.amount) {
                outputs.remove(position);
            }
        }
        outputs
    }

    pub fn get_balance(&self, address: &str) -> i64 {
        self.get_utxo(address)
            .iter()
            .fold(0i64, |sum, txo| sum.saturating_add(txo.amount))
    }
}
