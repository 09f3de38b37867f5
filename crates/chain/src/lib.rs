//! Ledger orchestration for tallychain.
//!
//! This crate brings the core types together into a working ledger:
//! - **Mempool**: pending transactions in arrival order
//! - **Blockchain**: the chain, difficulty, UTXO queries and next-block templates
//! - **Miner**: cancellable proof-of-work on a worker thread
//! - **Service**: a shared, lock-serialized handle for a transport layer
//!
//! # Example
//!
//! ```rust,no_run
//! use tallychain_chain::{Blockchain, Miner};
//! use tallychain_core::{Keypair, Transaction, TransactionInput, TransactionOutput};
//!
//! let keypair = Keypair::generate();
//! let mut blockchain = Blockchain::new(&keypair.address());
//!
//! // Spend the genesis reward
//! let txo = blockchain.get_utxo(&keypair.address())[0].clone();
//! let txi = TransactionInput::from_txo(&txo).signed(&keypair);
//! let tx = Transaction::transfer(
//!     vec![txi],
//!     vec![TransactionOutput::new("recipient", txo.amount - blockchain.get_fee_per_tx())],
//! );
//! blockchain.add_transaction(tx);
//!
//! // Mine the next block and append it
//! let info = blockchain.get_next_block().unwrap();
//! let block = Miner::new(keypair.address()).start(&info).join().unwrap().unwrap();
//! assert!(blockchain.add_block(block).success());
//! ```

pub mod blockchain;
pub mod mempool;
pub mod miner;
pub mod service;

// Re-export commonly used types
pub use blockchain::{Blockchain, BlockchainConfig, TransactionSearch};
pub use mempool::{Mempool, MempoolConfig, MempoolError};
pub use miner::{Miner, MinerError, MiningHandle};
pub use service::{ChainStatus, LedgerError, LedgerService, PendingSummary, WalletSummary};
