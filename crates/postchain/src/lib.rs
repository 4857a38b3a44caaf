#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod chain;
pub mod config;
mod crypto;
mod error;
pub mod http;
pub mod network;
mod node;
mod peers;
mod pool;
mod types;

pub use chain::{Chain, check_chain_validity, genesis_block};
pub use config::{Config, DEFAULT_DIFFICULTY, NodeSettings};
pub use crypto::{MAX_DIFFICULTY, compute_hash, is_valid_proof, meets_difficulty, proof_of_work};
pub use error::{ChainError, NodeError, PeerError, RegistrationError, ReplayError};
pub use node::{ConsensusOutcome, MineOutcome, Node};
pub use peers::PeerRegistry;
pub use pool::TransactionPool;
pub use types::{Block, ChainDump, GENESIS_PREVIOUS_HASH, NewTransaction, NodeAddress, Transaction};
