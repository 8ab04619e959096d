//! Umbra network parameters and hardened checkpoints
//!
//! This crate provides network-specific constants, the compiled-in checkpoint
//! tables, and the checkpoint guard consulted by chain selection.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod checkpoints;
pub mod config;
pub mod consensus;
pub mod guard;
pub mod hash;
pub mod network;

pub use checkpoints::{Checkpoint, CheckpointRegistry, CheckpointSet};
pub use config::{NodeConfig, TorSettings};
pub use consensus::{ConsensusContext, HardenedCheckpointCache};
pub use guard::{BlockIndex, BlockIndexEntry, CheckpointGuard, CheckpointViolation};
pub use hash::BlockHash;
pub use network::{Network, NetworkType};

/// Error types for parameter operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid network specified
    #[error("Invalid network: {0}")]
    InvalidNetwork(String),

    /// Malformed block hash
    #[error("Invalid block hash: {0}")]
    InvalidHash(String),

    /// Checkpoint table failed validation
    #[error("Invalid checkpoint list: {0}")]
    InvalidCheckpoints(String),

    /// Height-0 checkpoint does not match the network genesis block
    #[error("Genesis checkpoint mismatch on {network}: expected {expected}, found {found}")]
    GenesisMismatch {
        /// Network whose table is broken
        network: NetworkType,
        /// Compiled-in genesis hash
        expected: BlockHash,
        /// Hash registered at height 0
        found: BlockHash,
    },

    /// Configuration could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for parameter operations
pub type Result<T> = std::result::Result<T, Error>;
