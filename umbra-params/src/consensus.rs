//! Consensus context shared by chain selection and the checkpoint guard

use crate::hash::BlockHash;
use crate::network::{Network, NetworkType};
use once_cell::sync::OnceCell;
use tracing::{debug, warn};

/// Hash of the highest checkpoint present in the block index.
///
/// Starts out null and is set once during startup. The cell publishes the
/// value with release semantics, so readers on other threads see either null
/// or the complete hash.
#[derive(Debug, Default)]
pub struct HardenedCheckpointCache {
    hash: OnceCell<BlockHash>,
}

impl HardenedCheckpointCache {
    /// Create an unset cache
    pub fn new() -> Self {
        Self {
            hash: OnceCell::new(),
        }
    }

    /// Current value, or [`BlockHash::NULL`] if not set yet
    pub fn get(&self) -> BlockHash {
        self.hash.get().copied().unwrap_or(BlockHash::NULL)
    }

    /// True once a hash has been published
    pub fn is_set(&self) -> bool {
        self.hash.get().is_some()
    }

    /// Publish the hash. Returns `false` if it was already set; the
    /// original value is kept.
    pub fn set(&self, hash: BlockHash) -> bool {
        match self.hash.set(hash) {
            Ok(()) => {
                debug!(event = "hardened_checkpoint_set", hash = %hash, "Hardened checkpoint cached");
                true
            }
            Err(rejected) => {
                warn!(
                    event = "hardened_checkpoint_reset_ignored",
                    current = %self.get(),
                    rejected = %rejected,
                    "Hardened checkpoint already set"
                );
                false
            }
        }
    }
}

/// Process-wide consensus settings, passed explicitly to consumers.
#[derive(Debug)]
pub struct ConsensusContext {
    /// Network configuration
    pub network: Network,
    checkpoints_enabled: bool,
    hardened: HardenedCheckpointCache,
}

impl ConsensusContext {
    /// Context with checkpoint enforcement on
    pub fn new(network_type: NetworkType) -> Self {
        Self::with_checkpoints(network_type, true)
    }

    /// Context with explicit checkpoint enforcement
    pub fn with_checkpoints(network_type: NetworkType, checkpoints_enabled: bool) -> Self {
        if !checkpoints_enabled {
            warn!(
                event = "checkpoints_disabled",
                network = %network_type,
                "Checkpoint enforcement disabled; deep reorganizations will not be vetoed"
            );
        }
        Self {
            network: Network::from_type(network_type),
            checkpoints_enabled,
            hardened: HardenedCheckpointCache::new(),
        }
    }

    /// Active network mode
    pub fn network_type(&self) -> NetworkType {
        self.network.network_type
    }

    /// Whether checkpoint mismatches veto candidate chains
    pub fn checkpoints_enabled(&self) -> bool {
        self.checkpoints_enabled
    }

    /// Cached hardened checkpoint
    pub fn hardened(&self) -> &HardenedCheckpointCache {
        &self.hardened
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_cache_starts_null() {
        let cache = HardenedCheckpointCache::new();
        assert!(!cache.is_set());
        assert!(cache.get().is_null());
    }

    #[test]
    fn test_cache_sets_once() {
        let cache = HardenedCheckpointCache::new();
        let first = BlockHash::from_bytes([1u8; 32]);
        let second = BlockHash::from_bytes([2u8; 32]);

        assert!(cache.set(first));
        assert!(!cache.set(second));
        assert_eq!(cache.get(), first);
    }

    #[test]
    fn test_cache_visible_across_threads() {
        let ctx = Arc::new(ConsensusContext::new(NetworkType::Mainnet));
        let value = BlockHash::from_bytes([7u8; 32]);

        let writer = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || ctx.hardened().set(value))
        };
        assert!(writer.join().unwrap());

        let reader = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || ctx.hardened().get())
        };
        assert_eq!(reader.join().unwrap(), value);
    }

    #[test]
    fn test_context_defaults() {
        let ctx = ConsensusContext::new(NetworkType::Testnet);
        assert_eq!(ctx.network_type(), NetworkType::Testnet);
        assert!(ctx.checkpoints_enabled());

        let ctx = ConsensusContext::with_checkpoints(NetworkType::Mainnet, false);
        assert!(!ctx.checkpoints_enabled());
    }
}
