//! Checkpoint guard
//!
//! Query surface consulted by chain selection before a candidate best chain
//! is accepted, and by sync-progress reporting. All operations read the
//! checkpoint set of the active network only.

use crate::checkpoints::{CheckpointRegistry, CheckpointSet};
use crate::consensus::ConsensusContext;
use crate::hash::BlockHash;
use tracing::{debug, warn};

/// A block header record owned by the block-index store.
pub trait BlockIndexEntry {
    /// Hash of the block
    fn block_hash(&self) -> BlockHash;
    /// Height of the block
    fn height(&self) -> u32;
}

/// Read access to the block-index store.
///
/// Implementations handle their own locking. The guard never holds a lock of
/// its own while calling into this trait.
pub trait BlockIndex {
    /// Handle returned for known blocks
    type Entry: BlockIndexEntry;

    /// Look up a block by hash
    fn lookup_block_by_hash(&self, hash: &BlockHash) -> Option<Self::Entry>;

    /// The genesis block. Always present.
    fn genesis_block_index(&self) -> Self::Entry;
}

/// A candidate chain disagrees with a hardened checkpoint.
///
/// This is a consensus veto: the whole candidate chain must be rejected and
/// the result must not be retried into success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Checkpoint mismatch at height {height}: expected {expected}, found {found}")]
pub struct CheckpointViolation {
    /// Checkpointed height
    pub height: u32,
    /// Registered hash
    pub expected: BlockHash,
    /// Hash carried by the candidate chain
    pub found: BlockHash,
}

/// Checkpoint queries over the active network's checkpoint set.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointGuard<'a> {
    checkpoints: &'a CheckpointSet,
    context: &'a ConsensusContext,
}

impl<'a> CheckpointGuard<'a> {
    /// Guard for the network selected by `context`
    pub fn new(registry: &'a CheckpointRegistry, context: &'a ConsensusContext) -> Self {
        Self {
            checkpoints: registry.for_network(context.network_type()),
            context,
        }
    }

    /// Active checkpoint set
    pub fn checkpoints(&self) -> &'a CheckpointSet {
        self.checkpoints
    }

    /// Returns false only if `height` is checkpointed and `hash` differs
    /// from the registered hash.
    pub fn check_hardened(&self, height: u32, hash: &BlockHash) -> bool {
        if !self.context.checkpoints_enabled() {
            return true;
        }
        match self.checkpoints.hash(height) {
            None => true,
            Some(expected) if expected == *hash => true,
            Some(expected) => {
                warn!(
                    event = "checkpoint_mismatch",
                    height = height,
                    expected = %expected,
                    found = %hash,
                    "Candidate block conflicts with hardened checkpoint"
                );
                false
            }
        }
    }

    /// Height of the highest registered checkpoint.
    ///
    /// Only a download-progress hint.
    pub fn total_blocks_estimate(&self) -> u32 {
        self.checkpoints.max_height()
    }

    /// Highest checkpoint whose block is present in `index`, or genesis if
    /// none is.
    pub fn last_checkpoint<I: BlockIndex>(&self, index: &I) -> I::Entry {
        for checkpoint in self.checkpoints.iter_descending() {
            if let Some(entry) = index.lookup_block_by_hash(&checkpoint.hash) {
                debug!(
                    event = "last_checkpoint_found",
                    height = checkpoint.height,
                    hash = %checkpoint.hash,
                    "Resolved last known checkpoint"
                );
                return entry;
            }
        }
        debug!(event = "last_checkpoint_genesis", "No checkpoint in block index, using genesis");
        index.genesis_block_index()
    }

    /// Hash of [`last_checkpoint`](Self::last_checkpoint)
    pub fn last_checkpoint_hash<I: BlockIndex>(&self, index: &I) -> BlockHash {
        self.last_checkpoint(index).block_hash()
    }

    /// Check every `(height, hash)` of a candidate chain, stopping at the
    /// first checkpoint conflict.
    pub fn check_chain<It>(&self, chain: It) -> Result<(), CheckpointViolation>
    where
        It: IntoIterator<Item = (u32, BlockHash)>,
    {
        for (height, hash) in chain {
            if !self.check_hardened(height, &hash) {
                return Err(CheckpointViolation {
                    height,
                    // check_hardened only fails on registered heights
                    expected: self.checkpoints.hash(height).unwrap_or_default(),
                    found: hash,
                });
            }
        }
        Ok(())
    }

    /// Publish the last known checkpoint into the context's hardened cache.
    ///
    /// Returns the cached value, which is the previously published hash if
    /// the cache had already been set.
    pub fn init_hardened_checkpoint<I: BlockIndex>(&self, index: &I) -> BlockHash {
        let hash = self.last_checkpoint_hash(index);
        self.context.hardened().set(hash);
        self.context.hardened().get()
    }

    /// True unless a reorganization forking at `fork_height` would replace
    /// the last known checkpoint block.
    pub fn is_fork_allowed<I: BlockIndex>(&self, fork_height: u32, index: &I) -> bool {
        if !self.context.checkpoints_enabled() {
            return true;
        }
        let floor = self.last_checkpoint(index).height();
        if fork_height < floor {
            warn!(
                event = "fork_below_checkpoint",
                fork_height = fork_height,
                checkpoint_height = floor,
                "Rejecting fork below last known checkpoint"
            );
            return false;
        }
        true
    }
}
