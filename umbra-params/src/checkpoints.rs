//! Hardened checkpoint tables
//!
//! Each network carries a compiled-in list of `(height, hash)` pairs that the
//! node treats as immutable. Any candidate chain that disagrees with an entry
//! is rejected by the [`CheckpointGuard`](crate::guard::CheckpointGuard).

use crate::hash::BlockHash;
use crate::network::{genesis_hash, NetworkType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::info;

/// Mainnet checkpoints, ascending by height.
const MAINNET_CHECKPOINTS: &[(u32, &str)] = &[
    (0, crate::network::MAINNET_GENESIS_HASH),
    (4_200, "000000d6f328be93ef11cffa8d82c964a82502e8f4c9c619cd2b77ddf38b8e87"),
    (13_300, "00000069f4e8ade1ac899b0341146079ace02c06054df841d4dfd698ad1269ff"),
    (37_500, "000000ae280cf6c53ab58388a225fd45616e3deb71431334b59605097a562cd4"),
    (55_000, "000000dad6447fb677df1a19e3104941e739583d11227e5663fd1199201f0fe1"),
    (79_000, "000000fdb858a8f274c30c08b482df0d982824a540cba7953d71c802962103d7"),
    (104_500, "0000009c98ab27cca649e6f49d6fec4652c4d4ca43fc19aeac15694674c4e8bb"),
    (142_000, "0000007454bdd8f73a49573dedf48b542960843905855c0da6572cb6233c4c7b"),
    (186_000, "0000008ca72d0836d570615653851da0fa8249abd6644c4d48f01fcebb924e1e"),
];

/// Testnet has no real checkpointing: genesis only.
const TESTNET_CHECKPOINTS: &[(u32, &str)] = &[(0, crate::network::TESTNET_GENESIS_HASH)];

/// A hardened checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Block height
    pub height: u32,
    /// Block hash
    pub hash: BlockHash,
}

/// Checkpoints of a single network, ordered by height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointSet {
    network: NetworkType,
    checkpoints: BTreeMap<u32, BlockHash>,
}

impl CheckpointSet {
    /// Build and validate a checkpoint set for `network`.
    ///
    /// Heights must be unique, no hash may be null, and there must be an
    /// entry at height 0 equal to the network genesis hash.
    pub fn from_list(
        network: NetworkType,
        list: impl IntoIterator<Item = (u32, BlockHash)>,
    ) -> Result<Self> {
        // BTreeMap silently drops duplicates, so count first
        let original: Vec<(u32, BlockHash)> = list.into_iter().collect();
        let original_len = original.len();
        let checkpoints: BTreeMap<u32, BlockHash> = original.into_iter().collect();

        if checkpoints.len() != original_len {
            return Err(Error::InvalidCheckpoints(format!(
                "{}: checkpoint heights must be unique",
                network
            )));
        }

        let hashes: HashSet<&BlockHash> = checkpoints.values().collect();
        if hashes.contains(&BlockHash::NULL) {
            return Err(Error::InvalidCheckpoints(format!(
                "{}: found null checkpoint hash",
                network
            )));
        }

        let expected = genesis_hash(network);
        match checkpoints.get(&0) {
            Some(found) if *found == expected => {}
            Some(found) => {
                return Err(Error::GenesisMismatch {
                    network,
                    expected,
                    found: *found,
                })
            }
            None => {
                return Err(Error::InvalidCheckpoints(format!(
                    "{}: missing genesis checkpoint at height 0",
                    network
                )))
            }
        }

        Ok(Self {
            network,
            checkpoints,
        })
    }

    fn from_table(network: NetworkType, table: &[(u32, &str)]) -> Result<Self> {
        let list = table
            .iter()
            .map(|(height, hex)| -> Result<(u32, BlockHash)> {
                Ok((*height, BlockHash::from_hex(hex)?))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_list(network, list)
    }

    /// Compiled-in mainnet checkpoints
    pub fn mainnet() -> Result<Self> {
        Self::from_table(NetworkType::Mainnet, MAINNET_CHECKPOINTS)
    }

    /// Compiled-in testnet checkpoints
    pub fn testnet() -> Result<Self> {
        Self::from_table(NetworkType::Testnet, TESTNET_CHECKPOINTS)
    }

    /// Network this set belongs to
    pub fn network(&self) -> NetworkType {
        self.network
    }

    /// Registered hash at exactly `height`
    pub fn hash(&self, height: u32) -> Option<BlockHash> {
        self.checkpoints.get(&height).copied()
    }

    /// True if a checkpoint is registered at `height`
    pub fn contains(&self, height: u32) -> bool {
        self.checkpoints.contains_key(&height)
    }

    /// Height of the highest checkpoint
    pub fn max_height(&self) -> u32 {
        // Never empty: height 0 is checked on construction
        self.checkpoints.keys().next_back().copied().unwrap_or(0)
    }

    /// Highest checkpoint at or below `height`
    pub fn checkpoint_at_or_below(&self, height: u32) -> Option<Checkpoint> {
        self.checkpoints
            .range(..=height)
            .next_back()
            .map(|(height, hash)| Checkpoint {
                height: *height,
                hash: *hash,
            })
    }

    /// Checkpoints in ascending height order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Checkpoint> + '_ {
        self.checkpoints.iter().map(|(height, hash)| Checkpoint {
            height: *height,
            hash: *hash,
        })
    }

    /// Checkpoints from the highest height down to genesis
    pub fn iter_descending(&self) -> impl Iterator<Item = Checkpoint> + '_ {
        self.iter().rev()
    }

    /// Number of checkpoints
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Always false for a validated set
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }
}

/// Both networks' checkpoint sets, built once at startup.
#[derive(Debug, Clone)]
pub struct CheckpointRegistry {
    mainnet: CheckpointSet,
    testnet: CheckpointSet,
}

impl CheckpointRegistry {
    /// Build and validate the compiled-in tables.
    ///
    /// An error here is fatal: the node must not start with a genesis
    /// checkpoint that disagrees with the genesis block.
    pub fn load() -> Result<Self> {
        let registry = Self {
            mainnet: CheckpointSet::mainnet()?,
            testnet: CheckpointSet::testnet()?,
        };
        info!(
            event = "checkpoints_loaded",
            mainnet = registry.mainnet.len(),
            mainnet_max_height = registry.mainnet.max_height(),
            testnet = registry.testnet.len(),
            "Checkpoint registry validated"
        );
        Ok(registry)
    }

    /// Build from explicit sets. Each set must belong to its slot.
    pub fn from_sets(mainnet: CheckpointSet, testnet: CheckpointSet) -> Result<Self> {
        if mainnet.network() != NetworkType::Mainnet || testnet.network() != NetworkType::Testnet {
            return Err(Error::InvalidCheckpoints(
                "checkpoint set assigned to the wrong network".to_string(),
            ));
        }
        Ok(Self { mainnet, testnet })
    }

    /// Checkpoint set for `network`
    pub fn for_network(&self, network: NetworkType) -> &CheckpointSet {
        match network {
            NetworkType::Mainnet => &self.mainnet,
            NetworkType::Testnet => &self.testnet,
        }
    }
}
