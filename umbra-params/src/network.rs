//! Umbra network definitions

use crate::hash::BlockHash;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mainnet genesis block hash
pub const MAINNET_GENESIS_HASH: &str =
    "000000ef947439e7f9aef15b968b2c9cd3564401a2b805bdb96c59254b0be7fb";

/// Testnet genesis block hash
pub const TESTNET_GENESIS_HASH: &str =
    "00000012aef25fd29d1be358244f122ae9b6d5efb714b55072bde3f3e2a54d70";

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Mainnet
    Mainnet,
    /// Testnet
    Testnet,
}

impl NetworkType {
    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NetworkType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "main" | "mainnet" => Ok(Self::Mainnet),
            "test" | "testnet" => Ok(Self::Testnet),
            other => Err(Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Returns the compiled-in genesis block hash for `network`.
pub fn genesis_hash(network: NetworkType) -> BlockHash {
    let hex = match network {
        NetworkType::Mainnet => MAINNET_GENESIS_HASH,
        NetworkType::Testnet => TESTNET_GENESIS_HASH,
    };
    BlockHash::from_hex(hex).expect("hard-coded genesis hash is valid hex")
}

/// Network configuration
#[derive(Debug, Clone)]
pub struct Network {
    /// Network type
    pub network_type: NetworkType,
    /// Human-readable name
    pub name: &'static str,
    /// P2P port
    pub p2p_port: u16,
    /// Default SOCKS port of the local Tor process
    pub tor_socks_port: u16,
    /// Data directory suffix, appended to the base data dir
    pub data_subdir: Option<&'static str>,
}

impl Network {
    /// Get mainnet parameters
    pub const fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            name: "mainnet",
            p2p_port: 17_333,
            tor_socks_port: 9050,
            data_subdir: None,
        }
    }

    /// Get testnet parameters
    pub const fn testnet() -> Self {
        Self {
            network_type: NetworkType::Testnet,
            name: "testnet",
            p2p_port: 27_333,
            tor_socks_port: 9050,
            data_subdir: Some("testnet"),
        }
    }

    /// Get network by type
    pub const fn from_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Testnet => Self::testnet(),
        }
    }

    /// Genesis block hash of this network
    pub fn genesis_hash(&self) -> BlockHash {
        genesis_hash(self.network_type)
    }
}
