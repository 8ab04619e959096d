//! Node configuration
//!
//! Only the settings consumed by the checkpoint guard and the transport
//! bootstrap live here. Stored as JSON.

use crate::network::{Network, NetworkType};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Active network
    pub network: NetworkType,
    /// Base data directory (network subdirectory is appended)
    pub data_dir: Option<PathBuf>,
    /// Enforce hardened checkpoints
    pub checkpoints: bool,
    /// Anonymizing transport settings
    pub tor: TorSettings,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            data_dir: None,
            checkpoints: true,
            tor: TorSettings::default(),
        }
    }
}

/// Tor settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TorSettings {
    /// Gate peer networking behind the Tor bootstrap
    pub enabled: bool,
    /// SOCKS port of the local Tor process
    pub socks_port: u16,
    /// How often a blocked waiter re-checks for shutdown, in milliseconds
    pub wait_poll_ms: u64,
}

impl Default for TorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            socks_port: Network::mainnet().tor_socks_port,
            wait_poll_ms: 1_000,
        }
    }
}

impl NodeConfig {
    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the node cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.tor.wait_poll_ms == 0 {
            return Err(Error::Config("tor.wait_poll_ms must be greater than 0".to_string()));
        }
        if self.tor.enabled && self.tor.socks_port == 0 {
            return Err(Error::Config("tor.socks_port must be set when Tor is enabled".to_string()));
        }
        Ok(())
    }

    /// Read from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        self.validate()?;
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Write to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Data directory for the configured network.
    ///
    /// Falls back to the platform data directory when none is configured.
    pub fn network_data_dir(&self) -> Result<PathBuf> {
        let base = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => directories::ProjectDirs::from("org", "Umbra", "umbra")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| Error::Config("No home directory for default data dir".to_string()))?,
        };
        Ok(match Network::from_type(self.network).data_subdir {
            Some(sub) => base.join(sub),
            None => base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = NodeConfig::default();
        assert_eq!(config.network, NetworkType::Mainnet);
        assert!(config.checkpoints);
        assert!(config.tor.enabled);
        assert_eq!(config.tor.socks_port, 9050);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = NodeConfig::from_json(r#"{"network":"testnet","tor":{"wait_poll_ms":250}}"#).unwrap();
        assert_eq!(config.network, NetworkType::Testnet);
        assert!(config.checkpoints);
        assert_eq!(config.tor.wait_poll_ms, 250);
        assert!(config.tor.enabled);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(NodeConfig::from_json("{"), Err(Error::Config(_))));
        assert!(NodeConfig::from_json(r#"{"network":"regtest"}"#).is_err());
    }

    #[test]
    fn test_zero_wait_poll_rejected() {
        let err = NodeConfig::from_json(r#"{"tor":{"wait_poll_ms":0}}"#).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains("wait_poll_ms")));

        let mut config = NodeConfig::default();
        config.tor.wait_poll_ms = 0;
        assert!(config.validate().is_err());
        assert!(config.to_json().is_err());
    }

    #[test]
    fn test_zero_socks_port_rejected_only_with_tor() {
        assert!(NodeConfig::from_json(r#"{"tor":{"socks_port":0}}"#).is_err());
        assert!(NodeConfig::from_json(r#"{"tor":{"enabled":false,"socks_port":0}}"#).is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("umbra.json");

        let config = NodeConfig {
            network: NetworkType::Testnet,
            data_dir: Some(dir.path().to_path_buf()),
            checkpoints: false,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = NodeConfig::load(&path).unwrap();
        assert_eq!(loaded.network, NetworkType::Testnet);
        assert!(!loaded.checkpoints);
        assert_eq!(loaded.network_data_dir().unwrap(), dir.path().join("testnet"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            NodeConfig::load(&dir.path().join("absent.json")),
            Err(Error::Io(_))
        ));
    }
}
