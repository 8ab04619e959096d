//! 256-bit block hash

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A block header hash.
///
/// Bytes are stored in internal (little-endian) order and displayed reversed,
/// matching the convention used by block explorers and RPC output.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BlockHash(pub [u8; 32]);

impl BlockHash {
    /// The all-zero hash.
    pub const NULL: BlockHash = BlockHash([0u8; 32]);

    /// Build from internal byte order.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Internal byte order.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// True for the all-zero hash.
    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parse a display-order hex string.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)
            .map_err(|e| Error::InvalidHash(format!("{}: {}", s, e)))?;
        bytes.reverse();
        Ok(Self(bytes))
    }

    /// Display-order hex string.
    pub fn to_hex(&self) -> String {
        let mut bytes = self.0;
        bytes.reverse();
        hex::encode(bytes)
    }
}

impl FromStr for BlockHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockHash({})", self.to_hex())
    }
}

impl Serialize for BlockHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlockHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "00000a308cc3b469703a3bc8d6d4b1a8ea1f4a4c2c6f3c2a9cbd1e0d5c7b7e11";

    #[test]
    fn test_hex_display_order() {
        let hash = BlockHash::from_hex(SAMPLE).unwrap();
        // Leading display zeros live at the end of the internal array
        assert_eq!(hash.0[31], 0x00);
        assert_eq!(hash.0[0], 0x11);
        assert_eq!(hash.to_string(), SAMPLE);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(BlockHash::from_hex("zz").is_err());
        assert!(BlockHash::from_hex(&SAMPLE[..62]).is_err());
    }

    #[test]
    fn test_null() {
        assert!(BlockHash::NULL.is_null());
        assert!(BlockHash::default().is_null());
        assert!(!BlockHash::from_hex(SAMPLE).unwrap().is_null());
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash: BlockHash = SAMPLE.parse().unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", SAMPLE));
        let back: BlockHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }
}
