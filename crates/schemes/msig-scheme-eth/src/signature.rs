//! The 65-byte recoverable ETH signature wire form.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// A 65-byte `r‖s‖v` secp256k1 signature.
///
/// Serialized as a 0x-prefixed hex string with 130 hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthSignature(pub [u8; 65]);

impl EthSignature {
    pub fn as_bytes(&self) -> &[u8; 65] {
        &self.0
    }
}

impl From<[u8; 65]> for EthSignature {
    fn from(bytes: [u8; 65]) -> Self {
        EthSignature(bytes)
    }
}

/// Error for strings that are not 65 hex-encoded bytes.
#[derive(Debug, thiserror::Error)]
#[error("invalid ETH signature: expected 130 hex characters, optionally 0x-prefixed")]
pub struct InvalidEthSignature;

impl FromStr for EthSignature {
    type Err = InvalidEthSignature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(|_| InvalidEthSignature)?;
        let array: [u8; 65] = bytes.try_into().map_err(|_| InvalidEthSignature)?;
        Ok(EthSignature(array))
    }
}

impl Display for EthSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl Serialize for EthSignature {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EthSignature {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let sig = EthSignature([7u8; 65]);
        let text = sig.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 132);
        assert_eq!(text.parse::<EthSignature>().unwrap(), sig);
    }

    #[test]
    fn test_accepts_unprefixed_hex() {
        let sig = EthSignature([1u8; 65]);
        let unprefixed = hex::encode(sig.0);
        assert_eq!(unprefixed.parse::<EthSignature>().unwrap(), sig);
    }

    #[test]
    fn test_rejects_wrong_length_and_bad_hex() {
        assert!("0xabcd".parse::<EthSignature>().is_err());
        assert!("zz".repeat(65).parse::<EthSignature>().is_err());
    }

    #[test]
    fn test_serde_wire_form() {
        let sig = EthSignature([9u8; 65]);
        let json = serde_json::to_string(&sig).unwrap();
        assert_eq!(json, format!("\"{sig}\""));
        let back: EthSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
