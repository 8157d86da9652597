//! Canonical user identity strings.
//!
//! Every on-ledger user is identified by an alias of shape `eth|<address>`,
//! `ton|<address>`, `client|<opaque>`, or the sentinel `service|<chaincode>`
//! used by the origin-chaincode authentication branch.
//!
//! # Example
//!
//! ```
//! use msig_types::alias::UserAlias;
//!
//! let alias: UserAlias = "eth|0x7e5f4552091a69125d5dfcb7b8c2659029395bdf".parse().unwrap();
//! assert!(matches!(alias, UserAlias::Eth(_)));
//! assert_eq!(alias.to_string(), "eth|0x7e5f4552091a69125d5dfcb7b8c2659029395bdf");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

/// The alias written into a rotated-away profile slot.
pub const INVALIDATED: &str = "client|invalidated";

/// A canonical user identity.
///
/// Serializes to and from its `<prefix>|<value>` string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UserAlias {
    /// An address-derived ETH identity: `eth|0x…`.
    Eth(String),
    /// An address-derived TON identity: `ton|…`.
    Ton(String),
    /// An opaque registered identity: `client|…`.
    Client(String),
    /// An originating-chaincode identity: `service|<chaincode-name>`.
    Service(String),
}

impl UserAlias {
    /// The chaincode name of a `service|` alias, if this is one.
    pub fn service_name(&self) -> Option<&str> {
        match self {
            UserAlias::Service(name) => Some(name),
            _ => None,
        }
    }

    /// True for the `service|` sentinel form.
    pub fn is_service(&self) -> bool {
        matches!(self, UserAlias::Service(_))
    }

    /// The tombstone alias marking an invalidated profile slot.
    pub fn invalidated() -> Self {
        UserAlias::Client("invalidated".to_string())
    }
}

/// Error for alias strings that match no known `<prefix>|<value>` form.
#[derive(Debug, thiserror::Error)]
#[error("invalid user alias {0:?}: expected eth|, ton|, client| or service| prefix")]
pub struct InvalidAlias(pub String);

impl FromStr for UserAlias {
    type Err = InvalidAlias;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, value) = s.split_once('|').ok_or_else(|| InvalidAlias(s.to_string()))?;
        if value.is_empty() {
            return Err(InvalidAlias(s.to_string()));
        }
        match prefix {
            "eth" => Ok(UserAlias::Eth(value.to_string())),
            "ton" => Ok(UserAlias::Ton(value.to_string())),
            "client" => Ok(UserAlias::Client(value.to_string())),
            "service" => Ok(UserAlias::Service(value.to_string())),
            _ => Err(InvalidAlias(s.to_string())),
        }
    }
}

impl Display for UserAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserAlias::Eth(v) => write!(f, "eth|{v}"),
            UserAlias::Ton(v) => write!(f, "ton|{v}"),
            UserAlias::Client(v) => write!(f, "client|{v}"),
            UserAlias::Service(v) => write!(f, "service|{v}"),
        }
    }
}

impl Serialize for UserAlias {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for UserAlias {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_roundtrip() {
        for s in [
            "eth|0x7e5f4552091a69125d5dfcb7b8c2659029395bdf",
            "ton|EQCD39VS5jcptHL8vMjEXrzGaRcCVYto7HUn4bpAOg8xqB2N",
            "client|curator-org",
            "service|token-contract",
        ] {
            let alias: UserAlias = s.parse().unwrap();
            assert_eq!(alias.to_string(), s);
            let json = serde_json::to_string(&alias).unwrap();
            let back: UserAlias = serde_json::from_str(&json).unwrap();
            assert_eq!(back, alias);
        }
    }

    #[test]
    fn test_alias_rejects_unknown_prefix() {
        assert!("sol|abc".parse::<UserAlias>().is_err());
        assert!("eth|".parse::<UserAlias>().is_err());
        assert!("no-separator".parse::<UserAlias>().is_err());
    }

    #[test]
    fn test_service_name() {
        let alias: UserAlias = "service|token-contract".parse().unwrap();
        assert!(alias.is_service());
        assert_eq!(alias.service_name(), Some("token-contract"));
        assert_eq!("client|x".parse::<UserAlias>().unwrap().service_name(), None);
    }

    #[test]
    fn test_invalidated_tombstone() {
        assert_eq!(UserAlias::invalidated().to_string(), INVALIDATED);
    }
}
