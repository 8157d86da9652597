//! User profiles, roles, and stored public key records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::Display;

use crate::alias::UserAlias;
use crate::envelope::SigningScheme;

/// A role granted to an on-ledger user.
///
/// Operations declare the roles they require of every signer; the
/// authorization gate checks each calling user's role set against that list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// May perform privileged curation operations.
    Curator,
    /// May register and rotate user identities.
    Registrar,
    /// May invoke state-mutating operations.
    Submit,
    /// May invoke read-only operations.
    Evaluate,
}

impl Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", json.trim_matches('"'))
    }
}

/// The role set granted to users registered without an explicit one.
pub fn default_roles() -> BTreeSet<UserRole> {
    BTreeSet::from([UserRole::Evaluate, UserRole::Submit])
}

/// The role set carried by the environment-bootstrap admin identity.
pub fn admin_roles() -> BTreeSet<UserRole> {
    BTreeSet::from([
        UserRole::Curator,
        UserRole::Registrar,
        UserRole::Evaluate,
        UserRole::Submit,
    ])
}

/// An on-ledger user profile, keyed by address under `GCUP|`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// The canonical identity string.
    pub alias: UserAlias,
    /// The user's ETH address, when the identity has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eth_address: Option<String>,
    /// The user's TON address, when the identity has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ton_address: Option<String>,
    /// The user's granted roles; defaults applied at registration.
    #[serde(default)]
    pub roles: BTreeSet<UserRole>,
}

impl UserProfile {
    /// A profile synthesized for an unregistered signer, when permitted.
    ///
    /// The alias takes the `<scheme-lowercase>|<address>` shape and the role
    /// set is [`default_roles`].
    pub fn synthesized(signing: SigningScheme, address: &str) -> Self {
        let (alias, eth_address, ton_address) = match signing {
            SigningScheme::Eth => (
                UserAlias::Eth(address.to_string()),
                Some(address.to_string()),
                None,
            ),
            SigningScheme::Ton => (
                UserAlias::Ton(address.to_string()),
                None,
                Some(address.to_string()),
            ),
        };
        UserProfile {
            alias,
            eth_address,
            ton_address,
            roles: default_roles(),
        }
    }

    /// The profile written over a rotated-away address slot.
    pub fn tombstone() -> Self {
        UserProfile {
            alias: UserAlias::invalidated(),
            eth_address: Some("0x0000000000000000000000000000000000000000".to_string()),
            ton_address: None,
            roles: BTreeSet::new(),
        }
    }

    /// The address this profile is stored under.
    pub fn address(&self) -> Option<&str> {
        self.eth_address.as_deref().or(self.ton_address.as_deref())
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.roles.contains(&role)
    }
}

/// A stored public key, keyed by alias under `GCPK|`.
///
/// ETH keys are stored in normalized non-compact hex; TON keys in base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyRecord {
    /// The stored key in its scheme's normalized encoding.
    pub public_key: String,
    /// The scheme the key belongs to.
    #[serde(default)]
    pub signing: SigningScheme,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_form_is_screaming_snake() {
        assert_eq!(serde_json::to_string(&UserRole::Curator).unwrap(), "\"CURATOR\"");
        assert_eq!(UserRole::Evaluate.to_string(), "EVALUATE");
    }

    #[test]
    fn test_default_and_admin_role_sets() {
        assert!(default_roles().contains(&UserRole::Submit));
        assert!(!default_roles().contains(&UserRole::Curator));
        assert!(admin_roles().is_superset(&default_roles()));
    }

    #[test]
    fn test_synthesized_profile_shape() {
        let eth = UserProfile::synthesized(SigningScheme::Eth, "0xabc");
        assert_eq!(eth.alias.to_string(), "eth|0xabc");
        assert_eq!(eth.eth_address.as_deref(), Some("0xabc"));
        assert_eq!(eth.ton_address, None);

        let ton = UserProfile::synthesized(SigningScheme::Ton, "EQAdDr");
        assert_eq!(ton.alias.to_string(), "ton|EQAdDr");
        assert_eq!(ton.ton_address.as_deref(), Some("EQAdDr"));
    }

    #[test]
    fn test_profile_wire_form_omits_absent_addresses() {
        let profile = UserProfile {
            alias: "client|u1".parse().unwrap(),
            eth_address: None,
            ton_address: None,
            roles: default_roles(),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert!(json.get("ethAddress").is_none());
        assert_eq!(json["roles"], serde_json::json!(["SUBMIT", "EVALUATE"]));
    }

    #[test]
    fn test_tombstone_profile() {
        let tombstone = UserProfile::tombstone();
        assert_eq!(tombstone.alias.to_string(), "client|invalidated");
        assert!(tombstone.roles.is_empty());
    }
}
