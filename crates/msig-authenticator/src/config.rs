//! Environment-driven authenticator configuration.
//!
//! Configuration resolves once, at startup, into a plain [`AuthConfig`]
//! value; nothing here is consulted lazily on the request path.

use msig_types::alias::UserAlias;
use msig_types::error::AuthError;

/// Enables synthesized default profiles for callers without a stored profile.
pub const ENV_ALLOW_NON_REGISTERED_USERS: &str = "ALLOW_NON_REGISTERED_USERS";

/// The bootstrap admin's secp256k1 public key (hex or base64).
#[cfg(feature = "bootstrap-admin")]
pub const ENV_DEV_ADMIN_PUBLIC_KEY: &str = "DEV_ADMIN_PUBLIC_KEY";

/// Optional alias override for the bootstrap admin.
#[cfg(feature = "bootstrap-admin")]
pub const ENV_DEV_ADMIN_USER_ID: &str = "DEV_ADMIN_USER_ID";

/// Authenticator configuration.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    /// When true, signers without a stored profile get a synthesized default
    /// profile, provided their public key is known.
    pub allow_non_registered_users: bool,
    /// The environment-bootstrap admin identity, when configured.
    pub admin: Option<AdminIdentity>,
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allow_non_registered_users(mut self, allow: bool) -> Self {
        self.allow_non_registered_users = allow;
        self
    }

    pub fn with_admin(mut self, admin: AdminIdentity) -> Self {
        self.admin = Some(admin);
        self
    }

    /// Resolves configuration from the process environment.
    ///
    /// The admin identity is only read when the `bootstrap-admin` feature is
    /// compiled in; release builds without it ignore the variables entirely.
    pub fn from_env() -> Result<Self, AuthError> {
        let allow_non_registered_users = std::env::var(ENV_ALLOW_NON_REGISTERED_USERS)
            .map(|v| v == "true")
            .unwrap_or(false);

        #[cfg(feature = "bootstrap-admin")]
        let admin = match std::env::var(ENV_DEV_ADMIN_PUBLIC_KEY) {
            Ok(public_key) => {
                let user_id = std::env::var(ENV_DEV_ADMIN_USER_ID).ok();
                let admin = AdminIdentity::from_public_key(&public_key, user_id.as_deref())?;
                tracing::info!(alias = %admin.alias, address = %admin.eth_address, "Using bootstrap admin identity");
                Some(admin)
            }
            Err(_) => None,
        };
        #[cfg(not(feature = "bootstrap-admin"))]
        let admin = None;

        Ok(AuthConfig {
            allow_non_registered_users,
            admin,
        })
    }
}

/// The environment-bootstrap admin identity.
///
/// Profiles synthesized from this identity carry the admin role set and are
/// never written to the ledger.
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    /// The admin's alias; defaults to `eth|<derived-address>`.
    pub alias: UserAlias,
    /// The key in normalized non-compact hex.
    pub public_key: String,
    /// The address derived from the key, lowercase 0x hex.
    pub eth_address: String,
}

impl AdminIdentity {
    /// Builds the admin identity from a public key and optional alias
    /// override.
    ///
    /// The override must begin `eth|` or `client|`; anything else fails
    /// [`AuthError::Unauthorized`].
    pub fn from_public_key(public_key: &str, user_id: Option<&str>) -> Result<Self, AuthError> {
        let public_key = msig_scheme_eth::normalize_public_key(public_key)?;
        let eth_address = msig_scheme_eth::public_key_to_address(&public_key)?;
        let alias = match user_id {
            None => UserAlias::Eth(eth_address.clone()),
            Some(user_id) => {
                let alias: UserAlias = user_id.parse().map_err(|_| AuthError::Unauthorized {
                    message: format!("invalid admin user id {user_id:?}"),
                })?;
                match alias {
                    UserAlias::Eth(_) | UserAlias::Client(_) => alias,
                    _ => {
                        return Err(AuthError::Unauthorized {
                            message: format!(
                                "admin user id {user_id:?} must begin with eth| or client|"
                            ),
                        });
                    }
                }
            }
        };
        Ok(AdminIdentity {
            alias,
            public_key,
            eth_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY_ONE_PUBLIC: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
    const KEY_ONE_ADDRESS: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

    #[test]
    fn test_admin_defaults_to_eth_alias() {
        let admin = AdminIdentity::from_public_key(KEY_ONE_PUBLIC, None).unwrap();
        assert_eq!(admin.eth_address, KEY_ONE_ADDRESS);
        assert_eq!(admin.alias.to_string(), format!("eth|{KEY_ONE_ADDRESS}"));
    }

    #[test]
    fn test_admin_alias_override() {
        let admin =
            AdminIdentity::from_public_key(KEY_ONE_PUBLIC, Some("client|ops-admin")).unwrap();
        assert_eq!(admin.alias.to_string(), "client|ops-admin");
    }

    #[test]
    fn test_admin_alias_override_rejects_other_prefixes() {
        for bad in ["service|sneaky", "ton|abc", "plain-string"] {
            let err = AdminIdentity::from_public_key(KEY_ONE_PUBLIC, Some(bad)).unwrap_err();
            assert_eq!(err.key(), msig_types::error::ErrorKey::Unauthorized);
        }
    }
}
