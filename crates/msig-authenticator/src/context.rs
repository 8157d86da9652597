//! Per-request execution context.

use msig_types::identity::UserProfile;
use msig_types::store::Ledger;

use crate::config::AuthConfig;

/// The state threaded through one request: the ledger transaction view, the
/// resolved configuration, and, once authentication ran, the calling users.
pub struct Context<'a> {
    ledger: &'a dyn Ledger,
    config: AuthConfig,
    calling_users: Vec<UserProfile>,
}

impl<'a> Context<'a> {
    pub fn new(ledger: &'a dyn Ledger, config: AuthConfig) -> Self {
        Context {
            ledger,
            config,
            calling_users: Vec::new(),
        }
    }

    pub fn ledger(&self) -> &'a dyn Ledger {
        self.ledger
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// The authenticated signers of the current envelope, in signature order.
    ///
    /// Empty until [`Authenticator::authenticate`](crate::Authenticator::authenticate)
    /// ran, and empty for origin-chaincode callers.
    pub fn calling_users(&self) -> &[UserProfile] {
        &self.calling_users
    }

    pub fn calling_user(&self) -> Option<&UserProfile> {
        self.calling_users.first()
    }

    pub(crate) fn set_calling_users(&mut self, users: Vec<UserProfile>) {
        self.calling_users = users;
    }
}
