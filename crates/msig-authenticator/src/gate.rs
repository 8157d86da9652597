//! Per-operation authorization: signature counts, role predicates, and the
//! replay guard.
//!
//! Every exposed operation declares an [`OperationPolicy`]. The gate runs
//! after authentication: it checks the resolved calling users against the
//! policy, and for SUBMIT-classed operations consumes the envelope's
//! `uniqueKey` against the store-backed `UNTX|` set. EVALUATE-classed
//! operations skip the guard and are expected to run their body against a
//! read-only ledger view.

use msig_types::envelope::Envelope;
use msig_types::error::AuthError;
use msig_types::identity::UserRole;
use msig_types::store::{Ledger, keys};

use crate::authenticate::{AuthResult, Authenticator};
use crate::context::Context;

/// Whether an operation may write.
///
/// The class does not affect signature validation; it selects the replay
/// guard and the ledger view the operation body runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationType {
    /// May write; requires and consumes a `uniqueKey`.
    Submit,
    /// Read-only; no uniqueness requirement.
    Evaluate,
}

/// The authorization policy of one operation.
#[derive(Debug, Clone)]
pub struct OperationPolicy {
    /// The minimum number of authenticated signers, at least 1.
    pub min_signatures: usize,
    /// Roles every signer must hold.
    pub required_roles: Vec<UserRole>,
    pub op_type: OperationType,
}

impl OperationPolicy {
    /// A writing operation requiring one signature and no roles.
    pub fn submit() -> Self {
        OperationPolicy {
            min_signatures: 1,
            required_roles: Vec::new(),
            op_type: OperationType::Submit,
        }
    }

    /// A read-only operation requiring one signature and no roles.
    pub fn evaluate() -> Self {
        OperationPolicy {
            min_signatures: 1,
            required_roles: Vec::new(),
            op_type: OperationType::Evaluate,
        }
    }

    pub fn with_min_signatures(mut self, min_signatures: usize) -> Self {
        self.min_signatures = min_signatures;
        self
    }

    pub fn with_required_roles(mut self, roles: impl IntoIterator<Item = UserRole>) -> Self {
        self.required_roles = roles.into_iter().collect();
        self
    }
}

/// Checks the authenticated calling users against the policy.
///
/// Fails [`AuthError::Forbidden`] when fewer users authenticated than the
/// policy demands, and [`AuthError::MissingRole`] on the first signer whose
/// role set is not a superset of the required roles.
pub fn authorize(ctx: &Context<'_>, policy: &OperationPolicy) -> Result<(), AuthError> {
    let users = ctx.calling_users();
    if users.len() < policy.min_signatures {
        return Err(AuthError::Forbidden {
            required: policy.min_signatures,
            received: users.len(),
        });
    }
    for user in users {
        if let Some(missing) = policy
            .required_roles
            .iter()
            .find(|role| !user.has_role(**role))
        {
            tracing::debug!(alias = %user.alias, role = %missing, "signer lacks required role");
            return Err(AuthError::MissingRole {
                alias: user.alias.to_string(),
                has: join_roles(user.roles.iter()),
                required: join_roles(policy.required_roles.iter()),
            });
        }
    }
    Ok(())
}

/// Consumes the envelope's `uniqueKey`, rejecting replays.
///
/// The key is required for SUBMIT-classed operations and is marked consumed
/// under `UNTX|<uniqueKey>` within the same transaction.
pub async fn consume_unique_key(
    ledger: &dyn Ledger,
    envelope: &Envelope,
) -> Result<(), AuthError> {
    let unique_key = envelope
        .unique_key()
        .ok_or_else(|| AuthError::validation("submit operation requires a uniqueKey"))?;
    let key = ledger.create_composite_key(keys::UNIQUE_TX, &[unique_key]);
    if ledger.get_state(&key).await?.is_some() {
        return Err(AuthError::validation(format!(
            "uniqueKey {unique_key:?} has already been used"
        )));
    }
    ledger.put_state(&key, ledger.tx_id().into_bytes()).await
}

/// Authenticates the envelope, applies the policy, and runs the replay guard
/// for SUBMIT-classed operations.
///
/// This is the entry point operation wrappers call before their body.
pub async fn authorize_operation(
    authenticator: &Authenticator,
    ctx: &mut Context<'_>,
    envelope: &Envelope,
    policy: &OperationPolicy,
) -> Result<AuthResult, AuthError> {
    let auth = authenticator
        .authenticate(ctx, envelope, policy.min_signatures)
        .await?;
    authorize(ctx, policy)?;
    if policy.op_type == OperationType::Submit {
        consume_unique_key(ctx.ledger(), envelope).await?;
    }
    Ok(auth)
}

fn join_roles<'a>(roles: impl Iterator<Item = &'a UserRole>) -> String {
    roles
        .map(UserRole::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
