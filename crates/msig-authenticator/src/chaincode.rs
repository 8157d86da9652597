//! Origin-chaincode authentication branch.
//!
//! A `service|<name>` sender with no signatures authenticates through the
//! peer-provided signed proposal instead of user signatures: the proposal's
//! embedded invocation spec must name exactly the chaincode the sender
//! claims to be. This is the only way one chaincode authenticates to another
//! on the same peer; it bypasses role resolution and yields empty roles.

use std::collections::BTreeSet;

use msig_types::alias::UserAlias;
use msig_types::error::AuthError;
use msig_types::identity::UserProfile;
use msig_types::store::Ledger;

/// Verifies the peer proof for a `service|<expected>` sender and returns its
/// synthetic profile.
pub(crate) async fn authenticate_origin_chaincode(
    ledger: &dyn Ledger,
    expected: &str,
) -> Result<UserProfile, AuthError> {
    let proposal = ledger.signed_proposal().await?.ok_or_else(|| {
        AuthError::ChaincodeAuthorization {
            message: "no signed proposal available from the peer".to_string(),
        }
    })?;
    let invoked = proposal.invocation.chaincode_name;
    if invoked.is_empty() {
        return Err(AuthError::ChaincodeAuthorization {
            message: "signed proposal names no chaincode".to_string(),
        });
    }
    if invoked != expected {
        return Err(AuthError::ChaincodeAuthorization {
            message: format!(
                "signed proposal invokes chaincode {invoked:?} but sender claims {expected:?}"
            ),
        });
    }
    tracing::debug!(chaincode = %expected, "authenticated originating chaincode");
    Ok(UserProfile {
        alias: UserAlias::Service(expected.to_string()),
        eth_address: None,
        ton_address: None,
        roles: BTreeSet::new(),
    })
}
