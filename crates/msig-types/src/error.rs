//! Typed failure kinds for authentication, authorization, and wallet state.
//!
//! Every failure the subsystem produces is one of the [`AuthError`] variants
//! below. Callers dispatch on [`AuthError::key`], which yields a stable
//! machine-readable [`ErrorKey`] independent of the human-readable message.
//!
//! Errors raised while processing an individual signature entry carry a
//! [`SignerRef`] identifying the offending entry: the declared address if one
//! was present, otherwise the declared public key, otherwise the entry index.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;

/// Identifies the signature entry an error refers to.
///
/// Preference order follows what the envelope actually carried: address,
/// then public key, then the zero-based entry index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignerRef {
    /// The entry's declared or resolved address.
    Address(String),
    /// The entry's declared public key.
    PublicKey(String),
    /// The zero-based index of the entry in the `signatures` list.
    Index(usize),
}

impl Display for SignerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignerRef::Address(a) => write!(f, "{a}"),
            SignerRef::PublicKey(pk) => write!(f, "{pk}"),
            SignerRef::Index(i) => write!(f, "{i}"),
        }
    }
}

/// Failure kinds produced by the authenticator, the authorization gate, and
/// the multisig wallet state machine.
///
/// None of these are recovered internally: the authenticator either produces
/// a complete resolved user list or fails, and the wallet either mutates
/// consistently or fails before any write.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The envelope carried no signatures and no `service|` sender.
    #[error("signature is missing from the envelope")]
    MissingSignature,

    /// A signature entry lacked both an address and a public key, and the
    /// signature itself is not recoverable.
    #[error("signature {signature} carries no signer identity and is not recoverable (signer: {signer})")]
    MissingSigner { signature: String, signer: SignerRef },

    /// The public key recovered from the signature differs from the one the
    /// entry declared.
    #[error("recovered public key {recovered} does not match provided signerPublicKey {provided} (signer: {signer})")]
    PublicKeyMismatch {
        recovered: String,
        provided: String,
        signer: SignerRef,
    },

    /// The address recovered from the signature differs from the one the
    /// entry declared.
    #[error("recovered address {recovered} does not match provided signerAddress {provided} (signer: {signer})")]
    AddressMismatch {
        recovered: String,
        provided: String,
        signer: SignerRef,
    },

    /// The entry declared a public key even though the signature is
    /// recoverable; the declaration must be omitted.
    #[error("signerPublicKey {in_dto} is redundant: the signature is recoverable (signer: {signer})")]
    RedundantSignerPublicKey {
        recovered: Option<String>,
        in_dto: String,
        signer: SignerRef,
    },

    /// The entry declared an address even though the signature is recoverable
    /// and recovers to that same address; the declaration must be omitted.
    #[error("signerAddress {in_dto} is redundant: the signature is recoverable (signer: {signer})")]
    RedundantSignerAddress {
        recovered: Option<String>,
        in_dto: String,
        signer: SignerRef,
    },

    /// The same signer address appeared twice within one envelope.
    #[error("duplicate signer in envelope (signer: {address})")]
    DuplicateSigner { address: String },

    /// Signature verification against the resolved public key failed.
    #[error("signature verification failed for {alias} (signer: {signer})")]
    PkInvalidSignature { alias: String, signer: SignerRef },

    /// No stored public key record exists for the resolved alias.
    #[error("no public key registered for {alias} (signer: {signer})")]
    PkMissing { alias: String, signer: SignerRef },

    /// No user profile exists for the signer and synthesis is not permitted.
    #[error("user {user_id} is not registered (signer: {signer})")]
    UserNotRegistered { user_id: String, signer: SignerRef },

    /// The `service|` origin-chaincode branch failed its peer-proof check.
    #[error("chaincode authorization failed: {message}")]
    ChaincodeAuthorization { message: String },

    /// The operation demands more signatures than the envelope supplied.
    #[error("Requires at least {required} signatures but got {received}")]
    Forbidden { required: usize, received: usize },

    /// A signer lacks a role the operation requires of every signer.
    #[error("user {alias} has roles [{has}] but the operation requires [{required}]")]
    MissingRole {
        alias: String,
        has: String,
        required: String,
    },

    /// The caller identity is not acceptable for the requested action.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// A wallet or pending transaction lookup missed.
    #[error("not found: {key}")]
    NotFound { key: String },

    /// A wallet or envelope invariant was violated.
    #[error("{message}")]
    ValidationFailed { message: String },

    /// The envelope or a stored record could not be (de)serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying ledger store failed.
    #[error("store operation failed: {message}")]
    Store { message: String },
}

impl AuthError {
    /// Shorthand for a [`AuthError::ValidationFailed`] with a formatted message.
    pub fn validation(message: impl Into<String>) -> Self {
        AuthError::ValidationFailed {
            message: message.into(),
        }
    }

    /// The stable machine-readable key for this failure kind.
    pub fn key(&self) -> ErrorKey {
        match self {
            AuthError::MissingSignature => ErrorKey::MissingSignature,
            AuthError::MissingSigner { .. } => ErrorKey::MissingSigner,
            AuthError::PublicKeyMismatch { .. } => ErrorKey::PublicKeyMismatch,
            AuthError::AddressMismatch { .. } => ErrorKey::AddressMismatch,
            AuthError::RedundantSignerPublicKey { .. } => ErrorKey::RedundantSignerPublicKey,
            AuthError::RedundantSignerAddress { .. } => ErrorKey::RedundantSignerAddress,
            AuthError::DuplicateSigner { .. } => ErrorKey::DuplicateSigner,
            AuthError::PkInvalidSignature { .. } => ErrorKey::PkInvalidSignature,
            AuthError::PkMissing { .. } => ErrorKey::PkMissing,
            AuthError::UserNotRegistered { .. } => ErrorKey::UserNotRegistered,
            AuthError::ChaincodeAuthorization { .. } => ErrorKey::ChaincodeAuthorization,
            AuthError::Forbidden { .. } => ErrorKey::Forbidden,
            AuthError::MissingRole { .. } => ErrorKey::MissingRole,
            AuthError::Unauthorized { .. } => ErrorKey::Unauthorized,
            AuthError::NotFound { .. } => ErrorKey::NotFound,
            AuthError::ValidationFailed { .. } => ErrorKey::ValidationFailed,
            AuthError::Serialization(_) => ErrorKey::Serialization,
            AuthError::Store { .. } => ErrorKey::Store,
        }
    }

    /// Attaches a signer reference to an error raised while processing one
    /// signature entry.
    ///
    /// Variants that carry a [`SignerRef`] keep their kind; anything else is
    /// demoted to [`AuthError::ValidationFailed`] with the annotation folded
    /// into the message, so the log line still identifies the entry.
    pub fn with_signer(self, signer: SignerRef) -> AuthError {
        match self {
            AuthError::MissingSigner { signature, .. } => {
                AuthError::MissingSigner { signature, signer }
            }
            AuthError::PublicKeyMismatch {
                recovered,
                provided,
                ..
            } => AuthError::PublicKeyMismatch {
                recovered,
                provided,
                signer,
            },
            AuthError::AddressMismatch {
                recovered,
                provided,
                ..
            } => AuthError::AddressMismatch {
                recovered,
                provided,
                signer,
            },
            AuthError::RedundantSignerPublicKey {
                recovered, in_dto, ..
            } => AuthError::RedundantSignerPublicKey {
                recovered,
                in_dto,
                signer,
            },
            AuthError::RedundantSignerAddress {
                recovered, in_dto, ..
            } => AuthError::RedundantSignerAddress {
                recovered,
                in_dto,
                signer,
            },
            AuthError::PkInvalidSignature { alias, .. } => {
                AuthError::PkInvalidSignature { alias, signer }
            }
            AuthError::PkMissing { alias, .. } => AuthError::PkMissing { alias, signer },
            AuthError::UserNotRegistered { user_id, .. } => {
                AuthError::UserNotRegistered { user_id, signer }
            }
            already_annotated @ AuthError::DuplicateSigner { .. } => already_annotated,
            other => AuthError::ValidationFailed {
                message: format!("{other} (signer: {signer})"),
            },
        }
    }
}

/// Machine-readable keys for [`AuthError`] kinds.
///
/// These keys are stable across releases and are what callers should match
/// on; messages are free to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKey {
    MissingSignature,
    MissingSigner,
    PublicKeyMismatch,
    AddressMismatch,
    RedundantSignerPublicKey,
    RedundantSignerAddress,
    DuplicateSigner,
    PkInvalidSignature,
    PkMissing,
    UserNotRegistered,
    ChaincodeAuthorization,
    Forbidden,
    MissingRole,
    Unauthorized,
    NotFound,
    ValidationFailed,
    Serialization,
    Store,
}

impl Display for ErrorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Leverage serde to get the SCREAMING_SNAKE_CASE variant name
        let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        write!(f, "{}", json.trim_matches('"'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_key_display() {
        assert_eq!(ErrorKey::DuplicateSigner.to_string(), "DUPLICATE_SIGNER");
        assert_eq!(
            ErrorKey::PkInvalidSignature.to_string(),
            "PK_INVALID_SIGNATURE"
        );
    }

    #[test]
    fn test_forbidden_message_shape() {
        let err = AuthError::Forbidden {
            required: 2,
            received: 1,
        };
        assert_eq!(err.to_string(), "Requires at least 2 signatures but got 1");
        assert_eq!(err.key(), ErrorKey::Forbidden);
    }

    #[test]
    fn test_with_signer_keeps_kind() {
        let err = AuthError::PkMissing {
            alias: "client|u1".to_string(),
            signer: SignerRef::Index(0),
        }
        .with_signer(SignerRef::Address("0xabc".to_string()));
        assert_eq!(err.key(), ErrorKey::PkMissing);
        assert!(err.to_string().ends_with("(signer: 0xabc)"));
    }

    #[test]
    fn test_with_signer_folds_unrelated_kinds_into_message() {
        let err = AuthError::validation("bad signature encoding")
            .with_signer(SignerRef::Index(3));
        assert_eq!(err.key(), ErrorKey::ValidationFailed);
        assert!(err.to_string().contains("(signer: 3)"));
    }
}
