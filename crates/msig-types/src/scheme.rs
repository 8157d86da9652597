//! The signing-scheme seam.
//!
//! The authenticator never touches curve arithmetic directly: it resolves the
//! envelope's [`SigningScheme`] tag against a [`SchemeRegistry`] and drives
//! the [`SignatureScheme`] trait. ETH and TON implementations live in their
//! own crates and register here.
//!
//! Recovery is scheme-specific: ETH secp256k1 signatures in their 65-byte
//! form recover the signing key, while TON ed25519 signatures never do. The
//! trait expresses the absent capability with [`Recovery::NotRecoverable`]
//! as the default, and callers branch on [`SignatureScheme::is_recoverable`]
//! rather than hitting a runtime panic.

use std::collections::HashMap;

use crate::envelope::SigningScheme;
use crate::error::AuthError;

/// The outcome of attempting public-key recovery from a signature.
///
/// `NotRecoverable` is a result, not a failure: it covers schemes without
/// recovery and signature encodings (raw r‖s, DER) that do not embed a
/// recovery id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recovery {
    /// The signing public key, in the scheme's normalized encoding.
    Recovered(String),
    /// The signature does not support recovery.
    NotRecoverable,
}

impl Recovery {
    pub fn recovered(&self) -> Option<&str> {
        match self {
            Recovery::Recovered(public_key) => Some(public_key),
            Recovery::NotRecoverable => None,
        }
    }
}

/// Signature operations of one signing scheme.
///
/// Implementations are pure CPU-bound code; all byte-level encodings
/// (hex vs base64, compressed vs non-compact keys) are the implementation's
/// concern, and the normalized forms returned here are what gets persisted
/// and compared.
pub trait SignatureScheme: Send + Sync {
    /// The scheme tag this implementation serves.
    fn signing(&self) -> SigningScheme;

    /// Whether signatures of this scheme can recover the signing key.
    fn is_recoverable(&self) -> bool;

    /// Attempts to recover the signing public key from the signature over
    /// `message`.
    ///
    /// The default is [`Recovery::NotRecoverable`]; schemes without recovery
    /// simply do not implement this.
    fn recover_public_key(
        &self,
        _signature: &str,
        _message: &[u8],
    ) -> Result<Recovery, AuthError> {
        Ok(Recovery::NotRecoverable)
    }

    /// Verifies the signature over `message` against a public key in any
    /// accepted encoding.
    fn verify(&self, signature: &str, message: &[u8], public_key: &str)
    -> Result<bool, AuthError>;

    /// Canonicalizes a public key into the scheme's normalized stored form.
    fn normalize_public_key(&self, public_key: &str) -> Result<String, AuthError>;

    /// Derives the scheme's address form from a public key.
    fn public_key_to_address(&self, public_key: &str) -> Result<String, AuthError>;

    /// Canonicalizes an externally-provided address.
    fn normalize_address(&self, address: &str) -> Result<String, AuthError>;
}

/// Maps scheme tags to their implementations.
///
/// Built once by the consumer (the authenticator registers ETH and TON) and
/// shared across requests.
#[derive(Default)]
pub struct SchemeRegistry {
    schemes: HashMap<SigningScheme, Box<dyn SignatureScheme>>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a scheme implementation under its own tag.
    pub fn register(mut self, scheme: Box<dyn SignatureScheme>) -> Self {
        self.schemes.insert(scheme.signing(), scheme);
        self
    }

    /// Looks up the implementation for a scheme tag.
    pub fn scheme(&self, signing: SigningScheme) -> Result<&dyn SignatureScheme, AuthError> {
        self.schemes
            .get(&signing)
            .map(|b| b.as_ref())
            .ok_or_else(|| AuthError::validation(format!("no implementation registered for signing scheme {signing}")))
    }
}
