//! The signed request envelope and its signature entries.
//!
//! An envelope is a JSON object carrying the operation payload together with
//! an ordered `signatures` list, an optional signing-scheme tag, an optional
//! domain-separation `prefix`, and a `uniqueKey` for replay protection. The
//! legacy single-signature form places `signature` at the top level and is
//! treated as a one-entry `signatures` list everywhere downstream.
//!
//! The envelope keeps its raw JSON value so the canonical signed bytes can be
//! derived from exactly what the caller sent; typed accessors read the
//! bookkeeping fields without committing to an operation payload shape.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Display;

use crate::canonical;
use crate::error::AuthError;

/// The signing scheme of an envelope.
///
/// Defaults to [`SigningScheme::Eth`] when the envelope omits the tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningScheme {
    /// secp256k1 ECDSA over keccak-256; recoverable.
    #[default]
    #[serde(rename = "ETH")]
    Eth,
    /// ed25519; not recoverable.
    #[serde(rename = "TON")]
    Ton,
}

impl SigningScheme {
    /// The lowercase alias prefix for identities of this scheme.
    pub fn alias_prefix(&self) -> &'static str {
        match self {
            SigningScheme::Eth => "eth",
            SigningScheme::Ton => "ton",
        }
    }
}

impl Display for SigningScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SigningScheme::Eth => write!(f, "ETH"),
            SigningScheme::Ton => write!(f, "TON"),
        }
    }
}

/// One signature over the envelope's canonical bytes.
///
/// At most one of `signer_public_key` and `signer_address` may be present
/// when the scheme is recoverable; for TON at least one must be present.
/// Those constraints are enforced by the authenticator, not at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureEntry {
    /// The raw signature: hex for ETH, base64 for TON.
    pub signature: String,
    /// The signer's public key: hex for ETH, base64 for TON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_public_key: Option<String>,
    /// The signer's address: `eth|`-prefixed or raw hex for ETH, bounceable
    /// form for TON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer_address: Option<String>,
}

impl SignatureEntry {
    /// An entry carrying only the signature itself.
    pub fn bare(signature: impl Into<String>) -> Self {
        SignatureEntry {
            signature: signature.into(),
            signer_public_key: None,
            signer_address: None,
        }
    }
}

/// A signed request envelope wrapping the caller's raw JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope(serde_json::Value);

impl Envelope {
    /// Wraps a JSON value, rejecting anything that is not an object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, AuthError> {
        if !value.is_object() {
            return Err(AuthError::validation("envelope must be a JSON object"));
        }
        Ok(Envelope(value))
    }

    /// Parses an envelope from its JSON text form.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// The underlying JSON value.
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    /// The envelope's signing scheme; absent tags default to ETH.
    pub fn signing(&self) -> Result<SigningScheme, AuthError> {
        match self.0.get("signing") {
            None | Some(serde_json::Value::Null) => Ok(SigningScheme::default()),
            Some(value) => Ok(serde_json::from_value(value.clone())?),
        }
    }

    /// The optional domain-separation prefix.
    pub fn prefix(&self) -> Option<&str> {
        self.0.get("prefix").and_then(|v| v.as_str())
    }

    /// The replay-protection key, when present.
    pub fn unique_key(&self) -> Option<&str> {
        self.0.get("uniqueKey").and_then(|v| v.as_str())
    }

    /// The top-level `signerAddress`, used by the origin-chaincode branch.
    pub fn signer_address(&self) -> Option<&str> {
        self.0.get("signerAddress").and_then(|v| v.as_str())
    }

    /// The ordered signature entries, with the legacy top-level `signature`
    /// field desugared into a one-entry list.
    ///
    /// An envelope carrying both forms is accepted only when the list already
    /// contains the top-level signature; conflicting combinations are
    /// rejected.
    pub fn signature_entries(&self) -> Result<Vec<SignatureEntry>, AuthError> {
        let listed: Vec<SignatureEntry> = match self.0.get("signatures") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(value) => serde_json::from_value(value.clone())?,
        };
        let top_level = self.0.get("signature").and_then(|v| v.as_str());
        match (top_level, listed.is_empty()) {
            (None, _) => Ok(listed),
            (Some(signature), true) => {
                let mut entry = SignatureEntry::bare(signature);
                entry.signer_public_key = self
                    .0
                    .get("signerPublicKey")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                entry.signer_address = self.signer_address().map(str::to_string);
                Ok(vec![entry])
            }
            (Some(signature), false) => {
                if listed.iter().any(|entry| entry.signature == signature) {
                    Ok(listed)
                } else {
                    Err(AuthError::validation(
                        "envelope carries both a top-level signature and a conflicting signatures list",
                    ))
                }
            }
        }
    }

    /// The message every signer commits to: `prefix ‖ canonical_payload`.
    pub fn signed_bytes(&self) -> Result<Vec<u8>, AuthError> {
        canonical::signed_bytes(&self.0, self.prefix())
    }

    /// Decodes the operation-specific payload carried by this envelope.
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, AuthError> {
        Ok(serde_json::from_value(self.0.clone())?)
    }
}
