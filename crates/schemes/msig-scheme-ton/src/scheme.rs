//! ed25519 sign/verify and bounceable address derivation.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD as b64, URL_SAFE as b64_url};
use crc::{CRC_16_XMODEM, Crc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use msig_types::envelope::SigningScheme;
use msig_types::error::AuthError;
use msig_types::scheme::SignatureScheme;

/// Bounceable, non-testnet address tag.
const BOUNCEABLE_TAG: u8 = 0x11;
/// The basechain workchain id.
const WORKCHAIN: u8 = 0x00;

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Signs `message` with the given key, producing a base64 signature.
///
/// ed25519 hashes internally, so the message is the envelope's
/// `prefix ‖ canonical_payload` as-is.
pub fn sign(signing_key: &SigningKey, message: &[u8]) -> String {
    let signature = signing_key.sign(message);
    b64.encode(signature.to_bytes())
}

/// Verifies a base64 signature over `message` against a public key in any
/// accepted encoding.
pub fn verify(signature: &str, message: &[u8], public_key: &str) -> Result<bool, AuthError> {
    let signature_bytes = b64
        .decode(signature)
        .map_err(|_| AuthError::validation("TON signature is not valid base64"))?;
    let signature_bytes: [u8; 64] = signature_bytes
        .try_into()
        .map_err(|_| AuthError::validation("TON signature must be 64 bytes"))?;
    let verifying_key = decode_verifying_key(public_key)?;
    let signature = Signature::from_bytes(&signature_bytes);
    Ok(verifying_key.verify(message, &signature).is_ok())
}

/// Canonicalizes an ed25519 public key to its base64 stored form.
///
/// Accepts base64 or hex input of the raw 32-byte key.
pub fn normalize_public_key(public_key: &str) -> Result<String, AuthError> {
    let verifying_key = decode_verifying_key(public_key)?;
    Ok(b64.encode(verifying_key.to_bytes()))
}

/// Derives the bounceable address from a public key.
///
/// Layout: tag byte `0x11`, workchain byte `0x00`, the 32-byte sha-256
/// account id of the raw key, and a big-endian CRC-16/XMODEM checksum over
/// the preceding 34 bytes; the 36 bytes render as base64url.
pub fn public_key_to_address(public_key: &str) -> Result<String, AuthError> {
    let verifying_key = decode_verifying_key(public_key)?;
    let account_id = Sha256::digest(verifying_key.to_bytes());
    let mut data = Vec::with_capacity(36);
    data.push(BOUNCEABLE_TAG);
    data.push(WORKCHAIN);
    data.extend_from_slice(&account_id);
    let checksum = CRC16.checksum(&data);
    data.extend_from_slice(&checksum.to_be_bytes());
    Ok(b64_url.encode(&data))
}

/// Validates a bounceable address and re-encodes it canonically.
///
/// Accepts the base64url rendering as well as the standard-alphabet variant
/// some wallets emit.
pub fn normalize_address(address: &str) -> Result<String, AuthError> {
    let bytes = b64_url
        .decode(address)
        .or_else(|_| b64.decode(address))
        .map_err(|_| AuthError::validation(format!("invalid TON address {address:?}")))?;
    if bytes.len() != 36 || bytes[0] != BOUNCEABLE_TAG || bytes[1] != WORKCHAIN {
        return Err(AuthError::validation(format!(
            "invalid TON address {address:?}: expected 36 bytes in bounceable basechain form"
        )));
    }
    let checksum = u16::from_be_bytes([bytes[34], bytes[35]]);
    if CRC16.checksum(&bytes[..34]) != checksum {
        return Err(AuthError::validation(format!(
            "invalid TON address {address:?}: checksum mismatch"
        )));
    }
    Ok(b64_url.encode(&bytes))
}

fn decode_verifying_key(public_key: &str) -> Result<VerifyingKey, AuthError> {
    let hex_part = public_key.strip_prefix("0x").unwrap_or(public_key);
    // A raw 32-byte key is 64 hex characters; base64 forms are 44. The hex
    // form would also decode as base64, so length decides.
    let bytes = if hex_part.len() == 64 && hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        hex::decode(hex_part)
            .map_err(|_| AuthError::validation("public key is neither base64 nor hex"))?
    } else {
        b64.decode(public_key)
            .map_err(|_| AuthError::validation("public key is neither base64 nor hex"))?
    };
    let bytes: [u8; 32] = bytes
        .try_into()
        .map_err(|_| AuthError::validation("ed25519 public key must be 32 bytes"))?;
    VerifyingKey::from_bytes(&bytes)
        .map_err(|_| AuthError::validation("invalid ed25519 public key"))
}

/// The TON implementation of the scheme seam.
///
/// `recover_public_key` keeps the trait default: ed25519 has no recovery, so
/// the authenticator branches on [`SignatureScheme::is_recoverable`] and
/// requires a declared signer instead.
pub struct TonScheme;

impl SignatureScheme for TonScheme {
    fn signing(&self) -> SigningScheme {
        SigningScheme::Ton
    }

    fn is_recoverable(&self) -> bool {
        false
    }

    fn verify(
        &self,
        signature: &str,
        message: &[u8],
        public_key: &str,
    ) -> Result<bool, AuthError> {
        verify(signature, message, public_key)
    }

    fn normalize_public_key(&self, public_key: &str) -> Result<String, AuthError> {
        normalize_public_key(public_key)
    }

    fn public_key_to_address(&self, public_key: &str) -> Result<String, AuthError> {
        public_key_to_address(public_key)
    }

    fn normalize_address(&self, address: &str) -> Result<String, AuthError> {
        normalize_address(address)
    }
}
