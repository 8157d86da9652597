//! secp256k1 sign/recover/verify and ETH address derivation.

use alloy_primitives::{B256, Signature as RecoverableSignature, keccak256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as b64;
use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{Signature as EcdsaSignature, VerifyingKey};

use msig_types::envelope::SigningScheme;
use msig_types::error::AuthError;
use msig_types::scheme::{Recovery, SignatureScheme};

use crate::signature::EthSignature;

/// Signs `message` with the given key, producing the 65-byte recoverable form.
///
/// The message is the envelope's `prefix ‖ canonical_payload`; hashing with
/// keccak-256 happens here.
pub fn sign(signer: &PrivateKeySigner, message: &[u8]) -> Result<EthSignature, AuthError> {
    let digest = keccak256(message);
    let signature = signer
        .sign_hash_sync(&digest)
        .map_err(|e| AuthError::validation(format!("secp256k1 signing failed: {e}")))?;
    Ok(EthSignature(signature.as_bytes()))
}

/// Recovers the signing public key from a signature over `message`.
///
/// Returns [`Recovery::NotRecoverable`], a result rather than a failure, when the
/// signature is not in the 65-byte recoverable encoding or does not yield a
/// valid curve point.
pub fn recover_public_key(signature: &str, message: &[u8]) -> Result<Recovery, AuthError> {
    let Ok(parsed) = signature.parse::<EthSignature>() else {
        return Ok(Recovery::NotRecoverable);
    };
    let Ok(recoverable) = RecoverableSignature::from_raw(parsed.as_bytes()) else {
        return Ok(Recovery::NotRecoverable);
    };
    let digest = keccak256(message);
    match recoverable.recover_from_prehash(&digest) {
        Ok(verifying_key) => Ok(Recovery::Recovered(hex::encode(
            verifying_key.to_encoded_point(false).as_bytes(),
        ))),
        Err(_) => Ok(Recovery::NotRecoverable),
    }
}

/// Verifies a signature over `message` against a public key in any accepted
/// encoding.
///
/// The 65-byte recoverable form verifies by recovery and key comparison; raw
/// 64-byte `r‖s` and DER encodings verify directly against the key.
pub fn verify(signature: &str, message: &[u8], public_key: &str) -> Result<bool, AuthError> {
    let expected = normalize_public_key(public_key)?;
    if let Recovery::Recovered(recovered) = recover_public_key(signature, message)? {
        return Ok(recovered == expected);
    }

    let bytes = hex::decode(signature.trim_start_matches("0x"))
        .map_err(|_| AuthError::validation("ETH signature is not valid hex"))?;
    let ecdsa = EcdsaSignature::from_slice(&bytes)
        .or_else(|_| EcdsaSignature::from_der(&bytes))
        .map_err(|_| AuthError::validation("ETH signature is neither r\u{2016}s\u{2016}v, r\u{2016}s nor DER"))?;
    let verifying_key = decode_verifying_key(&expected)?;
    let digest: B256 = keccak256(message);
    Ok(verifying_key.verify_prehash(digest.as_slice(), &ecdsa).is_ok())
}

/// Canonicalizes a secp256k1 public key to the non-compact SEC1 hex form.
///
/// Accepts compressed (33-byte) or uncompressed (65-byte, with or without the
/// `04` tag) keys, hex- or base64-encoded.
pub fn normalize_public_key(public_key: &str) -> Result<String, AuthError> {
    let verifying_key = decode_verifying_key(public_key)?;
    Ok(hex::encode(verifying_key.to_encoded_point(false).as_bytes()))
}

/// The compressed-SEC1 base64 rendering of a public key.
///
/// Used where a short, stable form of a recovered key is wanted for storage
/// and lookup symmetry with base64-keyed schemes.
pub fn compact_base64(public_key: &str) -> Result<String, AuthError> {
    let verifying_key = decode_verifying_key(public_key)?;
    Ok(b64.encode(verifying_key.to_encoded_point(true).as_bytes()))
}

/// Derives the ETH address: last 20 bytes of `keccak256(pub[1..])`,
/// lowercased and 0x-prefixed.
pub fn public_key_to_address(public_key: &str) -> Result<String, AuthError> {
    let verifying_key = decode_verifying_key(public_key)?;
    let uncompressed = verifying_key.to_encoded_point(false);
    let digest = keccak256(&uncompressed.as_bytes()[1..]);
    Ok(format!("0x{}", hex::encode(&digest[12..])))
}

/// Canonicalizes an ETH address to lowercase 0x-prefixed hex, stripping an
/// `eth|` alias prefix when present.
pub fn normalize_address(address: &str) -> Result<String, AuthError> {
    let stripped = address.strip_prefix("eth|").unwrap_or(address);
    let hex_part = stripped.strip_prefix("0x").unwrap_or(stripped);
    if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(AuthError::validation(format!(
            "invalid ETH address {address:?}: expected 40 hex characters"
        )));
    }
    Ok(format!("0x{}", hex_part.to_ascii_lowercase()))
}

fn decode_verifying_key(public_key: &str) -> Result<VerifyingKey, AuthError> {
    let bytes = decode_key_material(public_key)?;
    let sec1 = match bytes.len() {
        // Uncompressed key missing its SEC1 tag.
        64 => {
            let mut tagged = Vec::with_capacity(65);
            tagged.push(0x04);
            tagged.extend_from_slice(&bytes);
            tagged
        }
        _ => bytes,
    };
    VerifyingKey::from_sec1_bytes(&sec1)
        .map_err(|_| AuthError::validation("invalid secp256k1 public key"))
}

fn decode_key_material(input: &str) -> Result<Vec<u8>, AuthError> {
    let hex_part = input.strip_prefix("0x").unwrap_or(input);
    // Hex key forms are 66 (compressed), 128 (untagged), or 130 characters;
    // base64 forms are 44 or 88 and may collide with the hex alphabet, so
    // length decides before alphabet.
    let looks_hex = matches!(hex_part.len(), 66 | 128 | 130)
        && hex_part.chars().all(|c| c.is_ascii_hexdigit());
    if looks_hex {
        return hex::decode(hex_part)
            .map_err(|_| AuthError::validation("public key is neither hex nor base64"));
    }
    if let Ok(bytes) = b64.decode(input) {
        return Ok(bytes);
    }
    hex::decode(hex_part).map_err(|_| AuthError::validation("public key is neither hex nor base64"))
}

/// The ETH implementation of the scheme seam.
pub struct EthScheme;

impl SignatureScheme for EthScheme {
    fn signing(&self) -> SigningScheme {
        SigningScheme::Eth
    }

    fn is_recoverable(&self) -> bool {
        true
    }

    fn recover_public_key(&self, signature: &str, message: &[u8]) -> Result<Recovery, AuthError> {
        recover_public_key(signature, message)
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

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use k256::ecdsa::signature::hazmat::PrehashSigner;

    // The secp256k1 generator point: the key pair of private key 0x…01.
    const KEY_ONE_PUBLIC: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
    const KEY_ONE_COMPRESSED: &str =
        "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
    const KEY_ONE_ADDRESS: &str = "0x7e5f4552091a69125d5dfcb7b8c2659029395bdf";

    fn key_one() -> PrivateKeySigner {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        PrivateKeySigner::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_sign_then_recover_yields_non_compact_key() {
        let message = br#"{"uniqueKey":"k"}"#;
        let signature = sign(&key_one(), message).unwrap();
        let recovery = recover_public_key(&signature.to_string(), message).unwrap();
        assert_eq!(recovery, Recovery::Recovered(KEY_ONE_PUBLIC.to_string()));
    }

    #[test]
    fn test_address_derivation_matches_known_vector() {
        assert_eq!(
            public_key_to_address(KEY_ONE_PUBLIC).unwrap(),
            KEY_ONE_ADDRESS
        );
    }

    #[test]
    fn test_normalize_accepts_compressed_uncompressed_and_untagged() {
        assert_eq!(
            normalize_public_key(KEY_ONE_COMPRESSED).unwrap(),
            KEY_ONE_PUBLIC
        );
        assert_eq!(
            normalize_public_key(&format!("0x{KEY_ONE_PUBLIC}")).unwrap(),
            KEY_ONE_PUBLIC
        );
        assert_eq!(
            normalize_public_key(&KEY_ONE_PUBLIC[2..]).unwrap(),
            KEY_ONE_PUBLIC
        );
    }

    #[test]
    fn test_normalize_accepts_base64_material() {
        let compressed = hex::decode(KEY_ONE_COMPRESSED).unwrap();
        let encoded = b64.encode(&compressed);
        assert_eq!(normalize_public_key(&encoded).unwrap(), KEY_ONE_PUBLIC);
    }

    #[test]
    fn test_compact_base64_roundtrips_to_compressed_bytes() {
        let compact = compact_base64(KEY_ONE_PUBLIC).unwrap();
        let decoded = b64.decode(&compact).unwrap();
        assert_eq!(hex::encode(decoded), KEY_ONE_COMPRESSED);
    }

    #[test]
    fn test_verify_recoverable_signature() {
        let message = b"payload";
        let signature = sign(&key_one(), message).unwrap().to_string();
        assert!(verify(&signature, message, KEY_ONE_PUBLIC).unwrap());
        assert!(!verify(&signature, b"other payload", KEY_ONE_PUBLIC).unwrap());
    }

    #[test]
    fn test_raw_rs_signature_verifies_but_does_not_recover() {
        let message = b"payload";
        let digest = keccak256(message);
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let signing_key = SigningKey::from_slice(&bytes).unwrap();
        let ecdsa: EcdsaSignature = signing_key.sign_prehash(digest.as_slice()).unwrap();
        let raw = hex::encode(ecdsa.to_bytes());

        assert_eq!(
            recover_public_key(&raw, message).unwrap(),
            Recovery::NotRecoverable
        );
        assert!(verify(&raw, message, KEY_ONE_PUBLIC).unwrap());
        assert!(verify(&raw, message, KEY_ONE_COMPRESSED).unwrap());
    }

    #[test]
    fn test_garbage_signature_is_not_recoverable() {
        assert_eq!(
            recover_public_key("zz-not-hex", b"m").unwrap(),
            Recovery::NotRecoverable
        );
        assert_eq!(
            recover_public_key("0xabcd", b"m").unwrap(),
            Recovery::NotRecoverable
        );
    }

    #[test]
    fn test_normalize_address_forms() {
        let checksummed = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
        assert_eq!(normalize_address(checksummed).unwrap(), KEY_ONE_ADDRESS);
        assert_eq!(
            normalize_address(&format!("eth|{checksummed}")).unwrap(),
            KEY_ONE_ADDRESS
        );
        assert_eq!(
            normalize_address(&KEY_ONE_ADDRESS[2..]).unwrap(),
            KEY_ONE_ADDRESS
        );
        assert!(normalize_address("0x1234").is_err());
    }
}
