//! ETH secp256k1 signing scheme.
//!
//! Signatures are ECDSA over `keccak256(prefix ‖ canonical_payload)`. The
//! primary wire form is the 65-byte recoverable `r‖s‖v` encoding, from which
//! the signing key (and thus the signer address) recovers without any hint;
//! raw 64-byte `r‖s` and DER encodings are accepted for verification but do
//! not recover, so entries carrying them must declare the signer.
//!
//! Keys are persisted in the normalized non-compact SEC1 hex form;
//! [`scheme::compact_base64`] produces the compressed-base64 rendering used
//! where a short stable form is wanted.

mod scheme;
mod signature;

pub use scheme::{
    EthScheme, compact_base64, normalize_address, normalize_public_key, public_key_to_address,
    recover_public_key, sign, verify,
};
pub use signature::EthSignature;
