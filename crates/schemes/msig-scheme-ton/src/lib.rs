//! TON ed25519 signing scheme.
//!
//! Signatures are plain ed25519 over the envelope's canonical bytes and are
//! NOT recoverable: every TON signature entry must declare its signer by
//! address or public key. Keys and signatures travel base64-encoded; the
//! address is the bounceable form derived from the raw public key.

mod scheme;

pub use scheme::{
    TonScheme, normalize_address, normalize_public_key, public_key_to_address, sign, verify,
};
