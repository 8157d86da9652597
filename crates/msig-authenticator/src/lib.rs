//! Signature-aggregation authenticator and authorization gate.
//!
//! This crate turns a signed [`Envelope`](msig_types::envelope::Envelope)
//! into an ordered list of authenticated user profiles, then enforces
//! per-operation signature counts and role predicates on that list.
//!
//! # Flow
//!
//! 1. [`Authenticator::authenticate`] resolves every signature entry to a
//!    `(address, public key)` pair, enforces signer uniqueness, loads (or,
//!    when configured, synthesizes) the matching user profiles, and verifies
//!    each signature against its resolved key.
//! 2. [`gate::authorize`] checks the resolved callers against the operation's
//!    [`gate::OperationPolicy`].
//! 3. SUBMIT-classed operations consume the envelope's `uniqueKey` through
//!    the store-backed replay guard.
//!
//! [`gate::authorize_operation`] chains all three for operation wrappers.
//!
//! # Admin bootstrap
//!
//! With the `bootstrap-admin` feature (on by default, intended for
//! development builds only), [`config::AuthConfig::from_env`] reads
//! `DEV_ADMIN_PUBLIC_KEY` / `DEV_ADMIN_USER_ID`, and lookups for the derived
//! address resolve to a synthetic admin profile when no on-ledger record
//! exists. Synthesized profiles are never persisted.

mod authenticate;
mod chaincode;
pub mod config;
mod context;
pub mod gate;
mod profile_store;

pub use authenticate::{AuthResult, Authenticator};
pub use config::{AuthConfig, AdminIdentity};
pub use context::Context;
pub use profile_store::ProfileStore;
