//! Core types for multi-signature ledger authentication.
//!
//! This crate provides the foundational types shared by the authenticator,
//! the per-scheme signature crates, and the multisig wallet. It is designed
//! to be scheme-agnostic: the ETH and TON signature implementations live in
//! separate crates and plug in through the [`scheme::SignatureScheme`] trait.
//!
//! # Overview
//!
//! A request enters the system as a signed [`envelope::Envelope`] carrying one
//! or more signature entries. Every signer commits to the same
//! [`canonical`] byte serialization of the envelope, so signatures produced by
//! independent parties over the same payload aggregate into a single
//! multi-signature request. The authenticator resolves each signer to an
//! on-ledger [`identity::UserProfile`] through the [`store::Ledger`]
//! abstraction.
//!
//! # Modules
//!
//! - [`alias`] - Canonical user identity strings (`eth|…`, `client|…`, `service|…`)
//! - [`canonical`] - Deterministic signed-byte derivation for envelopes
//! - [`envelope`] - The signed request envelope and its signature entries
//! - [`error`] - Typed failure kinds with stable keys for caller dispatch
//! - [`identity`] - User profiles, roles, and stored public key records
//! - [`scheme`] - The signing-scheme seam and scheme registry
//! - [`store`] - Ledger store abstraction plus the in-memory test substitute

pub mod alias;
pub mod canonical;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod scheme;
pub mod store;
