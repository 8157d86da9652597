//! Ledger store abstraction.
//!
//! The authenticator and the wallet both target [`Ledger`]: key-value state
//! access, composite-key construction, the event side channel, and the
//! peer-provided signed proposal consumed by the origin-chaincode branch.
//! Production wires the real chaincode stub; tests substitute
//! [`memory::MemoryLedger`].
//!
//! Reads are deterministic within a transaction; writes buffer and become
//! durable (and events observable) only on successful commit. That is the
//! enclosing ledger's discipline; nothing here retries or locks.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub mod memory;

/// Composite-key namespaces persisted by this subsystem.
pub mod keys {
    /// `GCPK|<alias>`: stored public key records.
    pub const PUBLIC_KEY: &str = "GCPK";
    /// `GCUP|<address>`: user profiles.
    pub const USER_PROFILE: &str = "GCUP";
    /// `MSIG|<walletId>`: multisig wallet state.
    pub const MULTISIG: &str = "MSIG";
    /// `UNTX|<uniqueKey>`: consumed replay-protection keys.
    pub const UNIQUE_TX: &str = "UNTX";
}

/// The peer-signed transaction proposal, as far as this subsystem reads it.
///
/// Only the embedded invocation spec matters here: the origin-chaincode
/// branch compares its target chaincode name against the `service|` sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedProposal {
    pub invocation: ChaincodeInvocationSpec,
}

/// The chaincode invocation embedded in a signed proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChaincodeInvocationSpec {
    /// The name of the chaincode the proposal invokes.
    pub chaincode_name: String,
}

/// Read/write access to the ledger within the current transaction.
///
/// Every method that touches state is a suspension point; composite-key
/// construction and the transaction id are pure.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Reads the value stored under `key`, if any.
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError>;

    /// Reads the values stored under `keys`, in input order, as one batched
    /// round trip.
    ///
    /// The default loops [`Ledger::get_state`] for stubs without a native
    /// multi-key read; implementations with one override it.
    async fn get_states(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, AuthError> {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            values.push(self.get_state(key).await?);
        }
        Ok(values)
    }

    /// Buffers a write of `value` under `key`.
    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), AuthError>;

    /// Joins a namespace prefix and attributes into a composite key.
    fn create_composite_key(&self, prefix: &str, attributes: &[&str]) -> String {
        let mut key = String::from(prefix);
        for attribute in attributes {
            key.push('|');
            key.push_str(attribute);
        }
        key
    }

    /// Adds an event to the transaction's write set.
    ///
    /// Events surface only on commit; they are not in-process notifications.
    async fn set_event(&self, name: &str, payload: Vec<u8>) -> Result<(), AuthError>;

    /// The enclosing transaction's id.
    fn tx_id(&self) -> String;

    /// The peer-provided signed proposal, when the stub exposes one.
    async fn signed_proposal(&self) -> Result<Option<SignedProposal>, AuthError>;
}

/// Reads a JSON-encoded record from the ledger.
pub async fn get_json<T: DeserializeOwned>(
    ledger: &dyn Ledger,
    key: &str,
) -> Result<Option<T>, AuthError> {
    match ledger.get_state(key).await? {
        Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        None => Ok(None),
    }
}

/// Writes a JSON-encoded record to the ledger.
pub async fn put_json<T: Serialize>(
    ledger: &dyn Ledger,
    key: &str,
    value: &T,
) -> Result<(), AuthError> {
    ledger.put_state(key, serde_json::to_vec(value)?).await
}

/// A view over a ledger that rejects writes.
///
/// EVALUATE-classed operations run their body against this view, so a write
/// reached in a read-only context fails instead of silently buffering.
pub struct ReadOnlyLedger<'a> {
    inner: &'a dyn Ledger,
}

impl<'a> ReadOnlyLedger<'a> {
    pub fn new(inner: &'a dyn Ledger) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Ledger for ReadOnlyLedger<'_> {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError> {
        self.inner.get_state(key).await
    }

    async fn get_states(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, AuthError> {
        self.inner.get_states(keys).await
    }

    async fn put_state(&self, key: &str, _value: Vec<u8>) -> Result<(), AuthError> {
        Err(AuthError::validation(format!(
            "write to {key} attempted on a read-only ledger view"
        )))
    }

    fn create_composite_key(&self, prefix: &str, attributes: &[&str]) -> String {
        self.inner.create_composite_key(prefix, attributes)
    }

    async fn set_event(&self, name: &str, _payload: Vec<u8>) -> Result<(), AuthError> {
        Err(AuthError::validation(format!(
            "event {name} emitted on a read-only ledger view"
        )))
    }

    fn tx_id(&self) -> String {
        self.inner.tx_id()
    }

    async fn signed_proposal(&self) -> Result<Option<SignedProposal>, AuthError> {
        self.inner.signed_proposal().await
    }
}
