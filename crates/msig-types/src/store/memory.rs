//! Deterministic in-memory ledger for tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::error::AuthError;
use crate::store::{Ledger, SignedProposal};

/// An event recorded by [`MemoryLedger::set_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

impl EmittedEvent {
    /// Decodes the JSON payload for assertions.
    pub fn payload_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

/// A `BTreeMap`-backed [`Ledger`] used as the store substitute in tests.
///
/// State iterates deterministically, events are recorded in emission order,
/// and the signed proposal can be stubbed for the origin-chaincode branch.
pub struct MemoryLedger {
    state: Mutex<BTreeMap<String, Vec<u8>>>,
    events: Mutex<Vec<EmittedEvent>>,
    proposal: Mutex<Option<SignedProposal>>,
    tx_id: String,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_tx_id("tx-0")
    }

    pub fn with_tx_id(tx_id: impl Into<String>) -> Self {
        MemoryLedger {
            state: Mutex::new(BTreeMap::new()),
            events: Mutex::new(Vec::new()),
            proposal: Mutex::new(None),
            tx_id: tx_id.into(),
        }
    }

    /// Stubs the peer-provided signed proposal.
    pub fn set_signed_proposal(&self, proposal: SignedProposal) {
        *self.proposal.lock().expect("proposal lock poisoned") = Some(proposal);
    }

    /// All events emitted so far, in order.
    pub fn events(&self) -> Vec<EmittedEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }

    /// The raw value stored under `key`, if any.
    pub fn stored(&self, key: &str) -> Option<Vec<u8>> {
        self.state
            .lock()
            .expect("state lock poisoned")
            .get(key)
            .cloned()
    }

    /// The number of stored keys.
    pub fn len(&self) -> usize {
        self.state.lock().expect("state lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError> {
        Ok(self
            .state
            .lock()
            .map_err(|_| AuthError::Store {
                message: "state lock poisoned".to_string(),
            })?
            .get(key)
            .cloned())
    }

    // One lock acquisition for the whole batch.
    async fn get_states(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, AuthError> {
        let state = self.state.lock().map_err(|_| AuthError::Store {
            message: "state lock poisoned".to_string(),
        })?;
        Ok(keys.iter().map(|key| state.get(key).cloned()).collect())
    }

    async fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), AuthError> {
        self.state
            .lock()
            .map_err(|_| AuthError::Store {
                message: "state lock poisoned".to_string(),
            })?
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn set_event(&self, name: &str, payload: Vec<u8>) -> Result<(), AuthError> {
        self.events
            .lock()
            .map_err(|_| AuthError::Store {
                message: "events lock poisoned".to_string(),
            })?
            .push(EmittedEvent {
                name: name.to_string(),
                payload,
            });
        Ok(())
    }

    fn tx_id(&self) -> String {
        self.tx_id.clone()
    }

    async fn signed_proposal(&self) -> Result<Option<SignedProposal>, AuthError> {
        Ok(self
            .proposal
            .lock()
            .map_err(|_| AuthError::Store {
                message: "proposal lock poisoned".to_string(),
            })?
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::keys;

    #[tokio::test]
    async fn test_state_roundtrip() {
        let ledger = MemoryLedger::new();
        let key = ledger.create_composite_key(keys::USER_PROFILE, &["0xabc"]);
        assert_eq!(key, "GCUP|0xabc");
        assert_eq!(ledger.get_state(&key).await.unwrap(), None);
        ledger.put_state(&key, b"profile".to_vec()).await.unwrap();
        assert_eq!(ledger.get_state(&key).await.unwrap(), Some(b"profile".to_vec()));
    }

    #[tokio::test]
    async fn test_batched_reads_preserve_input_order() {
        let ledger = MemoryLedger::new();
        ledger.put_state("a", b"1".to_vec()).await.unwrap();
        ledger.put_state("c", b"3".to_vec()).await.unwrap();
        let values = ledger
            .get_states(&["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![Some(b"1".to_vec()), None, Some(b"3".to_vec())]);
    }

    #[tokio::test]
    async fn test_events_record_in_order() {
        let ledger = MemoryLedger::new();
        ledger.set_event("First", b"1".to_vec()).await.unwrap();
        ledger.set_event("Second", b"2".to_vec()).await.unwrap();
        let names: Vec<String> = ledger.events().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["First", "Second"]);
    }

    #[tokio::test]
    async fn test_read_only_view_rejects_writes() {
        use crate::store::ReadOnlyLedger;

        let ledger = MemoryLedger::new();
        ledger.put_state("k", b"v".to_vec()).await.unwrap();
        let view = ReadOnlyLedger::new(&ledger);
        assert_eq!(view.get_state("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(view.put_state("k", b"w".to_vec()).await.is_err());
        assert!(view.set_event("E", vec![]).await.is_err());
        assert!(ledger.events().is_empty());
    }
}
