//! Wallet state and its transition rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use msig_types::error::AuthError;

/// The persisted state of one multisig wallet, keyed `MSIG|<walletId>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigState {
    pub wallet_id: String,
    /// The owner addresses, normalized, in registration order. Never empty.
    pub owners: Vec<String>,
    /// Confirmations required to execute; `0 < threshold <= owners.len()`.
    pub threshold: u32,
    /// The next submission nonce; only ever increases.
    pub nonce: u64,
    /// Open transactions by submission nonce. An entry holds strictly fewer
    /// than `threshold` confirmations; reaching the threshold removes it.
    #[serde(default)]
    pub pending_txs: BTreeMap<u64, PendingTx>,
}

/// A submitted transaction awaiting confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTx {
    pub to: String,
    pub data: String,
    /// Confirming owner addresses, distinct, in confirmation order.
    pub confirmations: Vec<String>,
}

impl MultisigState {
    /// Validates the creation invariants and builds the initial state.
    pub fn create(
        wallet_id: String,
        owners: Vec<String>,
        threshold: u32,
    ) -> Result<Self, AuthError> {
        if owners.is_empty() {
            return Err(AuthError::validation(format!(
                "wallet {wallet_id} must have at least one owner"
            )));
        }
        if threshold == 0 {
            return Err(AuthError::validation(format!(
                "wallet {wallet_id} threshold must be positive"
            )));
        }
        if (threshold as usize) > owners.len() {
            return Err(AuthError::validation(format!(
                "wallet {wallet_id} threshold {threshold} exceeds its {} owners",
                owners.len()
            )));
        }
        Ok(MultisigState {
            wallet_id,
            owners,
            threshold,
            nonce: 0,
            pending_txs: BTreeMap::new(),
        })
    }

    pub fn is_owner(&self, address: &str) -> bool {
        self.owners.iter().any(|owner| owner == address)
    }

    /// Records a submission by `submitter`, who implicitly confirms it, and
    /// assigns the next nonce.
    pub fn submit(&mut self, to: String, data: String, submitter: String) -> u64 {
        let nonce = self.nonce;
        self.pending_txs.insert(
            nonce,
            PendingTx {
                to,
                data,
                confirmations: vec![submitter],
            },
        );
        self.nonce += 1;
        nonce
    }

    /// Adds `owner`'s confirmation to the pending transaction at `nonce`.
    ///
    /// Rejects an unknown nonce and a repeated confirmation by the same
    /// owner. Returns whether the threshold is now reached (the caller
    /// executes via [`MultisigState::execute`]).
    pub fn confirm(&mut self, nonce: u64, owner: String) -> Result<bool, AuthError> {
        let wallet_id = self.wallet_id.clone();
        let pending = self.pending_txs.get_mut(&nonce).ok_or_else(|| {
            AuthError::validation(format!(
                "no pending transaction {nonce} in wallet {wallet_id}"
            ))
        })?;
        if pending.confirmations.contains(&owner) {
            return Err(AuthError::validation(format!(
                "owner {owner} already confirmed transaction {nonce} in wallet {wallet_id}"
            )));
        }
        pending.confirmations.push(owner);
        Ok(self.threshold_reached(nonce))
    }

    /// Whether the pending transaction at `nonce` holds enough confirmations
    /// to execute.
    pub fn threshold_reached(&self, nonce: u64) -> bool {
        self.pending_txs
            .get(&nonce)
            .is_some_and(|pending| pending.confirmations.len() >= self.threshold as usize)
    }

    /// Removes an executed transaction.
    ///
    /// The entry must never persist at the threshold: callers execute in the
    /// same transaction that reached it.
    pub fn execute(&mut self, nonce: u64) -> Option<PendingTx> {
        self.pending_txs.remove(&nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(owners: &[&str], threshold: u32) -> MultisigState {
        MultisigState::create(
            "W".to_string(),
            owners.iter().map(|o| o.to_string()).collect(),
            threshold,
        )
        .unwrap()
    }

    #[test]
    fn test_create_validates_bounds() {
        assert!(MultisigState::create("W".into(), vec![], 1).is_err());
        assert!(MultisigState::create("W".into(), vec!["a".into()], 0).is_err());
        assert!(MultisigState::create("W".into(), vec!["a".into()], 2).is_err());
        let state = wallet(&["a", "b"], 2);
        assert_eq!(state.nonce, 0);
        assert!(state.pending_txs.is_empty());
    }

    #[test]
    fn test_nonce_increments_per_submission() {
        let mut state = wallet(&["a", "b", "c"], 2);
        for expected in 0..4u64 {
            let nonce = state.submit("R".into(), "D".into(), "a".into());
            assert_eq!(nonce, expected);
        }
        assert_eq!(state.nonce, 4);
        assert_eq!(state.pending_txs.len(), 4);
    }

    #[test]
    fn test_confirm_accumulates_until_threshold() {
        let mut state = wallet(&["a", "b", "c"], 3);
        let nonce = state.submit("R".into(), "D".into(), "a".into());
        assert!(!state.confirm(nonce, "b".into()).unwrap());
        assert!(state.confirm(nonce, "c".into()).unwrap());
        let executed = state.execute(nonce).unwrap();
        assert_eq!(executed.confirmations, vec!["a", "b", "c"]);
        assert!(state.pending_txs.is_empty());
    }

    #[test]
    fn test_duplicate_confirmation_is_rejected() {
        let mut state = wallet(&["a", "b"], 2);
        let nonce = state.submit("R".into(), "D".into(), "a".into());
        let err = state.confirm(nonce, "a".into()).unwrap_err();
        assert!(err.to_string().contains("already confirmed"));
        assert_eq!(state.pending_txs[&nonce].confirmations, vec!["a"]);
    }

    #[test]
    fn test_confirm_unknown_nonce_is_rejected() {
        let mut state = wallet(&["a", "b"], 2);
        assert!(state.confirm(7, "a".into()).is_err());
    }

    #[test]
    fn test_wire_form_uses_camel_case_and_string_nonces() {
        let mut state = wallet(&["a", "b"], 2);
        state.submit("R".into(), "D".into(), "a".into());
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["walletId"], "W");
        assert_eq!(json["pendingTxs"]["0"]["confirmations"], serde_json::json!(["a"]));
        let back: MultisigState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
