//! Wallet lifecycle events.
//!
//! Events join the transaction's write set through the ledger stub and are
//! observable only on commit; nothing in-process waits on them.

use serde::Serialize;

use msig_types::error::AuthError;
use msig_types::store::Ledger;

/// Emitted when a wallet is created.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultisigCreated {
    pub wallet_id: String,
    pub owners: Vec<String>,
    pub threshold: u32,
}

impl MultisigCreated {
    pub const NAME: &'static str = "MultisigCreated";
}

/// Emitted when a transaction is submitted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxSubmitted {
    pub wallet_id: String,
    pub nonce: u64,
    pub to: String,
}

impl TxSubmitted {
    pub const NAME: &'static str = "TxSubmitted";
}

/// Emitted when a pending transaction reaches its threshold and executes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TxExecuted {
    pub wallet_id: String,
    pub nonce: u64,
}

impl TxExecuted {
    pub const NAME: &'static str = "TxExecuted";
}

pub(crate) async fn emit<E: Serialize>(
    ledger: &dyn Ledger,
    name: &str,
    event: &E,
) -> Result<(), AuthError> {
    ledger.set_event(name, serde_json::to_vec(event)?).await
}
