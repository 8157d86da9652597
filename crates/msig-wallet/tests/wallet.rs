//! Wallet state machine scenarios over the in-memory ledger.

use alloy_signer_local::PrivateKeySigner;
use serde_json::{Value, json};

use msig_authenticator::{AuthConfig, Context};
use msig_types::envelope::Envelope;
use msig_types::error::ErrorKey;
use msig_types::store::memory::MemoryLedger;
use msig_wallet::{MultisigContract, MultisigState};

fn eth_signer(byte: u8) -> PrivateKeySigner {
    let mut bytes = [0u8; 32];
    bytes[31] = byte;
    PrivateKeySigner::from_slice(&bytes).unwrap()
}

fn address_of(signer: &PrivateKeySigner) -> String {
    format!("0x{}", hex::encode(signer.address().into_array()))
}

/// Signs `payload` with a single recoverable signature.
fn signed(mut payload: Value, signer: &PrivateKeySigner) -> Envelope {
    let envelope = Envelope::from_value(payload.clone()).unwrap();
    let signature = msig_scheme_eth::sign(signer, &envelope.signed_bytes().unwrap())
        .unwrap()
        .to_string();
    payload["signatures"] = json!([{"signature": signature}]);
    Envelope::from_value(payload).unwrap()
}

fn config() -> AuthConfig {
    // Owners act as unregistered-but-known signers.
    AuthConfig::new().with_allow_non_registered_users(true)
}

fn stored_wallet(ledger: &MemoryLedger, wallet_id: &str) -> MultisigState {
    let bytes = ledger.stored(&format!("MSIG|{wallet_id}")).unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_two_owner_wallet(
    ledger: &MemoryLedger,
    contract: &MultisigContract,
    a1: &PrivateKeySigner,
    a2: &PrivateKeySigner,
) {
    let envelope = signed(
        json!({
            "uniqueKey": "create-W",
            "walletId": "W",
            "owners": [address_of(a1), address_of(a2)],
            "threshold": 2,
        }),
        a1,
    );
    let mut ctx = Context::new(ledger, config());
    let wallet_id = contract.create_multisig(&mut ctx, &envelope).await.unwrap();
    assert_eq!(wallet_id, "W");
}

#[tokio::test]
async fn test_wallet_happy_path() {
    // S5: create, submit, confirm to threshold.
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);
    let a2 = eth_signer(2);
    create_two_owner_wallet(&ledger, &contract, &a1, &a2).await;

    let events = ledger.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].name, "MultisigCreated");
    assert_eq!(events[0].payload_json()["walletId"], "W");
    assert_eq!(events[0].payload_json()["threshold"], 2);

    let envelope = signed(
        json!({"uniqueKey": "submit-0", "walletId": "W", "to": "R", "data": "D"}),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    let nonce = contract.submit_tx(&mut ctx, &envelope).await.unwrap();
    assert_eq!(nonce, 0);

    let state = stored_wallet(&ledger, "W");
    assert_eq!(state.nonce, 1);
    let pending = &state.pending_txs[&0];
    assert_eq!(pending.to, "R");
    assert_eq!(pending.data, "D");
    assert_eq!(pending.confirmations, vec![address_of(&a1)]);

    let events = ledger.events();
    assert_eq!(events.last().unwrap().name, "TxSubmitted");
    assert_eq!(events.last().unwrap().payload_json()["nonce"], 0);

    let envelope = signed(
        json!({"uniqueKey": "confirm-0", "walletId": "W", "nonce": 0}),
        &a2,
    );
    let mut ctx = Context::new(&ledger, config());
    let executed = contract.confirm_tx(&mut ctx, &envelope).await.unwrap();
    assert!(executed);

    let state = stored_wallet(&ledger, "W");
    assert_eq!(state.nonce, 1);
    assert!(state.pending_txs.is_empty());

    let executed_events: Vec<_> = ledger
        .events()
        .into_iter()
        .filter(|e| e.name == "TxExecuted")
        .collect();
    assert_eq!(executed_events.len(), 1);
    assert_eq!(executed_events[0].payload_json()["walletId"], "W");
    assert_eq!(executed_events[0].payload_json()["nonce"], 0);
}

#[tokio::test]
async fn test_confirm_by_non_owner_leaves_wallet_unchanged() {
    // S6.
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);
    let a2 = eth_signer(2);
    let a3 = eth_signer(3);
    create_two_owner_wallet(&ledger, &contract, &a1, &a2).await;

    let envelope = signed(
        json!({"uniqueKey": "submit-0", "walletId": "W", "to": "R", "data": "D"}),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    contract.submit_tx(&mut ctx, &envelope).await.unwrap();
    let before = stored_wallet(&ledger, "W");

    let envelope = signed(
        json!({"uniqueKey": "confirm-bad", "walletId": "W", "nonce": 0}),
        &a3,
    );
    let mut ctx = Context::new(&ledger, config());
    let err = contract.confirm_tx(&mut ctx, &envelope).await.unwrap_err();
    assert_eq!(err.key(), ErrorKey::ValidationFailed);
    assert_eq!(
        err.to_string(),
        format!("Confirmer {} is not an owner of wallet W", address_of(&a3))
    );
    assert_eq!(stored_wallet(&ledger, "W"), before);
}

#[tokio::test]
async fn test_threshold_one_submission_auto_executes() {
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);

    let envelope = signed(
        json!({
            "uniqueKey": "create-solo",
            "walletId": "solo",
            "owners": [address_of(&a1)],
            "threshold": 1,
        }),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    contract.create_multisig(&mut ctx, &envelope).await.unwrap();

    let envelope = signed(
        json!({"uniqueKey": "submit-solo", "walletId": "solo", "to": "R", "data": "D"}),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    let nonce = contract.submit_tx(&mut ctx, &envelope).await.unwrap();
    assert_eq!(nonce, 0);

    let state = stored_wallet(&ledger, "solo");
    assert_eq!(state.nonce, 1);
    assert!(state.pending_txs.is_empty());

    let names: Vec<String> = ledger.events().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["MultisigCreated", "TxSubmitted", "TxExecuted"]);
}

#[tokio::test]
async fn test_duplicate_confirmation_is_rejected() {
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);
    let a2 = eth_signer(2);
    create_two_owner_wallet(&ledger, &contract, &a1, &a2).await;

    let envelope = signed(
        json!({"uniqueKey": "submit-0", "walletId": "W", "to": "R", "data": "D"}),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    contract.submit_tx(&mut ctx, &envelope).await.unwrap();

    // The submitter already confirmed implicitly.
    let envelope = signed(
        json!({"uniqueKey": "confirm-dup", "walletId": "W", "nonce": 0}),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    let err = contract.confirm_tx(&mut ctx, &envelope).await.unwrap_err();
    assert_eq!(err.key(), ErrorKey::ValidationFailed);
    assert!(err.to_string().contains("already confirmed"));
}

#[tokio::test]
async fn test_confirm_without_pending_transaction() {
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);
    let a2 = eth_signer(2);
    create_two_owner_wallet(&ledger, &contract, &a1, &a2).await;

    let envelope = signed(
        json!({"uniqueKey": "confirm-none", "walletId": "W", "nonce": 5}),
        &a2,
    );
    let mut ctx = Context::new(&ledger, config());
    let err = contract.confirm_tx(&mut ctx, &envelope).await.unwrap_err();
    assert_eq!(err.key(), ErrorKey::ValidationFailed);
    assert!(err.to_string().contains("no pending transaction"));
}

#[tokio::test]
async fn test_submit_to_unknown_wallet_is_not_found() {
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);

    let envelope = signed(
        json!({"uniqueKey": "submit-?", "walletId": "ghost", "to": "R", "data": "D"}),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    let err = contract.submit_tx(&mut ctx, &envelope).await.unwrap_err();
    assert_eq!(err.key(), ErrorKey::NotFound);
}

#[tokio::test]
async fn test_submit_by_non_owner_is_rejected() {
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);
    let a2 = eth_signer(2);
    let a3 = eth_signer(3);
    create_two_owner_wallet(&ledger, &contract, &a1, &a2).await;

    let envelope = signed(
        json!({"uniqueKey": "submit-bad", "walletId": "W", "to": "R", "data": "D"}),
        &a3,
    );
    let mut ctx = Context::new(&ledger, config());
    let err = contract.submit_tx(&mut ctx, &envelope).await.unwrap_err();
    assert_eq!(err.key(), ErrorKey::ValidationFailed);
    assert!(err.to_string().contains("is not an owner"));
}

#[tokio::test]
async fn test_create_validations() {
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);
    let a2 = eth_signer(2);

    // Threshold above the owner count.
    let envelope = signed(
        json!({
            "uniqueKey": "create-bad",
            "walletId": "bad",
            "owners": [address_of(&a1)],
            "threshold": 2,
        }),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    let err = contract.create_multisig(&mut ctx, &envelope).await.unwrap_err();
    assert_eq!(err.key(), ErrorKey::ValidationFailed);

    // Recreating an existing wallet.
    create_two_owner_wallet(&ledger, &contract, &a1, &a2).await;
    let envelope = signed(
        json!({
            "uniqueKey": "create-W-again",
            "walletId": "W",
            "owners": [address_of(&a1)],
            "threshold": 1,
        }),
        &a1,
    );
    let mut ctx = Context::new(&ledger, config());
    let err = contract.create_multisig(&mut ctx, &envelope).await.unwrap_err();
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn test_nonce_counts_submissions() {
    // Property: after k submissions the stored nonce equals k.
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);
    let a2 = eth_signer(2);
    create_two_owner_wallet(&ledger, &contract, &a1, &a2).await;

    for k in 0..3u64 {
        let envelope = signed(
            json!({
                "uniqueKey": format!("submit-{k}"),
                "walletId": "W",
                "to": "R",
                "data": format!("D{k}"),
            }),
            &a1,
        );
        let mut ctx = Context::new(&ledger, config());
        assert_eq!(contract.submit_tx(&mut ctx, &envelope).await.unwrap(), k);
    }
    let state = stored_wallet(&ledger, "W");
    assert_eq!(state.nonce, 3);
    assert_eq!(state.pending_txs.len(), 3);
}

#[tokio::test]
async fn test_get_wallet_reads_without_unique_key() {
    let ledger = MemoryLedger::new();
    let contract = MultisigContract::default();
    let a1 = eth_signer(1);
    let a2 = eth_signer(2);
    create_two_owner_wallet(&ledger, &contract, &a1, &a2).await;

    // Evaluate-classed: no uniqueKey required, nothing consumed.
    let envelope = signed(json!({"walletId": "W"}), &a2);
    let mut ctx = Context::new(&ledger, config());
    let state = contract.get_wallet(&mut ctx, &envelope).await.unwrap();
    assert_eq!(state.wallet_id, "W");
    assert_eq!(state.threshold, 2);
    assert_eq!(state.owners, vec![address_of(&a1), address_of(&a2)]);

    let envelope = signed(json!({"walletId": "ghost"}), &a1);
    let mut ctx = Context::new(&ledger, config());
    let err = contract.get_wallet(&mut ctx, &envelope).await.unwrap_err();
    assert_eq!(err.key(), ErrorKey::NotFound);
}
