//! The wallet operations: create, submit, confirm, read.

use msig_authenticator::gate::{OperationPolicy, authorize_operation};
use msig_authenticator::{AuthResult, Authenticator, Context};
use msig_types::envelope::Envelope;
use msig_types::error::AuthError;
use msig_types::store::{Ledger, ReadOnlyLedger, get_json, keys, put_json};

use crate::dto::{ConfirmTxDto, CreateMultisigDto, GetWalletDto, SubmitTxDto};
use crate::events::{self, MultisigCreated, TxExecuted, TxSubmitted};
use crate::state::MultisigState;

/// The multisig wallet operations.
///
/// Each method authenticates its envelope, applies the operation's policy,
/// and then mutates (or reads) the wallet row. The acting owner is always
/// the first calling user's ETH address; the recoverable path guarantees
/// the signature itself names the owner.
pub struct MultisigContract {
    authenticator: Authenticator,
}

impl Default for MultisigContract {
    fn default() -> Self {
        MultisigContract::new(Authenticator::default())
    }
}

impl MultisigContract {
    pub fn new(authenticator: Authenticator) -> Self {
        MultisigContract { authenticator }
    }

    /// Creates a wallet. Fails when it already exists or when the threshold
    /// falls outside `1..=owners.len()`. Returns the wallet id.
    pub async fn create_multisig(
        &self,
        ctx: &mut Context<'_>,
        envelope: &Envelope,
    ) -> Result<String, AuthError> {
        authorize_operation(&self.authenticator, ctx, envelope, &OperationPolicy::submit())
            .await?;
        let dto: CreateMultisigDto = envelope.payload()?;
        let ledger = ctx.ledger();
        let key = wallet_key(ledger, &dto.wallet_id);
        if get_json::<MultisigState>(ledger, &key).await?.is_some() {
            return Err(AuthError::validation(format!(
                "wallet {} already exists",
                dto.wallet_id
            )));
        }
        let owners = dto
            .owners
            .iter()
            .map(|owner| msig_scheme_eth::normalize_address(owner))
            .collect::<Result<Vec<_>, _>>()?;
        let state = MultisigState::create(dto.wallet_id.clone(), owners, dto.threshold)?;
        put_json(ledger, &key, &state).await?;
        events::emit(
            ledger,
            MultisigCreated::NAME,
            &MultisigCreated {
                wallet_id: state.wallet_id.clone(),
                owners: state.owners.clone(),
                threshold: state.threshold,
            },
        )
        .await?;
        tracing::info!(wallet = %state.wallet_id, owners = state.owners.len(), threshold = state.threshold, "multisig wallet created");
        Ok(dto.wallet_id)
    }

    /// Submits a transaction, implicitly confirmed by its submitter, and
    /// returns the assigned nonce.
    ///
    /// With a threshold of 1 the submission executes immediately, the
    /// threshold-reaching rule applied uniformly.
    pub async fn submit_tx(
        &self,
        ctx: &mut Context<'_>,
        envelope: &Envelope,
    ) -> Result<u64, AuthError> {
        let auth =
            authorize_operation(&self.authenticator, ctx, envelope, &OperationPolicy::submit())
                .await?;
        let dto: SubmitTxDto = envelope.payload()?;
        let ledger = ctx.ledger();
        let key = wallet_key(ledger, &dto.wallet_id);
        let mut state = load_wallet(ledger, &key, &dto.wallet_id).await?;

        let submitter = acting_owner(&auth)?;
        if !state.is_owner(&submitter) {
            return Err(AuthError::validation(format!(
                "Submitter {submitter} is not an owner of wallet {}",
                dto.wallet_id
            )));
        }

        let nonce = state.submit(dto.to.clone(), dto.data, submitter);
        let executed = state.threshold_reached(nonce);
        if executed {
            state.execute(nonce);
        }
        put_json(ledger, &key, &state).await?;

        events::emit(
            ledger,
            TxSubmitted::NAME,
            &TxSubmitted {
                wallet_id: dto.wallet_id.clone(),
                nonce,
                to: dto.to,
            },
        )
        .await?;
        if executed {
            events::emit(
                ledger,
                TxExecuted::NAME,
                &TxExecuted {
                    wallet_id: dto.wallet_id.clone(),
                    nonce,
                },
            )
            .await?;
        }
        tracing::info!(wallet = %dto.wallet_id, nonce, executed, "transaction submitted");
        Ok(nonce)
    }

    /// Confirms a pending transaction. Returns whether the confirmation
    /// reached the threshold and executed it.
    pub async fn confirm_tx(
        &self,
        ctx: &mut Context<'_>,
        envelope: &Envelope,
    ) -> Result<bool, AuthError> {
        let auth =
            authorize_operation(&self.authenticator, ctx, envelope, &OperationPolicy::submit())
                .await?;
        let dto: ConfirmTxDto = envelope.payload()?;
        let ledger = ctx.ledger();
        let key = wallet_key(ledger, &dto.wallet_id);
        let mut state = load_wallet(ledger, &key, &dto.wallet_id).await?;

        let confirmer = acting_owner(&auth)?;
        if !state.is_owner(&confirmer) {
            return Err(AuthError::validation(format!(
                "Confirmer {confirmer} is not an owner of wallet {}",
                dto.wallet_id
            )));
        }

        let executed = state.confirm(dto.nonce, confirmer)?;
        if executed {
            state.execute(dto.nonce);
        }
        put_json(ledger, &key, &state).await?;

        if executed {
            events::emit(
                ledger,
                TxExecuted::NAME,
                &TxExecuted {
                    wallet_id: dto.wallet_id.clone(),
                    nonce: dto.nonce,
                },
            )
            .await?;
        }
        tracing::info!(wallet = %dto.wallet_id, nonce = dto.nonce, executed, "transaction confirmed");
        Ok(executed)
    }

    /// Reads the wallet state. Requires only the envelope's own
    /// authentication and runs against a read-only ledger view.
    pub async fn get_wallet(
        &self,
        ctx: &mut Context<'_>,
        envelope: &Envelope,
    ) -> Result<MultisigState, AuthError> {
        authorize_operation(
            &self.authenticator,
            ctx,
            envelope,
            &OperationPolicy::evaluate(),
        )
        .await?;
        let dto: GetWalletDto = envelope.payload()?;
        let view = ReadOnlyLedger::new(ctx.ledger());
        let key = wallet_key(&view, &dto.wallet_id);
        load_wallet(&view, &key, &dto.wallet_id).await
    }
}

fn wallet_key(ledger: &dyn Ledger, wallet_id: &str) -> String {
    ledger.create_composite_key(keys::MULTISIG, &[wallet_id])
}

async fn load_wallet(
    ledger: &dyn Ledger,
    key: &str,
    wallet_id: &str,
) -> Result<MultisigState, AuthError> {
    get_json::<MultisigState>(ledger, key)
        .await?
        .ok_or_else(|| AuthError::NotFound {
            key: wallet_id.to_string(),
        })
}

fn acting_owner(auth: &AuthResult) -> Result<String, AuthError> {
    auth.calling_user
        .eth_address
        .clone()
        .ok_or_else(|| AuthError::validation("acting user has no ETH address"))
}
