//! M-of-N multisig wallet state machine.
//!
//! A wallet is an on-ledger record (`MSIG|<walletId>`) holding its owners, a
//! confirmation threshold, a monotonically increasing submission nonce, and
//! the currently pending transactions. Owners submit transactions and
//! confirm each other's; once a pending transaction accumulates `threshold`
//! distinct owner confirmations it executes: the entry is removed in the
//! same transaction and a `TxExecuted` event joins the write set.
//!
//! Every wallet operation is an authenticated envelope operation: it runs
//! through the authenticator and the authorization gate first, and the
//! acting owner is the first calling user's ETH address.
//!
//! Concurrent mutations of the same wallet are the ledger's concern: two
//! transactions touching one wallet conflict at commit time and one rolls
//! back, which is what keeps the nonce and the confirmation sets consistent
//! without in-process locks.

mod contract;
mod dto;
mod events;
mod state;

pub use contract::MultisigContract;
pub use dto::{ConfirmTxDto, CreateMultisigDto, GetWalletDto, SubmitTxDto};
pub use events::{MultisigCreated, TxExecuted, TxSubmitted};
pub use state::{MultisigState, PendingTx};
