//! zkApp Core
//!
//! Account-update state-transition engine for zkApp transactions.
//!
//! # Architecture
//!
//! - **Engine**: pure check-and-apply of one account update against an
//!   account and a chain snapshot
//! - **Context**: pre-order walk of account-update trees over a ledger view,
//!   with per-node error traces
//! - **Commitments**: domain-separated hashing of updates, forests and
//!   whole commands
//! - **Authorization**: signing and proof attachment after construction
//!
//! # Invariants
//!
//! - Value conservation: a command's net fee excess is exactly zero
//! - Errors accumulate: no check short-circuits another
//! - Atomic construction: the ledger changes only when nothing failed
//! - Deterministic order: updates are evaluated pre-order, left to right

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod types;
pub mod hash;
pub mod codec;
pub mod account;
pub mod ledger;
pub mod chain;
pub mod precondition;
pub mod authorization;
pub mod state;
pub mod committed_list;
pub mod account_update;
pub mod tree;
pub mod engine;
pub mod transaction;
pub mod trace;
pub mod crypto;
pub mod error;
pub mod config;
pub mod metrics;

// Re-exports
pub use account::{Account, AccountTiming};
pub use account_update::{AccountUpdate, Update};
pub use chain::ChainView;
pub use config::Config;
pub use engine::{ApplyResult, Engine, FeeExcess};
pub use error::{ApplyError, Error, Result};
pub use ledger::{InMemoryLedger, LedgerView};
pub use transaction::{create_unsigned_zkapp_command, FeePayer, Memo, ZkappCommand};
pub use tree::AccountUpdateTree;
pub use types::{AccountId, Field, PublicKey, SignedAmount, TokenId};
