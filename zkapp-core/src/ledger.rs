//! Ledger views
//!
//! The engine never owns account storage; it reads and writes through
//! [`LedgerView`]. A single context mutates a view at a time.
//!
//! # Example
//!
//! ```
//! use zkapp_core::ledger::{InMemoryLedger, LedgerView};
//! use zkapp_core::types::{AccountId, PublicKey};
//!
//! let mut ledger = InMemoryLedger::new();
//! let id = AccountId::mina(PublicKey::from_bytes([1u8; 32]));
//! assert!(ledger.get(&id).is_new);
//! ledger.update(&id, |mut account| {
//!     account.balance = 10;
//!     account.is_new = false;
//!     account
//! });
//! assert_eq!(ledger.get(&id).balance, 10);
//! ```

use crate::account::Account;
use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Keyed account store
pub trait LedgerView {
    /// Whether a stored account exists
    fn has(&self, id: &AccountId) -> bool;

    /// Stored account, or a synthesized empty one with `is_new = true`
    fn get(&self, id: &AccountId) -> Account;

    /// Write the full account value
    fn set(&mut self, account: Account);

    /// `set(f(get(id)))`
    fn update<F>(&mut self, id: &AccountId, f: F)
    where
        F: FnOnce(Account) -> Account,
        Self: Sized,
    {
        let account = self.get(id);
        self.set(f(account));
    }
}

/// Ordered in-memory ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Account>", into = "Vec<Account>")]
pub struct InMemoryLedger {
    accounts: BTreeMap<AccountId, Account>,
}

impl InMemoryLedger {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored accounts
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// No stored accounts
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Stored accounts in id order
    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }
}

impl From<Vec<Account>> for InMemoryLedger {
    fn from(accounts: Vec<Account>) -> Self {
        let mut ledger = InMemoryLedger::new();
        for account in accounts {
            ledger.set(account);
        }
        ledger
    }
}

impl From<InMemoryLedger> for Vec<Account> {
    fn from(ledger: InMemoryLedger) -> Self {
        ledger.accounts.into_values().collect()
    }
}

impl LedgerView for InMemoryLedger {
    fn has(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    fn get(&self, id: &AccountId) -> Account {
        self.accounts
            .get(id)
            .cloned()
            .unwrap_or_else(|| Account::empty(*id))
    }

    fn set(&mut self, mut account: Account) {
        account.is_new = false;
        self.accounts.insert(account.account_id, account);
    }
}

/// Ordered set of account ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdSet(BTreeSet<AccountId>);

impl AccountIdSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, returning whether the id was absent
    pub fn add(&mut self, id: AccountId) -> bool {
        self.0.insert(id)
    }

    /// Membership
    pub fn has(&self, id: &AccountId) -> bool {
        self.0.contains(id)
    }

    /// Number of ids
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// No ids
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
