//! Equality and range guards evaluated against live values
//!
//! A disabled guard is always satisfied. Every guard packs to a fixed
//! number of fields (enabled flag followed by its operands) so that the
//! commitment of an update binds its preconditions.

use crate::codec::FieldCodec;
use crate::types::{Field, PublicKey, MAX_ZKAPP_STATE_FIELDS};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Equality guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Equals<T> {
    /// Always satisfied
    Disabled,
    /// Satisfied by exactly this value
    Enabled(T),
}

impl<T> Default for Equals<T> {
    fn default() -> Self {
        Equals::Disabled
    }
}

impl<T: PartialEq + Display> Equals<T> {
    /// Always-satisfied guard
    pub fn disabled() -> Self {
        Equals::Disabled
    }

    /// Guard requiring `value`
    pub fn equals(value: T) -> Self {
        Equals::Enabled(value)
    }

    /// Whether the guard is active
    pub fn is_enabled(&self) -> bool {
        matches!(self, Equals::Enabled(_))
    }

    /// `¬enabled ∨ value == x`
    pub fn is_satisfied(&self, x: &T) -> bool {
        match self {
            Equals::Disabled => true,
            Equals::Enabled(value) => value == x,
        }
    }

    /// Human-readable constraint
    pub fn describe(&self) -> String {
        match self {
            Equals::Disabled => "disabled".to_string(),
            Equals::Enabled(value) => format!("x == {}", value),
        }
    }
}

impl<T: FieldCodec> Equals<T> {
    /// Packed form: flag then value (zeros when disabled)
    pub fn to_fields(&self) -> Vec<Field> {
        match self {
            Equals::Disabled => vec![Field::ZERO; 1 + T::size_in_fields()],
            Equals::Enabled(value) => {
                let mut fields = vec![Field::from_bool(true)];
                fields.extend(value.to_fields());
                fields
            }
        }
    }
}

/// Inclusive range guard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InRange<T> {
    /// Always satisfied
    Disabled,
    /// Satisfied by `lower ≤ x ≤ upper`
    Enabled {
        /// Inclusive lower bound
        lower: T,
        /// Inclusive upper bound
        upper: T,
    },
}

impl<T> Default for InRange<T> {
    fn default() -> Self {
        InRange::Disabled
    }
}

/// Numeric types usable as range bounds
pub trait Bounded: Copy + PartialOrd + Display {
    /// Smallest value
    const MIN: Self;
    /// Largest value
    const MAX: Self;
}

impl Bounded for u32 {
    const MIN: Self = u32::MIN;
    const MAX: Self = u32::MAX;
}

impl Bounded for u64 {
    const MIN: Self = u64::MIN;
    const MAX: Self = u64::MAX;
}

impl<T: Bounded> InRange<T> {
    /// Always-satisfied guard
    pub fn disabled() -> Self {
        InRange::Disabled
    }

    /// Guard requiring `lower ≤ x ≤ upper`
    pub fn between(lower: T, upper: T) -> Self {
        InRange::Enabled { lower, upper }
    }

    /// Guard requiring exactly `value`
    pub fn exactly(value: T) -> Self {
        Self::between(value, value)
    }

    /// Guard requiring `x ≥ lower`
    pub fn at_least(lower: T) -> Self {
        Self::between(lower, T::MAX)
    }

    /// Guard requiring `x ≤ upper`
    pub fn at_most(upper: T) -> Self {
        Self::between(T::MIN, upper)
    }

    /// Whether the guard is active
    pub fn is_enabled(&self) -> bool {
        matches!(self, InRange::Enabled { .. })
    }

    /// `¬enabled ∨ lower ≤ x ≤ upper`
    pub fn is_satisfied(&self, x: &T) -> bool {
        match self {
            InRange::Disabled => true,
            InRange::Enabled { lower, upper } => lower <= x && x <= upper,
        }
    }

    /// Human-readable constraint
    pub fn describe(&self) -> String {
        match self {
            InRange::Disabled => "disabled".to_string(),
            InRange::Enabled { lower, upper } => format!("{} <= x <= {}", lower, upper),
        }
    }
}

impl<T: Bounded + FieldCodec> InRange<T> {
    /// Packed form: flag, lower, upper (full range when disabled)
    pub fn to_fields(&self) -> Vec<Field> {
        let (enabled, lower, upper) = match self {
            InRange::Disabled => (false, T::MIN, T::MAX),
            InRange::Enabled { lower, upper } => (true, *lower, *upper),
        };
        let mut fields = vec![Field::from_bool(enabled)];
        fields.extend(lower.to_fields());
        fields.extend(upper.to_fields());
        fields
    }
}

/// Guards on one epoch's ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EpochLedgerPreconditions {
    /// Ledger root
    pub hash: Equals<Field>,
    /// Ledger total currency
    pub total_currency: InRange<u64>,
}

/// Guards on one epoch's consensus data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EpochDataPreconditions {
    /// Ledger summary
    pub ledger: EpochLedgerPreconditions,
    /// Seed
    pub seed: Equals<Field>,
    /// Start checkpoint
    pub start_checkpoint: Equals<Field>,
    /// Lock checkpoint
    pub lock_checkpoint: Equals<Field>,
    /// Epoch length
    pub epoch_length: InRange<u32>,
}

impl EpochDataPreconditions {
    fn to_fields(&self) -> Vec<Field> {
        let mut fields = self.ledger.hash.to_fields();
        fields.extend(self.ledger.total_currency.to_fields());
        fields.extend(self.seed.to_fields());
        fields.extend(self.start_checkpoint.to_fields());
        fields.extend(self.lock_checkpoint.to_fields());
        fields.extend(self.epoch_length.to_fields());
        fields
    }
}

/// Guards on the chain snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkPreconditions {
    /// Snarked ledger root
    pub snarked_ledger_hash: Equals<Field>,
    /// Chain length
    pub blockchain_length: InRange<u32>,
    /// Minimum window density
    pub min_window_density: InRange<u32>,
    /// Total currency
    pub total_currency: InRange<u64>,
    /// Global slot
    pub global_slot_since_genesis: InRange<u32>,
    /// Staking epoch
    pub staking_epoch_data: EpochDataPreconditions,
    /// Next epoch
    pub next_epoch_data: EpochDataPreconditions,
}

impl NetworkPreconditions {
    /// Packed field representation
    pub fn to_fields(&self) -> Vec<Field> {
        let mut fields = self.snarked_ledger_hash.to_fields();
        fields.extend(self.blockchain_length.to_fields());
        fields.extend(self.min_window_density.to_fields());
        fields.extend(self.total_currency.to_fields());
        fields.extend(self.global_slot_since_genesis.to_fields());
        fields.extend(self.staking_epoch_data.to_fields());
        fields.extend(self.next_epoch_data.to_fields());
        fields
    }
}

/// Guards on the target account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountPreconditions {
    /// Balance
    pub balance: InRange<u64>,
    /// Nonce
    pub nonce: InRange<u32>,
    /// Receipt chain head
    pub receipt_chain_hash: Equals<Field>,
    /// Delegate (ignored for an account with no delegate)
    pub delegate: Equals<PublicKey>,
    /// Per-field state, generic layout
    pub state: [Equals<Field>; MAX_ZKAPP_STATE_FIELDS],
    /// Any retained action-state checkpoint
    pub action_state: Equals<Field>,
    /// Proven flag
    pub is_proven: Equals<bool>,
    /// Whether the account is being created
    pub is_new: Equals<bool>,
}

impl AccountPreconditions {
    /// Packed field representation
    pub fn to_fields(&self) -> Vec<Field> {
        let mut fields = self.balance.to_fields();
        fields.extend(self.nonce.to_fields());
        fields.extend(self.receipt_chain_hash.to_fields());
        fields.extend(self.delegate.to_fields());
        for guard in &self.state {
            fields.extend(guard.to_fields());
        }
        fields.extend(self.action_state.to_fields());
        fields.extend(self.is_proven.to_fields());
        fields.extend(self.is_new.to_fields());
        fields
    }
}

/// All guards of one account update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preconditions {
    /// Chain guards
    pub network: NetworkPreconditions,
    /// Account guards
    pub account: AccountPreconditions,
    /// Global-slot liveness bound
    pub valid_while: InRange<u32>,
}

impl Preconditions {
    /// Packed field representation
    pub fn to_fields(&self) -> Vec<Field> {
        let mut fields = self.network.to_fields();
        fields.extend(self.account.to_fields());
        fields.extend(self.valid_while.to_fields());
        fields
    }
}
