//! Read-only network snapshot consulted by network preconditions

use crate::types::Field;
use serde::{Deserialize, Serialize};

/// Ledger summary for one epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EpochLedgerData {
    /// Epoch ledger root
    pub hash: Field,
    /// Total currency in that ledger
    pub total_currency: u64,
}

/// Consensus data for one epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EpochData {
    /// Epoch ledger summary
    pub ledger: EpochLedgerData,
    /// Epoch seed
    pub seed: Field,
    /// Start checkpoint
    pub start_checkpoint: Field,
    /// Lock checkpoint
    pub lock_checkpoint: Field,
    /// Number of blocks in the epoch
    pub epoch_length: u32,
}

/// Immutable chain snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChainView {
    /// Snarked ledger root
    pub snarked_ledger_hash: Field,
    /// Chain length
    pub blockchain_length: u32,
    /// Minimum window density
    pub min_window_density: u32,
    /// Total currency
    pub total_currency: u64,
    /// Current global slot
    pub global_slot_since_genesis: u32,
    /// Staking epoch
    pub staking_epoch_data: EpochData,
    /// Next epoch
    pub next_epoch_data: EpochData,
}

impl ChainView {
    /// Snapshot at the given slot with everything else zeroed
    pub fn at_slot(global_slot_since_genesis: u32) -> Self {
        Self {
            global_slot_since_genesis,
            ..Self::default()
        }
    }
}
