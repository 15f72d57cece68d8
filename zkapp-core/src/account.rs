//! Account records, vesting schedules and the action-state ring

use crate::authorization::Permissions;
use crate::hash::{prefixes, Hasher};
use crate::state::{StateLayout, StateValue};
use crate::types::{
    AccountId, Field, PublicKey, TokenSymbol, ZkappUri, ACTION_STATE_LENGTH,
    MAX_ZKAPP_STATE_FIELDS,
};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Vesting schedule restricting how low the balance may go
///
/// The all-zero schedule is "untimed": its minimum balance is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccountTiming {
    /// Minimum balance before the cliff
    pub initial_minimum_balance: u64,
    /// Slot at which the cliff amount unlocks
    pub cliff_time: u32,
    /// Amount unlocked at the cliff
    pub cliff_amount: u64,
    /// Slots between vesting increments
    pub vesting_period: u32,
    /// Amount unlocked per period
    pub vesting_increment: u64,
}

impl AccountTiming {
    /// No vesting restriction
    pub fn untimed() -> Self {
        Self::default()
    }

    /// Whether this schedule restricts anything
    pub fn is_timed(&self) -> bool {
        *self != Self::untimed()
    }

    /// Minimum balance the account must hold at `slot`
    pub fn minimum_balance_at_slot(&self, slot: u32) -> u64 {
        if slot < self.cliff_time {
            return self.initial_minimum_balance;
        }
        if self.vesting_period == 0 || self.initial_minimum_balance < self.cliff_amount {
            return 0;
        }

        let periods_vested = ((slot - self.cliff_time) / self.vesting_period) as u64;
        // saturates: a fully vested schedule must reach zero even when the product overflows
        let vested = periods_vested.saturating_mul(self.vesting_increment);

        (self.initial_minimum_balance - self.cliff_amount).saturating_sub(vested)
    }

    /// Packed field representation
    pub fn to_fields(&self) -> Vec<Field> {
        vec![
            Field::from_bool(self.is_timed()),
            Field::from_u64(self.initial_minimum_balance),
            Field::from_u64(self.cliff_time as u64),
            Field::from_u64(self.cliff_amount),
            Field::from_u64(self.vesting_period as u64),
            Field::from_u64(self.vesting_increment),
        ]
    }
}

/// Verification key and its hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationKey {
    /// Serialized key material
    #[serde(with = "serde_bytes")]
    pub data: Vec<u8>,
    /// Hash the account and updates refer to
    pub hash: Field,
}

impl VerificationKey {
    /// Placeholder key carried by accounts without a program
    pub fn dummy() -> Self {
        Self {
            data: Vec::new(),
            hash: Field::ZERO,
        }
    }

    /// Key with hash derived from its bytes
    pub fn from_data(data: Vec<u8>) -> Self {
        let hash = Field::from_bytes(crate::crypto::hash_bytes(&data));
        Self { data, hash }
    }
}

impl Default for VerificationKey {
    fn default() -> Self {
        Self::dummy()
    }
}

/// zkApp portion of an account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZkappAccount {
    /// On-chain state, generic field layout
    pub state: [Field; MAX_ZKAPP_STATE_FIELDS],
    /// Current program
    pub verification_key: VerificationKey,
    /// Action-state checkpoints, oldest first
    pub action_state: [Field; ACTION_STATE_LENGTH],
    /// Slot of the most recent action push
    pub last_action_slot: u32,
    /// Every state field was last written by one update
    pub is_proven: bool,
    /// Program URI
    pub zkapp_uri: ZkappUri,
}

impl Default for ZkappAccount {
    fn default() -> Self {
        Self {
            state: [Field::ZERO; MAX_ZKAPP_STATE_FIELDS],
            verification_key: VerificationKey::dummy(),
            action_state: [Field::ZERO; ACTION_STATE_LENGTH],
            last_action_slot: 0,
            is_proven: false,
            zkapp_uri: ZkappUri::default(),
        }
    }
}

impl ZkappAccount {
    /// Fold a pushed actions list into the ring
    ///
    /// Pushes within one slot accumulate into the newest (last) checkpoint;
    /// the first push in a new slot drops the oldest and opens a new one.
    pub fn push_actions(&mut self, actions_hash: Field, slot: u32, hasher: &dyn Hasher) {
        const NEWEST: usize = ACTION_STATE_LENGTH - 1;
        if slot != self.last_action_slot {
            self.action_state.copy_within(1.., 0);
        }
        self.action_state[NEWEST] =
            hasher.hash(prefixes::ACTIONS, &[self.action_state[NEWEST], actions_hash]);
        self.last_action_slot = slot;
    }

    /// Most recent action-state checkpoint
    pub fn latest_action_state(&self) -> Field {
        self.action_state[ACTION_STATE_LENGTH - 1]
    }
}

/// Ledger account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Identity
    pub account_id: AccountId,
    /// Token symbol (meaningful for token owners)
    #[serde(default)]
    pub token_symbol: TokenSymbol,
    /// Balance in the smallest unit
    pub balance: u64,
    /// Transaction counter
    pub nonce: u32,
    /// Receipt chain head
    #[serde(default)]
    pub receipt_chain_hash: Field,
    /// Staking delegate
    #[serde(default)]
    pub delegate: Option<PublicKey>,
    /// Governance vote target
    #[serde(default)]
    pub voting_for: Field,
    /// Vesting schedule
    #[serde(default)]
    pub timing: AccountTiming,
    /// Per-aspect authorization requirements
    #[serde(default)]
    pub permissions: Permissions,
    /// zkApp fields
    #[serde(default)]
    pub zkapp: ZkappAccount,
    /// Synthesized because no stored account existed; never hashed
    #[serde(default, skip_serializing)]
    pub is_new: bool,
}

impl Account {
    /// Default account synthesized for an id with no stored record
    pub fn empty(account_id: AccountId) -> Self {
        Self {
            account_id,
            token_symbol: TokenSymbol::default(),
            balance: 0,
            nonce: 0,
            receipt_chain_hash: Field::ZERO,
            delegate: None,
            voting_for: Field::ZERO,
            timing: AccountTiming::untimed(),
            permissions: Permissions::defaults(),
            zkapp: ZkappAccount::default(),
            is_new: true,
        }
    }

    /// Stored signature-controlled account with the given balance
    pub fn new(account_id: AccountId, balance: u64) -> Self {
        Self {
            balance,
            permissions: Permissions::initial(),
            is_new: false,
            ..Self::empty(account_id)
        }
    }

    /// Minimum balance at `slot` under this account's schedule
    pub fn minimum_balance_at_slot(&self, slot: u32) -> u64 {
        self.timing.minimum_balance_at_slot(slot)
    }

    /// zkApp state read through `layout`
    pub fn typed_state(&self, layout: &StateLayout) -> Result<Vec<StateValue>> {
        layout.values_from_generic(&self.zkapp.state)
    }
}
