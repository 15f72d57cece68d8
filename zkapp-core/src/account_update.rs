//! Account updates: the proposed mutation of one account
//!
//! An update is built once with [`AccountUpdate::new`] (or
//! [`AccountUpdate::from_context_free`]) and refined with `with_*` calls;
//! every default is "do nothing": zero balance change, flags off,
//! preconditions disabled, attributes unset.

use crate::account::{AccountTiming, VerificationKey};
use crate::authorization::{AuthorizationKind, Permissions};
use crate::committed_list::{GenericCommittedList, ListKind};
use crate::config::NetworkId;
use crate::hash::Hasher;
use crate::precondition::{Equals, Preconditions};
use crate::state::{StateLayout, StateValue};
use crate::types::{
    AccountId, Field, ProofRef, PublicKey, Signature, SignedAmount, TokenSymbol, ZkappUri,
    MAX_ZKAPP_STATE_FIELDS,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Optional replacement of one attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Update<T> {
    /// Whether to replace
    pub set: bool,
    /// Replacement value (ignored when unset)
    pub value: T,
}

impl<T> Update<T> {
    /// Replace with `value`
    pub fn set(value: T) -> Self {
        Self { set: true, value }
    }

    /// Leave unchanged, carrying a placeholder value
    pub fn unset_with(value: T) -> Self {
        Self { set: false, value }
    }

    /// New value given the current one
    pub fn apply(&self, current: T) -> T
    where
        T: Clone,
    {
        if self.set {
            self.value.clone()
        } else {
            current
        }
    }

    fn to_fields(&self, pack: impl Fn(&T) -> Vec<Field>) -> Vec<Field> {
        let mut fields = vec![Field::from_bool(self.set)];
        fields.extend(pack(&self.value));
        fields
    }
}

impl<T: Default> Update<T> {
    /// Leave unchanged
    pub fn unset() -> Self {
        Self::unset_with(T::default())
    }
}

impl<T: Default> Default for Update<T> {
    fn default() -> Self {
        Self::unset()
    }
}

/// Token-use flags; at most one may be set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MayUseToken {
    /// Operate in the parent's own token
    pub parents_own_token: bool,
    /// Inherit the parent's token permission
    pub inherit_from_parent: bool,
}

impl MayUseToken {
    /// No token use
    pub const NO: MayUseToken = MayUseToken {
        parents_own_token: false,
        inherit_from_parent: false,
    };
    /// Parent's own token
    pub const PARENTS_OWN_TOKEN: MayUseToken = MayUseToken {
        parents_own_token: true,
        inherit_from_parent: false,
    };
    /// Inherited from parent
    pub const INHERIT_FROM_PARENT: MayUseToken = MayUseToken {
        parents_own_token: false,
        inherit_from_parent: true,
    };

    /// At most one flag set
    pub fn is_valid(&self) -> bool {
        !(self.parents_own_token && self.inherit_from_parent)
    }
}

/// Per-attribute replacements
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountUpdates {
    /// Per-field state writes, generic layout
    pub state: [Update<Field>; MAX_ZKAPP_STATE_FIELDS],
    /// Delegate
    pub delegate: Update<PublicKey>,
    /// Verification key
    pub verification_key: Update<VerificationKey>,
    /// Permissions
    pub permissions: Update<Permissions>,
    /// zkApp URI
    pub zkapp_uri: Update<ZkappUri>,
    /// Token symbol
    pub token_symbol: Update<TokenSymbol>,
    /// Timing
    pub timing: Update<AccountTiming>,
    /// Voting target
    pub voting_for: Update<Field>,
}

impl AccountUpdates {
    /// Any state field written
    pub fn any_state_set(&self) -> bool {
        self.state.iter().any(|u| u.set)
    }

    /// Every state field written
    pub fn all_state_set(&self) -> bool {
        self.state.iter().all(|u| u.set)
    }

    fn to_fields(&self) -> Vec<Field> {
        let mut fields = Vec::new();
        for update in &self.state {
            fields.extend(update.to_fields(|v| vec![*v]));
        }
        fields.extend(self.delegate.to_fields(|v| vec![v.to_field()]));
        fields.extend(self.verification_key.to_fields(|v| vec![v.hash]));
        fields.extend(self.permissions.to_fields(Permissions::to_fields));
        fields.extend(self.zkapp_uri.to_fields(|v| vec![v.to_field()]));
        fields.extend(self.token_symbol.to_fields(|v| vec![v.to_field()]));
        fields.extend(self.timing.to_fields(AccountTiming::to_fields));
        fields.extend(self.voting_for.to_fields(|v| vec![*v]));
        fields
    }
}

/// Account update without identity or program binding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextFreeAccountUpdate {
    /// Declared authorization
    pub authorization_kind: AuthorizationKind,
    /// Guards
    pub preconditions: Preconditions,
    /// Signed balance change
    pub balance_change: SignedAmount,
    /// Bump the nonce
    pub increment_nonce: bool,
    /// Sign the full transaction commitment
    pub use_full_commitment: bool,
    /// Deduct the creation fee from this update's balance change
    pub implicit_account_creation_fee: bool,
    /// Token-use flags
    pub may_use_token: MayUseToken,
    /// Events emitted
    pub push_events: GenericCommittedList,
    /// Actions dispatched
    pub push_actions: GenericCommittedList,
    /// Attribute replacements
    pub updates: AccountUpdates,
}

impl Default for ContextFreeAccountUpdate {
    fn default() -> Self {
        Self {
            authorization_kind: AuthorizationKind::NONE,
            preconditions: Preconditions::default(),
            balance_change: SignedAmount::ZERO,
            increment_nonce: false,
            use_full_commitment: false,
            implicit_account_creation_fee: false,
            may_use_token: MayUseToken::NO,
            push_events: GenericCommittedList::empty(ListKind::Events),
            push_actions: GenericCommittedList::empty(ListKind::Actions),
            updates: AccountUpdates::default(),
        }
    }
}

/// Proof attachment status of an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProofState {
    /// No proof produced yet
    #[default]
    Pending,
    /// Proof produced by the external prover
    Provided(ProofRef),
}

/// Account update bound to an account and a program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUpdate {
    /// Target account
    pub account_id: AccountId,
    /// Program the update was built against
    #[serde(default)]
    pub verification_key_hash: Field,
    /// Caller-supplied data bound into the commitment
    #[serde(default)]
    pub call_data: Field,
    /// Update body
    #[serde(flatten)]
    pub body: ContextFreeAccountUpdate,
    /// Proof attachment, not part of the commitment
    #[serde(default)]
    pub proof: ProofState,
}

impl AccountUpdate {
    /// No-op update of `account_id` against the placeholder program
    pub fn new(account_id: AccountId) -> Self {
        Self::from_context_free(
            account_id,
            VerificationKey::dummy().hash,
            ContextFreeAccountUpdate::default(),
        )
    }

    /// Bind a context-free body to an account and program
    pub fn from_context_free(
        account_id: AccountId,
        verification_key_hash: Field,
        body: ContextFreeAccountUpdate,
    ) -> Self {
        Self {
            account_id,
            verification_key_hash,
            call_data: Field::ZERO,
            body,
            proof: ProofState::Pending,
        }
    }

    /// Set declared authorization
    pub fn with_authorization_kind(mut self, kind: AuthorizationKind) -> Self {
        self.body.authorization_kind = kind;
        self
    }

    /// Set balance change
    pub fn with_balance_change(mut self, change: SignedAmount) -> Self {
        self.body.balance_change = change;
        self
    }

    /// Bump the nonce
    pub fn with_increment_nonce(mut self) -> Self {
        self.body.increment_nonce = true;
        self
    }

    /// Sign the full transaction commitment
    pub fn with_full_commitment(mut self) -> Self {
        self.body.use_full_commitment = true;
        self
    }

    /// Pay the creation fee out of this update's balance change
    pub fn with_implicit_account_creation_fee(mut self) -> Self {
        self.body.implicit_account_creation_fee = true;
        self
    }

    /// Set token-use flags
    pub fn with_may_use_token(mut self, may_use_token: MayUseToken) -> Self {
        self.body.may_use_token = may_use_token;
        self
    }

    /// Edit preconditions in place
    pub fn with_preconditions(mut self, f: impl FnOnce(&mut Preconditions)) -> Self {
        f(&mut self.body.preconditions);
        self
    }

    /// Edit attribute replacements in place
    pub fn with_updates(mut self, f: impl FnOnce(&mut AccountUpdates)) -> Self {
        f(&mut self.body.updates);
        self
    }

    /// Write one state field
    pub fn with_state(mut self, index: usize, value: Field) -> Result<Self> {
        let slot = self.body.updates.state.get_mut(index).ok_or_else(|| {
            Error::InvalidInput(format!(
                "state index {} out of range, only {} fields",
                index, MAX_ZKAPP_STATE_FIELDS
            ))
        })?;
        *slot = Update::set(value);
        Ok(self)
    }

    /// Write state through a typed layout, one update per layout entry
    ///
    /// Replaces every per-field state update.
    pub fn with_typed_state(
        mut self,
        layout: &StateLayout,
        updates: &[Update<StateValue>],
    ) -> Result<Self> {
        self.body.updates.state = layout.updates_to_generic(updates)?;
        Ok(self)
    }

    /// Guard state through a typed layout, one guard per layout entry
    pub fn with_typed_state_preconditions(
        mut self,
        layout: &StateLayout,
        guards: &[Equals<StateValue>],
    ) -> Result<Self> {
        self.body.preconditions.account.state = layout.preconditions_to_generic(guards)?;
        Ok(self)
    }

    /// Emit an event
    pub fn with_event(mut self, fields: Vec<Field>) -> Self {
        self.body.push_events.push(fields);
        self
    }

    /// Dispatch an action
    pub fn with_action(mut self, fields: Vec<Field>) -> Self {
        self.body.push_actions.push(fields);
        self
    }

    /// Set call data
    pub fn with_call_data(mut self, call_data: Field) -> Self {
        self.call_data = call_data;
        self
    }

    /// Attach a proof
    pub fn with_proof(mut self, proof: ProofRef) -> Self {
        self.proof = ProofState::Provided(proof);
        self
    }

    /// Packed body, the input of [`AccountUpdate::commitment`]
    pub fn to_fields(&self, hasher: &dyn Hasher) -> Vec<Field> {
        let body = &self.body;
        let mut fields = vec![self.account_id.public_key.to_field(), self.account_id.token_id.0];
        fields.extend(body.updates.to_fields());
        fields.extend(body.balance_change.to_fields());
        fields.push(Field::from_bool(body.increment_nonce));
        fields.push(body.push_events.generic_hash(hasher));
        fields.push(body.push_actions.generic_hash(hasher));
        fields.push(self.call_data);
        fields.extend(body.preconditions.to_fields());
        fields.push(Field::from_bool(body.use_full_commitment));
        fields.push(Field::from_bool(body.implicit_account_creation_fee));
        fields.push(Field::from_bool(body.may_use_token.parents_own_token));
        fields.push(Field::from_bool(body.may_use_token.inherit_from_parent));
        fields.push(Field::from_bool(body.authorization_kind.is_signed));
        fields.push(Field::from_bool(body.authorization_kind.is_proved));
        fields.push(self.verification_key_hash);
        fields
    }

    /// Commitment of this update alone
    pub fn commitment(&self, hasher: &dyn Hasher, network: NetworkId) -> Field {
        hasher.hash(network.body_prefix(), &self.to_fields(hasher))
    }
}

/// Authorization payload attached to an update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthorizationPayload {
    /// Signature over the relevant commitment
    pub signature: Option<Signature>,
    /// Proof reference
    pub proof: Option<ProofRef>,
}

/// Update paired with its authorization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorized {
    /// The update
    pub update: AccountUpdate,
    /// Its authorization
    pub authorization: AuthorizationPayload,
}

impl Authorized {
    /// Pair an update with its authorization
    pub fn new(update: AccountUpdate, authorization: AuthorizationPayload) -> Self {
        Self {
            update,
            authorization,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Sha256Hasher;
    use crate::precondition::InRange;
    use crate::state::StateValueType;

    fn id() -> AccountId {
        AccountId::mina(PublicKey::from_bytes([9u8; 32]))
    }

    #[test]
    fn test_defaults() {
        let update = AccountUpdate::new(id());
        assert_eq!(update.body.authorization_kind, AuthorizationKind::NONE);
        assert!(update.body.balance_change.is_zero());
        assert!(!update.body.increment_nonce);
        assert!(update.body.push_events.is_empty());
        assert!(!update.body.updates.any_state_set());
        assert_eq!(update.body.preconditions, Preconditions::default());
    }

    #[test]
    fn test_update_apply() {
        assert_eq!(Update::set(5u64).apply(1), 5);
        assert_eq!(Update::<u64>::unset().apply(1), 1);
    }

    #[test]
    fn test_with_state_out_of_range_rejected() {
        let result = AccountUpdate::new(id()).with_state(MAX_ZKAPP_STATE_FIELDS, Field::from_u64(1));
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        let update = AccountUpdate::new(id()).with_state(7, Field::from_u64(1)).unwrap();
        assert!(update.body.updates.any_state_set());
    }

    #[test]
    fn test_typed_state_fills_generic_fields() {
        let layout = StateLayout::custom(vec![
            ("count".to_string(), StateValueType::U32),
            ("open".to_string(), StateValueType::Bool),
        ])
        .unwrap();
        let update = AccountUpdate::new(id())
            .with_typed_state(
                &layout,
                &[
                    Update::set(StateValue::U32(3)),
                    Update::unset_with(StateValue::Bool(false)),
                ],
            )
            .unwrap()
            .with_typed_state_preconditions(
                &layout,
                &[Equals::Disabled, Equals::equals(StateValue::Bool(true))],
            )
            .unwrap();

        assert_eq!(update.body.updates.state[0], Update::set(Field::from_u64(3)));
        assert!(!update.body.updates.state[1].set);
        assert_eq!(update.body.preconditions.account.state[0], Equals::Disabled);
        assert_eq!(update.body.preconditions.account.state[1], Equals::Enabled(Field::from_u64(1)));

        // one entry per layout entry
        let short = AccountUpdate::new(id()).with_typed_state(&layout, &[Update::set(StateValue::U32(3))]);
        assert!(short.is_err());
    }

    #[test]
    fn test_commitment_binds_content() {
        let h = Sha256Hasher;
        let base = AccountUpdate::new(id());
        let c0 = base.commitment(&h, NetworkId::Testnet);

        let changed = base.clone().with_preconditions(|p| p.account.nonce = InRange::exactly(1));
        assert_ne!(changed.commitment(&h, NetworkId::Testnet), c0);

        let with_action = base.clone().with_action(vec![Field::from_u64(1)]);
        assert_ne!(with_action.commitment(&h, NetworkId::Testnet), c0);

        assert_ne!(base.commitment(&h, NetworkId::Mainnet), c0);
    }

    #[test]
    fn test_proof_not_committed() {
        let h = Sha256Hasher;
        let base = AccountUpdate::new(id());
        let proved = base.clone().with_proof(ProofRef(Field::from_u64(3)));
        assert_eq!(
            base.commitment(&h, NetworkId::Testnet),
            proved.commitment(&h, NetworkId::Testnet)
        );
    }

    #[test]
    fn test_may_use_token_validity() {
        assert!(MayUseToken::NO.is_valid());
        assert!(MayUseToken::INHERIT_FROM_PARENT.is_valid());
        let both = MayUseToken {
            parents_own_token: true,
            inherit_from_parent: true,
        };
        assert!(!both.is_valid());
    }

    #[test]
    fn test_json_roundtrip() {
        let update = AccountUpdate::new(id())
            .with_balance_change(SignedAmount::negative(5))
            .with_state(0, Field::from_u64(5))
            .unwrap();
        let json = serde_json::to_string(&update).unwrap();
        let back: AccountUpdate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, update);
    }
}
