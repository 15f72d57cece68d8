//! State-transition engine
//!
//! Decides whether one account update is admissible against an account and
//! a chain snapshot, and computes the resulting account and fee excess.
//! Checks never short-circuit: every finding is collected into one error
//! list, then folded into [`ApplyResult::Applied`] or [`ApplyResult::Failed`].
//!
//! The engine is pure. It reads its inputs by reference and returns new
//! values; committing the result is the caller's decision.

use crate::account::Account;
use crate::account_update::AccountUpdate;
use crate::authorization::{PermissionAspect, Permissions};
use crate::chain::{ChainView, EpochData};
use crate::config::Config;
use crate::error::ApplyError;
use crate::hash::Hasher;
use crate::metrics::Metrics;
use crate::precondition::{Bounded, EpochDataPreconditions, Equals, InRange, Preconditions};
use crate::transaction::FeePayer;
use crate::types::SignedAmount;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;

/// Running value-conservation accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeExcess {
    /// Representable running total
    Alive(SignedAmount),
    /// Overflowed; terminal for the transaction
    Dead,
}

impl FeeExcess {
    /// Fresh accumulator
    pub fn zero() -> Self {
        FeeExcess::Alive(SignedAmount::ZERO)
    }

    /// Current total, if alive
    pub fn value(&self) -> Option<SignedAmount> {
        match self {
            FeeExcess::Alive(v) => Some(*v),
            FeeExcess::Dead => None,
        }
    }

    /// Whether the accumulator is dead
    pub fn is_dead(&self) -> bool {
        matches!(self, FeeExcess::Dead)
    }

    /// Add `delta`; an unrepresentable result kills the accumulator
    pub fn accumulate(self, delta: SignedAmount, errors: &mut Vec<ApplyError>) -> Self {
        match self {
            FeeExcess::Dead => FeeExcess::Dead,
            FeeExcess::Alive(total) => match total.checked_add(delta) {
                Some(next) => FeeExcess::Alive(next),
                None => {
                    let direction = if delta.is_negative() { "underflowed" } else { "overflowed" };
                    errors.push(ApplyError::FeeExcessOverflow(direction.to_string()));
                    FeeExcess::Dead
                }
            },
        }
    }
}

impl Default for FeeExcess {
    fn default() -> Self {
        Self::zero()
    }
}

/// Outcome of checking and applying one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyResult {
    /// Admissible; carries the post-update account and accumulator
    Applied {
        /// Post-update account
        account: Account,
        /// Post-update accumulator
        fee_excess: FeeExcess,
    },
    /// Inadmissible; nothing is to be committed
    Failed {
        /// Every finding, in check order
        errors: Vec<ApplyError>,
        /// Accumulator to carry forward: the input unchanged, or `Dead`
        /// when this update overflowed it
        fee_excess: FeeExcess,
    },
}

impl ApplyResult {
    /// Whether the update was applied
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyResult::Applied { .. })
    }

    /// Findings of a failed update (empty when applied)
    pub fn errors(&self) -> &[ApplyError] {
        match self {
            ApplyResult::Applied { .. } => &[],
            ApplyResult::Failed { errors, .. } => errors,
        }
    }
}

/// Account-update engine
#[derive(Debug, Clone)]
pub struct Engine {
    config: Config,
    hasher: Arc<dyn Hasher>,
    metrics: Option<Metrics>,
}

impl Engine {
    /// Engine using the configured hasher
    pub fn new(config: Config) -> crate::Result<Self> {
        let metrics = if config.metrics_enabled {
            Some(Metrics::new()?)
        } else {
            None
        };
        let hasher = config.hasher.build();
        Ok(Self {
            config,
            hasher,
            metrics,
        })
    }

    /// Engine with an explicit hasher
    pub fn with_hasher(config: Config, hasher: Arc<dyn Hasher>) -> Self {
        Self {
            config,
            hasher,
            metrics: None,
        }
    }

    /// Attach a metrics collector
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Hasher
    pub fn hasher(&self) -> &dyn Hasher {
        self.hasher.as_ref()
    }

    /// Metrics collector, if enabled
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Check `update` against `account` and `chain`, and compute its effect
    pub fn check_and_apply_account_update(
        &self,
        chain: &ChainView,
        account: &Account,
        update: &AccountUpdate,
        fee_excess: FeeExcess,
    ) -> ApplyResult {
        let mut errors = Vec::new();

        // 1. Identity
        if account.account_id != update.account_id {
            errors.push(ApplyError::AccountIdMismatch);
        }

        // 2. Verification-key binding
        if account.zkapp.verification_key.hash != update.verification_key_hash {
            errors.push(ApplyError::VerificationKeyMismatch {
                account: account.zkapp.verification_key.hash,
                update: update.verification_key_hash,
            });
        }

        if !update.body.may_use_token.is_valid() {
            errors.push(ApplyError::InvalidMayUseToken);
        }

        // 3. Preconditions
        check_preconditions(chain, account, &update.body.preconditions, &mut errors);

        // 4. Permissions
        check_permissions(&account.permissions, update, &mut errors);

        // 5. Value application
        let (updated_account, updated_fee_excess) =
            self.apply_updates(chain, account, update, fee_excess, &mut errors);

        // 6. Timing, on the post-update account
        let minimum = updated_account.minimum_balance_at_slot(chain.global_slot_since_genesis);
        if updated_account.balance < minimum {
            errors.push(ApplyError::InsufficientMinimumBalance {
                balance: updated_account.balance,
                minimum,
            });
        }

        // 7. Fold
        if errors.is_empty() {
            tracing::debug!(account = %update.account_id, "account update applied");
            ApplyResult::Applied {
                account: updated_account,
                fee_excess: updated_fee_excess,
            }
        } else {
            tracing::debug!(
                account = %update.account_id,
                error_count = errors.len(),
                "account update failed"
            );
            // an overflow is terminal even though the update is rejected
            let fee_excess = if updated_fee_excess.is_dead() {
                FeeExcess::Dead
            } else {
                fee_excess
            };
            ApplyResult::Failed { errors, fee_excess }
        }
    }

    /// Check and apply the fee payment of a command
    ///
    /// The fee excess of the synthetic update is consumed here and never
    /// carried into the caller's running total.
    pub fn check_and_apply_fee_payment(
        &self,
        chain: &ChainView,
        account: &Account,
        fee_payer: &FeePayer,
    ) -> std::result::Result<Account, Vec<ApplyError>> {
        let update = fee_payer.to_account_update();
        match self.check_and_apply_account_update(chain, account, &update, FeeExcess::zero()) {
            ApplyResult::Applied { account, .. } => Ok(account),
            ApplyResult::Failed { errors, .. } => Err(errors),
        }
    }

    fn apply_updates(
        &self,
        chain: &ChainView,
        account: &Account,
        update: &AccountUpdate,
        mut fee_excess: FeeExcess,
        errors: &mut Vec<ApplyError>,
    ) -> (Account, FeeExcess) {
        let body = &update.body;
        let mut balance_change = body.balance_change;

        if account.is_new {
            let creation_fee = SignedAmount::negative(self.config.protocol.account_creation_fee);
            fee_excess = fee_excess.accumulate(creation_fee, errors);

            if body.implicit_account_creation_fee {
                match balance_change.checked_add(creation_fee) {
                    Some(change) => balance_change = change,
                    None => errors.push(ApplyError::CreationFeeUnderflow),
                }
            }
        }

        // value leaving the account enters the accumulator and vice versa
        fee_excess = fee_excess.accumulate(balance_change.negate(), errors);

        let balance = match SignedAmount::positive(account.balance).checked_add(balance_change) {
            None => {
                errors.push(ApplyError::BalanceOverflow);
                account.balance
            }
            Some(b) if b.is_negative() => {
                errors.push(ApplyError::NegativeBalance);
                account.balance
            }
            Some(b) => b.magnitude,
        };

        let nonce = if body.increment_nonce {
            account.nonce.checked_add(1).unwrap_or_else(|| {
                errors.push(ApplyError::NonceOverflow);
                account.nonce
            })
        } else {
            account.nonce
        };

        let updates = &body.updates;
        let mut updated = account.clone();
        updated.is_new = false;
        updated.balance = balance;
        updated.nonce = nonce;
        updated.token_symbol = updates.token_symbol.apply(account.token_symbol.clone());
        updated.delegate = if updates.delegate.set {
            Some(updates.delegate.value)
        } else {
            account.delegate
        };
        updated.voting_for = updates.voting_for.apply(account.voting_for);
        updated.timing = updates.timing.apply(account.timing);
        updated.permissions = updates.permissions.apply(account.permissions);

        let zkapp = &mut updated.zkapp;
        for (slot, state_update) in zkapp.state.iter_mut().zip(updates.state.iter()) {
            *slot = state_update.apply(*slot);
        }
        zkapp.verification_key = updates
            .verification_key
            .apply(account.zkapp.verification_key.clone());
        zkapp.zkapp_uri = updates.zkapp_uri.apply(account.zkapp.zkapp_uri.clone());
        zkapp.is_proven = account.zkapp.is_proven || updates.all_state_set();
        if !body.push_actions.is_empty() {
            let actions_hash = body.push_actions.generic_hash(self.hasher());
            zkapp.push_actions(actions_hash, chain.global_slot_since_genesis, self.hasher());
        }

        (updated, fee_excess)
    }
}

fn check_equals<T: PartialEq + Display>(
    errors: &mut Vec<ApplyError>,
    name: &str,
    guard: &Equals<T>,
    value: &T,
) {
    if !guard.is_satisfied(value) {
        errors.push(ApplyError::PreconditionFailed {
            name: name.to_string(),
            value: value.to_string(),
            constraint: guard.describe(),
        });
    }
}

fn check_range<T: Bounded>(
    errors: &mut Vec<ApplyError>,
    name: &str,
    guard: &InRange<T>,
    value: &T,
) {
    if !guard.is_satisfied(value) {
        errors.push(ApplyError::PreconditionFailed {
            name: name.to_string(),
            value: value.to_string(),
            constraint: guard.describe(),
        });
    }
}

fn check_epoch_data(
    errors: &mut Vec<ApplyError>,
    name: &str,
    guards: &EpochDataPreconditions,
    data: &EpochData,
) {
    check_equals(errors, &format!("{}.seed", name), &guards.seed, &data.seed);
    check_equals(
        errors,
        &format!("{}.startCheckpoint", name),
        &guards.start_checkpoint,
        &data.start_checkpoint,
    );
    check_equals(
        errors,
        &format!("{}.lockCheckpoint", name),
        &guards.lock_checkpoint,
        &data.lock_checkpoint,
    );
    check_range(
        errors,
        &format!("{}.epochLength", name),
        &guards.epoch_length,
        &data.epoch_length,
    );
    check_equals(
        errors,
        &format!("{}.ledger.hash", name),
        &guards.ledger.hash,
        &data.ledger.hash,
    );
    check_range(
        errors,
        &format!("{}.ledger.totalCurrency", name),
        &guards.ledger.total_currency,
        &data.ledger.total_currency,
    );
}

fn check_preconditions(
    chain: &ChainView,
    account: &Account,
    preconditions: &Preconditions,
    errors: &mut Vec<ApplyError>,
) {
    let guards = &preconditions.account;

    check_range(errors, "balance", &guards.balance, &account.balance);
    check_range(errors, "nonce", &guards.nonce, &account.nonce);
    check_equals(
        errors,
        "receiptChainHash",
        &guards.receipt_chain_hash,
        &account.receipt_chain_hash,
    );
    // an account without a delegate satisfies any delegate guard
    if let Some(delegate) = &account.delegate {
        check_equals(errors, "delegate", &guards.delegate, delegate);
    }
    check_equals(errors, "isProven", &guards.is_proven, &account.zkapp.is_proven);
    check_equals(errors, "isNew", &guards.is_new, &account.is_new);

    for (i, (guard, value)) in guards.state.iter().zip(account.zkapp.state.iter()).enumerate() {
        check_equals(errors, &format!("state[{}]", i), guard, value);
    }

    // matches any retained checkpoint
    let ring = &account.zkapp.action_state;
    if !ring.iter().any(|s| guards.action_state.is_satisfied(s)) {
        let retained: Vec<String> = ring.iter().map(|s| s.to_string()).collect();
        errors.push(ApplyError::PreconditionFailed {
            name: "actionState".to_string(),
            value: format!("[{}]", retained.join(", ")),
            constraint: guards.action_state.describe(),
        });
    }

    check_range(
        errors,
        "validWhile",
        &preconditions.valid_while,
        &chain.global_slot_since_genesis,
    );

    let network = &preconditions.network;
    check_equals(
        errors,
        "snarkedLedgerHash",
        &network.snarked_ledger_hash,
        &chain.snarked_ledger_hash,
    );
    check_range(
        errors,
        "blockchainLength",
        &network.blockchain_length,
        &chain.blockchain_length,
    );
    check_range(
        errors,
        "minWindowDensity",
        &network.min_window_density,
        &chain.min_window_density,
    );
    check_range(errors, "totalCurrency", &network.total_currency, &chain.total_currency);
    check_range(
        errors,
        "globalSlotSinceGenesis",
        &network.global_slot_since_genesis,
        &chain.global_slot_since_genesis,
    );
    check_epoch_data(
        errors,
        "stakingEpochData",
        &network.staking_epoch_data,
        &chain.staking_epoch_data,
    );
    check_epoch_data(
        errors,
        "nextEpochData",
        &network.next_epoch_data,
        &chain.next_epoch_data,
    );
}

fn check_permissions(
    permissions: &Permissions,
    update: &AccountUpdate,
    errors: &mut Vec<ApplyError>,
) {
    let body = &update.body;
    let updates = &body.updates;
    let kind = body.authorization_kind;

    let acted_upon = [
        (PermissionAspect::Access, true),
        (PermissionAspect::Send, body.balance_change.is_negative()),
        (PermissionAspect::Receive, body.balance_change.is_positive()),
        (PermissionAspect::IncrementNonce, body.increment_nonce),
        (PermissionAspect::SetDelegate, updates.delegate.set),
        (PermissionAspect::SetPermissions, updates.permissions.set),
        (PermissionAspect::SetVerificationKey, updates.verification_key.set),
        (PermissionAspect::SetZkappUri, updates.zkapp_uri.set),
        (PermissionAspect::SetTokenSymbol, updates.token_symbol.set),
        (PermissionAspect::SetVotingFor, updates.voting_for.set),
        (PermissionAspect::SetTiming, updates.timing.set),
        (PermissionAspect::EditActionState, !body.push_actions.is_empty()),
        (PermissionAspect::EditState, updates.any_state_set()),
    ];

    for (aspect, acted) in acted_upon {
        let required = permissions.required(aspect);
        if acted && !required.is_satisfied(kind) {
            tracing::trace!(%aspect, %kind, %required, "permission violated");
            errors.push(ApplyError::PermissionViolated {
                aspect,
                kind,
                required,
            });
        }
    }
}
