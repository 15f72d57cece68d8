//! zkApp command construction and authorization
//!
//! [`ZkappCommandContext`] walks account-update trees in pre-order against
//! a ledger view, applying each update through the [`Engine`] and recording
//! a parallel trace. [`create_unsigned_zkapp_command`] wraps a context with
//! the fee payment and the final fee-excess check, and commits to the
//! caller's ledger only when nothing failed.

use crate::account_update::{AccountUpdate, AuthorizationPayload, Authorized, ProofState};
use crate::authorization::AuthorizationKind;
use crate::chain::ChainView;
use crate::config::{ChildFailurePolicy, NetworkId};
use crate::crypto::{verify_signature, Authorizer};
use crate::engine::{ApplyResult, Engine, FeeExcess};
use crate::error::ApplyError;
use crate::hash::{prefixes, Hasher};
use crate::ledger::{AccountIdSet, LedgerView};
use crate::precondition::InRange;
use crate::trace::{AccountUpdateTrace, CallSite, ZkappCommandErrorTrace};
use crate::tree::{hash_forest, AccountUpdateForest, AccountUpdateTree};
use crate::types::{AccountId, Field, PublicKey, Signature, SignedAmount};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum memo length in bytes
pub const MAX_MEMO_LENGTH: usize = 32;

/// Fee payment of a zkApp command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePayer {
    /// Paying account (default token)
    pub public_key: PublicKey,
    /// Fee in the smallest unit
    pub fee: u64,
    /// Last slot the command is valid in
    #[serde(default)]
    pub valid_until: Option<u32>,
    /// Expected nonce of the paying account
    #[serde(default)]
    pub nonce: u32,
}

impl FeePayer {
    /// Fee payment without an expiry
    pub fn new(public_key: PublicKey, fee: u64, nonce: u32) -> Self {
        Self {
            public_key,
            fee,
            valid_until: None,
            nonce,
        }
    }

    /// Expire after `slot`
    pub fn with_valid_until(mut self, slot: u32) -> Self {
        self.valid_until = Some(slot);
        self
    }

    /// Paying account id
    pub fn account_id(&self) -> AccountId {
        AccountId::mina(self.public_key)
    }

    /// Synthetic signature-authorized update that pays the fee
    pub fn to_account_update(&self) -> AccountUpdate {
        let nonce = self.nonce;
        let valid_until = self.valid_until.unwrap_or(u32::MAX);
        AccountUpdate::new(self.account_id())
            .with_authorization_kind(AuthorizationKind::SIGNATURE)
            .with_balance_change(SignedAmount::negative(self.fee))
            .with_increment_nonce()
            .with_full_commitment()
            .with_implicit_account_creation_fee()
            .with_preconditions(|p| {
                p.account.nonce = InRange::exactly(nonce);
                p.valid_while = InRange::between(0, valid_until);
            })
    }
}

/// Transaction memo, at most [`MAX_MEMO_LENGTH`] bytes
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Memo(String);

impl Memo {
    /// Validate and wrap a memo
    pub fn new(memo: impl Into<String>) -> Result<Self> {
        let memo = memo.into();
        if memo.len() > MAX_MEMO_LENGTH {
            return Err(Error::InvalidInput(format!(
                "memo is {} bytes, at most {} allowed",
                memo.len(),
                MAX_MEMO_LENGTH
            )));
        }
        Ok(Self(memo))
    }

    /// Memo text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Commitment of the memo
    pub fn hash(&self, hasher: &dyn Hasher) -> Field {
        let mut bytes = [0u8; 32];
        bytes[..self.0.len()].copy_from_slice(self.0.as_bytes());
        hasher.hash(
            prefixes::MEMO,
            &[Field::from_u64(self.0.len() as u64), Field::from_bytes(bytes)],
        )
    }
}

impl TryFrom<String> for Memo {
    type Error = Error;

    fn try_from(memo: String) -> Result<Self> {
        Memo::new(memo)
    }
}

impl From<Memo> for String {
    fn from(memo: Memo) -> Self {
        memo.0
    }
}

impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of finalizing a context
#[derive(Debug, Clone)]
pub struct FinalizedForest {
    /// Every added tree, in order
    pub forest: AccountUpdateForest<AccountUpdate>,
    /// One trace per added tree
    pub traces: Vec<AccountUpdateTrace>,
    /// Transaction-level findings
    pub general_errors: Vec<ApplyError>,
}

/// Mutable environment account updates are added to
///
/// Holds exclusive access to the ledger view for its lifetime.
pub struct ZkappCommandContext<'a, L: LedgerView> {
    ledger: &'a mut L,
    chain: &'a ChainView,
    engine: &'a Engine,
    failed_accounts: AccountIdSet,
    fee_excess: FeeExcess,
    forest: AccountUpdateForest<AccountUpdate>,
    traces: Vec<AccountUpdateTrace>,
}

impl<L: LedgerView> fmt::Debug for ZkappCommandContext<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZkappCommandContext")
            .field("failed_accounts", &self.failed_accounts)
            .field("fee_excess", &self.fee_excess)
            .field("trees", &self.forest.len())
            .finish()
    }
}

impl<'a, L: LedgerView> ZkappCommandContext<'a, L> {
    /// Fresh context with no failed accounts
    pub fn new(ledger: &'a mut L, chain: &'a ChainView, engine: &'a Engine) -> Self {
        Self::with_failed_accounts(ledger, chain, engine, AccountIdSet::new())
    }

    /// Context that treats `failed_accounts` as already failed
    pub fn with_failed_accounts(
        ledger: &'a mut L,
        chain: &'a ChainView,
        engine: &'a Engine,
        failed_accounts: AccountIdSet,
    ) -> Self {
        Self {
            ledger,
            chain,
            engine,
            failed_accounts,
            fee_excess: FeeExcess::zero(),
            forest: Vec::new(),
            traces: Vec::new(),
        }
    }

    /// Ledger as seen by the next update
    pub fn ledger(&self) -> &L {
        &*self.ledger
    }

    /// Running fee excess
    pub fn fee_excess(&self) -> FeeExcess {
        self.fee_excess
    }

    /// Accounts that failed so far
    pub fn failed_accounts(&self) -> &AccountIdSet {
        &self.failed_accounts
    }

    /// Add an update or a tree of updates
    #[track_caller]
    pub fn add(&mut self, update: impl Into<AccountUpdateTree<AccountUpdate>>) {
        self.add_tree(update.into());
    }

    /// Add a tree of updates, applying it in pre-order
    #[track_caller]
    pub fn add_tree(&mut self, tree: AccountUpdateTree<AccountUpdate>) {
        let call_site = CallSite::caller();
        let trace = self.apply_tree(&tree, call_site, false);
        self.forest.push(tree);
        self.traces.push(trace);
    }

    /// Record a tree already applied to the ledger elsewhere
    ///
    /// The trace must have the same shape as the tree.
    pub fn add_without_applying(
        &mut self,
        tree: AccountUpdateTree<AccountUpdate>,
        trace: AccountUpdateTrace,
    ) -> Result<()> {
        if !trace.matches_shape(&tree) {
            return Err(Error::InvalidInput(
                "trace shape does not match account update tree".to_string(),
            ));
        }
        self.forest.push(tree);
        self.traces.push(trace);
        Ok(())
    }

    /// Close the context and run the transaction-level checks
    pub fn finalize(self) -> FinalizedForest {
        let mut general_errors = Vec::new();
        match self.fee_excess {
            FeeExcess::Dead => general_errors.push(ApplyError::FeeExcessUnavailable),
            FeeExcess::Alive(excess) if !excess.is_zero() => {
                general_errors.push(ApplyError::FeeExcessNonZero(excess))
            }
            FeeExcess::Alive(_) => {}
        }

        FinalizedForest {
            forest: self.forest,
            traces: self.traces,
            general_errors,
        }
    }

    fn apply_tree(
        &mut self,
        tree: &AccountUpdateTree<AccountUpdate>,
        call_site: CallSite,
        ancestor_failed: bool,
    ) -> AccountUpdateTrace {
        let update = &tree.root;
        let account_id = update.account_id;
        let skip_descendants =
            self.engine.config().child_failure_policy == ChildFailurePolicy::SkipDescendants;

        let errors = if ancestor_failed && skip_descendants {
            self.record_skipped(&account_id);
            vec![ApplyError::SkippedAncestorFailed]
        } else if self.failed_accounts.has(&account_id) {
            self.record_skipped(&account_id);
            vec![ApplyError::Skipped]
        } else {
            self.apply_update(update)
        };

        let failed = ancestor_failed || !errors.is_empty();
        let child_traces = tree
            .children
            .iter()
            .map(|child| self.apply_tree(child, call_site, failed))
            .collect();

        AccountUpdateTrace {
            account_id,
            call_site,
            errors,
            child_traces,
        }
    }

    fn apply_update(&mut self, update: &AccountUpdate) -> Vec<ApplyError> {
        let account = self.ledger.get(&update.account_id);
        match self
            .engine
            .check_and_apply_account_update(self.chain, &account, update, self.fee_excess)
        {
            ApplyResult::Applied {
                account,
                fee_excess,
            } => {
                self.ledger.set(account);
                self.fee_excess = fee_excess;
                if let Some(metrics) = self.engine.metrics() {
                    metrics.record_applied();
                }
                Vec::new()
            }
            ApplyResult::Failed { errors, fee_excess } => {
                self.failed_accounts.add(update.account_id);
                self.fee_excess = fee_excess;
                if let Some(metrics) = self.engine.metrics() {
                    metrics.record_failed(errors.len());
                }
                errors
            }
        }
    }

    fn record_skipped(&self, account_id: &AccountId) {
        tracing::debug!(account = %account_id, "skipping account update");
        if let Some(metrics) = self.engine.metrics() {
            metrics.record_skipped();
        }
    }
}

/// Forest and full-transaction commitments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitments {
    /// Commitment of the account-update forest
    pub forest: Field,
    /// Commitment binding memo, fee payer and forest
    pub full: Field,
}

/// Unsigned zkApp command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZkappCommand {
    /// Fee payment
    pub fee_payer: FeePayer,
    /// Account-update forest
    pub forest: AccountUpdateForest<AccountUpdate>,
    /// Memo
    #[serde(default)]
    pub memo: Memo,
}

impl ZkappCommand {
    /// Forest and full commitments under `network`
    pub fn commitments(&self, hasher: &dyn Hasher, network: NetworkId) -> Commitments {
        let fee_payer = self.fee_payer.to_account_update().commitment(hasher, network);
        let forest = hash_forest(&self.forest, hasher, network);
        let full = hasher.hash(
            prefixes::ACCOUNT_UPDATE_CONS,
            &[self.memo.hash(hasher), fee_payer, forest],
        );
        Commitments { forest, full }
    }

    /// Sign and attach proofs
    ///
    /// The fee payer signs the full commitment. Signed updates sign the full
    /// commitment when they ask for it and the forest commitment otherwise.
    /// Proof-authorized updates must already carry a provided proof.
    pub async fn authorize(
        &self,
        engine: &Engine,
        authorizer: &dyn Authorizer,
    ) -> Result<AuthorizedZkappCommand> {
        let commitments = self.commitments(engine.hasher(), engine.config().network_id);

        let fee_payer_signature = authorizer
            .sign(commitments.full, &self.fee_payer.public_key)
            .await?;

        let mut pending = Vec::new();
        for tree in &self.forest {
            tree.for_each_node(0, &mut |update, _| pending.push(update));
        }

        let mut payloads = Vec::with_capacity(pending.len());
        for update in pending {
            payloads.push(authorize_update(update, &commitments, authorizer).await?);
        }

        // payloads were produced in the same pre-order that map visits nodes
        let mut payloads = payloads.into_iter();
        let forest = self
            .forest
            .iter()
            .map(|tree| {
                tree.map(&mut |update| {
                    Authorized::new(update.clone(), payloads.next().unwrap_or_default())
                })
            })
            .collect();

        tracing::info!(
            commitment = %commitments.full,
            updates = self.forest.iter().map(|t| t.size()).sum::<usize>(),
            "zkApp command authorized"
        );

        Ok(AuthorizedZkappCommand {
            fee_payer: self.fee_payer,
            fee_payer_signature,
            forest,
            memo: self.memo.clone(),
        })
    }
}

async fn authorize_update(
    update: &AccountUpdate,
    commitments: &Commitments,
    authorizer: &dyn Authorizer,
) -> Result<AuthorizationPayload> {
    let kind = update.body.authorization_kind;
    let mut payload = AuthorizationPayload::default();

    if kind.is_proved {
        match update.proof {
            ProofState::Provided(proof) => payload.proof = Some(proof),
            ProofState::Pending => {
                return Err(Error::Authorization(format!(
                    "proof pending for account update of {}",
                    update.account_id
                )))
            }
        }
    }

    if kind.is_signed {
        let commitment = if update.body.use_full_commitment {
            commitments.full
        } else {
            commitments.forest
        };
        payload.signature = Some(
            authorizer
                .sign(commitment, &update.account_id.public_key)
                .await?,
        );
    }

    Ok(payload)
}

/// zkApp command with every authorization attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedZkappCommand {
    /// Fee payment
    pub fee_payer: FeePayer,
    /// Fee payer signature over the full commitment
    pub fee_payer_signature: Signature,
    /// Authorized account-update forest
    pub forest: AccountUpdateForest<Authorized>,
    /// Memo
    pub memo: Memo,
}

impl AuthorizedZkappCommand {
    /// Command without authorizations
    pub fn to_unsigned(&self) -> ZkappCommand {
        ZkappCommand {
            fee_payer: self.fee_payer,
            forest: self
                .forest
                .iter()
                .map(|tree| tree.map(&mut |authorized| authorized.update.clone()))
                .collect(),
            memo: self.memo.clone(),
        }
    }

    /// Check every signature against the recomputed commitments
    pub fn verify_signatures(&self, engine: &Engine) -> Result<()> {
        let commitments = self
            .to_unsigned()
            .commitments(engine.hasher(), engine.config().network_id);

        if !verify_signature(
            &commitments.full,
            &self.fee_payer_signature,
            &self.fee_payer.public_key,
        ) {
            return Err(Error::SignatureError("fee payer signature".to_string()));
        }

        for (authorized, _) in AccountUpdateTree::flatten_forest(&self.forest) {
            let update = &authorized.update;
            if !update.body.authorization_kind.is_signed {
                continue;
            }
            let commitment = if update.body.use_full_commitment {
                commitments.full
            } else {
                commitments.forest
            };
            let valid = authorized.authorization.signature.map_or(false, |signature| {
                verify_signature(&commitment, &signature, &update.account_id.public_key)
            });
            if !valid {
                return Err(Error::SignatureError(format!(
                    "account update of {}",
                    update.account_id
                )));
            }
        }
        Ok(())
    }
}

/// Build an unsigned command against `ledger`
///
/// The fee payer's nonce is taken from the ledger. The fee payment and the
/// updates produced by `routine` are applied to a copy of the ledger, which
/// replaces `ledger` only when no errors were found anywhere. Otherwise the
/// full error trace is returned in [`Error::CommandRejected`] and `ledger` is
/// left untouched.
pub fn create_unsigned_zkapp_command<L, F>(
    ledger: &mut L,
    chain: &ChainView,
    engine: &Engine,
    mut fee_payer: FeePayer,
    memo: Memo,
    routine: F,
) -> Result<ZkappCommand>
where
    L: LedgerView + Clone,
    F: FnOnce(&mut ZkappCommandContext<'_, L>) -> Result<()>,
{
    let mut draft = ledger.clone();
    let mut failed_accounts = AccountIdSet::new();
    let mut fee_payer_errors = Vec::new();
    let fee_payer_id = fee_payer.account_id();

    if draft.has(&fee_payer_id) {
        let account = draft.get(&fee_payer_id);
        fee_payer.nonce = account.nonce;
        match engine.check_and_apply_fee_payment(chain, &account, &fee_payer) {
            Ok(paid) => draft.set(paid),
            Err(errors) => {
                fee_payer_errors = errors;
                failed_accounts.add(fee_payer_id);
            }
        }
    } else {
        fee_payer_errors.push(ApplyError::FeePayerNotFound);
        failed_accounts.add(fee_payer_id);
    }

    let finalized = {
        let mut ctx =
            ZkappCommandContext::with_failed_accounts(&mut draft, chain, engine, failed_accounts);
        routine(&mut ctx)?;
        ctx.finalize()
    };

    let trace = ZkappCommandErrorTrace {
        fee_payer_errors,
        general_errors: finalized.general_errors,
        account_update_traces: finalized.traces,
    };

    if trace.has_errors() {
        tracing::warn!(
            fee_payer = %fee_payer.public_key,
            errors = trace.error_count(),
            "zkApp command rejected"
        );
        if let Some(metrics) = engine.metrics() {
            metrics.record_command(false);
        }
        return Err(Error::CommandRejected(Box::new(trace)));
    }

    *ledger = draft;
    if let Some(metrics) = engine.metrics() {
        metrics.record_command(true);
    }
    tracing::info!(
        fee_payer = %fee_payer.public_key,
        trees = finalized.forest.len(),
        "zkApp command created"
    );

    Ok(ZkappCommand {
        fee_payer,
        forest: finalized.forest,
        memo,
    })
}
