//! End-to-end scenarios: construction against a ledger, then authorization

use zkapp_core::{
    account_update::Update,
    authorization::{AuthorizationKind, PermissionAspect, Permissions},
    crypto::{KeyPair, KeyringAuthorizer},
    precondition::{Equals, InRange},
    state::{StateLayout, StateValue, StateValueType},
    trace::AccountUpdateTrace,
    transaction::ZkappCommandContext,
    types::ProofRef,
    create_unsigned_zkapp_command, Account, AccountId, AccountUpdate, AccountUpdateTree,
    ApplyError, ApplyResult, ChainView, Config, Engine, Error, FeeExcess, FeePayer, Field,
    InMemoryLedger, LedgerView, Memo, PublicKey, SignedAmount,
};

fn engine() -> Engine {
    Engine::new(Config::default()).unwrap()
}

fn id(pk: PublicKey) -> AccountId {
    AccountId::mina(pk)
}

fn pk(b: u8) -> PublicKey {
    PublicKey::from_bytes([b; 32])
}

fn single_error(trace: &AccountUpdateTrace) -> &ApplyError {
    assert_eq!(trace.errors.len(), 1, "errors: {:?}", trace.errors);
    &trace.errors[0]
}

struct ScenarioA {
    engine: Engine,
    payer: KeyPair,
    funder: KeyPair,
    target: PublicKey,
    ledger: InMemoryLedger,
}

impl ScenarioA {
    fn new() -> Self {
        let engine = engine();
        let payer = KeyPair::from_seed(&[1u8; 32]);
        let funder = KeyPair::from_seed(&[2u8; 32]);
        let fee = engine.config().protocol.account_creation_fee;
        let ledger = InMemoryLedger::from(vec![
            Account::new(id(payer.public_key()), 1_000),
            Account::new(id(funder.public_key()), 2 * fee),
        ]);
        Self {
            engine,
            payer,
            funder,
            target: pk(3),
            ledger,
        }
    }

    fn updates(&self) -> (AccountUpdate, AccountUpdate) {
        let fee = self.engine.config().protocol.account_creation_fee;
        let funding = AccountUpdate::new(id(self.funder.public_key()))
            .with_authorization_kind(AuthorizationKind::SIGNATURE)
            .with_balance_change(SignedAmount::negative(fee));
        let target = AccountUpdate::new(id(self.target))
            .with_authorization_kind(AuthorizationKind::PROOF)
            .with_increment_nonce()
            .with_state(0, Field::from_u64(5))
            .unwrap();
        (funding, target)
    }
}

#[test]
fn test_scenario_a_new_zkapp_account() {
    let mut scenario = ScenarioA::new();
    let (funding, target) = scenario.updates();
    let engine = &scenario.engine;

    let command = create_unsigned_zkapp_command(
        &mut scenario.ledger,
        &ChainView::default(),
        engine,
        FeePayer::new(scenario.payer.public_key(), 2, 0),
        Memo::new("scenario a").unwrap(),
        |ctx| {
            ctx.add(funding);
            ctx.add(target);
            assert_eq!(ctx.fee_excess(), FeeExcess::zero());
            Ok(())
        },
    )
    .unwrap();

    let payer = scenario.ledger.get(&id(scenario.payer.public_key()));
    assert_eq!(payer.balance, 998);
    assert_eq!(payer.nonce, 1);

    assert!(scenario.ledger.has(&id(scenario.target)));
    let created = scenario.ledger.get(&id(scenario.target));
    assert!(!created.is_new);
    assert_eq!(created.balance, 0);
    assert_eq!(created.nonce, 1);
    assert_eq!(created.zkapp.state[0], Field::from_u64(5));
    assert!(!created.zkapp.is_proven);

    assert_eq!(command.fee_payer.nonce, 0);
    assert_eq!(command.forest.len(), 2);
}

#[test]
fn test_scenario_a_without_funding_burns_creation_fee() {
    let mut scenario = ScenarioA::new();
    let before = scenario.ledger.clone();
    let (_, target) = scenario.updates();
    let fee = scenario.engine.config().protocol.account_creation_fee;

    let result = create_unsigned_zkapp_command(
        &mut scenario.ledger,
        &ChainView::default(),
        &scenario.engine,
        FeePayer::new(scenario.payer.public_key(), 2, 0),
        Memo::default(),
        |ctx| {
            ctx.add(target);
            Ok(())
        },
    );

    match result {
        Err(Error::CommandRejected(trace)) => {
            assert_eq!(
                trace.general_errors,
                vec![ApplyError::FeeExcessNonZero(SignedAmount::negative(fee))]
            );
            assert!(trace.generate_report().contains("burn or mint"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(scenario.ledger, before);
}

#[test]
fn test_scenario_b_nonce_precondition() {
    let engine = engine();
    let mut account = Account::new(id(pk(5)), 50);
    account.nonce = 3;
    let mut ledger = InMemoryLedger::from(vec![account.clone(), Account::new(id(pk(1)), 10)]);
    let before = ledger.clone();

    let update = AccountUpdate::new(id(pk(5)))
        .with_preconditions(|p| p.account.nonce = InRange::between(5, 5));

    let result = engine.check_and_apply_account_update(&ChainView::default(), &account, &update, FeeExcess::zero());
    match &result {
        ApplyResult::Failed { errors, .. } => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].precondition_name(), Some("nonce"));
            assert!(errors[0].to_string().contains("3 does not satisfy"));
        }
        other => panic!("unexpected {:?}", other),
    }

    let rejected = create_unsigned_zkapp_command(
        &mut ledger,
        &ChainView::default(),
        &engine,
        FeePayer::new(pk(1), 1, 0),
        Memo::default(),
        |ctx| {
            ctx.add(update);
            Ok(())
        },
    );
    match rejected {
        Err(Error::CommandRejected(trace)) => {
            let error = single_error(&trace.account_update_traces[0]);
            assert_eq!(error.precondition_name(), Some("nonce"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ledger, before);
}

#[test]
fn test_scenario_c_set_delegate_needs_signature() {
    let engine = engine();
    let mut account = Account::new(id(pk(6)), 0);
    account.permissions = Permissions {
        set_delegate: zkapp_core::authorization::AuthorizationLevel::Signature,
        ..Permissions::dummy()
    };
    let update = AccountUpdate::new(id(pk(6)))
        .with_authorization_kind(AuthorizationKind::PROOF)
        .with_updates(|u| u.delegate = Update::set(pk(7)));

    let result = engine.check_and_apply_account_update(&ChainView::default(), &account, &update, FeeExcess::zero());
    assert!(!result.is_applied());
    assert_eq!(result.errors().len(), 1);
    assert_eq!(
        result.errors()[0].permission_aspect(),
        Some(PermissionAspect::SetDelegate)
    );
    assert!(result.errors()[0].to_string().contains("setDelegate"));

    let signed = update.with_authorization_kind(AuthorizationKind::SIGNATURE);
    match engine.check_and_apply_account_update(&ChainView::default(), &account, &signed, FeeExcess::zero()) {
        ApplyResult::Applied { account, .. } => assert_eq!(account.delegate, Some(pk(7))),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_scenario_d_sibling_skipped_after_failure() {
    let engine = engine();
    let mut account = Account::new(id(pk(8)), 10);
    account.permissions = Permissions::dummy();
    let mut ledger = InMemoryLedger::from(vec![account]);
    let chain = ChainView::default();

    let failing = AccountUpdate::new(id(pk(8)))
        .with_preconditions(|p| p.account.balance = InRange::at_least(1_000));
    let valid = AccountUpdate::new(id(pk(8)))
        .with_state(1, Field::from_u64(1))
        .unwrap();

    let mut ctx = ZkappCommandContext::new(&mut ledger, &chain, &engine);
    ctx.add(failing);
    ctx.add(valid);
    assert!(ctx.failed_accounts().has(&id(pk(8))));
    let finalized = ctx.finalize();

    assert_eq!(
        single_error(&finalized.traces[0]).precondition_name(),
        Some("balance")
    );
    assert_eq!(single_error(&finalized.traces[1]), &ApplyError::Skipped);
    assert_eq!(ledger.get(&id(pk(8))).zkapp.state[1], Field::ZERO);
}

#[test]
fn test_typed_counter_state_through_command() {
    let engine = engine();
    let layout = StateLayout::custom(vec![
        ("counter".to_string(), StateValueType::U64),
        ("owner".to_string(), StateValueType::PublicKey),
        ("paused".to_string(), StateValueType::Bool),
    ])
    .unwrap();

    let mut zkapp = Account::new(id(pk(9)), 0);
    zkapp.permissions = Permissions::dummy();
    zkapp.zkapp.state = layout
        .values_to_generic(&[
            StateValue::U64(1),
            StateValue::PublicKey(pk(4)),
            StateValue::Bool(false),
        ])
        .unwrap();
    let mut ledger = InMemoryLedger::from(vec![Account::new(id(pk(1)), 100), zkapp]);

    let increment = |from: u64| {
        AccountUpdate::new(id(pk(9)))
            .with_typed_state_preconditions(
                &layout,
                &[Equals::equals(StateValue::U64(from)), Equals::Disabled, Equals::Disabled],
            )
            .unwrap()
            .with_typed_state(
                &layout,
                &[
                    Update::set(StateValue::U64(from + 1)),
                    Update::unset_with(StateValue::PublicKey(PublicKey::empty())),
                    Update::unset_with(StateValue::Bool(false)),
                ],
            )
            .unwrap()
    };

    let first = increment(1);
    create_unsigned_zkapp_command(
        &mut ledger,
        &ChainView::default(),
        &engine,
        FeePayer::new(pk(1), 1, 0),
        Memo::default(),
        |ctx| {
            ctx.add(first);
            Ok(())
        },
    )
    .unwrap();

    let stored = ledger.get(&id(pk(9)));
    assert_eq!(
        stored.typed_state(&layout).unwrap(),
        vec![StateValue::U64(2), StateValue::PublicKey(pk(4)), StateValue::Bool(false)]
    );

    // the guard still expects the old counter
    let stale = increment(1);
    let before = ledger.clone();
    match create_unsigned_zkapp_command(
        &mut ledger,
        &ChainView::default(),
        &engine,
        FeePayer::new(pk(1), 1, 0),
        Memo::default(),
        |ctx| {
            ctx.add(stale);
            Ok(())
        },
    ) {
        Err(Error::CommandRejected(trace)) => {
            let error = single_error(&trace.account_update_traces[0]);
            assert_eq!(error.precondition_name(), Some("state[0]"));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(ledger, before);
}

#[test]
fn test_pre_order_evaluation_skips_child_of_failed_parent_account() {
    let engine = engine();
    let mut account = Account::new(id(pk(4)), 10);
    account.permissions = Permissions::dummy();
    let mut ledger = InMemoryLedger::from(vec![account]);
    let chain = ChainView::default();

    let tree = AccountUpdateTree::new(
        AccountUpdate::new(id(pk(4))).with_balance_change(SignedAmount::negative(11)),
        vec![AccountUpdateTree::leaf(AccountUpdate::new(id(pk(4))))],
    );

    let mut ctx = ZkappCommandContext::new(&mut ledger, &chain, &engine);
    ctx.add(tree);
    let finalized = ctx.finalize();

    let trace = &finalized.traces[0];
    assert_eq!(single_error(trace), &ApplyError::NegativeBalance);
    assert_eq!(single_error(&trace.child_traces[0]), &ApplyError::Skipped);
}

#[tokio::test]
async fn test_scenario_a_authorization() {
    let mut scenario = ScenarioA::new();
    let (funding, target) = scenario.updates();

    let mut command = create_unsigned_zkapp_command(
        &mut scenario.ledger,
        &ChainView::default(),
        &scenario.engine,
        FeePayer::new(scenario.payer.public_key(), 2, 0),
        Memo::default(),
        |ctx| {
            ctx.add(funding);
            ctx.add(target);
            Ok(())
        },
    )
    .unwrap();

    let authorizer = KeyringAuthorizer::new()
        .with_key(KeyPair::from_seed(&[1u8; 32]))
        .with_key(KeyPair::from_seed(&[2u8; 32]));

    match command.authorize(&scenario.engine, &authorizer).await {
        Err(Error::Authorization(msg)) => assert!(msg.contains("proof pending")),
        other => panic!("unexpected {:?}", other),
    }

    let commitments_before = command.commitments(
        scenario.engine.hasher(),
        scenario.engine.config().network_id,
    );
    let proof = ProofRef(Field::from_u64(42));
    command.forest[1].root = command.forest[1].root.clone().with_proof(proof);
    assert_eq!(
        command.commitments(scenario.engine.hasher(), scenario.engine.config().network_id),
        commitments_before
    );

    let authorized = command.authorize(&scenario.engine, &authorizer).await.unwrap();
    assert!(authorized.forest[0].root.authorization.signature.is_some());
    assert_eq!(authorized.forest[1].root.authorization.proof, Some(proof));
    assert!(authorized.forest[1].root.authorization.signature.is_none());
    assert!(authorized.verify_signatures(&scenario.engine).is_ok());

    let mut tampered = authorized.clone();
    tampered.memo = Memo::new("tampered").unwrap();
    assert!(tampered.verify_signatures(&scenario.engine).is_err());
}
