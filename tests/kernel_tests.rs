//! Kernel invariants: ordering, priority, cancellation, vetoes, status
//! round-trips, end idempotence, aux key uniqueness, failure isolation.

use mafia_engine::{
    Ability, AbilityArgs, AbilityKind, ActionKind, ActionSpec, ActionStatus, AuxKind, AuxObject,
    Constraint, EngineError, EventPayload, Game, GameConfig, ObjectId, Outcome, OutcomeChecker,
    StatusValue, Tally, Trigger, TriggerKind, VetoReason, VoteTarget, WinCondition,
};

fn small_game() -> (Game, ObjectId, ObjectId) {
    let mut game = Game::new(GameConfig::new(0)).unwrap();
    let a = game.add_actor("Alice").unwrap();
    let b = game.add_actor("Bob").unwrap();
    (game, a, b)
}

fn set_status_spec(actor: ObjectId, key: &str, value: i64) -> ActionSpec {
    ActionSpec::new(
        ObjectId::GAME,
        ActionKind::SetStatus {
            actor,
            key: key.into(),
            value: Some(StatusValue::Int(value)),
        },
    )
}

/// Same-priority actions resolve in enqueue order.
#[test]
fn test_enqueue_order_within_priority() {
    let (mut game, alice, _) = small_game();

    for i in 0..4 {
        game.enqueue(set_status_spec(alice, "mark", i));
    }
    game.drain().unwrap();

    let values: Vec<i64> = game
        .history()
        .iter()
        .filter_map(|e| match &e.action.kind {
            ActionKind::SetStatus {
                value: Some(StatusValue::Int(v)),
                ..
            } => Some(*v),
            _ => None,
        })
        .collect();
    assert_eq!(values, vec![0, 1, 2, 3]);
    assert_eq!(
        game.state().actor(alice).unwrap().status.get("mark"),
        Some(&StatusValue::Int(3))
    );
}

/// Higher priorities fully resolve before lower ones run.
#[test]
fn test_priority_tiers_resolve_in_order() {
    let (mut game, alice, _) = small_game();

    game.enqueue(set_status_spec(alice, "low", 1).with_priority(-5));
    game.enqueue(set_status_spec(alice, "high", 1).with_priority(5));
    game.enqueue(set_status_spec(alice, "mid", 1).with_priority(0));
    game.drain().unwrap();

    let keys: Vec<&str> = game
        .history()
        .iter()
        .filter_map(|e| match &e.action.kind {
            ActionKind::SetStatus { key, .. } => Some(key.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(keys, vec!["high", "mid", "low"]);
}

/// A cancelled action never runs and gets no post event, but keeps its
/// history entry and the cancel's.
#[test]
fn test_cancellation_suppresses_run_and_post() {
    let (mut game, alice, bob) = small_game();
    game.add_trigger(Trigger::new(ObjectId(0), alice, "tough", TriggerKind::Unkillable))
        .unwrap();

    game.enqueue(ActionSpec::kill(ObjectId::GAME, alice));
    game.enqueue(ActionSpec::kill(ObjectId::GAME, bob));
    game.drain().unwrap();

    assert!(game.state().is_alive(alice));
    assert!(!game.state().is_alive(bob));

    let statuses: Vec<(&ActionKind, &ActionStatus)> = game
        .history()
        .iter()
        .filter(|e| matches!(e.action.kind, ActionKind::Kill { .. }))
        .map(|e| (&e.action.kind, &e.status))
        .collect();
    assert_eq!(statuses.len(), 2);
    assert_eq!(*statuses[0].1, ActionStatus::Cancelled);
    assert_eq!(*statuses[1].1, ActionStatus::Ran);

    let kill_posts = game
        .events()
        .iter()
        .filter(|e| matches!(
            &e.payload,
            EventPayload::PostAction(view) if matches!(view.kind, ActionKind::Kill { .. })
        ))
        .count();
    assert_eq!(kill_posts, 1);
}

/// An activation produces actions iff every attached constraint passes.
#[test]
fn test_constraint_completeness() {
    let (mut game, alice, bob) = small_game();
    let kill = Ability::new(ObjectId(0), alice, "kill", AbilityKind::Kill)
        .with_constraint(Constraint::SourceAlive)
        .with_constraint(Constraint::PhaseIs(vec!["night".into()]));
    game.add_ability(kill).unwrap();

    game.advance_phase().unwrap(); // day 1: wrong phase
    let err = game.activate(alice, "kill", AbilityArgs::Actor(bob));
    assert!(matches!(
        err,
        Err(EngineError::InvalidActivation(VetoReason::WrongPhase { .. }))
    ));
    assert!(game.state().is_alive(bob));

    game.advance_phase().unwrap(); // night 1: all constraints pass
    game.activate(alice, "kill", AbilityArgs::Actor(bob)).unwrap();
    game.advance_phase().unwrap();
    assert!(!game.state().is_alive(bob));
}

/// Writing then reverting a status key produces two change events whose
/// old/new pairs compose to the identity.
#[test]
fn test_status_round_trip() {
    let (mut game, alice, _) = small_game();

    game.enqueue(set_status_spec(alice, "mark", 7));
    game.enqueue(ActionSpec::new(
        ObjectId::GAME,
        ActionKind::SetStatus {
            actor: alice,
            key: "mark".into(),
            value: None,
        },
    ));
    game.drain().unwrap();

    let changes: Vec<(Option<StatusValue>, Option<StatusValue>)> = game
        .events()
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::StatusChange { key, old, new, .. } if key == "mark" => {
                Some((old.clone(), new.clone()))
            }
            _ => None,
        })
        .collect();

    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0], (None, Some(StatusValue::Int(7))));
    assert_eq!(changes[1], (Some(StatusValue::Int(7)), None));
    assert!(game.state().actor(alice).unwrap().status.get("mark").is_none());
}

/// A no-op write (same value) emits nothing.
#[test]
fn test_identical_status_write_is_silent() {
    let (mut game, alice, _) = small_game();

    game.enqueue(set_status_spec(alice, "mark", 7));
    game.enqueue(set_status_spec(alice, "mark", 7));
    game.drain().unwrap();

    let changes = game
        .events()
        .iter()
        .filter(|e| matches!(&e.payload, EventPayload::StatusChange { key, .. } if key == "mark"))
        .count();
    assert_eq!(changes, 1);
}

/// After the game ends, activations are refused and the phase is stuck.
#[test]
fn test_end_idempotence() {
    let mut game = Game::new(GameConfig::new(0)).unwrap();
    let town = game.add_faction("town").unwrap();
    let alice = game.add_actor("Alice").unwrap();
    game.join_faction(alice, town);
    let vote = Ability::new(ObjectId(0), alice, "vote", AbilityKind::Vote);
    game.add_ability(vote).unwrap();
    // A one-faction game where the faction already holds a majority: the
    // first evaluation ends it.
    game.add_checker(OutcomeChecker::new(
        ObjectId(0),
        town,
        Outcome::Victory,
        WinCondition::FactionMajority(town),
    ))
    .unwrap();

    game.advance_phase().unwrap(); // evaluation happens on the phase event
    assert!(game.is_ended());
    assert_eq!(game.current_phase().name(), "shutdown");

    let err = game.activate(alice, "vote", AbilityArgs::Vote(VoteTarget::Actor(alice)));
    assert_eq!(
        err,
        Err(EngineError::InvalidActivation(VetoReason::GameEnded))
    );
    assert_eq!(
        game.advance_phase(),
        Err(EngineError::InvalidPhaseTransition("shutdown is terminal".into()))
    );
    assert_eq!(game.current_phase().name(), "shutdown");
}

/// Two aux objects cannot share a key.
#[test]
fn test_aux_key_uniqueness() {
    let (mut game, _, _) = small_game();

    game.register_aux(AuxObject::new(
        ObjectId(0),
        "tally.night",
        AuxKind::Tally(Tally::new("night")),
    ))
    .unwrap();

    let err = game.register_aux(AuxObject::new(
        ObjectId(0),
        "tally.night",
        AuxKind::Tally(Tally::new("night")),
    ));
    assert_eq!(err, Err(EngineError::DuplicateKey("tally.night".into())));
}

/// A failed action is recorded as failed, gets no post event, and the
/// drain continues past it.
#[test]
fn test_failed_action_does_not_stop_drain() {
    let (mut game, alice, _) = small_game();

    game.enqueue(ActionSpec::kill(ObjectId::GAME, ObjectId(999)));
    game.enqueue(set_status_spec(alice, "after", 1));
    game.drain().unwrap();

    let entries: Vec<&ActionStatus> = game.history().iter().map(|e| &e.status).collect();
    assert!(matches!(entries[0], ActionStatus::Failed { .. }));
    assert_eq!(*entries[1], ActionStatus::Ran);

    assert!(!game.events().iter().any(|e| matches!(
        &e.payload,
        EventPayload::PostAction(view) if matches!(view.kind, ActionKind::Kill { .. })
    )));

    // The failure landed on the diagnostics channel.
    let diagnostics = game.take_diagnostics();
    assert!(diagnostics.iter().any(|d| matches!(
        d.detail,
        mafia_engine::DiagnosticKind::ActionFailed { .. }
    )));
}

/// A protection action installs a guard that lasts until the phase ends.
#[test]
fn test_protect_guard_is_phase_scoped() {
    let (mut game, alice, bob) = small_game();

    let protect = Ability::new(ObjectId(0), bob, "protect", AbilityKind::Protect)
        .with_constraint(Constraint::PhaseIs(vec!["night".into()]));
    let kill = Ability::new(ObjectId(0), alice, "kill", AbilityKind::Kill)
        .with_constraint(Constraint::PhaseIs(vec!["night".into()]));
    game.add_ability(protect).unwrap();
    game.add_ability(kill).unwrap();

    game.advance_phase().unwrap(); // day 1
    game.advance_phase().unwrap(); // night 1

    // Protection resolves at priority 80, before the kill at 0.
    game.activate(alice, "kill", AbilityArgs::Actor(alice)).unwrap();
    game.activate(bob, "protect", AbilityArgs::Actor(alice)).unwrap();
    game.advance_phase().unwrap(); // day 2

    assert!(game.state().is_alive(alice));

    // The guard expired with the night: an unprotected kill next night
    // goes through.
    game.advance_phase().unwrap(); // night 2
    game.activate(alice, "kill", AbilityArgs::Actor(alice)).unwrap();
    game.advance_phase().unwrap();
    assert!(!game.state().is_alive(alice));
}

/// History queries are cumulative and indexable.
#[test]
fn test_history_since() {
    let (mut game, alice, _) = small_game();

    game.enqueue(set_status_spec(alice, "a", 1));
    game.drain().unwrap();
    let checkpoint = game.history().len();

    game.enqueue(set_status_spec(alice, "b", 2));
    game.drain().unwrap();

    let tail = game.history_since(checkpoint);
    assert_eq!(tail.len(), 1);
    assert!(matches!(
        &tail[0].action.kind,
        ActionKind::SetStatus { key, .. } if key == "b"
    ));
}
