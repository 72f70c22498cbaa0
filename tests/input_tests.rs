//! Pending-input integration tests.
//!
//! These tests verify mode picks, answer validation through the actor,
//! dependent inputs, and expiry under both expiry policies.

use stackwise::core::{Action, EngineConfig, EntityId, ExpiryPolicy, PlayerId};
use stackwise::effects::{ChoiceSpec, EffectOp, EventTemplate, Fallback, Selector};
use stackwise::error::{EngineError, ErrorKind, ValidationError};
use stackwise::events::EventStatus;
use stackwise::games::skirmish::{self, actions, counters, kinds, Skirmish};
use stackwise::input::{Answer, Cost, InputKind, PendingInputId};
use stackwise::resolution::{Inbound, MatchActor, MatchPhase, Outbound, SystemControl};
use stackwise::triggers::{TriggerDefinition, TriggerId, ValueExpr};

const P0: PlayerId = PlayerId::new(0);
const P1: PlayerId = PlayerId::new(1);

fn actor_with(rules: Skirmish, policy: ExpiryPolicy) -> MatchActor<Skirmish> {
    let mut actor = MatchActor::new(rules, EngineConfig::new(policy), skirmish::setup(2, 20), 5);
    actor.start();
    actor
}

/// Submit `action` for P0 and let both players pass.
fn play(actor: &mut MatchActor<Skirmish>, action_type: &str) -> Vec<Outbound> {
    actor.submit_action(Action::new(P0, action_type)).unwrap();
    actor.submit_action(Action::pass(P0)).unwrap();
    actor.handle(Inbound::pass(P1))
}

fn open_input(actor: &MatchActor<Skirmish>) -> PendingInputId {
    actor.pending_inputs()[0].id
}

fn errors(outbound: &[Outbound]) -> Vec<ErrorKind> {
    outbound
        .iter()
        .filter_map(|message| match message {
            Outbound::Error { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

/// "Whenever an Echo resolves, its controller deals 2 damage to a player."
fn zap_on_echo(spec: ChoiceSpec) -> TriggerDefinition {
    TriggerDefinition::new(TriggerId::new(1), "Zap", kinds::ECHO)
        .with_effect(EffectOp::Choose(spec))
        .with_effect(EffectOp::Emit(
            EventTemplate::new(kinds::DAMAGED)
                .with("target", ValueExpr::chosen("zap", 0))
                .with("amount", ValueExpr::int(2)),
        ))
}

fn life(actor: &MatchActor<Skirmish>, player: PlayerId) -> i64 {
    actor.state().get_player_state(player, counters::LIFE, 0)
}

// =============================================================================
// Mode Picks
// =============================================================================

/// Test that an event waits for its mode pick and applies the chosen mode.
#[test]
fn test_rally_mode_pick() {
    let mut actor = actor_with(Skirmish::new(2), ExpiryPolicy::AbortAction);
    let outbound = play(&mut actor, actions::RALLY);

    let announced = outbound.iter().find_map(|message| match message {
        Outbound::PendingInput { kind, constraints, .. } => Some((*kind, constraints.modes.clone())),
        _ => None,
    });
    assert_eq!(
        announced,
        Some((InputKind::ModePick, vec!["heal".to_string(), "energy".to_string()]))
    );
    assert_eq!(actor.phase(), MatchPhase::AwaitingInput);

    let id = open_input(&actor);
    actor.submit_input(id, P0, Answer::mode("energy")).unwrap();

    assert_eq!(actor.state().get_player_state(P0, counters::ENERGY, 0), 2);
    assert_eq!(life(&actor, P0), 20);
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);

    let rallied = actor
        .log()
        .iter()
        .find(|e| e.event_type.as_str() == kinds::RALLIED)
        .unwrap();
    assert_eq!(rallied.status, EventStatus::Applied);
    assert_eq!(rallied.choices.get("rally").and_then(|a| a.mode.as_deref()), Some("energy"));
}

/// Test that invalid answers are refused and leave the input open.
#[test]
fn test_invalid_answers_rejected() {
    let mut actor = actor_with(Skirmish::new(2), ExpiryPolicy::AbortAction);
    play(&mut actor, actions::RALLY);
    let id = open_input(&actor);

    assert_eq!(
        actor.submit_input(id, P0, Answer::mode("retreat")),
        Err(ValidationError::IllegalMode("retreat".to_string()).into())
    );
    assert_eq!(
        actor.submit_input(id, P1, Answer::mode("heal")),
        Err(ValidationError::NotRequested { input: id, player: P1 }.into())
    );
    assert_eq!(
        actor.submit_input(id, P0, Answer::decline()),
        Err(ValidationError::NotOptional(id).into())
    );
    assert_eq!(
        actor.submit_input(PendingInputId::new(99), P0, Answer::mode("heal")),
        Err(ValidationError::UnknownInput(PendingInputId::new(99)).into())
    );

    let outbound = actor.handle(Inbound::input(id, P1, Answer::mode("heal")));
    assert_eq!(errors(&outbound), vec![ErrorKind::Validation]);

    assert_eq!(actor.phase(), MatchPhase::AwaitingInput);
    assert_eq!(actor.pending_inputs().len(), 1);
    assert!(actor.journal().iter().all(|m| !matches!(m, Inbound::InputSubmit { .. })));

    actor.submit_input(id, P0, Answer::mode("heal")).unwrap();
    assert_eq!(life(&actor, P0), 23);
}

/// Test that input submissions are refused when nothing is pending.
#[test]
fn test_input_without_pending_rejected() {
    let mut actor = actor_with(Skirmish::new(2), ExpiryPolicy::AbortAction);
    assert_eq!(
        actor.submit_input(PendingInputId::new(1), P0, Answer::mode("heal")),
        Err(EngineError::Validation(ValidationError::NoPendingInput))
    );
    assert_eq!(
        actor.control(SystemControl::Timeout {
            input_id: PendingInputId::new(1)
        }),
        Err(EngineError::Validation(ValidationError::NoPendingInput))
    );
}

/// Test that a cost that cannot be paid is refused.
#[test]
fn test_unpayable_cost_rejected() {
    let fee = TriggerDefinition::new(TriggerId::new(1), "Tithe", kinds::ECHO)
        .with_effect(EffectOp::Choose(ChoiceSpec::pay("fee", Cost::new(counters::ENERGY, 2))))
        .with_effect(EffectOp::Emit(
            EventTemplate::new(kinds::CARD_DRAWN).with("player", ValueExpr::Controller),
        ));
    let mut actor = actor_with(Skirmish::new(2).with_trigger(fee), ExpiryPolicy::AbortAction);
    play(&mut actor, actions::ECHO);

    let id = open_input(&actor);
    assert_eq!(actor.pending_inputs()[0].kind, InputKind::PayCost);
    assert_eq!(
        actor.submit_input(id, P0, Answer::activate()),
        Err(ValidationError::CannotPay {
            resource: counters::ENERGY.to_string(),
            amount: 2
        }
        .into())
    );

    actor.control(SystemControl::Timeout { input_id: id }).unwrap();
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
    assert!(actor.log().iter().all(|e| e.event_type.as_str() != kinds::CARD_DRAWN));
}

// =============================================================================
// Dependent Inputs
// =============================================================================

/// Test that a dependent input opens only after the earlier one is answered.
#[test]
fn test_dependent_input_waits() {
    let trigger = TriggerDefinition::new(TriggerId::new(1), "Two Questions", kinds::ECHO)
        .with_effect(EffectOp::Choose(ChoiceSpec::target("zap", Selector::Players)))
        .with_effect(EffectOp::Choose(ChoiceSpec::mode("size", ["small", "large"]).dependent()))
        .with_effect(EffectOp::Emit(
            EventTemplate::new(kinds::DAMAGED)
                .with("target", ValueExpr::chosen("zap", 0))
                .with("amount", ValueExpr::int(1)),
        ));
    let mut actor = actor_with(Skirmish::new(2).with_trigger(trigger), ExpiryPolicy::AbortAction);

    let outbound = play(&mut actor, actions::ECHO);
    let announced = outbound
        .iter()
        .filter(|m| matches!(m, Outbound::PendingInput { .. }))
        .count();
    assert_eq!(announced, 1);
    assert_eq!(actor.pending_inputs().len(), 1);
    assert_eq!(actor.pending_inputs()[0].kind, InputKind::TargetSelect);

    let first = open_input(&actor);
    let outbound = actor.handle(Inbound::input(first, P0, Answer::targets([EntityId::player(P1)])));
    let second = outbound.iter().find_map(|m| match m {
        Outbound::PendingInput { input_id, kind, .. } => Some((*input_id, *kind)),
        _ => None,
    });
    assert_eq!(second, Some((PendingInputId::new(first.raw() + 1), InputKind::ModePick)));
    assert_eq!(actor.phase(), MatchPhase::AwaitingInput);
    assert_eq!(life(&actor, P1), 20);

    actor
        .submit_input(PendingInputId::new(first.raw() + 1), P0, Answer::mode("large"))
        .unwrap();
    assert_eq!(life(&actor, P1), 19);
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
}

// =============================================================================
// Expiry
// =============================================================================

/// Test that an explicit timeout takes the default answer when configured to.
#[test]
fn test_timeout_takes_default_answer() {
    let mut actor = actor_with(Skirmish::new(2), ExpiryPolicy::DefaultAnswer);
    play(&mut actor, actions::RALLY);
    let id = open_input(&actor);

    let outbound = actor.handle(Inbound::SystemControl(SystemControl::Timeout { input_id: id }));
    assert_eq!(errors(&outbound), vec![ErrorKind::Timeout]);
    assert_eq!(life(&actor, P0), 23);
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
}

/// Test that an explicit timeout aborts the suspended event when configured to.
#[test]
fn test_timeout_aborts_action() {
    let mut actor = actor_with(Skirmish::new(2), ExpiryPolicy::AbortAction);
    play(&mut actor, actions::RALLY);
    let id = open_input(&actor);

    let outbound = actor.handle(Inbound::SystemControl(SystemControl::Timeout { input_id: id }));
    assert_eq!(errors(&outbound), vec![ErrorKind::Timeout]);

    let rallied = actor
        .log()
        .iter()
        .find(|e| e.event_type.as_str() == kinds::RALLIED)
        .unwrap();
    assert_eq!(rallied.status, EventStatus::Failed);
    assert_eq!(life(&actor, P0), 20);
    assert!(actor.pending_inputs().is_empty());
    assert_eq!(actor.priority_holder(), Some(P0));
}

/// Test that the logical clock expires inputs at their deadline.
#[test]
fn test_clock_tick_expires_input() {
    let spec = ChoiceSpec::target("zap", Selector::Players)
        .with_ttl(3)
        .with_fallback(Fallback::FirstOffered);
    let mut actor = actor_with(Skirmish::new(2).with_trigger(zap_on_echo(spec)), ExpiryPolicy::DefaultAnswer);

    let outbound = play(&mut actor, actions::ECHO);
    let expires_at = outbound.iter().find_map(|m| match m {
        Outbound::PendingInput { expires_at, .. } => Some(*expires_at),
        _ => None,
    });
    assert_eq!(expires_at, Some(Some(3)));

    actor.control(SystemControl::Tick { now: 2 }).unwrap();
    assert_eq!(actor.phase(), MatchPhase::AwaitingInput);

    let outbound = actor.handle(Inbound::SystemControl(SystemControl::Tick { now: 3 }));
    assert_eq!(errors(&outbound), vec![ErrorKind::Timeout]);
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);

    // first offered is the lowest id: P0's own seat
    assert_eq!(life(&actor, P0), 18);
    assert_eq!(life(&actor, P1), 20);
}

/// Test that an expired reaction is dropped without touching its trigger event.
#[test]
fn test_expired_reaction_is_discarded() {
    let spec = ChoiceSpec::target("zap", Selector::Players).with_ttl(1);
    let mut actor = actor_with(Skirmish::new(2).with_trigger(zap_on_echo(spec)), ExpiryPolicy::AbortAction);
    play(&mut actor, actions::ECHO);

    actor.control(SystemControl::Tick { now: 10 }).unwrap();

    let echo = actor
        .log()
        .iter()
        .find(|e| e.event_type.as_str() == kinds::ECHO)
        .unwrap();
    assert_eq!(echo.status, EventStatus::Applied);
    assert!(actor.log().iter().all(|e| e.event_type.as_str() != kinds::DAMAGED));
    assert_eq!(actor.stack_depth(), 0);
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
}

/// Test that a default answer of decline skips the rest of the reaction.
#[test]
fn test_declining_default() {
    let spec = ChoiceSpec::target("zap", Selector::Players)
        .optional()
        .with_fallback(Fallback::Decline);
    let mut actor = actor_with(Skirmish::new(2).with_trigger(zap_on_echo(spec)), ExpiryPolicy::DefaultAnswer);
    play(&mut actor, actions::ECHO);

    let id = open_input(&actor);
    actor.control(SystemControl::Timeout { input_id: id }).unwrap();
    assert!(actor.log().iter().all(|e| e.event_type.as_str() != kinds::DAMAGED));
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
}
