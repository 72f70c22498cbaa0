//! Turn flow integration tests.
//!
//! These tests verify phase and turn advancing, seat rotation, automatic
//! passing, and every way a match can end.

use stackwise::core::{Action, EngineConfig, ExpiryPolicy, PlayerId};
use stackwise::error::{EngineError, ValidationError};
use stackwise::events::{Event, EventType};
use stackwise::games::skirmish::{self, actions, counters, kinds, Skirmish};
use stackwise::resolution::{Inbound, MatchActor, MatchPhase, Outbound, SystemControl};

const P0: PlayerId = PlayerId::new(0);
const P1: PlayerId = PlayerId::new(1);
const P2: PlayerId = PlayerId::new(2);

fn started(rules: Skirmish, state: stackwise::GameState) -> MatchActor<Skirmish> {
    let mut actor = MatchActor::new(rules, EngineConfig::new(ExpiryPolicy::AbortAction), state, 9);
    actor.start();
    actor
}

/// Every live player passes once, starting with the holder.
fn pass_round(actor: &mut MatchActor<Skirmish>) {
    for _ in 0..actor.state().live_player_count() {
        let holder = actor.priority_holder().unwrap();
        actor.submit_action(Action::pass(holder)).unwrap();
    }
}

fn last_of<'a>(actor: &'a MatchActor<Skirmish>, event_type: &EventType) -> &'a Event {
    actor
        .log()
        .iter()
        .rev()
        .find(|e| e.event_type == *event_type)
        .unwrap()
}

fn count_of(actor: &MatchActor<Skirmish>, event_type: &EventType) -> usize {
    actor.log().of_type(event_type).count()
}

// =============================================================================
// Advancing
// =============================================================================

/// Test the opening sequence of a match.
#[test]
fn test_match_opening() {
    let actor = started(Skirmish::new(2), skirmish::setup(2, 20));

    assert_eq!(
        actor.log().type_names(),
        vec!["MatchStarted", "TurnStarted", "PhaseStarted", "StepStarted"]
    );
    let opening = actor.log().get(0).unwrap();
    assert_eq!(opening.payload.int("seed"), Some(9));
    assert_eq!(actor.state().turn_number, 1);
    assert_eq!(actor.state().active_player, P0);
    assert_eq!(actor.priority_holder(), Some(P0));
}

/// Test that passing through a phase enters the next one and its mandatory step.
#[test]
fn test_phase_advance_runs_cleanup() {
    let mut actor = started(Skirmish::new(2), skirmish::setup(2, 20));
    pass_round(&mut actor);

    let names = actor.log().type_names();
    assert_eq!(
        names[4..].to_vec(),
        vec!["PhaseEnded", "PhaseStarted", "StepStarted", kinds::CLEANUP]
    );
    assert_eq!(last_of(&actor, &EventType::PHASE_STARTED).payload.text("name"), Some("end"));
    assert_eq!(actor.state().phase_index, 1);
    assert_eq!(actor.priority_holder(), Some(P0));
}

/// Test that the turn passes to the next seat.
#[test]
fn test_turn_rotation() {
    let mut actor = started(Skirmish::new(2), skirmish::setup(2, 20));
    pass_round(&mut actor);
    pass_round(&mut actor);

    let turn_started = last_of(&actor, &EventType::TURN_STARTED);
    assert_eq!(turn_started.payload.int("turn"), Some(2));
    assert_eq!(turn_started.payload.player("player"), Some(P1));
    assert_eq!(count_of(&actor, &EventType::TURN_ENDED), 1);
    assert_eq!(actor.state().turn_number, 2);
    assert_eq!(actor.state().active_player, P1);
    assert_eq!(actor.state().phase_index, 0);
    assert_eq!(actor.priority_holder(), Some(P1));

    pass_round(&mut actor);
    pass_round(&mut actor);
    assert_eq!(actor.state().active_player, P0);
    assert_eq!(actor.state().turn_number, 3);
}

/// Test that an accepted action resets the pass count.
#[test]
fn test_action_resets_passes() {
    let mut actor = started(Skirmish::new(2), skirmish::setup(2, 20));
    actor.submit_action(Action::pass(P0)).unwrap();
    actor.submit_action(Action::new(P1, actions::ECHO)).unwrap();
    actor.submit_action(Action::pass(P1)).unwrap();

    // P0 has passed before, but not since the echo
    assert_eq!(actor.stack_depth(), 1);
    assert_eq!(actor.priority_holder(), Some(P0));

    actor.submit_action(Action::pass(P0)).unwrap();
    assert_eq!(actor.stack_depth(), 0);
    assert_eq!(actor.state().phase_index, 0, "still in the main phase");
}

// =============================================================================
// Automatic Passing
// =============================================================================

/// Test that a player with nothing to do passes automatically.
#[test]
fn test_auto_pass_skips_idle_player() {
    let mut state = skirmish::setup(2, 20);
    skirmish::spawn_unit(&mut state, P1, 1, 1);
    let actor = started(Skirmish::new(2).with_auto_pass(), state);

    assert_eq!(actor.priority_holder(), Some(P1));
    assert_eq!(actor.state().turn_number, 1);
}

/// Test that a match where nobody can act runs to its turn limit.
#[test]
fn test_auto_pass_runs_to_turn_limit() {
    let actor = started(
        Skirmish::new(2).with_auto_pass().with_max_turns(3),
        skirmish::setup(2, 20),
    );

    assert_eq!(actor.phase(), MatchPhase::Ended);
    assert_eq!(count_of(&actor, &EventType::TURN_STARTED), 3);
    let ended = last_of(&actor, &EventType::GAME_ENDED);
    assert_eq!(ended.payload.text("reason"), Some("turn limit"));
    assert_eq!(ended.payload.player("winner"), None);
}

// =============================================================================
// Game End
// =============================================================================

/// Test that the turn limit ends the match and later messages are refused.
#[test]
fn test_turn_limit_ends_match() {
    let mut actor = started(Skirmish::new(2).with_max_turns(1), skirmish::setup(2, 20));
    pass_round(&mut actor);
    pass_round(&mut actor);

    assert_eq!(actor.phase(), MatchPhase::Ended);
    assert!(actor.state().game_over);
    assert_eq!(actor.priority_holder(), None);
    assert_eq!(actor.log().last().unwrap().event_type, EventType::GAME_ENDED);

    assert_eq!(
        actor.submit_action(Action::pass(P0)),
        Err(EngineError::Validation(ValidationError::MatchEnded))
    );
}

/// Test that a player at zero life is defeated by the state watcher.
#[test_log::test]
fn test_lethal_damage_ends_match() {
    let mut state = skirmish::setup(2, 5);
    let attacker = skirmish::spawn_unit(&mut state, P0, 6, 6);
    let mut actor = started(Skirmish::new(2), state);

    actor
        .submit_action(
            Action::new(P0, actions::ATTACK)
                .with_param("attacker", attacker)
                .with_param("defender", P1),
        )
        .unwrap();
    actor.submit_action(Action::pass(P0)).unwrap();
    let outbound = actor.handle(Inbound::pass(P1));

    let names = actor.log().type_names();
    let damaged = names.iter().position(|n| *n == kinds::DAMAGED).unwrap();
    assert_eq!(
        names[damaged..].to_vec(),
        vec![kinds::DAMAGED, kinds::PLAYER_DEFEATED, "GameEnded"]
    );

    let ended = last_of(&actor, &EventType::GAME_ENDED);
    assert_eq!(ended.payload.player("winner"), Some(P0));
    assert_eq!(actor.phase(), MatchPhase::Ended);
    assert!(actor.state().is_eliminated(P1));
    assert_eq!(actor.state().get_player_state(P1, counters::LIFE, 0), -1);

    assert!(outbound.iter().any(|m| matches!(
        m,
        Outbound::PriorityChanged {
            window_open: false,
            ..
        }
    )));
    assert!(actor
        .discovery_trace()
        .iter()
        .any(|r| r.event.is_none() && !r.fired.is_empty()));
}

/// Test that a concession in a two-player match hands the win to the other seat.
#[test]
fn test_concession_ends_two_player_match() {
    let mut actor = started(Skirmish::new(2), skirmish::setup(2, 20));
    actor.control(SystemControl::Concede { player: P0 }).unwrap();

    let conceded = last_of(&actor, &EventType::PLAYER_CONCEDED);
    assert_eq!(conceded.payload.player("player"), Some(P0));
    let ended = last_of(&actor, &EventType::GAME_ENDED);
    assert_eq!(ended.payload.text("reason"), Some("concession"));
    assert_eq!(ended.payload.player("winner"), Some(P1));
    assert_eq!(actor.phase(), MatchPhase::Ended);
}

/// Test that conceded seats are skipped by priority and turn rotation.
#[test]
fn test_three_player_rotation_skips_conceded_seat() {
    let mut actor = started(Skirmish::new(3), skirmish::setup(3, 20));
    actor.control(SystemControl::Concede { player: P1 }).unwrap();

    assert!(actor.state().is_eliminated(P1));
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
    assert_eq!(count_of(&actor, &EventType::GAME_ENDED), 0);
    assert_eq!(actor.priority_holder(), Some(P0));

    actor.submit_action(Action::pass(P0)).unwrap();
    assert_eq!(actor.priority_holder(), Some(P2));
    assert_eq!(
        actor.submit_action(Action::pass(P1)),
        Err(ValidationError::NotPriorityHolder { player: P1 }.into())
    );
    actor.submit_action(Action::pass(P2)).unwrap();

    // end phase, then the turn goes straight to P2
    pass_round(&mut actor);
    assert_eq!(actor.state().active_player, P2);
    assert_eq!(actor.priority_holder(), Some(P2));

    assert_eq!(
        actor.control(SystemControl::Concede { player: P1 }),
        Err(ValidationError::Eliminated(P1).into())
    );
}

/// Test that a concession resolves on its own and hands the interrupted
/// window back, so the rest of the stack waits for every player to pass.
#[test]
fn test_concession_keeps_open_window() {
    let mut state = skirmish::setup(3, 20);
    let attacker = skirmish::spawn_unit(&mut state, P0, 3, 3);
    let mut actor = started(Skirmish::new(3), state);

    actor
        .submit_action(
            Action::new(P0, actions::ATTACK)
                .with_param("attacker", attacker)
                .with_param("defender", P1),
        )
        .unwrap();
    actor.control(SystemControl::Concede { player: P2 }).unwrap();

    assert_eq!(actor.log().last().unwrap().event_type, EventType::PLAYER_CONCEDED);
    assert_eq!(count_of(&actor, &EventType::from_static(kinds::ATTACK)), 0);
    assert_eq!(actor.stack_depth(), 1);
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
    assert_eq!(actor.priority_holder(), Some(P0));

    actor.submit_action(Action::pass(P0)).unwrap();
    assert_eq!(actor.priority_holder(), Some(P1));
    assert_eq!(actor.state().get_player_state(P1, counters::LIFE, 0), 20);

    actor.submit_action(Action::pass(P1)).unwrap();
    assert_eq!(actor.stack_depth(), 0);
    assert_eq!(actor.state().get_player_state(P1, counters::LIFE, 0), 17);
    assert_eq!(count_of(&actor, &EventType::GAME_ENDED), 0);
}

/// Test that actions before `start` are refused.
#[test]
fn test_not_started() {
    let mut actor = MatchActor::new(
        Skirmish::new(2),
        EngineConfig::new(ExpiryPolicy::AbortAction),
        skirmish::setup(2, 20),
        1,
    );
    assert_eq!(
        actor.submit_action(Action::pass(P0)),
        Err(ValidationError::NotStarted.into())
    );
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
}
