//! Trigger discovery integration tests.
//!
//! These tests verify discovery order, fire limits, before-reactions and
//! per-entity fan-out triggering, both through `DiscoveryIndex` directly and
//! through full matches.

use stackwise::core::{Action, EngineConfig, EntityId, ExpiryPolicy, GameState, Payload, PlayerId};
use stackwise::effects::{EffectOp, EventTemplate};
use stackwise::events::{Event, EventId, EventStatus, EventType, ReactionTiming};
use stackwise::games::skirmish::{self, actions, counters, kinds, triggers, Skirmish};
use stackwise::input::Choices;
use stackwise::resolution::{MatchActor, MatchPhase};
use stackwise::triggers::{
    DiscoveryIndex, FireScope, LimitKey, LimiterTracker, TriggerDefinition, TriggerId, ValueExpr,
};

const P0: PlayerId = PlayerId::new(0);
const P1: PlayerId = PlayerId::new(1);

fn config() -> EngineConfig {
    EngineConfig::new(ExpiryPolicy::AbortAction)
}

fn echo_event(id: u64) -> Event {
    Event {
        id: EventId::new(id),
        event_type: EventType::from_static(kinds::ECHO),
        payload: Payload::new(),
        caused_by: None,
        chain_root: EventId::new(id),
        order: 0,
        status: EventStatus::Pending,
        group: None,
        prevents_group: false,
        prevention: None,
        choices: Choices::new(),
    }
}

/// "Whenever an Echo resolves, draw a card."
fn draw_on_echo(id: u32, source: Option<EntityId>) -> TriggerDefinition {
    let trigger = TriggerDefinition::new(TriggerId::new(id), "Listener", kinds::ECHO).with_effect(
        EffectOp::Emit(EventTemplate::new(kinds::CARD_DRAWN).with("player", ValueExpr::Controller)),
    );
    match source {
        Some(source) => trigger.with_source(source),
        None => trigger,
    }
}

fn resolve(actor: &mut MatchActor<Skirmish>, action: Action) {
    let player = action.player;
    actor.submit_action(action).unwrap();
    actor.submit_action(Action::pass(player)).unwrap();
    let other = actor.priority_holder().unwrap();
    actor.submit_action(Action::pass(other)).unwrap();
}

fn pass_round(actor: &mut MatchActor<Skirmish>) {
    for _ in 0..2 {
        let holder = actor.priority_holder().unwrap();
        actor.submit_action(Action::pass(holder)).unwrap();
    }
}

fn drawn_by(actor: &MatchActor<Skirmish>) -> Vec<PlayerId> {
    actor
        .log()
        .iter()
        .filter(|e| e.event_type.as_str() == kinds::CARD_DRAWN)
        .filter_map(|e| e.payload.player("player"))
        .collect()
}

// =============================================================================
// Discovery Order
// =============================================================================

/// Test that the active player's reactions come first, then rule id order.
#[test]
fn test_active_player_reactions_first() {
    let mut state = skirmish::setup(2, 20);
    let a = skirmish::spawn_unit(&mut state, P0, 1, 1);
    let b = skirmish::spawn_unit(&mut state, P1, 1, 1);
    let rules = Skirmish::new(2)
        .with_trigger(draw_on_echo(1, Some(b)))
        .with_trigger(draw_on_echo(2, Some(a)));
    let discovery = DiscoveryIndex::new(&rules, 64);
    let event = echo_event(1);

    let found = discovery
        .discover_after(&event, &state, &mut LimiterTracker::new())
        .unwrap();
    let order: Vec<_> = found.iter().map(|r| (r.trigger_id.raw(), r.controller)).collect();
    assert_eq!(order, vec![(2, P0), (1, P1)]);

    state.begin_turn(2, P1);
    let found = discovery
        .discover_after(&event, &state, &mut LimiterTracker::new())
        .unwrap();
    let order: Vec<_> = found.iter().map(|r| (r.trigger_id.raw(), r.controller)).collect();
    assert_eq!(order, vec![(1, P1), (2, P0)]);
}

/// Test that discovery is a pure function of state and event.
#[test]
fn test_discovery_is_reproducible() {
    let mut state = GameState::new(3);
    let units: Vec<_> = (0..3u8)
        .map(|p| skirmish::spawn_unit(&mut state, PlayerId::new(p), 1, 1))
        .collect();
    let rules = units
        .iter()
        .enumerate()
        .fold(Skirmish::new(3), |rules, (i, unit)| {
            rules.with_trigger(draw_on_echo(10 - i as u32, Some(*unit)))
        });
    let discovery = DiscoveryIndex::new(&rules, 64);

    let first = discovery
        .discover_after(&echo_event(4), &state, &mut LimiterTracker::new())
        .unwrap();
    let second = discovery
        .discover_after(&echo_event(4), &state, &mut LimiterTracker::new())
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].controller, P0);
}

/// Test that before and after triggers are discovered separately.
#[test]
fn test_timing_filters_discovery() {
    let state = skirmish::setup(2, 20);
    let rules = Skirmish::new(2)
        .with_trigger(draw_on_echo(1, None))
        .with_trigger(draw_on_echo(2, None).before());
    let discovery = DiscoveryIndex::new(&rules, 64);
    let mut limiter = LimiterTracker::new();

    let before = discovery.discover_before(&echo_event(1), &state, &mut limiter).unwrap();
    let after = discovery.discover_after(&echo_event(1), &state, &mut limiter).unwrap();
    assert_eq!(before.len(), 1);
    assert_eq!(before[0].timing, ReactionTiming::Before);
    assert_eq!(before[0].trigger_id, TriggerId::new(2));
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].trigger_id, TriggerId::new(1));
}

/// Test that the match resolves reactions in discovery order and traces them.
#[test]
fn test_reactions_resolve_in_discovery_order() {
    let mut state = skirmish::setup(2, 20);
    let a = skirmish::spawn_unit(&mut state, P0, 1, 1);
    let b = skirmish::spawn_unit(&mut state, P1, 1, 1);
    let rules = Skirmish::new(2)
        .with_trigger(draw_on_echo(1, Some(b)))
        .with_trigger(draw_on_echo(2, Some(a)));

    let mut actor = MatchActor::new(rules, config(), state, 3);
    actor.start();
    resolve(&mut actor, Action::new(P0, actions::ECHO));

    assert_eq!(drawn_by(&actor), vec![P0, P1]);

    let echo_id = actor
        .log()
        .iter()
        .find(|e| e.event_type.as_str() == kinds::ECHO)
        .map(|e| e.id);
    let record = actor
        .discovery_trace()
        .iter()
        .find(|r| r.event == echo_id && r.timing == ReactionTiming::After)
        .unwrap();
    assert_eq!(
        record.fired,
        vec![(TriggerId::new(2), Some(a)), (TriggerId::new(1), Some(b))]
    );
}

// =============================================================================
// Fire Limits
// =============================================================================

/// Test that a per-turn cap drops extra firings until the next turn.
#[test]
fn test_per_turn_limit_resets_each_turn() {
    let rules = Skirmish::new(2).with_trigger(draw_on_echo(1, None).limited(FireScope::PerTurn, 1));
    let mut actor = MatchActor::new(rules, config(), skirmish::setup(2, 20), 3);
    actor.start();

    resolve(&mut actor, Action::new(P0, actions::ECHO));
    resolve(&mut actor, Action::new(P0, actions::ECHO));
    assert_eq!(drawn_by(&actor), vec![P0]);

    // main -> end, end -> next turn
    pass_round(&mut actor);
    pass_round(&mut actor);
    assert_eq!(actor.state().turn_number, 2);
    assert_eq!(actor.priority_holder(), Some(P1));

    resolve(&mut actor, Action::new(P1, actions::ECHO));
    assert_eq!(drawn_by(&actor), vec![P0, P1]);
}

/// Test that a per-event cap bounds a self-feeding chain.
#[test]
fn test_per_event_limit_bounds_chain() {
    let rules = Skirmish::new(2).with_trigger(triggers::echo(TriggerId::new(1), 1).limited(FireScope::PerEvent, 3));
    let mut actor = MatchActor::new(rules, config(), skirmish::setup(2, 20), 3);
    actor.start();

    let echoes = |actor: &MatchActor<Skirmish>| {
        actor
            .log()
            .iter()
            .filter(|e| e.event_type.as_str() == kinds::ECHO)
            .count()
    };

    resolve(&mut actor, Action::new(P0, actions::ECHO));
    assert_eq!(echoes(&actor), 4);
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);

    resolve(&mut actor, Action::new(P0, actions::ECHO));
    assert_eq!(echoes(&actor), 8);
}

/// Test that capped reactions are dropped silently, not reported.
#[test]
fn test_limit_drop_is_not_an_error() {
    let state = skirmish::setup(2, 20);
    let rules = Skirmish::new(2).with_trigger(draw_on_echo(1, None).limited(FireScope::PerSource, 1));
    let discovery = DiscoveryIndex::new(&rules, 64);
    let mut limiter = LimiterTracker::new();

    assert_eq!(discovery.discover_after(&echo_event(1), &state, &mut limiter).unwrap().len(), 1);
    assert_eq!(discovery.discover_after(&echo_event(2), &state, &mut limiter).unwrap().len(), 0);

    limiter.reset_turn();
    limiter.reset_chains();
    assert_eq!(discovery.discover_after(&echo_event(3), &state, &mut limiter).unwrap().len(), 0);
}

/// Test that a group pre-scan failing on a later member keeps no firings from
/// the members discovered before it.
#[test]
fn test_failed_group_prescan_keeps_no_firings() {
    let quickening = TriggerDefinition::new(TriggerId::new(1), "Quickening", kinds::CARD_CREATED)
        .before()
        .with_effect(EffectOp::set_payload(counters::HEALTH, ValueExpr::int(2)))
        .limited(FireScope::PerTurn, 1);
    let tripwire = |id| {
        TriggerDefinition::new(TriggerId::new(id), "Tripwire", kinds::CARD_MOVED)
            .before()
            .with_effect(EffectOp::PreventTriggering)
    };
    let rules = Skirmish::new(2)
        .with_trigger(quickening)
        .with_trigger(tripwire(2))
        .with_trigger(tripwire(3))
        .recoverable();
    let mut actor = MatchActor::new(
        rules,
        config().with_max_reactions_per_event(1),
        skirmish::setup(2, 20),
        4,
    );
    actor.start();

    resolve(&mut actor, Action::new(P0, actions::CREATE));

    let status = |name: &str| {
        actor
            .log()
            .iter()
            .find(|e| e.event_type.as_str() == name)
            .map(|e| e.status)
    };
    assert_eq!(status(kinds::CARD_CREATED), Some(EventStatus::Failed));
    assert_eq!(status(kinds::CARD_MOVED), Some(EventStatus::Failed));
    assert_eq!(status(kinds::POWER_CHANGED), Some(EventStatus::Applied));
    assert_eq!(actor.phase(), MatchPhase::AwaitingAction);

    let key = LimitKey::new(TriggerId::new(1), None, FireScope::PerTurn, None);
    assert_eq!(actor.limiter().count(&key), 0);
}

// =============================================================================
// Before-Reactions
// =============================================================================

/// Test that a before-reaction can rewrite the payload of a pending event.
#[test]
fn test_before_reaction_rewrites_payload() {
    let mut state = skirmish::setup(2, 20);
    let attacker = skirmish::spawn_unit(&mut state, P0, 4, 4);
    let tank = skirmish::spawn_unit(&mut state, P1, 1, 5);
    let rules = Skirmish::new(2).with_trigger(triggers::armored(TriggerId::new(1), tank));

    let mut actor = MatchActor::new(rules, config(), state, 3);
    actor.start();
    resolve(
        &mut actor,
        Action::new(P0, actions::ATTACK)
            .with_param("attacker", attacker)
            .with_param("defender", tank),
    );

    let damaged = actor
        .log()
        .iter()
        .find(|e| e.event_type.as_str() == kinds::DAMAGED)
        .unwrap();
    assert_eq!(damaged.payload.int("amount"), Some(1));
    assert_eq!(damaged.status, EventStatus::Applied);
    assert_eq!(actor.state().counter(tank, counters::HEALTH), 4);
}

/// Test that a prevented event gets no after-reactions.
#[test]
fn test_prevented_event_skips_after_discovery() {
    let mut state = skirmish::setup(2, 20);
    let attacker = skirmish::spawn_unit(&mut state, P0, 3, 3);
    let guard = skirmish::spawn_unit(&mut state, P1, 0, 3);
    let witness = TriggerDefinition::new(TriggerId::new(2), "Witness", kinds::DAMAGED).with_effect(
        EffectOp::Emit(EventTemplate::new(kinds::CARD_DRAWN).with("player", ValueExpr::Controller)),
    );
    let rules = Skirmish::new(2)
        .with_trigger(triggers::guardian(TriggerId::new(1), guard, EntityId::player(P1)))
        .with_trigger(witness);

    let mut actor = MatchActor::new(rules, config(), state, 3);
    actor.start();
    resolve(
        &mut actor,
        Action::new(P0, actions::ATTACK)
            .with_param("attacker", attacker)
            .with_param("defender", P1),
    );

    let damaged = actor
        .log()
        .iter()
        .find(|e| e.event_type.as_str() == kinds::DAMAGED)
        .unwrap();
    assert_eq!(damaged.status, EventStatus::Prevented);
    assert!(drawn_by(&actor).is_empty());
    assert_eq!(actor.state().get_player_state(P1, counters::LIFE, 0), 20);
    assert!(actor
        .discovery_trace()
        .iter()
        .all(|r| !(r.event == Some(damaged.id) && r.timing == ReactionTiming::After)));
}

// =============================================================================
// Fan-out
// =============================================================================

/// Test that a fan-out fires per-entity triggers once per affected entity.
#[test]
fn test_fan_out_triggers_per_entity() {
    let mut state = skirmish::setup(2, 20);
    let u1 = skirmish::spawn_unit(&mut state, P0, 1, 3);
    let u2 = skirmish::spawn_unit(&mut state, P1, 1, 3);
    let u3 = skirmish::spawn_unit(&mut state, P1, 1, 3);
    let rules = Skirmish::new(2)
        .with_trigger(triggers::on_damaged_draw(TriggerId::new(1), u1))
        .with_trigger(triggers::on_damaged_draw(TriggerId::new(2), u2));

    let mut actor = MatchActor::new(rules, config(), state, 3);
    actor.start();
    resolve(&mut actor, Action::new(P0, actions::VOLLEY).with_param("amount", 1));

    let names = actor.log().type_names();
    let start = names.iter().position(|n| *n == kinds::VOLLEY).unwrap();
    assert_eq!(
        names[start..].to_vec(),
        vec![
            kinds::VOLLEY,
            kinds::DAMAGED,
            kinds::CARD_DRAWN,
            kinds::DAMAGED,
            kinds::CARD_DRAWN,
            kinds::DAMAGED,
        ]
    );

    let volley = actor.log().iter().find(|e| e.event_type.as_str() == kinds::VOLLEY).unwrap();
    let targets: Vec<_> = actor
        .log()
        .iter()
        .filter(|e| e.event_type.as_str() == kinds::DAMAGED)
        .inspect(|e| assert_eq!(e.caused_by, Some(volley.id)))
        .filter_map(|e| e.payload.entity("target"))
        .collect();
    assert_eq!(targets, vec![u1, u2, u3]);
    assert_eq!(drawn_by(&actor), vec![P0, P1]);

    for unit in [u1, u2, u3] {
        assert_eq!(actor.state().counter(unit, counters::HEALTH), 2);
    }
}

/// Test that a fan-out over nothing emits nothing.
#[test]
fn test_empty_fan_out() {
    let mut actor = MatchActor::new(Skirmish::new(2), config(), skirmish::setup(2, 20), 3);
    actor.start();
    resolve(&mut actor, Action::new(P0, actions::VOLLEY));

    let names = actor.log().type_names();
    assert_eq!(names.last(), Some(&kinds::VOLLEY));
    assert_eq!(actor.stack_depth(), 0);
}
