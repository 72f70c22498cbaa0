//! Skirmish ruleset implementation.

use crate::core::{Action, EntityId, EntityRecord, GameState, PlayerId, Value};
use crate::effects::{EffectOp, EventTemplate, FanOut, Selector};
use crate::error::{RecursionError, ValidationError};
use crate::events::{Event, EventDraft, EventType, GroupTag};
use crate::input::{Answer, InputKind, InputRequest};
use crate::rules::{
    ApplyContext, ApplyOutcome, Consequence, PhaseDef, ResolvedIntent, Ruleset, StateWatcher,
    StepDef, TurnStructure,
};
use crate::triggers::{Predicate, TriggerDefinition, TriggerId, TriggerIndex, ValueExpr};

use super::{actions, counters, kinds};

/// Watchers use ids from here up, one per seat.
const DEFEAT_WATCHER_BASE: u32 = 10_000;

const RALLY_SLOT: &str = "rally";
const RALLY_HEAL: i64 = 3;
const RALLY_ENERGY: i64 = 2;

#[derive(Clone, Debug)]
pub struct Skirmish {
    triggers: TriggerIndex,
    watchers: Vec<StateWatcher>,
    turns: TurnStructure,
    auto_pass: bool,
    recoverable: bool,
}

impl Skirmish {
    /// Ruleset for `player_count` seats: a main phase and an end phase with a
    /// mandatory cleanup step.
    pub fn new(player_count: usize) -> Self {
        let turns = TurnStructure::new()
            .with_phase(PhaseDef::new(0, "main").with_step(StepDef::new(0, "main")))
            .with_phase(
                PhaseDef::new(1, "end").with_step(StepDef::new(0, "cleanup").emitting(kinds::CLEANUP)),
            );

        let watchers = PlayerId::all(player_count)
            .map(|player| {
                let seat = ValueExpr::Const(Value::Player(player));
                StateWatcher::new(
                    TriggerId::new(DEFEAT_WATCHER_BASE + player.index() as u32),
                    "Defeat",
                    Predicate::AtMost(ValueExpr::counter(seat.clone(), counters::LIFE), 0)
                        .and(Predicate::IsAlive(seat.clone())),
                )
                .with_controller(player)
                .with_effect(EffectOp::Emit(
                    EventTemplate::new(kinds::PLAYER_DEFEATED).with("player", seat),
                ))
            })
            .collect();

        Self {
            triggers: TriggerIndex::new(),
            watchers,
            turns,
            auto_pass: false,
            recoverable: false,
        }
    }

    /// Add a trigger (builder pattern).
    #[must_use]
    pub fn with_trigger(mut self, trigger: TriggerDefinition) -> Self {
        self.triggers.register(trigger);
        self
    }

    #[must_use]
    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.turns = self.turns.with_max_turns(turns);
        self
    }

    /// Players controlling no units pass automatically.
    #[must_use]
    pub fn with_auto_pass(mut self) -> Self {
        self.auto_pass = true;
        self
    }

    /// Treat every tripped resolution guard as recoverable.
    #[must_use]
    pub fn recoverable(mut self) -> Self {
        self.recoverable = true;
        self
    }

    pub fn triggers_mut(&mut self) -> &mut TriggerIndex {
        &mut self.triggers
    }

    fn validate_attack(&self, action: &Action, state: &GameState) -> Result<ResolvedIntent, ValidationError> {
        let attacker = entity_param(action, "attacker")?;
        let defender = entity_param(action, "defender")?;

        if attacker.is_player(state.player_count()) || !state.is_alive(attacker) {
            return Err(ValidationError::IllegalAction(format!("{attacker} cannot attack")));
        }
        if state.controller_of(attacker) != Some(action.player) {
            return Err(ValidationError::IllegalAction(format!(
                "{attacker} is not controlled by {}",
                action.player
            )));
        }
        if !state.is_alive(defender) {
            return Err(ValidationError::IllegalAction(format!("{defender} is not a legal defender")));
        }

        Ok(ResolvedIntent::single(
            EventDraft::new(kinds::ATTACK)
                .with("player", action.player)
                .with("attacker", attacker)
                .with("defender", defender)
                .with("amount", state.counter(attacker, counters::POWER)),
        ))
    }

    fn validate_create(&self, action: &Action, state: &GameState) -> ResolvedIntent {
        let entity = state.peek_next_entity();
        let power = action.params.int(counters::POWER).unwrap_or(1);
        let health = action.params.int(counters::HEALTH).unwrap_or(1);
        let group = GroupTag(1);

        ResolvedIntent::many(vec![
            EventDraft::new(kinds::CARD_CREATED)
                .with("entity", entity)
                .with("owner", action.player)
                .with(counters::HEALTH, health)
                .in_group(group)
                .preventing_group(),
            EventDraft::new(kinds::CARD_MOVED)
                .with("entity", entity)
                .with("to", "battlefield")
                .in_group(group),
            EventDraft::new(kinds::POWER_CHANGED)
                .with("entity", entity)
                .with(counters::POWER, power)
                .in_group(group),
        ])
    }
}

impl Ruleset for Skirmish {
    fn validate_action(&self, action: &Action, state: &GameState) -> Result<ResolvedIntent, ValidationError> {
        let player = action.player;
        match action.action_type.as_str() {
            actions::ATTACK => self.validate_attack(action, state),

            actions::ACTIVATE => {
                let target = action
                    .params
                    .event("target")
                    .ok_or_else(|| ValidationError::MissingParam("target".to_string()))?;
                Ok(ResolvedIntent::single(
                    EventDraft::new(kinds::ABILITY_RESOLVED)
                        .with("player", player)
                        .with("ability", "counter_attack")
                        .with("target", target),
                ))
            }

            actions::CREATE => Ok(self.validate_create(action, state)),

            actions::VOLLEY => Ok(ResolvedIntent::single(
                EventDraft::new(kinds::VOLLEY)
                    .with("player", player)
                    .with("amount", action.params.int("amount").unwrap_or(1)),
            )),

            actions::RALLY => Ok(ResolvedIntent::single(
                EventDraft::new(kinds::RALLIED).with("player", player),
            )),

            actions::ECHO => Ok(ResolvedIntent::single(
                EventDraft::new(kinds::ECHO).with("player", player),
            )),

            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }

    fn triggers_for_event_type(&self, event_type: &EventType) -> Vec<&TriggerDefinition> {
        self.triggers.for_event_type(event_type)
    }

    fn turn_structure(&self) -> &TurnStructure {
        &self.turns
    }

    fn apply_event(&self, event: &Event, state: &mut GameState, ctx: &mut ApplyContext<'_>) -> ApplyOutcome {
        let payload = &event.payload;
        let mut out = Vec::new();

        match event.event_type.as_str() {
            kinds::ATTACK => {
                out.push(Consequence::Emit(
                    EventDraft::new(kinds::COMBAT_RESOLVED).with_payload(payload.clone()),
                ));
            }

            kinds::COMBAT_RESOLVED => {
                if let (Some(attacker), Some(defender)) = (payload.entity("attacker"), payload.entity("defender")) {
                    out.push(Consequence::Emit(
                        EventDraft::new(kinds::DAMAGED)
                            .with("target", defender)
                            .with("amount", payload.int("amount").unwrap_or(0))
                            .with("source", attacker),
                    ));
                }
            }

            kinds::DAMAGED => {
                let amount = payload.int("amount").unwrap_or(0);
                if let Some(target) = payload.entity("target") {
                    if let Some(player) = target.as_player(state.player_count()) {
                        state.modify_player_state(player, counters::LIFE, -amount);
                    } else if state.is_alive(target) {
                        let health = state.add_counter(target, counters::HEALTH, -amount);
                        if health <= 0 {
                            out.push(Consequence::Emit(
                                EventDraft::new(kinds::DESTROYED).with("entity", target),
                            ));
                        }
                    }
                }
            }

            kinds::DESTROYED => {
                if let Some(entity) = payload.entity("entity") {
                    state.destroy_entity(entity);
                }
            }

            kinds::CARD_DRAWN => {
                if let Some(player) = payload.player("player") {
                    state.modify_player_state(player, counters::CARDS, 1);
                    let card = ctx.rng.gen_range_inclusive(1, 10);
                    state.set_player_state(player, counters::LAST_DRAW, card);
                }
            }

            kinds::ABILITY_RESOLVED => {
                if let Some(target) = payload.event("target") {
                    out.push(Consequence::Prevent(target));
                }
            }

            kinds::CARD_CREATED => {
                if let (Some(entity), Some(owner)) = (payload.entity("entity"), payload.player("owner")) {
                    let mut record = EntityRecord::new(owner);
                    record
                        .counters
                        .insert(counters::HEALTH.to_string(), payload.int(counters::HEALTH).unwrap_or(1));
                    state.insert_entity(entity, record);
                }
            }

            kinds::CARD_MOVED => {
                if let Some(entity) = payload.entity("entity") {
                    state.set_counter(entity, counters::IN_PLAY, 1);
                }
            }

            kinds::POWER_CHANGED => {
                if let (Some(entity), Some(power)) = (payload.entity("entity"), payload.int(counters::POWER)) {
                    state.set_counter(entity, counters::POWER, power);
                }
            }

            kinds::VOLLEY => {
                if let Some(player) = payload.player("player") {
                    out.push(Consequence::FanOut(
                        FanOut::new(Selector::AllEntities, kinds::DAMAGED, player)
                            .with("amount", payload.int("amount").unwrap_or(1))
                            .with("source", EntityId::player(player)),
                    ));
                }
            }

            kinds::RALLIED => {
                let Some(player) = payload.player("player") else {
                    return ApplyOutcome::done();
                };
                match ctx.choices.get(RALLY_SLOT) {
                    None => {
                        return ApplyOutcome::NeedsInput(vec![InputRequest::new(
                            RALLY_SLOT,
                            player,
                            InputKind::ModePick,
                        )
                        .with_modes(["heal", "energy"])
                        .with_default(Answer::mode("heal"))]);
                    }
                    Some(answer) if answer.mode.as_deref() == Some("energy") => {
                        state.modify_player_state(player, counters::ENERGY, RALLY_ENERGY);
                    }
                    Some(_) => {
                        state.modify_player_state(player, counters::LIFE, RALLY_HEAL);
                    }
                }
            }

            kinds::PLAYER_DEFEATED => {
                if let Some(player) = payload.player("player") {
                    state.eliminate(player);
                    if state.live_player_count() <= 1 {
                        out.push(Consequence::EndGame {
                            reason: "last player standing".to_string(),
                        });
                    }
                }
            }

            _ => {}
        }

        ApplyOutcome::Applied(out)
    }

    fn state_watchers(&self) -> &[StateWatcher] {
        &self.watchers
    }

    fn is_recoverable(&self, _error: &RecursionError) -> bool {
        self.recoverable
    }

    fn has_available_actions(&self, player: PlayerId, state: &GameState) -> bool {
        !self.auto_pass || state.live_entities().any(|(_, unit)| unit.controller == player)
    }
}

fn entity_param(action: &Action, key: &str) -> Result<EntityId, ValidationError> {
    action
        .params
        .entity(key)
        .ok_or_else(|| ValidationError::MissingParam(key.to_string()))
}

/// A fresh state with every player at `life`.
pub fn setup(player_count: usize, life: i64) -> GameState {
    let mut state = GameState::new(player_count);
    for player in PlayerId::all(player_count) {
        state.set_player_state(player, counters::LIFE, life);
        state.set_player_state(player, counters::ENERGY, 0);
    }
    state
}

/// Put a unit into play for `owner`.
pub fn spawn_unit(state: &mut GameState, owner: PlayerId, power: i64, health: i64) -> EntityId {
    let unit = state.spawn_entity(owner);
    state.set_counter(unit, counters::POWER, power);
    state.set_counter(unit, counters::HEALTH, health);
    state.set_counter(unit, counters::IN_PLAY, 1);
    unit
}
