//! Trigger discovery.
//!
//! Given an event and the current state, find the reactions that must fire
//! before or after it, in a deterministic total order:
//!
//! 1. reactions whose source is controlled by the active player first,
//! 2. then by declared rule id,
//! 3. then by source id,
//! 4. then by declaration order within a source.
//!
//! Identical (state, event) inputs always produce the same list. Limiter caps
//! are applied in that order, so which of several capped reactions survives is
//! reproducible too.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::{EntityId, GameState, PlayerId};
use crate::error::RecursionError;
use crate::events::{Event, EventId, Reaction, ReactionId, ReactionTiming};
use crate::input::Choices;
use crate::rules::{Ruleset, StateWatcher};

use super::condition::{ConditionEvaluator, EvalContext};
use super::definition::{TriggerDefinition, TriggerId, TriggerTiming};
use super::limiter::{LimitKey, LimiterTracker};

/// One discovery pass, for traces and replay comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRecord {
    /// The event discovered against; `None` for state-watcher passes.
    pub event: Option<EventId>,
    pub timing: ReactionTiming,
    /// Fired (rule, source) pairs in scheduling order.
    pub fired: Vec<(TriggerId, Option<EntityId>)>,
}

impl DiscoveryRecord {
    #[must_use]
    pub fn new(event: Option<EventId>, timing: ReactionTiming, reactions: &[Reaction]) -> Self {
        Self {
            event,
            timing,
            fired: reactions.iter().map(|r| (r.trigger_id, r.source)).collect(),
        }
    }
}

/// Sort key for discovered reactions.
type OrderKey = (bool, TriggerId, Option<EntityId>, u32);

/// Discovery over a ruleset's triggers.
pub struct DiscoveryIndex<'r, R: Ruleset + ?Sized> {
    ruleset: &'r R,
    max_reactions_per_event: usize,
}

impl<'r, R: Ruleset + ?Sized> DiscoveryIndex<'r, R> {
    pub fn new(ruleset: &'r R, max_reactions_per_event: usize) -> Self {
        Self {
            ruleset,
            max_reactions_per_event,
        }
    }

    /// Reactions that must resolve before `event` applies.
    pub fn discover_before(
        &self,
        event: &Event,
        state: &GameState,
        limiter: &mut LimiterTracker,
    ) -> Result<Vec<Reaction>, RecursionError> {
        self.discover(event, state, limiter, TriggerTiming::Before)
    }

    /// Reactions to an event that has just applied.
    pub fn discover_after(
        &self,
        event: &Event,
        state: &GameState,
        limiter: &mut LimiterTracker,
    ) -> Result<Vec<Reaction>, RecursionError> {
        self.discover(event, state, limiter, TriggerTiming::After)
    }

    fn discover(
        &self,
        event: &Event,
        state: &GameState,
        limiter: &mut LimiterTracker,
        timing: TriggerTiming,
    ) -> Result<Vec<Reaction>, RecursionError> {
        let mut candidates: Vec<(OrderKey, &TriggerDefinition, Option<PlayerId>)> = self
            .ruleset
            .triggers_for_event_type(&event.event_type)
            .into_iter()
            .filter(|def| def.enabled && def.timing == timing && def.listens_to(&event.event_type))
            .filter_map(|def| {
                let source_controller = source_controller(def.source, def.controller, state);
                let ctx = EvalContext::new(state, source_controller.unwrap_or(state.active_player))
                    .with_event(event)
                    .with_source(def.source);
                if !ConditionEvaluator::all(&def.conditions, &ctx) {
                    trace!(trigger = %def.id, event = %event.id, "conditions not met");
                    return None;
                }
                let key = order_key(source_controller, state, def.id, def.source, def.declaration_index);
                Some((key, def, source_controller))
            })
            .collect();

        candidates.sort_by_key(|(key, _, _)| *key);

        let mut reactions = Vec::with_capacity(candidates.len());
        for (_, def, source_controller) in candidates {
            let limit_key = match def.limit {
                Some(limit) => {
                    let key = LimitKey::new(def.id, def.source, limit.scope, Some(event.chain_root));
                    if !limiter.try_fire(key, &limit) {
                        continue;
                    }
                    Some(key)
                }
                None => None,
            };

            reactions.push(Reaction {
                id: ReactionId::new(0),
                trigger_id: def.id,
                name: def.name.clone(),
                source: def.source,
                controller: source_controller.unwrap_or(state.active_player),
                timing: timing.into(),
                trigger_event: Some(event.id),
                event_snapshot: Some(event.clone()),
                conditions: def.conditions.clone(),
                effects: def.effects.clone(),
                limit_key,
                cursor: 0,
                choices: Choices::default(),
            });
        }

        if reactions.len() > self.max_reactions_per_event {
            return Err(RecursionError::ReactionsPerEvent {
                event: event.id,
                limit: self.max_reactions_per_event,
            });
        }

        if !reactions.is_empty() {
            debug!(
                event = %event.id,
                event_type = %event.event_type,
                ?timing,
                count = reactions.len(),
                "discovered reactions"
            );
        }
        Ok(reactions)
    }

    /// State watchers whose condition currently holds, as state-based reactions.
    #[must_use]
    pub fn discover_state_based(&self, state: &GameState) -> Vec<Reaction> {
        let mut candidates: Vec<(OrderKey, &StateWatcher, Option<PlayerId>)> = self
            .ruleset
            .state_watchers()
            .iter()
            .filter_map(|watcher| {
                let source_controller = source_controller(watcher.source, watcher.controller, state);
                let ctx = EvalContext::new(state, source_controller.unwrap_or(state.active_player))
                    .with_source(watcher.source);
                if !ConditionEvaluator::evaluate(&watcher.condition, &ctx) {
                    return None;
                }
                let key = order_key(
                    source_controller,
                    state,
                    watcher.id,
                    watcher.source,
                    watcher.declaration_index,
                );
                Some((key, watcher, source_controller))
            })
            .collect();

        candidates.sort_by_key(|(key, _, _)| *key);

        candidates
            .into_iter()
            .map(|(_, watcher, source_controller)| Reaction {
                id: ReactionId::new(0),
                trigger_id: watcher.id,
                name: watcher.name.clone(),
                source: watcher.source,
                controller: source_controller.unwrap_or(state.active_player),
                timing: ReactionTiming::StateBased,
                trigger_event: None,
                event_snapshot: None,
                conditions: vec![watcher.condition.clone()],
                effects: watcher.effects.clone(),
                limit_key: None,
                cursor: 0,
                choices: Choices::default(),
            })
            .collect()
    }
}

/// Controller of a trigger's source: the entity's current controller when it
/// is in play, else the declared one.
fn source_controller(
    source: Option<EntityId>,
    declared: Option<PlayerId>,
    state: &GameState,
) -> Option<PlayerId> {
    source
        .and_then(|id| state.controller_of(id))
        .or(declared)
}

fn order_key(
    source_controller: Option<PlayerId>,
    state: &GameState,
    id: TriggerId,
    source: Option<EntityId>,
    declaration_index: u32,
) -> OrderKey {
    let not_active = source_controller != Some(state.active_player);
    (not_active, id, source, declaration_index)
}
