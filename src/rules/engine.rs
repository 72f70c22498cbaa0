//! The ruleset seam.
//!
//! The engine never interprets game concepts. Everything game-specific comes
//! through [`Ruleset`]:
//! - which actions are legal and what events they produce
//! - which triggers listen to an event type
//! - the turn structure
//! - how a selector resolves to entities
//! - how an applied event folds into state

use serde::{Deserialize, Serialize};

use crate::core::{Action, EntityId, GameState, MatchRng, PlayerId, Value};
use crate::effects::{FanOut, Selector, SelectorEvaluator};
use crate::error::{RecursionError, ValidationError};
use crate::events::{Event, EventDraft, EventId, EventType};
use crate::input::{Choices, InputRequest};
use crate::triggers::{EvalContext, TriggerDefinition};

use super::turn::TurnStructure;
use super::watcher::StateWatcher;

/// What a validated action turns into.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedIntent {
    /// Pushed so that the first resolves first.
    pub events: Vec<EventDraft>,
}

impl ResolvedIntent {
    #[must_use]
    pub fn single(event: EventDraft) -> Self {
        Self {
            events: vec![event],
        }
    }

    #[must_use]
    pub fn many(events: Vec<EventDraft>) -> Self {
        Self { events }
    }
}

/// Something an applied event or a resolved reaction asks the engine to do.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consequence {
    /// Push a new event caused by the resolving item.
    Emit(EventDraft),
    /// Materialize one event per selected entity.
    FanOut(FanOut),
    /// Prevent a pending event (and its group, if it propagates).
    Prevent(EventId),
    /// Rewrite a pending event's payload field.
    SetPayload {
        event: EventId,
        key: String,
        value: Value,
    },
    /// End the match.
    EndGame { reason: String },
}

/// Result of folding an event into state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(Vec<Consequence>),
    /// The fold needs decisions first. It must not have touched state or the
    /// RNG; it is called again with the answers.
    NeedsInput(Vec<InputRequest>),
}

impl ApplyOutcome {
    #[must_use]
    pub fn done() -> Self {
        Self::Applied(Vec::new())
    }
}

/// Per-call context for [`Ruleset::apply_event`].
pub struct ApplyContext<'a> {
    /// The match RNG; the only source of randomness.
    pub rng: &'a mut MatchRng,
    /// Answers collected for this event so far.
    pub choices: &'a Choices,
}

/// A game's rules, as the resolution engine sees them.
pub trait Ruleset {
    /// Check an action and translate it into events.
    fn validate_action(
        &self,
        action: &Action,
        state: &GameState,
    ) -> Result<ResolvedIntent, ValidationError>;

    /// Triggers that may react to `event_type`, including wildcard listeners.
    fn triggers_for_event_type(&self, event_type: &EventType) -> Vec<&TriggerDefinition>;

    fn turn_structure(&self) -> &TurnStructure;

    /// Resolve a selector. Built-in kinds are handled by default; override to
    /// support `Selector::Named`.
    fn evaluate_selector(&self, selector: &Selector, ctx: &EvalContext<'_>) -> Vec<EntityId> {
        SelectorEvaluator::evaluate(selector, ctx)
    }

    /// Fold an event into state.
    fn apply_event(
        &self,
        event: &Event,
        state: &mut GameState,
        ctx: &mut ApplyContext<'_>,
    ) -> ApplyOutcome;

    /// Watchers checked whenever the stack empties after a state change.
    fn state_watchers(&self) -> &[StateWatcher] {
        &[]
    }

    /// Whether the match may continue after a resolution guard trips.
    fn is_recoverable(&self, _error: &RecursionError) -> bool {
        false
    }

    /// Whether `player` could act in the current window. When not, the
    /// engine passes priority for them.
    fn has_available_actions(&self, _player: PlayerId, _state: &GameState) -> bool {
        true
    }
}
