//! Reaction instances.
//!
//! A reaction is one firing of a trigger (or a state watcher) against one
//! causing event. Discovery creates it, the stack schedules it, and it is
//! unregistered once its effects ran. A reaction that paused for player input
//! keeps its effect cursor and the answers collected so far.

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, PlayerId};
use crate::effects::EffectOp;
use crate::input::Choices;
use crate::triggers::{LimitKey, Predicate, TriggerId};

use super::event::{Event, EventId};

/// Unique identifier for a reaction within a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReactionId(pub u64);

impl ReactionId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ReactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Reaction({})", self.0)
    }
}

/// When a reaction was scheduled relative to its event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReactionTiming {
    /// Pushed above its event before the event applied.
    Before,
    /// Discovered after its event applied.
    After,
    /// Raised by a state watcher once the stack emptied.
    StateBased,
}

/// A materialized trigger firing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: ReactionId,
    pub trigger_id: TriggerId,
    pub name: String,
    pub source: Option<EntityId>,
    pub controller: PlayerId,
    pub timing: ReactionTiming,

    /// The event this reaction responds to; `None` for state-based reactions.
    pub trigger_event: Option<EventId>,

    /// The causing event as discovery saw it.
    pub event_snapshot: Option<Event>,

    pub conditions: Vec<Predicate>,
    pub effects: Vec<EffectOp>,
    pub limit_key: Option<LimitKey>,

    /// Index of the next effect to run.
    pub cursor: usize,

    /// Answers collected from player inputs.
    pub choices: Choices,
}

impl Reaction {
    /// Whether every effect has run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.effects.len()
    }
}
