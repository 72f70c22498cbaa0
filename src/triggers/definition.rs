//! Trigger definitions as the ruleset declares them.

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, PlayerId};
use crate::effects::EffectOp;
use crate::events::{EventType, ReactionTiming};

use super::condition::Predicate;

/// Declared rule id of a trigger.
///
/// Discovery breaks ties by this id, so it doubles as the rule's
/// precedence: lower ids fire first among equally-placed reactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub u32);

impl TriggerId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for TriggerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Trigger({})", self.0)
    }
}

/// When the trigger fires relative to its event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerTiming {
    /// Before the event applies; may prevent it or rewrite its payload.
    Before,
    /// After the event applied.
    #[default]
    After,
}

impl From<TriggerTiming> for ReactionTiming {
    fn from(timing: TriggerTiming) -> Self {
        match timing {
            TriggerTiming::Before => ReactionTiming::Before,
            TriggerTiming::After => ReactionTiming::After,
        }
    }
}

/// Scope of a firing cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireScope {
    /// Resets when the turn ends.
    PerTurn,
    /// Never resets: counts for the source's whole lifetime in the match.
    PerSource,
    /// Resets when the causal chain that produced the event ends.
    PerEvent,
}

/// At most `max` firings per scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FireLimit {
    pub scope: FireScope,
    pub max: u32,
}

/// A rule-bound trigger.
///
/// ```
/// use stackwise::core::{EntityId, PlayerId};
/// use stackwise::effects::{EffectOp, EventTemplate};
/// use stackwise::triggers::{FireScope, Predicate, TriggerDefinition, TriggerId, ValueExpr};
///
/// // "Whenever this creature is dealt damage, its owner draws a card. Once per turn."
/// let trigger = TriggerDefinition::new(TriggerId::new(10), "Thick Hide", "Damaged")
///     .with_source(EntityId::new(4))
///     .with_controller(PlayerId::new(1))
///     .when(Predicate::field_is_source("target"))
///     .with_effect(EffectOp::Emit(
///         EventTemplate::new("CardDrawn")
///             .with("player", ValueExpr::owner_of(ValueExpr::Source)),
///     ))
///     .limited(FireScope::PerTurn, 1);
///
/// assert!(trigger.listens_to(&"Damaged".into()));
/// assert!(!trigger.listens_to(&"Healed".into()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDefinition {
    pub id: TriggerId,

    /// Human-readable name (for logs and traces).
    pub name: String,

    /// Event types this trigger listens for; `*` matches every type.
    pub event_types: Vec<EventType>,

    pub timing: TriggerTiming,

    /// Entity the trigger belongs to; `None` for global rules.
    pub source: Option<EntityId>,

    /// Declared controller. The source's current controller wins when the
    /// source is an entity in play.
    pub controller: Option<PlayerId>,

    /// All must hold for the trigger to fire.
    pub conditions: Vec<Predicate>,

    pub effects: Vec<EffectOp>,

    pub limit: Option<FireLimit>,

    /// Position among the triggers of the same source.
    pub declaration_index: u32,

    pub enabled: bool,
}

impl TriggerDefinition {
    pub fn new(id: TriggerId, name: impl Into<String>, event_type: impl Into<EventType>) -> Self {
        Self {
            id,
            name: name.into(),
            event_types: vec![event_type.into()],
            timing: TriggerTiming::default(),
            source: None,
            controller: None,
            conditions: Vec::new(),
            effects: Vec::new(),
            limit: None,
            declaration_index: 0,
            enabled: true,
        }
    }

    /// Listen for another event type (builder pattern).
    #[must_use]
    pub fn also_on(mut self, event_type: impl Into<EventType>) -> Self {
        let event_type = event_type.into();
        if !self.event_types.contains(&event_type) {
            self.event_types.push(event_type);
        }
        self
    }

    #[must_use]
    pub fn with_timing(mut self, timing: TriggerTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Fire before the event applies.
    #[must_use]
    pub fn before(self) -> Self {
        self.with_timing(TriggerTiming::Before)
    }

    #[must_use]
    pub fn with_source(mut self, source: EntityId) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_controller(mut self, controller: PlayerId) -> Self {
        self.controller = Some(controller);
        self
    }

    /// Add a condition (builder pattern).
    #[must_use]
    pub fn when(mut self, condition: Predicate) -> Self {
        self.conditions.push(condition);
        self
    }

    #[must_use]
    pub fn with_effect(mut self, effect: EffectOp) -> Self {
        self.effects.push(effect);
        self
    }

    #[must_use]
    pub fn limited(mut self, scope: FireScope, max: u32) -> Self {
        self.limit = Some(FireLimit { scope, max });
        self
    }

    #[must_use]
    pub fn declared_at(mut self, index: u32) -> Self {
        self.declaration_index = index;
        self
    }

    /// Whether this trigger listens for `event_type`.
    #[must_use]
    pub fn listens_to(&self, event_type: &EventType) -> bool {
        self.event_types
            .iter()
            .any(|t| t.is_wildcard() || t == event_type)
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.event_types.iter().any(EventType::is_wildcard)
    }
}
