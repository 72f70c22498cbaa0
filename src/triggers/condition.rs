//! Trigger predicates and value expressions.
//!
//! Rules never embed executable code: conditions are a closed set of
//! [`Predicate`] kinds over [`ValueExpr`]s, evaluated against the current
//! state, the causing event, the reaction's source and controller, and any
//! answers the reaction has collected.

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, GameState, PlayerId, Value};
use crate::events::Event;
use crate::input::Choices;

/// An expression producing a payload value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueExpr {
    /// A literal.
    Const(Value),

    // === Causing Event ===
    /// A payload field of the causing event.
    EventField(String),
    /// The causing event's id.
    EventId,

    // === Reaction Context ===
    /// The reaction's source entity.
    Source,
    /// The reaction's controller.
    Controller,
    /// Whose turn it is.
    ActivePlayer,
    TurnNumber,

    // === State Lookups ===
    /// Owner of the entity the inner expression names.
    OwnerOf(Box<ValueExpr>),
    /// Controller of the entity the inner expression names.
    ControllerOf(Box<ValueExpr>),
    /// A counter of an entity (player counters for player entities).
    Counter { entity: Box<ValueExpr>, key: String },

    // === Answers ===
    /// The `index`-th target answered for `slot`.
    Chosen { slot: String, index: usize },
    /// The mode answered for `slot`.
    ChosenMode(String),

    /// Integer sum; `None` if any term is not an integer.
    Sum(Vec<ValueExpr>),
}

impl ValueExpr {
    #[must_use]
    pub fn int(v: i64) -> Self {
        Self::Const(Value::Int(v))
    }

    #[must_use]
    pub fn field(key: impl Into<String>) -> Self {
        Self::EventField(key.into())
    }

    #[must_use]
    pub fn owner_of(inner: ValueExpr) -> Self {
        Self::OwnerOf(Box::new(inner))
    }

    #[must_use]
    pub fn controller_of(inner: ValueExpr) -> Self {
        Self::ControllerOf(Box::new(inner))
    }

    #[must_use]
    pub fn counter(entity: ValueExpr, key: impl Into<String>) -> Self {
        Self::Counter {
            entity: Box::new(entity),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn chosen(slot: impl Into<String>, index: usize) -> Self {
        Self::Chosen {
            slot: slot.into(),
            index,
        }
    }
}

/// A condition over state, event and reaction context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    Always,
    Never,

    /// Both sides evaluate and name the same value.
    /// Player and entity references compare by entity id.
    Equals(ValueExpr, ValueExpr),

    /// Integer at least `min`.
    AtLeast(ValueExpr, i64),

    /// Integer at most `max`.
    AtMost(ValueExpr, i64),

    /// The causing event carries a payload field.
    HasField(String),

    /// The named entity exists and is alive (players: not eliminated).
    IsAlive(ValueExpr),

    All(Vec<Predicate>),
    Any(Vec<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    #[must_use]
    pub fn equals(left: ValueExpr, right: ValueExpr) -> Self {
        Self::Equals(left, right)
    }

    /// The causing event's `key` field names the reaction's source.
    #[must_use]
    pub fn field_is_source(key: impl Into<String>) -> Self {
        Self::Equals(ValueExpr::EventField(key.into()), ValueExpr::Source)
    }

    #[must_use]
    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// Add another condition with AND.
    #[must_use]
    pub fn and(self, other: Predicate) -> Self {
        match self {
            Self::All(mut conditions) => {
                conditions.push(other);
                Self::All(conditions)
            }
            Self::Always => other,
            _ => Self::All(vec![self, other]),
        }
    }
}

/// Everything an expression may look at.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub state: &'a GameState,
    pub event: Option<&'a Event>,
    pub source: Option<EntityId>,
    pub controller: PlayerId,
    pub choices: &'a Choices,
}

impl<'a> EvalContext<'a> {
    /// Context with no event, no source and no answers.
    #[must_use]
    pub fn new(state: &'a GameState, controller: PlayerId) -> Self {
        Self {
            state,
            event: None,
            source: None,
            controller,
            choices: Choices::none(),
        }
    }

    #[must_use]
    pub fn with_event(mut self, event: &'a Event) -> Self {
        self.event = Some(event);
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: Option<EntityId>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_choices(mut self, choices: &'a Choices) -> Self {
        self.choices = choices;
        self
    }
}

/// Evaluator for expressions and predicates.
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Evaluate an expression; `None` when it does not resolve.
    #[must_use]
    pub fn value(expr: &ValueExpr, ctx: &EvalContext<'_>) -> Option<Value> {
        match expr {
            ValueExpr::Const(v) => Some(v.clone()),

            ValueExpr::EventField(key) => ctx.event.and_then(|e| e.payload.get(key)).cloned(),

            ValueExpr::EventId => ctx.event.map(|e| Value::Event(e.id)),

            ValueExpr::Source => ctx.source.map(Value::Entity),

            ValueExpr::Controller => Some(Value::Player(ctx.controller)),

            ValueExpr::ActivePlayer => Some(Value::Player(ctx.state.active_player)),

            ValueExpr::TurnNumber => Some(Value::Int(i64::from(ctx.state.turn_number))),

            ValueExpr::OwnerOf(inner) => {
                let id = Self::value(inner, ctx)?.as_entity()?;
                ctx.state.owner_of(id).map(Value::Player)
            }

            ValueExpr::ControllerOf(inner) => {
                let id = Self::value(inner, ctx)?.as_entity()?;
                ctx.state.controller_of(id).map(Value::Player)
            }

            ValueExpr::Counter { entity, key } => {
                let id = Self::value(entity, ctx)?.as_entity()?;
                Some(Value::Int(ctx.state.counter(id, key)))
            }

            ValueExpr::Chosen { slot, index } => ctx
                .choices
                .get(slot)
                .and_then(|answer| answer.targets.get(*index))
                .map(|id| Value::Entity(*id)),

            ValueExpr::ChosenMode(slot) => ctx
                .choices
                .get(slot)
                .and_then(|answer| answer.mode.clone())
                .map(Value::Text),

            ValueExpr::Sum(terms) => terms
                .iter()
                .map(|t| Self::value(t, ctx).and_then(|v| v.as_int()))
                .sum::<Option<i64>>()
                .map(Value::Int),
        }
    }

    /// Evaluate an expression that should name an entity.
    #[must_use]
    pub fn entity(expr: &ValueExpr, ctx: &EvalContext<'_>) -> Option<EntityId> {
        Self::value(expr, ctx)?.as_entity()
    }

    /// Evaluate an expression that should name a player.
    ///
    /// Player entities convert to their seat.
    #[must_use]
    pub fn player(expr: &ValueExpr, ctx: &EvalContext<'_>) -> Option<PlayerId> {
        match Self::value(expr, ctx)? {
            Value::Player(p) => Some(p),
            Value::Entity(id) => id.as_player(ctx.state.player_count()),
            _ => None,
        }
    }

    /// Check if a predicate holds.
    #[must_use]
    pub fn evaluate(predicate: &Predicate, ctx: &EvalContext<'_>) -> bool {
        match predicate {
            Predicate::Always => true,

            Predicate::Never => false,

            Predicate::Equals(left, right) => {
                match (Self::value(left, ctx), Self::value(right, ctx)) {
                    (Some(a), Some(b)) => same_value(&a, &b),
                    _ => false,
                }
            }

            Predicate::AtLeast(expr, min) => {
                Self::value(expr, ctx).and_then(|v| v.as_int()).is_some_and(|v| v >= *min)
            }

            Predicate::AtMost(expr, max) => {
                Self::value(expr, ctx).and_then(|v| v.as_int()).is_some_and(|v| v <= *max)
            }

            Predicate::HasField(key) => ctx.event.is_some_and(|e| e.payload.contains_key(key)),

            Predicate::IsAlive(expr) => {
                Self::entity(expr, ctx).is_some_and(|id| ctx.state.is_alive(id))
            }

            Predicate::All(conditions) => conditions.iter().all(|c| Self::evaluate(c, ctx)),

            Predicate::Any(conditions) => conditions.iter().any(|c| Self::evaluate(c, ctx)),

            Predicate::Not(inner) => !Self::evaluate(inner, ctx),
        }
    }

    /// Whether every predicate holds. Empty lists hold.
    #[must_use]
    pub fn all(predicates: &[Predicate], ctx: &EvalContext<'_>) -> bool {
        predicates.iter().all(|p| Self::evaluate(p, ctx))
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Player(_) | Value::Entity(_), Value::Player(_) | Value::Entity(_)) => {
            a.as_entity() == b.as_entity()
        }
        _ => false,
    }
}
