//! Effect operations.
//!
//! A reaction's effects are a closed set of operations, run in order by the
//! [`EffectInterpreter`](super::EffectInterpreter). None of them touch state
//! directly: they emit events, fan out, prevent, rewrite a pending event's
//! payload, or ask a player to choose.

use serde::{Deserialize, Serialize};

use crate::events::{EventType, GroupTag};
use crate::input::{Cost, InputKind};
use crate::triggers::ValueExpr;

use super::selector::Selector;

/// An event to emit, with payload fields computed when the effect runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTemplate {
    pub event_type: EventType,
    pub fields: Vec<(String, ValueExpr)>,
    pub group: Option<GroupTag>,
    pub prevents_group: bool,
}

impl EventTemplate {
    pub fn new(event_type: impl Into<EventType>) -> Self {
        Self {
            event_type: event_type.into(),
            fields: Vec::new(),
            group: None,
            prevents_group: false,
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: ValueExpr) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    #[must_use]
    pub fn in_group(mut self, tag: GroupTag) -> Self {
        self.group = Some(tag);
        self
    }

    #[must_use]
    pub fn preventing_group(mut self) -> Self {
        self.prevents_group = true;
        self
    }
}

/// What happens at expiry when no answer arrived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fallback {
    /// No default; expiry aborts.
    #[default]
    None,
    /// Decline the choice.
    Decline,
    /// Take the first offered targets (or mode).
    FirstOffered,
}

/// A decision the effect list needs before it can continue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceSpec {
    /// Answer key, read back with `ValueExpr::Chosen`.
    pub slot: String,
    pub kind: InputKind,
    /// Who decides. Defaults to the reaction's controller.
    pub chooser: ValueExpr,
    /// Offered entities for target and order picks.
    pub selector: Option<Selector>,
    pub min: usize,
    pub max: usize,
    pub modes: Vec<String>,
    pub optional: bool,
    pub cost: Option<Cost>,
    pub ttl: Option<u64>,
    pub dependent: bool,
    pub fallback: Fallback,
}

impl ChoiceSpec {
    fn base(slot: impl Into<String>, kind: InputKind) -> Self {
        Self {
            slot: slot.into(),
            kind,
            chooser: ValueExpr::Controller,
            selector: None,
            min: 1,
            max: 1,
            modes: Vec::new(),
            optional: false,
            cost: None,
            ttl: None,
            dependent: false,
            fallback: Fallback::None,
        }
    }

    /// Pick one target from `selector`.
    pub fn target(slot: impl Into<String>, selector: Selector) -> Self {
        Self {
            selector: Some(selector),
            ..Self::base(slot, InputKind::TargetSelect)
        }
    }

    /// Order every entity `selector` yields.
    pub fn order(slot: impl Into<String>, selector: Selector) -> Self {
        Self {
            selector: Some(selector),
            ..Self::base(slot, InputKind::OrderSelect)
        }
    }

    pub fn mode<I, S>(slot: impl Into<String>, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            modes: modes.into_iter().map(Into::into).collect(),
            ..Self::base(slot, InputKind::ModePick)
        }
    }

    pub fn pay(slot: impl Into<String>, cost: Cost) -> Self {
        Self {
            cost: Some(cost),
            ..Self::base(slot, InputKind::PayCost)
        }
    }

    pub fn confirm(slot: impl Into<String>) -> Self {
        Self::base(slot, InputKind::Confirm)
    }

    #[must_use]
    pub fn with_count(mut self, min: usize, max: usize) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    #[must_use]
    pub fn chosen_by(mut self, chooser: ValueExpr) -> Self {
        self.chooser = chooser;
        self
    }

    /// The player may decline; declining skips the rest of the effects.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn dependent(mut self) -> Self {
        self.dependent = true;
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }
}

/// One effect operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectOp {
    /// Emit one event.
    Emit(EventTemplate),

    /// Emit one event per entity `selector` yields, binding each id under `bind`.
    FanOut {
        selector: Selector,
        template: EventTemplate,
        bind: String,
    },

    /// Prevent the event that triggered this reaction.
    PreventTriggering,

    /// Prevent the pending event the expression names.
    Prevent(ValueExpr),

    /// Rewrite a payload field of the triggering event before it applies.
    SetPayload { key: String, value: ValueExpr },

    /// Ask a player to choose.
    Choose(ChoiceSpec),
}

impl EffectOp {
    /// Fan a template out over a selector, binding ids as `"target"`.
    pub fn fan_out(selector: Selector, template: EventTemplate) -> Self {
        Self::FanOut {
            selector,
            template,
            bind: "target".to_string(),
        }
    }

    pub fn set_payload(key: impl Into<String>, value: ValueExpr) -> Self {
        Self::SetPayload {
            key: key.into(),
            value,
        }
    }
}
