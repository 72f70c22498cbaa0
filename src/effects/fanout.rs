//! Fan-out and materialization.
//!
//! One logical effect ("deal 1 damage to every unit") becomes one projection
//! event per affected entity. Each projection is registered, folded and
//! discovered against on its own, so per-entity "when damaged" rules fire
//! once per entity rather than once per batch.

use serde::{Deserialize, Serialize};

use crate::core::{EntityId, GameState, Payload, PlayerId, Value};
use crate::events::{Event, EventDraft, EventType, GroupTag};
use crate::input::Choices;
use crate::rules::Ruleset;
use crate::triggers::EvalContext;

use super::selector::Selector;

/// A multi-target consequence awaiting materialization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FanOut {
    pub selector: Selector,
    pub event_type: EventType,
    /// Shared payload of every projection.
    pub payload: Payload,
    /// Key each projection's entity is bound under.
    pub bind: String,
    pub group: Option<GroupTag>,
    pub prevents_group: bool,
    /// Player the selector is evaluated for.
    pub controller: PlayerId,
    pub source: Option<EntityId>,
    pub choices: Choices,
}

impl FanOut {
    pub fn new(selector: Selector, event_type: impl Into<EventType>, controller: PlayerId) -> Self {
        Self {
            selector,
            event_type: event_type.into(),
            payload: Payload::new(),
            bind: "target".to_string(),
            group: None,
            prevents_group: false,
            controller,
            source: None,
            choices: Choices::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key, value);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    #[must_use]
    pub fn bind_as(mut self, key: impl Into<String>) -> Self {
        self.bind = key.into();
        self
    }

    #[must_use]
    pub fn in_group(mut self, tag: GroupTag) -> Self {
        self.group = Some(tag);
        self
    }

    #[must_use]
    pub fn from_source(mut self, source: Option<EntityId>) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_choices(mut self, choices: Choices) -> Self {
        self.choices = choices;
        self
    }
}

pub struct Materializer;

impl Materializer {
    /// Projection drafts for `fan_out`, in ascending entity order.
    ///
    /// `origin` is the event the fan-out came from, visible to selector
    /// expressions. An empty selection yields no drafts.
    pub fn expand<R: Ruleset + ?Sized>(
        ruleset: &R,
        fan_out: &FanOut,
        origin: Option<&Event>,
        state: &GameState,
    ) -> Vec<EventDraft> {
        let mut ctx = EvalContext::new(state, fan_out.controller)
            .with_source(fan_out.source)
            .with_choices(&fan_out.choices);
        if let Some(event) = origin {
            ctx = ctx.with_event(event);
        }

        let mut ids = ruleset.evaluate_selector(&fan_out.selector, &ctx);
        ids.sort_unstable();
        ids.dedup();

        ids.into_iter()
            .map(|id| {
                let mut draft = EventDraft::new(&fan_out.event_type)
                    .with_payload(fan_out.payload.clone())
                    .with(fan_out.bind.as_str(), id);
                draft.group = fan_out.group;
                draft.prevents_group = fan_out.prevents_group;
                draft
            })
            .collect()
    }
}
