//! Events: domain occurrences flowing through the stack.
//!
//! Rulesets and effects produce [`EventDraft`]s. The resolution loop
//! registers a draft as an [`Event`], which assigns its id, creation order,
//! causal parent and (for grouped drafts) a match-unique [`GroupId`].
//! From then on only the loop changes its status, and before-reactions may
//! rewrite its payload while it is still pending.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::core::{Payload, Value};
use crate::input::Choices;

/// Unique identifier for an event within a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl EventId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event({})", self.0)
    }
}

/// Event type tag.
///
/// Types are plain strings defined by the ruleset. The engine owns a handful
/// of boundary types, available as associated constants.
///
/// ```
/// use stackwise::events::EventType;
///
/// const DAMAGED: EventType = EventType::from_static("Damaged");
///
/// assert_eq!(DAMAGED, EventType::new("Damaged"));
/// assert!(EventType::WILDCARD.is_wildcard());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// Matches every event type when used in a trigger.
    pub const WILDCARD: EventType = EventType::from_static("*");

    pub const MATCH_STARTED: EventType = EventType::from_static("MatchStarted");
    pub const TURN_STARTED: EventType = EventType::from_static("TurnStarted");
    pub const TURN_ENDED: EventType = EventType::from_static("TurnEnded");
    pub const PHASE_STARTED: EventType = EventType::from_static("PhaseStarted");
    pub const PHASE_ENDED: EventType = EventType::from_static("PhaseEnded");
    pub const STEP_STARTED: EventType = EventType::from_static("StepStarted");
    pub const EVENT_PREVENTED: EventType = EventType::from_static("EventPrevented");
    pub const PLAYER_CONCEDED: EventType = EventType::from_static("PlayerConceded");
    pub const GAME_ENDED: EventType = EventType::from_static("GameEnded");

    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for EventType {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for EventType {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Lifecycle status of an event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventStatus {
    #[default]
    Pending,
    Applied,
    Prevented,
    Failed,
}

impl EventStatus {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, EventStatus::Pending)
    }
}

/// Match-unique identifier of an atomic event group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl GroupId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Group({})", self.0)
    }
}

/// Group label local to one batch of drafts.
///
/// Drafts produced by the same resolution step that share a tag end up in the
/// same [`GroupId`]. Tags from different steps never collide.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupTag(pub u32);

/// Why an event ended up prevented.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreventionCause {
    /// Prevented by an effect targeting it.
    Direct,
    /// Prevented because another member of its group was.
    Group { origin: EventId },
}

/// A registered event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub event_type: EventType,
    pub payload: Payload,

    /// The event whose resolution produced this one.
    pub caused_by: Option<EventId>,

    /// Root of the causal chain (the event itself for roots).
    pub chain_root: EventId,

    /// Monotonic creation order.
    pub order: u64,

    pub status: EventStatus,
    pub group: Option<GroupId>,
    pub prevents_group: bool,
    pub prevention: Option<PreventionCause>,

    /// Player answers the state-fold saw when this event applied.
    pub choices: Choices,
}

impl Event {
    #[must_use]
    pub fn is_type(&self, event_type: &EventType) -> bool {
        self.event_type == *event_type
    }

    /// Shorthand for a payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// An event that has not been registered yet.
///
/// ```
/// use stackwise::core::EntityId;
/// use stackwise::events::{EventDraft, GroupTag};
///
/// let created = EventDraft::new("CardCreated")
///     .with("entity", EntityId::new(9))
///     .in_group(GroupTag(1))
///     .preventing_group();
///
/// assert!(created.prevents_group);
/// assert_eq!(created.group, Some(GroupTag(1)));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDraft {
    pub event_type: EventType,
    pub payload: Payload,
    pub group: Option<GroupTag>,
    pub prevents_group: bool,
}

impl EventDraft {
    #[must_use]
    pub fn new(event_type: impl Into<EventType>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: Payload::new(),
            group: None,
            prevents_group: false,
        }
    }

    /// Add a payload field (builder pattern).
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
    pub fn in_group(mut self, tag: GroupTag) -> Self {
        self.group = Some(tag);
        self
    }

    /// Mark that preventing this event prevents its whole group.
    #[must_use]
    pub fn preventing_group(mut self) -> Self {
        self.prevents_group = true;
        self
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&EventType> for EventType {
    fn from(event_type: &EventType) -> Self {
        event_type.clone()
    }
}
