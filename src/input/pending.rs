//! Pending input records and answers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::core::{EntityId, PlayerId};

/// Identifier for a pending input. Monotonic per match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PendingInputId(pub u64);

impl PendingInputId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PendingInputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Input({})", self.0)
    }
}

/// What kind of decision is requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    /// Pick between `min` and `max` of the offered entities.
    TargetSelect,
    /// Order every offered entity.
    OrderSelect,
    /// Pick one of the offered modes.
    ModePick,
    /// Agree to pay a cost.
    PayCost,
    /// Yes or no.
    Confirm,
}

/// A resource cost checked when a `PayCost` input is answered.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cost {
    /// Player counter paid from.
    pub resource: String,
    pub amount: i64,
}

impl Cost {
    #[must_use]
    pub fn new(resource: impl Into<String>, amount: i64) -> Self {
        Self {
            resource: resource.into(),
            amount,
        }
    }
}

/// Constraints an answer is validated against.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputConstraints {
    /// Offered entities, ascending.
    pub choices: Vec<EntityId>,
    pub min: usize,
    pub max: usize,
    pub modes: Vec<String>,
    /// Whether the input may be declined.
    pub optional: bool,
    pub cost: Option<Cost>,
}

/// A request for input, produced by an effect or a state fold.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRequest {
    /// Key the answer is delivered under.
    pub slot: String,
    pub players: Vec<PlayerId>,
    pub kind: InputKind,
    pub constraints: InputConstraints,
    /// Ticks until expiry; `None` never expires.
    pub ttl: Option<u64>,
    /// Answer used by the `DefaultAnswer` expiry policy.
    pub default_answer: Option<Answer>,
    /// Open only after every earlier input of the same step is answered.
    pub dependent: bool,
}

impl InputRequest {
    #[must_use]
    pub fn new(slot: impl Into<String>, player: PlayerId, kind: InputKind) -> Self {
        Self {
            slot: slot.into(),
            players: vec![player],
            kind,
            constraints: InputConstraints {
                min: 1,
                max: 1,
                ..InputConstraints::default()
            },
            ttl: None,
            default_answer: None,
            dependent: false,
        }
    }

    #[must_use]
    pub fn with_choices(mut self, choices: Vec<EntityId>) -> Self {
        self.constraints.choices = choices;
        self
    }

    #[must_use]
    pub fn with_count(mut self, min: usize, max: usize) -> Self {
        self.constraints.min = min;
        self.constraints.max = max;
        self
    }

    #[must_use]
    pub fn with_modes<I, S>(mut self, modes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints.modes = modes.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_cost(mut self, cost: Cost) -> Self {
        self.constraints.cost = Some(cost);
        self
    }

    #[must_use]
    pub fn optional(mut self) -> Self {
        self.constraints.optional = true;
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn with_default(mut self, answer: Answer) -> Self {
        self.default_answer = Some(answer);
        self
    }

    #[must_use]
    pub fn dependent(mut self) -> Self {
        self.dependent = true;
        self
    }
}

/// An open input, as announced to players.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInput {
    pub id: PendingInputId,
    pub slot: String,
    pub for_players: Vec<PlayerId>,
    pub kind: InputKind,
    pub constraints: InputConstraints,
    /// Match-clock tick at which the input expires.
    pub expires_at: Option<u64>,
    pub default_answer: Option<Answer>,
}

/// A player's answer to a pending input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// `false` declines an optional input.
    pub activate: bool,
    /// Chosen targets, or the full order for `OrderSelect`.
    pub targets: SmallVec<[EntityId; 4]>,
    pub mode: Option<String>,
}

impl Answer {
    /// Accept with the given targets (or order).
    pub fn targets(targets: impl IntoIterator<Item = EntityId>) -> Self {
        Self {
            activate: true,
            targets: targets.into_iter().collect(),
            mode: None,
        }
    }

    pub fn mode(mode: impl Into<String>) -> Self {
        Self {
            activate: true,
            targets: SmallVec::new(),
            mode: Some(mode.into()),
        }
    }

    /// Accept with nothing chosen (confirm, pay).
    #[must_use]
    pub fn activate() -> Self {
        Self {
            activate: true,
            targets: SmallVec::new(),
            mode: None,
        }
    }

    #[must_use]
    pub fn decline() -> Self {
        Self {
            activate: false,
            targets: SmallVec::new(),
            mode: None,
        }
    }
}

static NO_CHOICES: Choices = Choices::new();

/// Answers collected by one resolution step, keyed by slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Choices(BTreeMap<String, Answer>);

impl Choices {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Shared empty set.
    #[must_use]
    pub fn none() -> &'static Choices {
        &NO_CHOICES
    }

    pub fn insert(&mut self, slot: impl Into<String>, answer: Answer) {
        self.0.insert(slot.into(), answer);
    }

    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&Answer> {
        self.0.get(slot)
    }

    #[must_use]
    pub fn contains(&self, slot: &str) -> bool {
        self.0.contains_key(slot)
    }

    /// Whether `slot` was answered with a decline.
    #[must_use]
    pub fn is_declined(&self, slot: &str) -> bool {
        self.get(slot).is_some_and(|answer| !answer.activate)
    }

    /// Take every answer of `other`, replacing answers to the same slot.
    pub fn merge(&mut self, other: Choices) {
        self.0.extend(other.0);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.0.iter().map(|(slot, answer)| (slot.as_str(), answer))
    }
}
