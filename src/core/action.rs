//! Player actions as they arrive from the transport.
//!
//! An action is an action type plus free-form parameters. The engine only
//! interprets one type itself (`pass`); everything else is handed to the
//! ruleset for validation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::entity::EntityId;
use super::player::PlayerId;
use super::value::{Payload, Value};

/// Action type the engine handles itself: give up priority.
pub const PASS: &str = "pass";

/// A submitted player action.
///
/// ```
/// use stackwise::core::{Action, EntityId, PlayerId};
///
/// let attack = Action::new(PlayerId::new(0), "attack")
///     .with_param("attacker", EntityId::new(2))
///     .with_param("defender", EntityId::new(1));
///
/// assert!(!attack.is_pass());
/// assert!(Action::pass(PlayerId::new(1)).is_pass());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub player: PlayerId,
    pub action_type: String,
    pub params: Payload,
}

impl Action {
    #[must_use]
    pub fn new(player: PlayerId, action_type: impl Into<String>) -> Self {
        Self {
            player,
            action_type: action_type.into(),
            params: Payload::new(),
        }
    }

    /// The priority pass.
    #[must_use]
    pub fn pass(player: PlayerId) -> Self {
        Self::new(player, PASS)
    }

    /// Add a parameter (builder pattern).
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key, value);
        self
    }

    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.action_type == PASS
    }

    /// Entity parameters listed under `key`, in submission order.
    ///
    /// A single entity value is treated as a one-element list.
    #[must_use]
    pub fn entities(&self, key: &str) -> SmallVec<[EntityId; 3]> {
        match self.params.get(key) {
            Some(Value::List(items)) => items.iter().filter_map(Value::as_entity).collect(),
            Some(value) => value.as_entity().into_iter().collect(),
            None => SmallVec::new(),
        }
    }
}
