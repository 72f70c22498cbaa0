//! Entity identifiers.
//!
//! Every addressable game object (a player, a creature, a token) carries an
//! `EntityId`. Ids `0..player_count` stand for the players themselves, so a
//! rule that says "deal damage to any target" never needs a second id space
//! for players.
//!
//! ```
//! use stackwise::core::{EntityId, PlayerId};
//!
//! let seat = EntityId::player(PlayerId::new(1));
//! assert_eq!(seat.as_player(2), Some(PlayerId::new(1)));
//! assert_eq!(EntityId::new(7).as_player(2), None);
//! ```

use serde::{Deserialize, Serialize};

use super::player::PlayerId;

/// Identifier for any entity in a match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Create an entity ID from its raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The entity standing for a player seat.
    #[must_use]
    pub const fn player(player: PlayerId) -> Self {
        Self(player.0 as u32)
    }

    /// First id handed out to non-player entities.
    #[must_use]
    pub const fn first_non_player(player_count: usize) -> u32 {
        player_count as u32
    }

    /// Whether this id names a player seat in a match of `player_count`.
    #[must_use]
    pub const fn is_player(self, player_count: usize) -> bool {
        self.0 < player_count as u32
    }

    /// The seat this id stands for, if it is a player entity.
    #[must_use]
    pub fn as_player(self, player_count: usize) -> Option<PlayerId> {
        self.is_player(player_count).then(|| PlayerId::new(self.0 as u8))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl From<PlayerId> for EntityId {
    fn from(player: PlayerId) -> Self {
        Self::player(player)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}
