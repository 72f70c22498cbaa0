//! Match state folded from applied events.
//!
//! `GameState` is the data the ruleset's state-fold mutates. The engine
//! itself only touches the turn bookkeeping (turn number, active player,
//! phase and step position, eliminations, game over) when it applies its own
//! boundary events.
//!
//! ## State Values (i64 only)
//!
//! Player, turn and entity counters are plain `i64`s keyed by name. Games
//! define the keys; booleans are 0/1 and references are raw ids.
//!
//! ## Hashing
//!
//! `state_hash` digests a canonical form of the state (sorted keys, entities in
//! id order) so two states built through different but equivalent paths hash
//! the same. Replay equality is checked through it.

use std::collections::BTreeMap;
use std::hash::Hasher;

use im::OrdMap;
use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use super::entity::EntityId;
use super::player::{PlayerId, PlayerMap};

/// A non-player entity: who owns it, who controls it, and its counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub owner: PlayerId,
    pub controller: PlayerId,
    pub alive: bool,
    pub counters: BTreeMap<String, i64>,
}

impl EntityRecord {
    #[must_use]
    pub fn new(owner: PlayerId) -> Self {
        Self {
            owner,
            controller: owner,
            alive: true,
            counters: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn counter(&self, key: &str) -> i64 {
        self.counters.get(key).copied().unwrap_or(0)
    }
}

/// Complete state of one match.
///
/// Entity records live in an `im::OrdMap`: iteration is in id order and
/// snapshots for replay comparison are O(1).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameState {
    player_count: usize,

    // === Turn Structure ===
    /// Turn number (starts at 0 before the first `TurnStarted`).
    pub turn_number: u32,

    /// Whose turn it is.
    pub active_player: PlayerId,

    /// Position inside the turn structure.
    pub phase_index: usize,
    pub step_index: usize,

    // === Counters ===
    /// Per-player counters (life, cards drawn, resources).
    pub player_state: PlayerMap<FxHashMap<String, i64>>,

    /// Per-turn counters, cleared when a turn starts.
    pub turn_state: FxHashMap<String, i64>,

    entities: OrdMap<EntityId, EntityRecord>,
    next_entity_id: u32,

    // === Outcome ===
    eliminated: PlayerMap<bool>,
    pub game_over: bool,
}

impl GameState {
    /// Create an empty state. Player 0 is active.
    ///
    /// Panics unless `player_count` is in `1..=255`.
    #[must_use]
    pub fn new(player_count: usize) -> Self {
        Self {
            player_count,
            turn_number: 0,
            active_player: PlayerId::new(0),
            phase_index: 0,
            step_index: 0,
            player_state: PlayerMap::with_default(player_count),
            turn_state: FxHashMap::default(),
            entities: OrdMap::new(),
            next_entity_id: EntityId::first_non_player(player_count),
            eliminated: PlayerMap::with_value(player_count, false),
            game_over: false,
        }
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.player_count
    }

    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> {
        PlayerId::all(self.player_count)
    }

    // === Player State ===

    #[must_use]
    pub fn get_player_state(&self, player: PlayerId, key: &str, default: i64) -> i64 {
        self.player_state
            .get(player)
            .and_then(|values| values.get(key).copied())
            .unwrap_or(default)
    }

    pub fn set_player_state(&mut self, player: PlayerId, key: impl Into<String>, value: i64) {
        if let Some(values) = self.player_state.get_mut(player) {
            values.insert(key.into(), value);
        }
    }

    /// Add `delta` to a player counter and return the new value.
    pub fn modify_player_state(&mut self, player: PlayerId, key: &str, delta: i64) -> i64 {
        let value = self.get_player_state(player, key, 0) + delta;
        self.set_player_state(player, key, value);
        value
    }

    // === Turn State ===

    #[must_use]
    pub fn get_turn_state(&self, key: &str, default: i64) -> i64 {
        self.turn_state.get(key).copied().unwrap_or(default)
    }

    pub fn set_turn_state(&mut self, key: impl Into<String>, value: i64) {
        self.turn_state.insert(key.into(), value);
    }

    // === Entities ===

    /// Id the next `spawn_entity` call will hand out.
    #[must_use]
    pub fn peek_next_entity(&self) -> EntityId {
        EntityId::new(self.next_entity_id)
    }

    /// Create a new entity owned and controlled by `owner`.
    pub fn spawn_entity(&mut self, owner: PlayerId) -> EntityId {
        let id = EntityId::new(self.next_entity_id);
        self.insert_entity(id, EntityRecord::new(owner));
        id
    }

    /// Insert an entity under a specific id, keeping the allocator ahead of it.
    pub fn insert_entity(&mut self, id: EntityId, record: EntityRecord) {
        self.next_entity_id = self.next_entity_id.max(id.raw() + 1);
        self.entities.insert(id, record);
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.entities.get_mut(&id)
    }

    /// Live non-player entities in id order.
    pub fn live_entities(&self) -> impl Iterator<Item = (EntityId, &EntityRecord)> {
        self.entities
            .iter()
            .filter(|(_, record)| record.alive)
            .map(|(id, record)| (*id, record))
    }

    /// Counter of an entity; players read from their player state.
    #[must_use]
    pub fn counter(&self, id: EntityId, key: &str) -> i64 {
        match id.as_player(self.player_count) {
            Some(player) => self.get_player_state(player, key, 0),
            None => self.entity(id).map_or(0, |record| record.counter(key)),
        }
    }

    pub fn set_counter(&mut self, id: EntityId, key: &str, value: i64) {
        match id.as_player(self.player_count) {
            Some(player) => self.set_player_state(player, key, value),
            None => {
                if let Some(record) = self.entity_mut(id) {
                    record.counters.insert(key.to_string(), value);
                }
            }
        }
    }

    /// Add `delta` to a counter and return the new value.
    pub fn add_counter(&mut self, id: EntityId, key: &str, delta: i64) -> i64 {
        let value = self.counter(id, key) + delta;
        self.set_counter(id, key, value);
        value
    }

    /// Owner of an entity. Player entities own themselves.
    #[must_use]
    pub fn owner_of(&self, id: EntityId) -> Option<PlayerId> {
        id.as_player(self.player_count)
            .or_else(|| self.entity(id).map(|record| record.owner))
    }

    /// Current controller of an entity. Player entities control themselves.
    #[must_use]
    pub fn controller_of(&self, id: EntityId) -> Option<PlayerId> {
        id.as_player(self.player_count)
            .or_else(|| self.entity(id).map(|record| record.controller))
    }

    /// Whether an entity currently exists and is alive.
    #[must_use]
    pub fn is_alive(&self, id: EntityId) -> bool {
        match id.as_player(self.player_count) {
            Some(player) => !self.is_eliminated(player),
            None => self.entity(id).is_some_and(|record| record.alive),
        }
    }

    pub fn destroy_entity(&mut self, id: EntityId) {
        if let Some(record) = self.entity_mut(id) {
            record.alive = false;
        }
    }

    // === Players ===

    #[must_use]
    pub fn is_eliminated(&self, player: PlayerId) -> bool {
        self.eliminated.get(player).copied().unwrap_or(true)
    }

    pub fn eliminate(&mut self, player: PlayerId) {
        if let Some(flag) = self.eliminated.get_mut(player) {
            *flag = true;
        }
    }

    /// Players still in the match, in seat order.
    pub fn live_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.player_ids().filter(|p| !self.is_eliminated(*p))
    }

    #[must_use]
    pub fn live_player_count(&self) -> usize {
        self.live_players().count()
    }

    /// The next live seat after `player`, wrapping around.
    ///
    /// Returns `player` itself when nobody else is left.
    #[must_use]
    pub fn next_live_player(&self, player: PlayerId) -> PlayerId {
        let mut candidate = player.next(self.player_count);
        for _ in 0..self.player_count {
            if !self.is_eliminated(candidate) {
                return candidate;
            }
            candidate = candidate.next(self.player_count);
        }
        player
    }

    // === Turn Advancement ===

    /// Enter a new turn: set the turn number and active player, reset the
    /// position to the first step and clear per-turn counters.
    pub fn begin_turn(&mut self, turn_number: u32, active_player: PlayerId) {
        self.turn_number = turn_number;
        self.active_player = active_player;
        self.phase_index = 0;
        self.step_index = 0;
        self.turn_state.clear();
    }

    // === Hashing ===

    /// Deterministic digest of the canonical state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let canonical = CanonicalState {
            player_count: self.player_count,
            turn_number: self.turn_number,
            active_player: self.active_player,
            phase_index: self.phase_index,
            step_index: self.step_index,
            player_state: self
                .player_state
                .iter()
                .map(|(_, values)| sorted(values))
                .collect(),
            turn_state: sorted(&self.turn_state),
            entities: self.entities.iter().collect(),
            next_entity_id: self.next_entity_id,
            eliminated: self.eliminated.iter().map(|(_, flag)| *flag).collect(),
            game_over: self.game_over,
        };

        let bytes = bincode::serialize(&canonical).unwrap_or_default();
        let mut hasher = FxHasher::default();
        hasher.write(&bytes);
        hasher.finish()
    }
}

#[derive(Serialize)]
struct CanonicalState<'a> {
    player_count: usize,
    turn_number: u32,
    active_player: PlayerId,
    phase_index: usize,
    step_index: usize,
    player_state: Vec<BTreeMap<&'a str, i64>>,
    turn_state: BTreeMap<&'a str, i64>,
    entities: Vec<(&'a EntityId, &'a EntityRecord)>,
    next_entity_id: u32,
    eliminated: Vec<bool>,
    game_over: bool,
}

fn sorted(values: &FxHashMap<String, i64>) -> BTreeMap<&str, i64> {
    values.iter().map(|(k, v)| (k.as_str(), *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "Must have at least 1 player")]
    fn test_zero_seats_rejected() {
        let _ = GameState::new(0);
    }

    #[test]
    fn test_player_counters() {
        let mut state = GameState::new(2);
        state.set_player_state(PlayerId::new(0), "life", 20);

        assert_eq!(state.get_player_state(PlayerId::new(0), "life", 0), 20);
        assert_eq!(state.modify_player_state(PlayerId::new(0), "life", -3), 17);
        assert_eq!(state.get_player_state(PlayerId::new(1), "life", 99), 99);
    }

    #[test]
    fn test_spawn_entity_skips_player_ids() {
        let mut state = GameState::new(3);
        let first = state.spawn_entity(PlayerId::new(1));
        let second = state.spawn_entity(PlayerId::new(2));

        assert_eq!(first, EntityId::new(3));
        assert_eq!(second, EntityId::new(4));
        assert_eq!(state.owner_of(first), Some(PlayerId::new(1)));
        assert_eq!(state.peek_next_entity(), EntityId::new(5));
    }

    #[test]
    fn test_counters_route_players_and_entities() {
        let mut state = GameState::new(2);
        let creature = state.spawn_entity(PlayerId::new(0));

        state.set_counter(EntityId::new(1), "life", 20);
        state.add_counter(EntityId::new(1), "life", -2);
        state.add_counter(creature, "damage", 1);

        assert_eq!(state.get_player_state(PlayerId::new(1), "life", 0), 18);
        assert_eq!(state.counter(creature, "damage"), 1);
        assert_eq!(state.controller_of(EntityId::new(0)), Some(PlayerId::new(0)));
    }

    #[test]
    fn test_next_live_player_skips_eliminated() {
        let mut state = GameState::new(4);
        state.eliminate(PlayerId::new(1));
        state.eliminate(PlayerId::new(2));

        assert_eq!(state.next_live_player(PlayerId::new(0)), PlayerId::new(3));
        assert_eq!(state.next_live_player(PlayerId::new(3)), PlayerId::new(0));
        assert_eq!(state.live_player_count(), 2);
        assert!(!state.is_alive(EntityId::new(2)));
    }

    #[test]
    fn test_begin_turn_clears_turn_state() {
        let mut state = GameState::new(2);
        state.set_turn_state("attacks", 2);
        state.phase_index = 1;

        state.begin_turn(2, PlayerId::new(1));

        assert_eq!(state.turn_number, 2);
        assert_eq!(state.active_player, PlayerId::new(1));
        assert_eq!(state.phase_index, 0);
        assert_eq!(state.get_turn_state("attacks", 0), 0);
    }

    #[test]
    fn test_state_hash_is_order_independent() {
        let mut a = GameState::new(2);
        a.set_player_state(PlayerId::new(0), "life", 20);
        a.set_player_state(PlayerId::new(0), "mana", 3);

        let mut b = GameState::new(2);
        b.set_player_state(PlayerId::new(0), "mana", 3);
        b.set_player_state(PlayerId::new(0), "life", 20);

        assert_eq!(a.state_hash(), b.state_hash());

        b.set_player_state(PlayerId::new(0), "life", 19);
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut state = GameState::new(2);
        let creature = state.spawn_entity(PlayerId::new(0));
        let snapshot = state.clone();

        state.destroy_entity(creature);

        assert!(!state.is_alive(creature));
        assert!(snapshot.is_alive(creature));
    }
}
