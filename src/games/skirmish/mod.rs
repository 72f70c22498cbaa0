//! Skirmish: a small ruleset for exercising the engine.
//!
//! Players start with life and may control units (entities with `power` and
//! `health` counters). On their turn they may:
//! - `attack` with a unit they control (`Attack` → `CombatResolved` → `Damaged`)
//! - `activate` a counter-ability naming a pending event, preventing it
//! - `create` a unit, producing an atomic `CardCreated`/`CardMoved`/`PowerChanged` group
//! - `volley`, dealing damage to every unit through a fan-out
//! - `rally`, picking between healing and energy through a mode input
//! - `echo`, an event with no effect of its own, for rules that feed on it
//!
//! A player whose life drops to zero is defeated by a state watcher; the last
//! player standing wins. Units get their abilities from the trigger helpers
//! in [`triggers`].

mod ruleset;
pub mod triggers;

pub use ruleset::{setup, spawn_unit, Skirmish};

/// Action type names.
pub mod actions {
    pub const ATTACK: &str = "attack";
    pub const ACTIVATE: &str = "activate";
    pub const CREATE: &str = "create";
    pub const VOLLEY: &str = "volley";
    pub const RALLY: &str = "rally";
    pub const ECHO: &str = "echo";
}

/// Event type names.
pub mod kinds {
    pub const ATTACK: &str = "Attack";
    pub const COMBAT_RESOLVED: &str = "CombatResolved";
    pub const DAMAGED: &str = "Damaged";
    pub const DESTROYED: &str = "Destroyed";
    pub const CARD_DRAWN: &str = "CardDrawn";
    pub const ABILITY_RESOLVED: &str = "AbilityResolved";
    pub const CARD_CREATED: &str = "CardCreated";
    pub const CARD_MOVED: &str = "CardMoved";
    pub const POWER_CHANGED: &str = "PowerChanged";
    pub const VOLLEY: &str = "Volley";
    pub const RALLIED: &str = "Rallied";
    pub const PLAYER_DEFEATED: &str = "PlayerDefeated";
    pub const CLEANUP: &str = "Cleanup";
    pub const ECHO: &str = "Echo";
}

/// Counter keys.
pub mod counters {
    pub const LIFE: &str = "life";
    pub const ENERGY: &str = "energy";
    pub const CARDS: &str = "cards";
    pub const LAST_DRAW: &str = "last_draw";
    pub const POWER: &str = "power";
    pub const HEALTH: &str = "health";
    pub const IN_PLAY: &str = "in_play";
}
