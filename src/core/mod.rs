//! Core engine types: entities, players, payload values, state, actions,
//! RNG and configuration.
//!
//! Nothing in here knows about the stack. These are the values every other
//! module passes around.

pub mod action;
pub mod config;
pub mod entity;
pub mod player;
pub mod rng;
pub mod state;
pub mod value;

pub use action::{Action, PASS};
pub use config::{EngineConfig, ExpiryPolicy, PreventionNotice, ResolutionLimits};
pub use entity::EntityId;
pub use player::{PlayerId, PlayerMap};
pub use rng::{MatchRng, MatchRngState};
pub use state::{EntityRecord, GameState};
pub use value::{Payload, Value};
