//! Rules interface.
//!
//! Games implement [`Ruleset`] to supply action validation, triggers, the turn
//! structure, selector resolution and the state fold. The engine calls into
//! it but never interprets game-specific concepts directly.

mod engine;
mod turn;
mod watcher;

pub use engine::{ApplyContext, ApplyOutcome, Consequence, ResolvedIntent, Ruleset};
pub use turn::{PhaseDef, StepDef, TurnStructure};
pub use watcher::StateWatcher;
