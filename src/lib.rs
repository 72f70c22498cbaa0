//! # stackwise
//!
//! A deterministic, event-sourced stack resolution engine for turn-based
//! game rules.
//!
//! ## Design Principles
//!
//! 1. **Rules-Agnostic**: The engine knows nothing about cards, damage or
//!    life totals. Everything game-specific comes through the [`Ruleset`]
//!    trait: action validation, triggers, turn structure and the state-fold.
//!
//! 2. **Deterministic**: One seeded RNG per match, handed only to the
//!    state-fold. The same seed and the same inbound messages produce the
//!    same event log, byte for byte.
//!
//! 3. **Closed Vocabulary**: Trigger conditions and effects are data
//!    ([`Predicate`](triggers::Predicate), [`EffectOp`](effects::EffectOp)),
//!    never embedded code.
//!
//! 4. **Match Isolation**: All mutable state lives in a [`MatchActor`]. No
//!    globals, so matches run side by side on separate threads.
//!
//! ## Modules
//!
//! - `core`: ids, values, state, RNG, configuration
//! - `events`: events, reactions and the append-only log
//! - `stack`: the LIFO stack, registries and priority rounds
//! - `triggers`: trigger definitions, conditions, discovery and fire limits
//! - `effects`: effect operations, selectors and fan-out
//! - `input`: pending inputs and the input gate
//! - `rules`: the `Ruleset` seam and turn structure
//! - `resolution`: the match actor, prevention tracking, messages and replay
//! - `games`: reference rulesets
//!
//! ## Example
//!
//! ```
//! use stackwise::core::{Action, EngineConfig, ExpiryPolicy, PlayerId};
//! use stackwise::games::skirmish::{self, Skirmish};
//! use stackwise::resolution::{MatchActor, MatchPhase};
//!
//! let mut state = skirmish::setup(2, 20);
//! let unit = skirmish::spawn_unit(&mut state, PlayerId::new(0), 3, 3);
//!
//! let config = EngineConfig::new(ExpiryPolicy::AbortAction);
//! let mut actor = MatchActor::new(Skirmish::new(2), config, state, 42);
//! actor.start();
//! assert_eq!(actor.phase(), MatchPhase::AwaitingAction);
//!
//! let attack = Action::new(PlayerId::new(0), "attack")
//!     .with_param("attacker", unit)
//!     .with_param("defender", PlayerId::new(1));
//! actor.submit_action(attack).unwrap();
//! actor.submit_action(Action::pass(PlayerId::new(0))).unwrap();
//! actor.submit_action(Action::pass(PlayerId::new(1))).unwrap();
//!
//! assert_eq!(actor.state().get_player_state(PlayerId::new(1), "life", 0), 17);
//! ```

pub mod core;
pub mod error;
pub mod events;
pub mod stack;
pub mod triggers;
pub mod effects;
pub mod input;
pub mod rules;
pub mod resolution;
pub mod games;

// Re-export commonly used types
pub use crate::core::{
    Action, EngineConfig, EntityId, ExpiryPolicy, GameState, MatchRng, Payload, PlayerId,
    PlayerMap, PreventionNotice, ResolutionLimits, Value,
};

pub use crate::error::{
    ConstraintViolation, EngineError, ErrorKind, RecursionError, ReplayError, TimeoutError,
    ValidationError,
};

pub use crate::events::{
    Event, EventDraft, EventId, EventLog, EventStatus, EventType, GroupId, Reaction, ReactionId,
};

pub use crate::stack::{EventStack, StackItem, StackItemKind};

pub use crate::triggers::{Predicate, TriggerDefinition, TriggerId, TriggerIndex, ValueExpr};

pub use crate::effects::{EffectOp, EventTemplate, FanOut, Selector};

pub use crate::input::{Answer, Choices, InputKind, PendingInput, PendingInputId};

pub use crate::rules::{ApplyOutcome, Consequence, Ruleset, TurnStructure};

pub use crate::resolution::{Inbound, MatchActor, MatchPhase, Outbound, SystemControl};
