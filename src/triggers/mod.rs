//! Triggers: declarative rules that react to events.
//!
//! A ruleset declares [`TriggerDefinition`]s. Each one listens to one or more
//! event types (or the `"*"` wildcard), fires before or after the event
//! applies, may carry conditions and a firing cap, and carries a list of
//! effect operations to run when it resolves.
//!
//! ## Key Components
//!
//! - [`TriggerIndex`]: lookup of definitions by event type
//! - [`ConditionEvaluator`]: evaluates [`Predicate`]s against state and event
//! - [`DiscoveryIndex`]: finds and orders the reactions for one event
//! - [`LimiterTracker`]: per-turn, per-source and per-chain firing caps
//!
//! ## Example Usage
//!
//! ```
//! use stackwise::core::EntityId;
//! use stackwise::events::EventType;
//! use stackwise::triggers::{
//!     FireScope, Predicate, TriggerDefinition, TriggerId, TriggerIndex,
//! };
//!
//! let mut index = TriggerIndex::new();
//!
//! // "When this unit is damaged, once per turn..."
//! index.register(
//!     TriggerDefinition::new(TriggerId::new(1), "Retaliate", "Damaged")
//!         .with_source(EntityId(10))
//!         .when(Predicate::field_is_source("target"))
//!         .limited(FireScope::PerTurn, 1),
//! );
//!
//! let damaged = EventType::new("Damaged");
//! assert_eq!(index.for_event_type(&damaged).len(), 1);
//! assert!(index.for_event_type(&EventType::new("Healed")).is_empty());
//! ```

mod condition;
mod definition;
mod discovery;
mod index;
mod limiter;

pub use condition::{ConditionEvaluator, EvalContext, Predicate, ValueExpr};
pub use definition::{FireLimit, FireScope, TriggerDefinition, TriggerId, TriggerTiming};
pub use discovery::{DiscoveryIndex, DiscoveryRecord};
pub use index::TriggerIndex;
pub use limiter::{LimitKey, LimiterTracker};
