//! Effects: what a reaction does when it resolves.
//!
//! - [`EffectOp`]: the closed set of effect operations
//! - [`Selector`]: entity sets, resolved through the ruleset
//! - [`EffectInterpreter`]: runs a reaction's effects, pausing for choices
//! - [`FanOut`] / [`Materializer`]: one projection event per selected entity
//!
//! Effects never mutate state. They produce [`Consequence`]s that the match
//! actor turns into events, preventions and payload rewrites; only the
//! ruleset's state fold changes state.
//!
//! [`Consequence`]: crate::rules::Consequence

mod effect;
mod fanout;
mod interpreter;
mod selector;

pub use effect::{ChoiceSpec, EffectOp, EventTemplate, Fallback};
pub use fanout::{FanOut, Materializer};
pub use interpreter::{EffectInterpreter, InterpretOutcome};
pub use selector::{Selector, SelectorEvaluator};
