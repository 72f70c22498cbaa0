//! Player decisions requested during resolution.
//!
//! - [`InputRequest`]: what a step needs (kind, offered choices, counts, expiry)
//! - [`PendingInput`]: an open request as announced to players
//! - [`Answer`] / [`Choices`]: submitted answers, keyed by slot
//! - [`PendingInputGate`]: opens, validates, queues and expires inputs

mod gate;
mod pending;

pub use gate::PendingInputGate;
pub use pending::{
    Answer, Choices, Cost, InputConstraints, InputKind, InputRequest, PendingInput, PendingInputId,
};
