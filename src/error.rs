//! Error taxonomy.
//!
//! - [`ValidationError`]: an action or answer failed its preconditions. Rejected
//!   with no state change and reported to the caller.
//! - [`RecursionError`]: a resolution guard tripped. The current item fails and
//!   the ruleset decides whether the match continues.
//! - [`TimeoutError`]: a pending input expired. Resolved through the configured
//!   expiry policy.
//! - [`ConstraintViolation`]: an engine invariant broke. Fatal for the match.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{EntityId, PlayerId};
use crate::events::{EventId, EventStatus, ReactionId};
use crate::input::PendingInputId;

/// An inbound action or input answer was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("{player} does not hold priority")]
    NotPriorityHolder { player: PlayerId },

    #[error("{0} has left the match")]
    Eliminated(PlayerId),

    #[error("the match is waiting on a pending input")]
    AwaitingInput,

    #[error("no pending input is open")]
    NoPendingInput,

    #[error("the match is not accepting actions right now")]
    NotAcceptingActions,

    #[error("the match has ended")]
    MatchEnded,

    #[error("the match has not started")]
    NotStarted,

    #[error("unknown action type `{0}`")]
    UnknownAction(String),

    #[error("missing parameter `{0}`")]
    MissingParam(String),

    #[error("illegal action: {0}")]
    IllegalAction(String),

    #[error("unknown pending input {0}")]
    UnknownInput(PendingInputId),

    #[error("{player} may not answer {input}")]
    NotRequested { input: PendingInputId, player: PlayerId },

    #[error("{0} cannot be declined")]
    NotOptional(PendingInputId),

    #[error("{0} is not an offered choice")]
    IllegalTarget(EntityId),

    #[error("{0} was chosen twice")]
    DuplicateTarget(EntityId),

    #[error("expected between {min} and {max} choices, got {got}")]
    ChoiceCount { min: usize, max: usize, got: usize },

    #[error("order is not a permutation of the offered choices")]
    NotAPermutation,

    #[error("mode `{0}` is not offered")]
    IllegalMode(String),

    #[error("a mode must be picked")]
    MissingMode,

    #[error("cannot pay {amount} {resource}")]
    CannotPay { resource: String, amount: i64 },
}

/// A resolution guard tripped.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum RecursionError {
    #[error("stack depth limit of {limit} exceeded")]
    StackDepth { limit: usize },

    #[error("{event} discovered more than {limit} reactions")]
    ReactionsPerEvent { event: EventId, limit: usize },

    #[error("resolution exceeded {limit} iterations")]
    LoopIterations { limit: usize },

    #[error("state watchers did not settle within {limit} passes")]
    WatcherPasses { limit: usize },
}

/// A pending input expired before it was answered.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{input} expired at tick {at}")]
pub struct TimeoutError {
    pub input: PendingInputId,
    pub at: u64,
}

/// A broken engine invariant.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ConstraintViolation {
    #[error("{event} was about to apply while {status:?}")]
    NotPending { event: EventId, status: EventStatus },

    #[error("{0} is on the stack but not registered")]
    MissingEvent(EventId),

    #[error("{0} is on the stack but not registered")]
    MissingReaction(ReactionId),

    #[error("{0} was unregistered twice")]
    EventUnregisteredTwice(EventId),

    #[error("{0} was unregistered twice")]
    ReactionUnregisteredTwice(ReactionId),

    #[error("input answered with nothing suspended")]
    NothingSuspended,

    #[error("{0} asked for input without any request")]
    NoInputRequested(String),
}

/// Failure to rebuild state from a persisted log.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("{0} requested input while replaying")]
    NeedsInput(EventId),

    #[error("event log codec failed: {0}")]
    Codec(#[from] bincode::Error),
}

/// Umbrella error returned by the match actor.
#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Recursion(#[from] RecursionError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error(transparent)]
    Constraint(#[from] ConstraintViolation),

    #[error("match is halted: {0}")]
    Halted(String),
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_) => ErrorKind::Validation,
            EngineError::Recursion(_) => ErrorKind::Recursion,
            EngineError::Timeout(_) => ErrorKind::Timeout,
            EngineError::Constraint(_) => ErrorKind::ConstraintViolation,
            EngineError::Halted(_) => ErrorKind::Halted,
        }
    }
}

/// Tag carried by outbound `error` messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Recursion,
    Timeout,
    ConstraintViolation,
    Halted,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Recursion => "recursion",
            ErrorKind::Timeout => "timeout",
            ErrorKind::ConstraintViolation => "constraint_violation",
            ErrorKind::Halted => "halted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        let err: EngineError = ValidationError::MatchEnded.into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: EngineError = RecursionError::StackDepth { limit: 4 }.into();
        assert_eq!(err.kind(), ErrorKind::Recursion);
        assert_eq!(err.to_string(), "stack depth limit of 4 exceeded");

        let err: EngineError = ConstraintViolation::MissingEvent(EventId::new(3)).into();
        assert_eq!(err.kind().as_str(), "constraint_violation");
    }

    #[test]
    fn test_messages() {
        let err = ValidationError::ChoiceCount { min: 1, max: 2, got: 3 };
        assert_eq!(err.to_string(), "expected between 1 and 2 choices, got 3");

        let err = TimeoutError { input: PendingInputId::new(2), at: 10 };
        assert_eq!(err.to_string(), "Input(2) expired at tick 10");
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ConstraintViolation).unwrap();
        assert_eq!(json, r#""constraint_violation""#);
    }
}
