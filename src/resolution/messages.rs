//! Message-shaped contracts at the match boundary.
//!
//! Transport is out of scope; these types only fix the shape of what goes in
//! and what comes out. Both serialize with serde using the wire names
//! (`action.submit`, `event.appended`, ...).

use serde::{Deserialize, Serialize};

use crate::core::{Action, Payload, PlayerId};
use crate::error::{EngineError, ErrorKind};
use crate::events::Event;
use crate::input::{Answer, InputConstraints, InputKind, PendingInput, PendingInputId};

/// Out-of-band control messages.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemControl {
    /// A player leaves the match.
    Concede { player: PlayerId },
    /// Expire a pending input now.
    Timeout { input_id: PendingInputId },
    /// Advance the match clock.
    Tick { now: u64 },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Inbound {
    #[serde(rename = "action.submit")]
    ActionSubmit {
        player: PlayerId,
        action_type: String,
        params: Payload,
    },

    #[serde(rename = "input.submit")]
    InputSubmit {
        input_id: PendingInputId,
        player: PlayerId,
        answer: Answer,
    },

    #[serde(rename = "system.control")]
    SystemControl(SystemControl),
}

impl Inbound {
    #[must_use]
    pub fn action(action: Action) -> Self {
        Self::ActionSubmit {
            player: action.player,
            action_type: action.action_type,
            params: action.params,
        }
    }

    #[must_use]
    pub fn pass(player: PlayerId) -> Self {
        Self::action(Action::pass(player))
    }

    #[must_use]
    pub fn input(input_id: PendingInputId, player: PlayerId, answer: Answer) -> Self {
        Self::InputSubmit {
            input_id,
            player,
            answer,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outbound {
    /// Once per logged event, `EventPrevented` included.
    #[serde(rename = "event.appended")]
    EventAppended { event: Event },

    #[serde(rename = "pending.input")]
    PendingInput {
        input_id: PendingInputId,
        for_player_ids: Vec<PlayerId>,
        kind: InputKind,
        constraints: InputConstraints,
        expires_at: Option<u64>,
    },

    #[serde(rename = "priority.changed")]
    PriorityChanged {
        active_player_id: PlayerId,
        window_open: bool,
    },

    #[serde(rename = "error")]
    Error { kind: ErrorKind, message: String },
}

impl Outbound {
    #[must_use]
    pub fn pending(input: &PendingInput) -> Self {
        Self::PendingInput {
            input_id: input.id,
            for_player_ids: input.for_players.clone(),
            kind: input.kind,
            constraints: input.constraints.clone(),
            expires_at: input.expires_at,
        }
    }

    #[must_use]
    pub fn error(err: &EngineError) -> Self {
        Self::Error {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// The logged event, for `event.appended`.
    #[must_use]
    pub fn appended(&self) -> Option<&Event> {
        match self {
            Self::EventAppended { event } => Some(event),
            _ => None,
        }
    }
}
