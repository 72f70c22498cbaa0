//! The pending-input gate.
//!
//! A resolution step that needs decisions hands its requests to the gate and
//! the match suspends. Independent requests open together; dependent ones
//! wait in declaration order until everything before them is answered. The
//! step resumes once the gate is complete, with every answer delivered as one
//! [`Choices`] set.
//!
//! Expiry runs on a logical clock advanced by the host. The gate only reports
//! which inputs are due; the match actor applies the expiry policy.

use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use crate::core::{GameState, PlayerId};
use crate::error::ValidationError;

use super::pending::{Answer, Choices, InputKind, InputRequest, PendingInput, PendingInputId};

#[derive(Clone, Debug, Default)]
pub struct PendingInputGate {
    next_id: u64,
    now: u64,
    open: BTreeMap<PendingInputId, PendingInput>,
    queued: VecDeque<InputRequest>,
    answers: Choices,
}

impl PendingInputGate {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Current match-clock tick.
    #[must_use]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Take a step's requests. Returns the inputs opened right away.
    pub fn open_requests(&mut self, requests: Vec<InputRequest>) -> Vec<PendingInput> {
        let mut opened = Vec::new();
        for request in requests {
            if request.dependent && (!self.open.is_empty() || !self.queued.is_empty()) {
                self.queued.push_back(request);
            } else {
                opened.push(self.open_one(request));
            }
        }
        opened
    }

    fn open_one(&mut self, request: InputRequest) -> PendingInput {
        let id = PendingInputId::new(self.next_id.max(1));
        self.next_id = id.raw() + 1;

        let pending = PendingInput {
            id,
            slot: request.slot,
            for_players: request.players,
            kind: request.kind,
            constraints: request.constraints,
            expires_at: request.ttl.map(|ttl| self.now + ttl),
            default_answer: request.default_answer,
        };
        debug!(input = %id, slot = %pending.slot, kind = ?pending.kind, "input opened");
        self.open.insert(id, pending.clone());
        pending
    }

    /// Validate and record an answer. Returns inputs that opened as a result.
    pub fn submit(
        &mut self,
        id: PendingInputId,
        player: PlayerId,
        answer: Answer,
        state: &GameState,
    ) -> Result<Vec<PendingInput>, ValidationError> {
        let pending = self.open.get(&id).ok_or(ValidationError::UnknownInput(id))?;
        validate_answer(pending, player, &answer, state)?;
        Ok(self.record(id, answer))
    }

    /// Record an answer without validation (expiry defaults).
    pub fn answer_with(&mut self, id: PendingInputId, answer: Answer) -> Vec<PendingInput> {
        if self.open.contains_key(&id) {
            self.record(id, answer)
        } else {
            Vec::new()
        }
    }

    fn record(&mut self, id: PendingInputId, answer: Answer) -> Vec<PendingInput> {
        if let Some(pending) = self.open.remove(&id) {
            self.answers.insert(pending.slot, answer);
        }

        if self.open.is_empty() {
            if let Some(next) = self.queued.pop_front() {
                return vec![self.open_one(next)];
            }
        }
        Vec::new()
    }

    /// Move the clock to `now`; returns the open inputs now due, in id order.
    pub fn advance_clock(&mut self, now: u64) -> Vec<PendingInputId> {
        self.now = self.now.max(now);
        self.open
            .values()
            .filter(|p| p.expires_at.is_some_and(|at| at <= self.now))
            .map(|p| p.id)
            .collect()
    }

    #[must_use]
    pub fn get(&self, id: PendingInputId) -> Option<&PendingInput> {
        self.open.get(&id)
    }

    /// Open inputs in id order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingInput> {
        self.open.values()
    }

    /// Whether anything is open or queued.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        !self.open.is_empty() || !self.queued.is_empty()
    }

    /// Whether every request of the current step has been answered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.is_waiting()
    }

    pub fn take_answers(&mut self) -> Choices {
        std::mem::take(&mut self.answers)
    }

    /// Drop all open and queued inputs and collected answers. Ids keep counting.
    pub fn clear(&mut self) {
        self.open.clear();
        self.queued.clear();
        self.answers = Choices::new();
    }
}

fn validate_answer(
    pending: &PendingInput,
    player: PlayerId,
    answer: &Answer,
    state: &GameState,
) -> Result<(), ValidationError> {
    if !pending.for_players.contains(&player) {
        return Err(ValidationError::NotRequested {
            input: pending.id,
            player,
        });
    }

    let constraints = &pending.constraints;
    if !answer.activate {
        return if constraints.optional {
            Ok(())
        } else {
            Err(ValidationError::NotOptional(pending.id))
        };
    }

    match pending.kind {
        InputKind::TargetSelect => {
            let mut seen = Vec::with_capacity(answer.targets.len());
            for target in &answer.targets {
                if !constraints.choices.contains(target) {
                    return Err(ValidationError::IllegalTarget(*target));
                }
                if seen.contains(target) {
                    return Err(ValidationError::DuplicateTarget(*target));
                }
                seen.push(*target);
            }
            let got = answer.targets.len();
            if got < constraints.min || got > constraints.max {
                return Err(ValidationError::ChoiceCount {
                    min: constraints.min,
                    max: constraints.max,
                    got,
                });
            }
        }

        InputKind::OrderSelect => {
            let mut given: Vec<_> = answer.targets.to_vec();
            given.sort_unstable();
            let mut offered = constraints.choices.clone();
            offered.sort_unstable();
            if given != offered {
                return Err(ValidationError::NotAPermutation);
            }
        }

        InputKind::ModePick => {
            let mode = answer.mode.as_deref().ok_or(ValidationError::MissingMode)?;
            if !constraints.modes.iter().any(|m| m == mode) {
                return Err(ValidationError::IllegalMode(mode.to_string()));
            }
        }

        InputKind::PayCost => {
            if let Some(cost) = &constraints.cost {
                if state.get_player_state(player, &cost.resource, 0) < cost.amount {
                    return Err(ValidationError::CannotPay {
                        resource: cost.resource.clone(),
                        amount: cost.amount,
                    });
                }
            }
        }

        InputKind::Confirm => {}
    }

    Ok(())
}
