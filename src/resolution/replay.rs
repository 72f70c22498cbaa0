//! Replaying a match.
//!
//! There are two ways to reproduce a match:
//!
//! - [`rerun`] feeds the accepted inbound journal to a fresh actor with the
//!   same seed. The log, discovery trace and final state all come out
//!   identical.
//! - [`fold_log`] folds a persisted event log straight into the initial
//!   state, reusing the answers recorded on each event. No triggers are
//!   rediscovered.

use crate::core::{EngineConfig, GameState, MatchRng};
use crate::error::ReplayError;
use crate::events::{EventLog, EventStatus};
use crate::resolution::actor::fold_engine_event;
use crate::rules::{ApplyContext, ApplyOutcome, Ruleset};

use super::actor::MatchActor;
use super::messages::Inbound;

/// Run a recorded journal through a fresh actor.
pub fn rerun<R: Ruleset>(
    ruleset: R,
    config: EngineConfig,
    initial: GameState,
    seed: u64,
    journal: &[Inbound],
) -> MatchActor<R> {
    let mut actor = MatchActor::new(ruleset, config, initial, seed);
    actor.start();
    for message in journal {
        actor.handle(message.clone());
    }
    actor
}

/// Rebuild state by applying every `Applied` event of a log in order.
pub fn fold_log<R: Ruleset + ?Sized>(
    ruleset: &R,
    initial: &GameState,
    seed: u64,
    log: &EventLog,
) -> Result<GameState, ReplayError> {
    let mut state = initial.clone();
    let mut rng = MatchRng::new(seed);

    for event in log.iter().filter(|e| e.status == EventStatus::Applied) {
        let mut ctx = ApplyContext {
            rng: &mut rng,
            choices: &event.choices,
        };
        match ruleset.apply_event(event, &mut state, &mut ctx) {
            ApplyOutcome::Applied(_) => fold_engine_event(event, &mut state),
            ApplyOutcome::NeedsInput(_) => return Err(ReplayError::NeedsInput(event.id)),
        }
    }
    Ok(state)
}

/// Decode a persisted log and fold it.
pub fn fold_encoded<R: Ruleset + ?Sized>(
    ruleset: &R,
    initial: &GameState,
    seed: u64,
    bytes: &[u8],
) -> Result<GameState, ReplayError> {
    let log = EventLog::decode(bytes)?;
    fold_log(ruleset, initial, seed, &log)
}
