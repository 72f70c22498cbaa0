//! Priority passing between resolution steps.
//!
//! When a priority window opens the holder may act or pass. Passes go round
//! in seat order, skipping eliminated players; once every live player has
//! passed in a row the window closes and the loop either resolves the stack
//! or advances the turn structure. Any accepted action resets the count and
//! hands priority back to the actor.

use serde::{Deserialize, Serialize};

use crate::core::{GameState, PlayerId};

/// Result of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// The passing player does not hold priority.
    NotHolder,
    /// Priority moved on.
    Passed { next: PlayerId },
    /// Every live player passed in succession.
    AllPassed,
}

/// Priority state of one window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRound {
    holder: PlayerId,
    consecutive_passes: usize,
    open: bool,
}

impl PriorityRound {
    #[must_use]
    pub fn new(holder: PlayerId) -> Self {
        Self {
            holder,
            consecutive_passes: 0,
            open: false,
        }
    }

    /// Open a window with `holder` to act first.
    pub fn open(&mut self, holder: PlayerId) {
        self.holder = holder;
        self.consecutive_passes = 0;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
        self.consecutive_passes = 0;
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    #[must_use]
    pub fn holder(&self) -> PlayerId {
        self.holder
    }

    #[must_use]
    pub fn consecutive_passes(&self) -> usize {
        self.consecutive_passes
    }

    /// `player` passes priority.
    pub fn pass(&mut self, player: PlayerId, state: &GameState) -> PassOutcome {
        if !self.open || player != self.holder {
            return PassOutcome::NotHolder;
        }

        self.consecutive_passes += 1;

        if self.consecutive_passes >= state.live_player_count() {
            PassOutcome::AllPassed
        } else {
            self.holder = state.next_live_player(self.holder);
            PassOutcome::Passed { next: self.holder }
        }
    }

    /// `player` acted: passes reset and the actor keeps priority.
    pub fn respond(&mut self, player: PlayerId) {
        self.holder = player;
        self.consecutive_passes = 0;
    }
}
