//! Turn structure: ordered phases of ordered steps.

use serde::{Deserialize, Serialize};

use crate::events::EventType;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDef {
    pub id: u32,
    pub name: String,
    /// Mandatory steps emit their `on_enter` events when entered.
    pub mandatory: bool,
    pub on_enter: Vec<EventType>,
}

impl StepDef {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mandatory: false,
            on_enter: Vec::new(),
        }
    }

    /// A mandatory step emitting `event_type` on entry.
    #[must_use]
    pub fn emitting(mut self, event_type: impl Into<EventType>) -> Self {
        self.mandatory = true;
        self.on_enter.push(event_type.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDef {
    pub id: u32,
    pub name: String,
    pub steps: Vec<StepDef>,
}

impl PhaseDef {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_step(mut self, step: StepDef) -> Self {
        self.steps.push(step);
        self
    }
}

/// The phases of one turn, in order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStructure {
    pub phases: Vec<PhaseDef>,
    /// The match ends after this many turns.
    pub max_turns: Option<u32>,
}

impl TurnStructure {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// One phase with one non-mandatory step.
    #[must_use]
    pub fn single_step() -> Self {
        Self::new().with_phase(PhaseDef::new(0, "main").with_step(StepDef::new(0, "main")))
    }

    #[must_use]
    pub fn with_phase(mut self, phase: PhaseDef) -> Self {
        self.phases.push(phase);
        self
    }

    #[must_use]
    pub fn with_max_turns(mut self, turns: u32) -> Self {
        self.max_turns = Some(turns);
        self
    }

    #[must_use]
    pub fn phase(&self, index: usize) -> Option<&PhaseDef> {
        self.phases.get(index)
    }

    #[must_use]
    pub fn step(&self, phase: usize, step: usize) -> Option<&StepDef> {
        self.phase(phase).and_then(|p| p.steps.get(step))
    }

    /// Whether a turn past `turn_number` would exceed the limit.
    #[must_use]
    pub fn is_last_turn(&self, turn_number: u32) -> bool {
        self.max_turns.is_some_and(|max| turn_number >= max)
    }
}
