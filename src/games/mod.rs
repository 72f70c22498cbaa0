//! Reference rulesets.

pub mod skirmish;
