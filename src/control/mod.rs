//! Actuator-side control primitives: ON-time budgets and the damper sequencer.

pub mod budget;
pub mod damper;
