//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the decision rules for the enclosure: which mode
//! should run (the override chain in [`resolve`]), what each mode asks of
//! the actuators, and how water budgets and the damper are sequenced
//! around that.  All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod resolve;
pub mod service;
