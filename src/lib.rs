//! Humidity-regeneration enclosure controller library.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod experiment;
pub mod fsm;
pub mod schedule;
pub mod sensors;

mod pins;

// Hardware-facing modules compile on the host too; the peripheral calls
// inside are replaced by simulation stubs there.
pub mod adapters;
pub mod drivers;
