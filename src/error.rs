//! Unified error types for the enclosure controller.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! boot path's error handling uniform.  All variants are `Copy` so they can
//! be carried through poll results and events without allocation.
//!
//! Nothing in the tick path returns these as fatal: bus and sensor errors
//! are absorbed by the poller's retry ceiling and the orchestrator's
//! fallbacks.  Only boot-time bring-up surfaces them to `main`.

use core::fmt;

use crate::app::ports::ConfigError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A transaction on the shared sensor bus failed.
    Bus(BusError),
    /// A sensor value is missing or implausible.
    Sensor(SensorError),
    /// Configuration could not be loaded, saved, or validated.
    Config(ConfigError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Failure modes of one Modbus-RTU request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// No (or a truncated) response arrived within the read window.
    Timeout,
    /// Response CRC did not match its payload.
    Crc,
    /// Slave answered with a Modbus exception code.
    Exception(u8),
    /// Response length or function code was not what was requested.
    Framing,
    /// Response came from a different slave address.
    AddressMismatch,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "response timeout"),
            Self::Crc => write!(f, "CRC mismatch"),
            Self::Exception(code) => write!(f, "modbus exception 0x{code:02X}"),
            Self::Framing => write!(f, "malformed frame"),
            Self::AddressMismatch => write!(f, "unexpected slave address"),
        }
    }
}

impl std::error::Error for BusError {}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The channel has never produced a reading.
    Unavailable,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "no reading available"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
