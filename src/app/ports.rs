//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (sensor bus, actuators, damper lines, experiment
//! runner, event sinks, storage, clocks) implement these traits.  The
//! [`Controller`](super::service::Controller) consumes them via generics,
//! so the domain core never touches hardware directly.

use crate::config::ControllerConfig;
use crate::control::damper::DamperMode;
use crate::error::BusError;

// ───────────────────────────────────────────────────────────────
// Sensor bus (driven adapter: half-duplex RS-485)
// ───────────────────────────────────────────────────────────────

/// One shared half-duplex bus carrying every probe.
///
/// Only one transaction is ever in flight; the poller brackets each
/// [`read_input_register`](Self::read_input_register) with
/// `set_transmit(true)` / `set_transmit(false)`.
pub trait SensorBus {
    /// Register a slave address before first use.
    fn begin(&mut self, address: u8);

    /// Switch the transceiver direction (`true` = driver enabled).
    fn set_transmit(&mut self, enabled: bool);

    /// Read one input register from `address`.  Must return within a
    /// bounded read window.
    fn read_input_register(&mut self, address: u8, register: u16) -> Result<i16, BusError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Fans and water pumps.
pub trait ActuatorPort {
    /// Main fan bank duty (0–100).
    fn set_fan_percent(&mut self, percent: u8);

    /// Inner circulation fan duty (0–100).
    fn set_inner_fan_percent(&mut self, percent: u8);

    /// Drip pump enable.
    fn set_dripper(&mut self, on: bool);

    /// Sprinkler solenoid enable.
    fn set_sprinkler(&mut self, on: bool);

    /// Kill fans and pumps for a safe shutdown.  The damper is left to its
    /// sequencer.
    fn all_off(&mut self);
}

/// The two discrete lines of the damper motor.
pub trait DamperLines {
    /// Direction line: HIGH drives toward open.
    fn set_drive(&mut self, high: bool);

    /// Motor supply.
    fn set_power(&mut self, on: bool);
}

// ───────────────────────────────────────────────────────────────
// Experiment provider (driven adapter: scripted runs)
// ───────────────────────────────────────────────────────────────

/// Scripted experiment source.  While an experiment is due it overrides
/// the schedule and supplies every setpoint.
pub trait ExperimentPort {
    /// `true` while an experiment is (or has just become) active.  May
    /// start a pending experiment whose window contains `now_unix`.
    fn is_experiment_due(&mut self, now_unix: i64) -> bool;

    fn current_fan_percent(&self) -> u8;
    fn current_inner_fan_percent(&self) -> u8;
    fn current_water_budget_secs(&self) -> u32;
    fn current_damper_state(&self) -> DamperMode;
}

// ───────────────────────────────────────────────────────────────
// Clocks
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.
pub trait MonotonicClock {
    fn now_ms(&self) -> u64;
}

/// Calendar time.  `None` until the clock has been synchronised.
pub trait WallClock {
    fn unix_secs(&self) -> Option<i64>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`ControllerConfig`].
///
/// Implementations MUST call [`ControllerConfig::validate`] before
/// persisting and reject, not clamp, out-of-range values.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations and config validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
