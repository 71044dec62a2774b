//! Outbound application events.
//!
//! The [`Controller`](super::service::Controller) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish to a
//! dashboard, append to a file, etc.

use serde::Serialize;

use crate::app::resolve::ModeSource;
use crate::control::damper::{DamperMode, DamperPhase};
use crate::fsm::context::ActuatorSetpoint;
use crate::fsm::SystemMode;
use crate::sensors::poller::PollFailure;
use crate::sensors::SensorSnapshot;

/// Rate-limited water actuators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Pump {
    Dripper,
    Sprinkler,
}

/// Structured events emitted by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The controller has started (carries initial mode).
    Started(SystemMode),

    /// The mode table moved between modes.
    ModeChanged {
        from: SystemMode,
        to: SystemMode,
        source: ModeSource,
    },

    /// A damper stroke finished in this position.
    DamperMoved(DamperMode),

    /// A pump was switched off because its slot budget ran out.
    WaterBudgetExhausted(Pump),

    /// The poller gave up on a read for this cycle.
    SensorReadFailed(PollFailure),

    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryData {
    pub mode: SystemMode,
    pub status_code: u16,
    pub setpoint: ActuatorSetpoint,
    pub damper_phase: DamperPhase,
    pub damper_actual: DamperMode,
    pub dripper_on: bool,
    pub sprinkler_on: bool,
    pub dripper_budget_remaining_secs: u64,
    pub dripper_daily_used_secs: u64,
    pub sprinkler_daily_used_secs: u64,
    pub sensors: SensorSnapshot,
}
