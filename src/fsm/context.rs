//! Shared state threaded through every mode handler.
//!
//! `ControllerState` is the single struct owned by the
//! [`Controller`](crate::app::service::Controller) that mode hooks and
//! synthesis functions read from and write to: the latest sensor
//! snapshot, the schedule's values for "now", the operator and experiment
//! setpoints, and the setpoint last applied to the hardware.

use serde::{Deserialize, Serialize};

use crate::config::ControllerConfig;
use crate::control::damper::DamperMode;
use crate::schedule::{
    DEFAULT_AIR_MODE, DEFAULT_FAN_PERCENT, DEFAULT_INNER_FAN_PERCENT, DEFAULT_WATER_BUDGET_SECS,
};
use crate::sensors::SensorSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaterMode {
    Off,
    On,
}

/// Everything the orchestrator drives, computed fresh each evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActuatorSetpoint {
    /// Main fan bank (0–100).
    pub fan_percent: u8,
    /// Inner circulation fan (0–100).
    pub inner_fan_percent: u8,
    pub damper: DamperMode,
    /// Whether the drip pump is wanted, subject to its budget.
    pub water: WaterMode,
    /// Drip budget per slot.
    pub water_budget_secs: u32,
}

impl ActuatorSetpoint {
    /// Fans off, damper closed, no water.
    pub const fn off() -> Self {
        Self {
            fan_percent: 0,
            inner_fan_percent: 0,
            damper: DamperMode::Close,
            water: WaterMode::Off,
            water_budget_secs: 0,
        }
    }
}

impl Default for ActuatorSetpoint {
    fn default() -> Self {
        Self::off()
    }
}

/// The schedule resolver's derived values at the last evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleHint {
    pub fan_percent: u8,
    pub inner_fan_percent: u8,
    pub water_budget_secs: u32,
    pub air: DamperMode,
}

impl Default for ScheduleHint {
    fn default() -> Self {
        Self {
            fan_percent: DEFAULT_FAN_PERCENT,
            inner_fan_percent: DEFAULT_INNER_FAN_PERCENT,
            water_budget_secs: DEFAULT_WATER_BUDGET_SECS,
            air: DEFAULT_AIR_MODE,
        }
    }
}

pub struct ControllerState {
    pub config: ControllerConfig,
    pub sensors: SensorSnapshot,
    pub schedule: ScheduleHint,
    /// Operator override values (meaningful in `Manual`).
    pub manual: ActuatorSetpoint,
    /// Values reported by the experiment runner (meaningful in `Experiment`).
    pub experiment: ActuatorSetpoint,
    /// Last setpoint applied to the actuators.
    pub setpoint: ActuatorSetpoint,
    /// Sprinkler request.  Only the command surface sets it.
    pub sprinkler: WaterMode,
    /// "After" humidity captured when leaving `Stop`.
    pub last_after_humidity: Option<f32>,
}

impl ControllerState {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            sensors: SensorSnapshot::default(),
            schedule: ScheduleHint::default(),
            manual: ActuatorSetpoint::off(),
            experiment: ActuatorSetpoint::off(),
            setpoint: ActuatorSetpoint::off(),
            sprinkler: WaterMode::Off,
            last_after_humidity: None,
        }
    }
}
