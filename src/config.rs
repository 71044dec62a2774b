//! Controller configuration parameters
//!
//! All tunable parameters for the enclosure controller, including the
//! weekly schedule table.  Values can be overridden via NVS.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::schedule::{default_schedule, ScheduleEntry, SCHEDULE_CAPACITY};
use crate::sensors::SensorRole;

/// How the "stop watering" humidity threshold is derived from the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HumidityMargin {
    /// `target * factor`
    Relative(f32),
    /// `target + delta`
    Absolute(f32),
}

impl HumidityMargin {
    pub fn stop_threshold(self, target_rh: f32) -> f32 {
        match self {
            Self::Relative(factor) => target_rh * factor,
            Self::Absolute(delta) => target_rh + delta,
        }
    }
}

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    // --- Timing ---
    /// Cooperative loop period (milliseconds)
    pub tick_interval_ms: u32,
    /// Mode re-evaluation period (seconds)
    pub mode_eval_period_secs: u32,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,
    /// Local time offset from UTC (seconds)
    pub utc_offset_secs: i32,

    // --- Damper ---
    /// Full stroke duration (milliseconds)
    pub damper_action_ms: u32,
    /// Delay between drive and power lines (milliseconds)
    pub damper_settle_ms: u32,

    // --- Sensor bus ---
    /// Modbus address per role, indexed by `SensorRole as usize`
    pub sensor_addresses: [u8; SensorRole::COUNT],
    /// Per-channel read interval (milliseconds)
    pub sensor_poll_interval_ms: u32,
    /// Gap before each bus transaction (milliseconds)
    pub sensor_settle_ms: u32,
    /// Attempts per operation before giving up for this cycle
    pub sensor_max_retries: u8,

    // --- Mode validation ---
    /// Cool is downgraded to Stop below this room temperature (°C)
    pub cooling_threshold_c: f32,
    /// Heat is downgraded to Stop above this room temperature (°C)
    pub heating_threshold_c: f32,

    // --- Cool ---
    pub cool_fan_min_temp_c: f32,
    pub cool_fan_max_temp_c: f32,
    pub cool_fan_min_percent: u8,
    pub cool_fan_max_percent: u8,
    /// Target "before" humidity (%RH)
    pub cool_humidity_target_rh: f32,
    /// Derives the stop threshold from the target
    pub water_stop_margin: HumidityMargin,
    /// Drip budget at 100 % fan (seconds per slot)
    pub cool_water_budget_max_secs: u32,

    // --- Regenerate ---
    pub regen_low_rh: f32,
    pub regen_high_rh: f32,
    pub regen_budget_max_secs: u32,
    pub regen_budget_min_secs: u32,
    /// Re-enter Regenerate from an idle Stop when ambient RH exceeds the
    /// last recorded "after" RH by this much.  `None` disables the rule.
    pub regen_reentry_margin_rh: Option<f32>,

    // --- Water actuators ---
    /// Drip pump budget window (seconds)
    pub dripper_slot_secs: u32,
    /// Sprinkler budget window (seconds)
    pub sprinkler_slot_secs: u32,
    /// Sprinkler ON time per window (seconds)
    pub sprinkler_budget_secs: u32,

    // --- Schedule ---
    pub schedule: heapless::Vec<ScheduleEntry, SCHEDULE_CAPACITY>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Timing
            tick_interval_ms: 100,       // 10 Hz
            mode_eval_period_secs: 300,  // 5 min
            telemetry_interval_secs: 600, // 10 min
            utc_offset_secs: 3 * 3600,

            // Damper
            damper_action_ms: 12_000,
            damper_settle_ms: 100,

            // Sensor bus
            sensor_addresses: [1, 2, 3, 4, 5],
            sensor_poll_interval_ms: 60_000,
            sensor_settle_ms: 200,
            sensor_max_retries: 3,

            // Mode validation
            cooling_threshold_c: 25.2,
            heating_threshold_c: 18.0,

            // Cool
            cool_fan_min_temp_c: 25.2,
            cool_fan_max_temp_c: 32.0,
            cool_fan_min_percent: 30,
            cool_fan_max_percent: 100,
            cool_humidity_target_rh: 90.0,
            water_stop_margin: HumidityMargin::Relative(0.95),
            cool_water_budget_max_secs: 600,

            // Regenerate
            regen_low_rh: 60.0,
            regen_high_rh: 85.0,
            regen_budget_max_secs: 900,
            regen_budget_min_secs: 60,
            regen_reentry_margin_rh: None,

            // Water actuators
            dripper_slot_secs: 3600,
            sprinkler_slot_secs: 3600,
            sprinkler_budget_secs: 300,

            schedule: default_schedule(),
        }
    }
}

impl ControllerConfig {
    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10..=1000).contains(&self.tick_interval_ms) {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be 10–1000"));
        }
        if !(10..=3600).contains(&self.mode_eval_period_secs) {
            return Err(ConfigError::ValidationFailed(
                "mode_eval_period_secs must be 10–3600",
            ));
        }
        if self.telemetry_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "telemetry_interval_secs must be > 0",
            ));
        }
        if !(-14 * 3600..=14 * 3600).contains(&self.utc_offset_secs) {
            return Err(ConfigError::ValidationFailed("utc_offset_secs must be within ±14 h"));
        }
        if !(1_000..=120_000).contains(&self.damper_action_ms) {
            return Err(ConfigError::ValidationFailed(
                "damper_action_ms must be 1000–120000",
            ));
        }
        if self.damper_settle_ms >= self.damper_action_ms {
            return Err(ConfigError::ValidationFailed(
                "damper_settle_ms must be < damper_action_ms",
            ));
        }
        if self.sensor_addresses.iter().any(|a| !(1..=247).contains(a)) {
            return Err(ConfigError::ValidationFailed(
                "sensor_addresses must be 1–247",
            ));
        }
        if self.sensor_max_retries == 0 {
            return Err(ConfigError::ValidationFailed("sensor_max_retries must be > 0"));
        }
        if self.sensor_poll_interval_ms < self.sensor_settle_ms {
            return Err(ConfigError::ValidationFailed(
                "sensor_poll_interval_ms must be >= sensor_settle_ms",
            ));
        }
        let temps = [
            self.heating_threshold_c,
            self.cooling_threshold_c,
            self.cool_fan_min_temp_c,
            self.cool_fan_max_temp_c,
        ];
        if temps.iter().any(|t| !t.is_finite()) {
            return Err(ConfigError::ValidationFailed("temperature thresholds must be finite"));
        }
        if self.heating_threshold_c >= self.cooling_threshold_c {
            return Err(ConfigError::ValidationFailed(
                "heating_threshold_c must be < cooling_threshold_c",
            ));
        }
        if self.cool_fan_min_temp_c >= self.cool_fan_max_temp_c {
            return Err(ConfigError::ValidationFailed(
                "cool_fan_min_temp_c must be < cool_fan_max_temp_c",
            ));
        }
        if self.cool_fan_min_percent > self.cool_fan_max_percent || self.cool_fan_max_percent > 100 {
            return Err(ConfigError::ValidationFailed(
                "cool fan percents must satisfy min <= max <= 100",
            ));
        }
        if !(0.0..=100.0).contains(&self.cool_humidity_target_rh) {
            return Err(ConfigError::ValidationFailed(
                "cool_humidity_target_rh must be 0–100",
            ));
        }
        let margin_ok = match self.water_stop_margin {
            HumidityMargin::Relative(f) => (0.5..=1.5).contains(&f),
            HumidityMargin::Absolute(d) => (-20.0..=20.0).contains(&d),
        };
        if !margin_ok {
            return Err(ConfigError::ValidationFailed(
                "water_stop_margin out of range",
            ));
        }
        if !(0.0..=100.0).contains(&self.regen_low_rh)
            || !(0.0..=100.0).contains(&self.regen_high_rh)
            || self.regen_low_rh >= self.regen_high_rh
        {
            return Err(ConfigError::ValidationFailed(
                "regen bands must satisfy 0 <= low < high <= 100",
            ));
        }
        if self.regen_budget_min_secs > self.regen_budget_max_secs {
            return Err(ConfigError::ValidationFailed(
                "regen_budget_min_secs must be <= regen_budget_max_secs",
            ));
        }
        if let Some(m) = self.regen_reentry_margin_rh {
            if !(0.0..=50.0).contains(&m) {
                return Err(ConfigError::ValidationFailed(
                    "regen_reentry_margin_rh must be 0–50",
                ));
            }
        }
        if self.dripper_slot_secs == 0 || self.sprinkler_slot_secs == 0 {
            return Err(ConfigError::ValidationFailed("water slots must be > 0"));
        }
        if self.regen_budget_max_secs > self.dripper_slot_secs
            || self.cool_water_budget_max_secs > self.dripper_slot_secs
        {
            return Err(ConfigError::ValidationFailed(
                "drip budgets must fit inside dripper_slot_secs",
            ));
        }
        if self.sprinkler_budget_secs > self.sprinkler_slot_secs {
            return Err(ConfigError::ValidationFailed(
                "sprinkler_budget_secs must be <= sprinkler_slot_secs",
            ));
        }
        for entry in &self.schedule {
            if !entry.mode.is_schedulable() {
                return Err(ConfigError::ValidationFailed(
                    "schedule entries may only use Stop/Cool/Heat/Regenerate",
                ));
            }
            if entry.start_fan_percent > 100
                || entry.end_fan_percent > 100
                || entry.inner_fan_percent > 100
            {
                return Err(ConfigError::ValidationFailed(
                    "schedule fan percents must be 0–100",
                ));
            }
        }
        Ok(())
    }
}
