//! Inbound commands to the controller.
//!
//! These represent setpoint overrides requested by the outside world
//! (remote dashboard, serial console) that the
//! [`Controller`](super::service::Controller) applies immediately.  Every
//! variant except `SetAutoMode(true)` leaves the controller in
//! [`SystemMode::Manual`](crate::fsm::SystemMode::Manual).

use serde::Deserialize;

use crate::control::damper::DamperMode;
use crate::fsm::context::WaterMode;

/// Commands that external adapters can send into the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ManualCommand {
    /// Main fan bank duty (0–100, clamped).
    SetFanSpeed(u8),

    /// Inner circulation fan duty (0–100, clamped).
    SetInnerFanSpeed(u8),

    /// Request the damper to open or close.
    SetDamper(DamperMode),

    /// Drip pump on/off, still gated by its budget.
    SetWater(WaterMode),

    /// Dripper budget window length (seconds).
    SetWaterSlot(u32),

    /// Dripper ON time per window (seconds).
    SetWaterBudget(u32),

    /// Sprinkler on/off, gated by its own budget.
    SetSprinkler(bool),

    /// `true` leaves Manual and re-evaluates on the next tick; `false`
    /// enters Manual holding the current setpoint.
    SetAutoMode(bool),
}
