//! Per-mode hooks, setpoint synthesis, and the table builder.
//!
//! Each mode is three plain `fn` pointers. No closures, no dynamic
//! dispatch.  Synthesis prefers live sensor values and falls back to the
//! schedule's values whenever a reading is missing or implausible.
//!
//! ```text
//!  Cool        fan   ← room temperature ramp      | schedule fan
//!              water ← before-RH vs stop threshold | on, schedule budget
//!              budget∝ fan
//!  Regenerate  water ← before-RH banding           | on, schedule budget
//!              damper always open
//!  Heat / Stop schedule / fixed
//!  Manual      operator values
//!  Experiment  experiment runner values
//! ```

use super::context::{ActuatorSetpoint, ControllerState, WaterMode};
use super::{ModeDescriptor, SystemMode};
use crate::config::ControllerConfig;
use crate::control::damper::DamperMode;
use crate::sensors::{SensorRole, SensorSource};
use log::info;

/// Build the static mode table.  Called once at startup.
pub fn build_mode_table() -> [ModeDescriptor; SystemMode::COUNT] {
    [
        ModeDescriptor {
            id: SystemMode::Stop,
            name: "Stop",
            on_enter: Some(stop_enter),
            on_exit: None,
            synthesize: stop_setpoint,
        },
        ModeDescriptor {
            id: SystemMode::Cool,
            name: "Cool",
            on_enter: Some(cool_enter),
            on_exit: None,
            synthesize: cool_setpoint,
        },
        ModeDescriptor {
            id: SystemMode::Heat,
            name: "Heat",
            on_enter: Some(heat_enter),
            on_exit: None,
            synthesize: heat_setpoint,
        },
        ModeDescriptor {
            id: SystemMode::Regenerate,
            name: "Regenerate",
            on_enter: Some(regenerate_enter),
            on_exit: None,
            synthesize: regenerate_setpoint,
        },
        ModeDescriptor {
            id: SystemMode::Manual,
            name: "Manual",
            on_enter: Some(manual_enter),
            on_exit: Some(manual_exit),
            synthesize: manual_setpoint,
        },
        ModeDescriptor {
            id: SystemMode::Experiment,
            name: "Experiment",
            on_enter: Some(experiment_enter),
            on_exit: Some(experiment_exit),
            synthesize: experiment_setpoint,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  STOP
// ═══════════════════════════════════════════════════════════════════════════

fn stop_enter(_ctx: &mut ControllerState) {
    info!("STOP: fans off, water off, damper closing");
}

fn stop_setpoint(_ctx: &ControllerState) -> ActuatorSetpoint {
    ActuatorSetpoint::off()
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOL: evaporative cooling through the open damper
// ═══════════════════════════════════════════════════════════════════════════

fn cool_enter(ctx: &mut ControllerState) {
    info!(
        "COOL: room={:?}\u{00b0}C before={:?}%RH",
        ctx.sensors.temperature(SensorRole::Room),
        ctx.sensors.humidity(SensorRole::Before)
    );
}

fn cool_setpoint(ctx: &ControllerState) -> ActuatorSetpoint {
    let cfg = &ctx.config;
    let fan_percent = ctx
        .sensors
        .temperature(SensorRole::Room)
        .map_or(ctx.schedule.fan_percent, |t| cool_fan_percent(t, cfg));

    let (water, water_budget_secs) = match ctx.sensors.humidity(SensorRole::Before) {
        Some(rh) => {
            let threshold = cfg.water_stop_margin.stop_threshold(cfg.cool_humidity_target_rh);
            if rh < threshold {
                (WaterMode::On, cool_water_budget_secs(fan_percent, cfg))
            } else {
                (WaterMode::Off, 0)
            }
        }
        None => (WaterMode::On, ctx.schedule.water_budget_secs),
    };

    ActuatorSetpoint {
        fan_percent,
        inner_fan_percent: ctx.schedule.inner_fan_percent,
        damper: ctx.schedule.air,
        water,
        water_budget_secs,
    }
}

/// Linear ramp from the low to the high fan percent across the cooling
/// temperature band, clamped at both ends.
pub fn cool_fan_percent(room_c: f32, cfg: &ControllerConfig) -> u8 {
    let (lo_t, hi_t) = (cfg.cool_fan_min_temp_c, cfg.cool_fan_max_temp_c);
    let (lo_p, hi_p) = (
        f32::from(cfg.cool_fan_min_percent),
        f32::from(cfg.cool_fan_max_percent),
    );
    let span = hi_t - lo_t;
    let progress = if span > 0.0 {
        ((room_c - lo_t) / span).clamp(0.0, 1.0)
    } else if room_c >= hi_t {
        1.0
    } else {
        0.0
    };
    (lo_p + (hi_p - lo_p) * progress).round().clamp(0.0, 100.0) as u8
}

/// Drip budget proportional to fan speed.
pub fn cool_water_budget_secs(fan_percent: u8, cfg: &ControllerConfig) -> u32 {
    (u64::from(cfg.cool_water_budget_max_secs) * u64::from(fan_percent.min(100)) / 100) as u32
}

// ═══════════════════════════════════════════════════════════════════════════
//  HEAT
// ═══════════════════════════════════════════════════════════════════════════

fn heat_enter(_ctx: &mut ControllerState) {
    info!("HEAT: schedule-driven fans, no water");
}

fn heat_setpoint(ctx: &ControllerState) -> ActuatorSetpoint {
    ActuatorSetpoint {
        fan_percent: ctx.schedule.fan_percent,
        inner_fan_percent: ctx.schedule.inner_fan_percent,
        damper: ctx.schedule.air,
        water: WaterMode::Off,
        water_budget_secs: 0,
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  REGENERATE: re-wet the medium with the damper open
// ═══════════════════════════════════════════════════════════════════════════

fn regenerate_enter(ctx: &mut ControllerState) {
    info!(
        "REGENERATE: before={:?}%RH after-at-start={:?}%RH",
        ctx.sensors.humidity(SensorRole::Before),
        ctx.last_after_humidity
    );
}

fn regenerate_setpoint(ctx: &ControllerState) -> ActuatorSetpoint {
    let (water, water_budget_secs) = match ctx.sensors.humidity(SensorRole::Before) {
        Some(rh) => match regen_water_budget_secs(rh, &ctx.config) {
            0 => (WaterMode::Off, 0),
            secs => (WaterMode::On, secs),
        },
        None => (WaterMode::On, ctx.schedule.water_budget_secs),
    };

    ActuatorSetpoint {
        fan_percent: ctx.schedule.fan_percent,
        inner_fan_percent: ctx.schedule.inner_fan_percent,
        damper: DamperMode::Open,
        water,
        water_budget_secs,
    }
}

/// Humidity banding: full budget at or below the low band, linear taper
/// to the minimum across the mid band, nothing at or above the high band.
pub fn regen_water_budget_secs(rh: f32, cfg: &ControllerConfig) -> u32 {
    let (low, high) = (cfg.regen_low_rh, cfg.regen_high_rh);
    if rh >= high {
        return 0;
    }
    if rh <= low {
        return cfg.regen_budget_max_secs;
    }
    let max = cfg.regen_budget_max_secs as f32;
    let min = cfg.regen_budget_min_secs as f32;
    let progress = (rh - low) / (high - low);
    (max - (max - min) * progress).round() as u32
}

// ═══════════════════════════════════════════════════════════════════════════
//  MANUAL
// ═══════════════════════════════════════════════════════════════════════════

fn manual_enter(ctx: &mut ControllerState) {
    // Seed from the applied setpoint; commands then edit single fields.
    ctx.manual = ctx.setpoint;
    info!("MANUAL: schedule suspended");
}

fn manual_exit(ctx: &mut ControllerState) {
    ctx.sprinkler = WaterMode::Off;
    info!("MANUAL: returning to automatic control");
}

fn manual_setpoint(ctx: &ControllerState) -> ActuatorSetpoint {
    ctx.manual
}

// ═══════════════════════════════════════════════════════════════════════════
//  EXPERIMENT
// ═══════════════════════════════════════════════════════════════════════════

fn experiment_enter(_ctx: &mut ControllerState) {
    info!("EXPERIMENT: scripted run active");
}

fn experiment_exit(ctx: &mut ControllerState) {
    ctx.experiment = ActuatorSetpoint::off();
    info!("EXPERIMENT: run finished");
}

fn experiment_setpoint(ctx: &ControllerState) -> ActuatorSetpoint {
    ctx.experiment
}
