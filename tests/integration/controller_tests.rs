//! Integration tests for the Controller → mode table → actuators pipeline.
//!
//! These run on the host and drive the full evaluation chain (override
//! providers, schedule, setpoint synthesis, budgets, damper) against the
//! recording mocks.

use crate::mock_hw::{MockHardware, RecordingSink};

use regenctl::app::commands::ManualCommand;
use regenctl::app::events::{AppEvent, Pump};
use regenctl::app::ports::ExperimentPort;
use regenctl::app::resolve::ModeSource;
use regenctl::config::ControllerConfig;
use regenctl::control::damper::DamperMode;
use regenctl::experiment::{Experiment, ExperimentRunner, ExperimentStep};
use regenctl::fsm::context::WaterMode;
use regenctl::fsm::SystemMode;
use regenctl::app::service::Controller;
use regenctl::sensors::{SensorRole, SensorSnapshot};

/// 2024-01-08 12:00 UTC, a Monday (inside the default Cool window).
const MONDAY_NOON: i64 = 1_704_715_200;
/// 2024-01-07 00:30 UTC, a Sunday (inside the default Regenerate window).
const SUNDAY_0030: i64 = 1_704_587_400;
/// 2024-01-09 12:00 UTC, a Tuesday (nothing scheduled).
const TUESDAY_NOON: i64 = 1_704_801_600;

fn utc_config() -> ControllerConfig {
    ControllerConfig {
        utc_offset_secs: 0,
        ..ControllerConfig::default()
    }
}

fn make_controller(config: ControllerConfig) -> (Controller, MockHardware, RecordingSink) {
    let mut ctl = Controller::new(config);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    ctl.start(0, &mut hw, &mut sink);
    (ctl, hw, sink)
}

fn warm_room() -> SensorSnapshot {
    SensorSnapshot::default()
        .with_temperature(SensorRole::Room, 28.6)
        .with_humidity(SensorRole::Before, 70.0)
}

// ── Schedule + sensor rules ───────────────────────────────────

#[test]
fn cool_window_with_cold_room_downgrades_to_stop() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let sensors = SensorSnapshot::default().with_temperature(SensorRole::Room, 24.0);
    let mut exp = ExperimentRunner::new();

    ctl.tick(0, Some(MONDAY_NOON), &sensors, &mut hw, &mut exp, &mut sink);

    assert_eq!(ctl.mode(), SystemMode::Stop);
    assert_eq!(ctl.mode_source(), ModeSource::SensorDowngrade);
    assert_eq!(hw.fan(), 0);
    assert!(!hw.dripper_on());
}

#[test]
fn cool_window_with_warm_room_ramps_fan_and_drips() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();

    ctl.tick(0, Some(MONDAY_NOON), &warm_room(), &mut hw, &mut exp, &mut sink);

    assert_eq!(ctl.mode(), SystemMode::Cool);
    assert_eq!(ctl.mode_source(), ModeSource::Schedule);
    // 28.6 °C is halfway up the 25.2–32.0 ramp: 30 + 70 / 2.
    assert_eq!(hw.fan(), 65);
    assert_eq!(ctl.setpoint().water, WaterMode::On);
    // Budget proportional to fan: 600 s × 65 %.
    assert_eq!(ctl.setpoint().water_budget_secs, 390);
    assert_eq!(ctl.dripper().budget_duration_ms(), 390_000);
    assert!(hw.dripper_on());
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ModeChanged { from: SystemMode::Stop, to: SystemMode::Cool, source: ModeSource::Schedule }
    )));
}

#[test]
fn humid_intake_keeps_dripper_off() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let sensors = warm_room().with_humidity(SensorRole::Before, 88.0);
    let mut exp = ExperimentRunner::new();

    ctl.tick(0, Some(MONDAY_NOON), &sensors, &mut hw, &mut exp, &mut sink);

    assert_eq!(ctl.mode(), SystemMode::Cool);
    assert_eq!(ctl.setpoint().water, WaterMode::Off);
    assert!(!hw.dripper_on());
}

#[test]
fn regenerate_without_humidity_uses_schedule_budget_and_opens_damper() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let none = SensorSnapshot::default();
    let mut exp = ExperimentRunner::new();

    ctl.tick(0, Some(SUNDAY_0030), &none, &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Regenerate);
    assert_eq!(ctl.setpoint().water, WaterMode::On);
    assert_eq!(ctl.setpoint().water_budget_secs, 300);
    assert_eq!(ctl.setpoint().damper, DamperMode::Open);
    assert!(hw.dripper_on());

    // Boot close stroke finishes first, then the open stroke runs.
    ctl.tick(12_000, Some(SUNDAY_0030 + 12), &none, &mut hw, &mut exp, &mut sink);
    ctl.tick(24_000, Some(SUNDAY_0030 + 24), &none, &mut hw, &mut exp, &mut sink);

    let moves: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::DamperMoved(m) => Some(*m),
            _ => None,
        })
        .collect();
    assert_eq!(moves, vec![DamperMode::Close, DamperMode::Open]);
    assert_eq!(ctl.damper().actual(), DamperMode::Open);
    // Regenerate, fan 80 % → bucket 2, water on, damper open.
    assert_eq!(ctl.status_code(), 3211);
}

#[test]
fn unsynced_clock_holds_current_mode() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();

    ctl.tick(0, None, &warm_room(), &mut hw, &mut exp, &mut sink);

    assert_eq!(ctl.mode(), SystemMode::Stop);
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::ModeChanged { .. })),
        0
    );
}

// ── Overrides ─────────────────────────────────────────────────

#[test]
fn manual_hold_outlasts_schedule_until_auto_restored() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();

    ctl.handle_command(ManualCommand::SetFanSpeed(40), 0, &mut hw, &mut sink);
    assert_eq!(hw.fan(), 40);

    ctl.tick(0, Some(MONDAY_NOON), &warm_room(), &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Manual);
    assert_eq!(hw.fan(), 40);

    ctl.handle_command(ManualCommand::SetAutoMode(true), 100, &mut hw, &mut sink);
    ctl.tick(200, Some(MONDAY_NOON), &warm_room(), &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Cool);
    assert_eq!(hw.fan(), 65);
}

#[test]
fn running_experiment_overrides_schedule() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();
    let step = ExperimentStep {
        offset_mins: 0,
        fan_percent: 55,
        inner_fan_percent: 20,
        water_budget_secs: 45,
        damper: DamperMode::Open,
    };
    let experiment = Experiment::new("pad-soak", MONDAY_NOON - 60, 2, &[step]).unwrap();
    assert!(exp.add(experiment));

    ctl.tick(0, Some(MONDAY_NOON), &warm_room(), &mut hw, &mut exp, &mut sink);

    assert!(exp.is_running());
    assert_eq!(ctl.mode(), SystemMode::Experiment);
    assert_eq!(ctl.mode_source(), ModeSource::Experiment);
    assert_eq!(hw.fan(), 55);
    assert_eq!(ctl.setpoint().water_budget_secs, 45);
    assert_eq!(ctl.setpoint().damper, DamperMode::Open);
    assert!(hw.dripper_on());

    // Paused: still in control, but nothing runs.
    exp.pause();
    ctl.evaluate_now();
    ctl.tick(100, Some(MONDAY_NOON), &warm_room(), &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Experiment);
    assert_eq!(hw.fan(), 0);
    assert_eq!(ctl.setpoint().water, WaterMode::Off);
    assert!(!hw.dripper_on());
}

#[test]
fn completed_experiment_hands_back_to_schedule() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();
    let step = ExperimentStep {
        offset_mins: 0,
        fan_percent: 55,
        inner_fan_percent: 0,
        water_budget_secs: 0,
        damper: DamperMode::Close,
    };
    assert!(exp.add(Experiment::new("short", MONDAY_NOON, 1, &[step]).unwrap()));

    ctl.tick(0, Some(MONDAY_NOON), &warm_room(), &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Experiment);
    assert!(!hw.dripper_on());

    exp.tick(MONDAY_NOON + 3600);
    assert!(!exp.is_experiment_due(MONDAY_NOON + 3600));
    ctl.evaluate_now();
    ctl.tick(1_000, Some(MONDAY_NOON + 3600), &warm_room(), &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Cool);
}

#[test]
fn humidity_reentry_triggers_regeneration_when_enabled() {
    let config = ControllerConfig {
        regen_reentry_margin_rh: Some(10.0),
        ..utc_config()
    };
    let (mut ctl, mut hw, mut sink) = make_controller(config);
    let mut exp = ExperimentRunner::new();
    let sensors = warm_room()
        .with_humidity(SensorRole::After, 50.0)
        .with_humidity(SensorRole::Ambient, 55.0);

    // Leaving Stop records the after-medium humidity.
    ctl.tick(0, Some(MONDAY_NOON), &sensors, &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Cool);
    assert_eq!(ctl.last_after_humidity(), Some(50.0));

    let humid = sensors.with_humidity(SensorRole::Ambient, 65.0);
    ctl.tick(300_000, Some(TUESDAY_NOON), &humid, &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Stop);

    ctl.evaluate_now();
    ctl.tick(300_100, Some(TUESDAY_NOON), &humid, &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Regenerate);
    assert_eq!(ctl.mode_source(), ModeSource::HumidityReentry);

    // Held across later evaluations while the air stays damp.
    let is_mode_change = |e: &AppEvent| matches!(e, AppEvent::ModeChanged { .. });
    let changes = sink.count(is_mode_change);
    for k in 1..=6u64 {
        let now_ms = 300_100 + k * 300_000;
        let unix = TUESDAY_NOON + (k * 300) as i64;
        ctl.tick(now_ms, Some(unix), &humid, &mut hw, &mut exp, &mut sink);
        assert_eq!(ctl.mode(), SystemMode::Regenerate, "evaluation {k}");
    }
    assert_eq!(sink.count(is_mode_change), changes);

    // Released once ambient falls back to the recorded reference.
    let dry = sensors.with_humidity(SensorRole::Ambient, 48.0);
    ctl.tick(2_400_100, Some(TUESDAY_NOON + 2_100), &dry, &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Stop);
    ctl.tick(2_700_100, Some(TUESDAY_NOON + 2_400), &dry, &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Stop);
}

#[test]
fn humidity_reentry_is_off_by_default() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();
    let sensors = warm_room()
        .with_humidity(SensorRole::After, 50.0)
        .with_humidity(SensorRole::Ambient, 95.0);

    ctl.tick(0, Some(MONDAY_NOON), &sensors, &mut hw, &mut exp, &mut sink);
    ctl.tick(300_000, Some(TUESDAY_NOON), &sensors, &mut hw, &mut exp, &mut sink);
    ctl.evaluate_now();
    ctl.tick(300_100, Some(TUESDAY_NOON), &sensors, &mut hw, &mut exp, &mut sink);
    assert_eq!(ctl.mode(), SystemMode::Stop);
}

// ── Budgets + telemetry ───────────────────────────────────────

#[test]
fn dripper_budget_exhaustion_switches_pump_off() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();

    ctl.tick(0, Some(MONDAY_NOON), &warm_room(), &mut hw, &mut exp, &mut sink);
    assert!(hw.dripper_on());

    ctl.tick(390_000, Some(MONDAY_NOON + 390), &warm_room(), &mut hw, &mut exp, &mut sink);

    assert!(!hw.dripper_on());
    assert!(!ctl.is_dripper_on());
    assert_eq!(ctl.mode(), SystemMode::Cool);
    assert_eq!(
        sink.count(|e| *e == AppEvent::WaterBudgetExhausted(Pump::Dripper)),
        1
    );
    assert_eq!(ctl.dripper().daily_used_ms(), 390_000);
}

#[test]
fn zero_water_slot_command_keeps_the_dripper_rate_limited() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();
    let sensors = SensorSnapshot::default();

    ctl.handle_command(ManualCommand::SetWaterBudget(10), 0, &mut hw, &mut sink);
    ctl.handle_command(ManualCommand::SetWaterSlot(0), 0, &mut hw, &mut sink);
    ctl.handle_command(ManualCommand::SetWater(WaterMode::On), 0, &mut hw, &mut sink);
    assert_eq!(ctl.dripper().slot_duration_ms(), 3_600_000);
    assert!(hw.dripper_on());

    for s in 1..3_600u64 {
        let unix = MONDAY_NOON + s as i64;
        ctl.tick(s * 1_000, Some(unix), &sensors, &mut hw, &mut exp, &mut sink);
    }

    assert_eq!(ctl.mode(), SystemMode::Manual);
    assert!(!hw.dripper_on());
    assert!(ctl.dripper().daily_used_ms() <= 11_000);
    assert_eq!(
        sink.count(|e| *e == AppEvent::WaterBudgetExhausted(Pump::Dripper)),
        1
    );
}

#[test]
fn telemetry_is_emitted_once_per_interval() {
    let (mut ctl, mut hw, mut sink) = make_controller(utc_config());
    let mut exp = ExperimentRunner::new();
    let is_telem = |e: &AppEvent| matches!(e, AppEvent::Telemetry(_));

    ctl.tick(0, Some(MONDAY_NOON), &warm_room(), &mut hw, &mut exp, &mut sink);
    ctl.tick(1_000, Some(MONDAY_NOON + 1), &warm_room(), &mut hw, &mut exp, &mut sink);
    assert_eq!(sink.count(is_telem), 1);

    ctl.tick(600_000, Some(MONDAY_NOON + 600), &warm_room(), &mut hw, &mut exp, &mut sink);
    assert_eq!(sink.count(is_telem), 2);

    let Some(AppEvent::Telemetry(t)) = sink.events.iter().rev().find(|e| is_telem(e)) else {
        panic!("telemetry missing");
    };
    assert_eq!(t.mode, SystemMode::Cool);
    assert_eq!(t.status_code, ctl.status_code());
    assert_eq!(t.sensors.temperature_c[SensorRole::Room.index()], Some(28.6));
}
