//! Damper sequencing as seen from the hardware lines.
//!
//! The motor supply must be off whenever the direction line changes, and
//! requests arriving mid-stroke are honoured only after the stroke ends.

use crate::mock_hw::{ActuatorCall, MockHardware, RecordingSink};

use regenctl::app::commands::ManualCommand;
use regenctl::app::events::AppEvent;
use regenctl::app::service::Controller;
use regenctl::config::ControllerConfig;
use regenctl::control::damper::{DamperMode, DamperPhase};
use regenctl::experiment::ExperimentRunner;
use regenctl::sensors::SensorSnapshot;

fn moves(sink: &RecordingSink) -> Vec<DamperMode> {
    sink.events
        .iter()
        .filter_map(|e| match e {
            AppEvent::DamperMoved(m) => Some(*m),
            _ => None,
        })
        .collect()
}

#[test]
fn boot_forces_a_close_stroke() {
    let mut ctl = Controller::new(ControllerConfig::default());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    ctl.start(0, &mut hw, &mut sink);

    assert_eq!(ctl.damper().phase(), DamperPhase::Closing);
    assert_eq!(hw.calls[..2], [ActuatorCall::AllOff, ActuatorCall::Drive(false)]);
}

#[test]
fn operator_flip_flop_never_reverses_a_powered_motor() {
    let mut ctl = Controller::new(ControllerConfig::default());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut exp = ExperimentRunner::new();
    let sensors = SensorSnapshot::default();
    ctl.start(0, &mut hw, &mut sink);

    // Open, close, open again while the boot stroke is still running.
    ctl.handle_command(ManualCommand::SetDamper(DamperMode::Open), 1_000, &mut hw, &mut sink);
    ctl.handle_command(ManualCommand::SetDamper(DamperMode::Close), 2_000, &mut hw, &mut sink);
    ctl.handle_command(ManualCommand::SetDamper(DamperMode::Open), 3_000, &mut hw, &mut sink);
    assert_eq!(ctl.damper().phase(), DamperPhase::Closing);

    for t in (0..=40_000).step_by(100) {
        ctl.tick(t, None, &sensors, &mut hw, &mut exp, &mut sink);
    }

    assert_eq!(moves(&sink), vec![DamperMode::Close, DamperMode::Open]);
    assert_eq!(ctl.damper().actual(), DamperMode::Open);
    assert!(ctl.damper().is_idle());
    assert_eq!(hw.drive_changes_while_powered(), 0);
    assert!(!hw.power_on());
    // Drive line released one settle period after the open stroke.
    assert!(!hw.drive_high());
}

#[test]
fn close_request_after_open_runs_second_stroke() {
    let mut ctl = Controller::new(ControllerConfig::default());
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut exp = ExperimentRunner::new();
    let sensors = SensorSnapshot::default();
    ctl.start(0, &mut hw, &mut sink);
    ctl.handle_command(ManualCommand::SetDamper(DamperMode::Open), 0, &mut hw, &mut sink);

    for t in (0..=24_500).step_by(100) {
        ctl.tick(t, None, &sensors, &mut hw, &mut exp, &mut sink);
    }
    assert_eq!(ctl.damper().actual(), DamperMode::Open);

    ctl.handle_command(ManualCommand::SetDamper(DamperMode::Close), 25_000, &mut hw, &mut sink);
    assert_eq!(ctl.damper().phase(), DamperPhase::Closing);
    for t in (25_000..=40_000).step_by(100) {
        ctl.tick(t, None, &sensors, &mut hw, &mut exp, &mut sink);
    }

    assert_eq!(
        moves(&sink),
        vec![DamperMode::Close, DamperMode::Open, DamperMode::Close]
    );
    assert_eq!(hw.drive_changes_while_powered(), 0);
}
