//! Integration tests for the sensor poller on a scripted bus, and the
//! poller feeding the controller end to end.

use crate::mock_hw::{MockHardware, RecordingSink, ScriptedBus};

use regenctl::app::service::Controller;
use regenctl::config::ControllerConfig;
use regenctl::error::BusError;
use regenctl::experiment::ExperimentRunner;
use regenctl::fsm::SystemMode;
use regenctl::sensors::modbus::{HUMIDITY_REGISTER, TEMPERATURE_REGISTER};
use regenctl::sensors::poller::{PollFailure, Reading, SensorPoller};
use regenctl::sensors::{SensorRole, SensorSource};

const MONDAY_NOON: i64 = 1_704_715_200;
const STEP_MS: u64 = 200;

/// Step the poller `steps` times, `STEP_MS` apart, collecting failures.
fn run(poller: &mut SensorPoller, bus: &mut ScriptedBus, start_ms: u64, steps: u64) -> Vec<PollFailure> {
    (0..steps)
        .filter_map(|i| poller.step(start_ms + i * STEP_MS, bus))
        .collect()
}

fn healthy_bus(config: &ControllerConfig) -> ScriptedBus {
    let mut bus = ScriptedBus::new();
    for (i, &addr) in config.sensor_addresses.iter().enumerate() {
        bus.set(addr, TEMPERATURE_REGISTER, 200 + i as i16 * 10);
        bus.set(addr, HUMIDITY_REGISTER, 500 + i as i16 * 10);
    }
    bus
}

#[test]
fn begin_registers_every_address() {
    let config = ControllerConfig::default();
    let mut poller = SensorPoller::from_config(&config);
    let mut bus = ScriptedBus::new();
    poller.begin(&mut bus);
    assert_eq!(bus.begun, config.sensor_addresses.to_vec());
}

#[test]
fn full_cycle_reads_every_channel_in_order() {
    let config = ControllerConfig::default();
    let mut poller = SensorPoller::from_config(&config);
    let mut bus = healthy_bus(&config);

    // Three steps per channel: arm, temperature, humidity.
    let failures = run(&mut poller, &mut bus, 0, 15);
    assert!(failures.is_empty());

    let order: Vec<u8> = bus.reads.iter().map(|&(addr, _)| addr).collect();
    assert_eq!(order, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]);
    assert_eq!(poller.temperature(SensorRole::Ambient), Some(20.0));
    assert_eq!(poller.humidity(SensorRole::Roof), Some(54.0));
    assert!(bus.reads.chunks(2).all(|pair| pair[0].1 == TEMPERATURE_REGISTER
        && pair[1].1 == HUMIDITY_REGISTER));
}

#[test]
fn dead_probe_is_abandoned_and_the_rest_still_read() {
    let config = ControllerConfig::default();
    let mut poller = SensorPoller::from_config(&config);
    let mut bus = healthy_bus(&config);
    bus.registers.retain(|&(addr, _), _| addr != 2);

    let failures = run(&mut poller, &mut bus, 0, 40);

    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|f| f.role == SensorRole::Before && f.error == BusError::Timeout));
    assert_eq!(failures[0].reading, Reading::Temperature);
    assert_eq!(failures[1].reading, Reading::Humidity);
    assert_eq!(poller.channel(SensorRole::Before).failures, 2);
    assert_eq!(poller.temperature(SensorRole::Before), None);
    assert_eq!(poller.temperature(SensorRole::Roof), Some(24.0));
}

#[test]
fn transient_error_is_retried() {
    let config = ControllerConfig::default();
    let mut poller = SensorPoller::from_config(&config);
    let mut bus = healthy_bus(&config);
    bus.queued_errors.push_back(BusError::Crc);

    let failures = run(&mut poller, &mut bus, 0, 20);

    assert!(failures.is_empty());
    assert_eq!(poller.temperature(SensorRole::Ambient), Some(20.0));
    assert_eq!(poller.channel(SensorRole::Ambient).failures, 0);
}

#[test]
fn implausible_value_reads_as_missing() {
    let config = ControllerConfig::default();
    let mut poller = SensorPoller::from_config(&config);
    let mut bus = healthy_bus(&config);
    bus.set(1, HUMIDITY_REGISTER, 1_500);

    run(&mut poller, &mut bus, 0, 15);

    assert_eq!(poller.humidity(SensorRole::Ambient), None);
    assert_eq!(poller.channel(SensorRole::Ambient).last_humidity_rh, Some(150.0));
}

#[test]
fn poller_feeds_controller_decisions() {
    let config = ControllerConfig {
        utc_offset_secs: 0,
        ..ControllerConfig::default()
    };
    let mut poller = SensorPoller::from_config(&config);
    let mut bus = healthy_bus(&config);
    // Room probe (address 4) reports 28.6 °C, intake (address 2) 70 %RH.
    bus.set(4, TEMPERATURE_REGISTER, 286);
    bus.set(2, HUMIDITY_REGISTER, 700);
    poller.begin(&mut bus);
    run(&mut poller, &mut bus, 0, 15);

    let mut ctl = Controller::new(config);
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut exp = ExperimentRunner::new();
    ctl.start(3_000, &mut hw, &mut sink);
    ctl.tick(3_000, Some(MONDAY_NOON), &poller, &mut hw, &mut exp, &mut sink);

    assert_eq!(ctl.mode(), SystemMode::Cool);
    assert_eq!(hw.fan(), 65);
    assert!(hw.dripper_on());
}
