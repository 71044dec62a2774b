//! Mock adapters for integration tests.
//!
//! Records every actuator and damper-line call so tests can assert on the
//! full command history without touching real GPIO/PWM registers, and
//! provides a scripted sensor bus and a recording event sink.

use std::collections::{HashMap, VecDeque};

use regenctl::app::events::AppEvent;
use regenctl::app::ports::{ActuatorPort, DamperLines, EventSink, SensorBus};
use regenctl::error::BusError;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Fan(u8),
    InnerFan(u8),
    Dripper(bool),
    Sprinkler(bool),
    Drive(bool),
    Power(bool),
    AllOff,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self { calls: Vec::new() }
    }

    fn latest<T>(&self, pick: impl Fn(&ActuatorCall) -> Option<T>) -> Option<T> {
        self.calls.iter().rev().find_map(pick)
    }

    pub fn fan(&self) -> u8 {
        self.latest(|c| match c {
            ActuatorCall::Fan(p) => Some(*p),
            ActuatorCall::AllOff => Some(0),
            _ => None,
        })
        .unwrap_or(0)
    }

    pub fn dripper_on(&self) -> bool {
        self.latest(|c| match c {
            ActuatorCall::Dripper(on) => Some(*on),
            ActuatorCall::AllOff => Some(false),
            _ => None,
        })
        .unwrap_or(false)
    }

    pub fn sprinkler_on(&self) -> bool {
        self.latest(|c| match c {
            ActuatorCall::Sprinkler(on) => Some(*on),
            ActuatorCall::AllOff => Some(false),
            _ => None,
        })
        .unwrap_or(false)
    }

    pub fn drive_high(&self) -> bool {
        self.latest(|c| match c {
            ActuatorCall::Drive(high) => Some(*high),
            _ => None,
        })
        .unwrap_or(false)
    }

    pub fn power_on(&self) -> bool {
        self.latest(|c| match c {
            ActuatorCall::Power(on) => Some(*on),
            _ => None,
        })
        .unwrap_or(false)
    }

    /// Every drive-line level written while the motor supply was on.
    pub fn drive_changes_while_powered(&self) -> usize {
        let mut powered = false;
        let mut count = 0;
        for call in &self.calls {
            match call {
                ActuatorCall::Power(on) => powered = *on,
                ActuatorCall::Drive(_) if powered => count += 1,
                _ => {}
            }
        }
        count
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorPort for MockHardware {
    fn set_fan_percent(&mut self, percent: u8) {
        self.calls.push(ActuatorCall::Fan(percent));
    }

    fn set_inner_fan_percent(&mut self, percent: u8) {
        self.calls.push(ActuatorCall::InnerFan(percent));
    }

    fn set_dripper(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Dripper(on));
    }

    fn set_sprinkler(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Sprinkler(on));
    }

    fn all_off(&mut self) {
        self.calls.push(ActuatorCall::AllOff);
    }
}

impl DamperLines for MockHardware {
    fn set_drive(&mut self, high: bool) {
        self.calls.push(ActuatorCall::Drive(high));
    }

    fn set_power(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Power(on));
    }
}

// ── Recording EventSink ───────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Scripted SensorBus ────────────────────────────────────────

/// Answers from a register table; queued errors are returned first.
#[derive(Default)]
pub struct ScriptedBus {
    pub registers: HashMap<(u8, u16), i16>,
    pub queued_errors: VecDeque<BusError>,
    pub begun: Vec<u8>,
    pub reads: Vec<(u8, u16)>,
    pub transmit_toggles: usize,
}

#[allow(dead_code)]
impl ScriptedBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, address: u8, register: u16, raw: i16) {
        self.registers.insert((address, register), raw);
    }
}

impl SensorBus for ScriptedBus {
    fn begin(&mut self, address: u8) {
        self.begun.push(address);
    }

    fn set_transmit(&mut self, _enabled: bool) {
        self.transmit_toggles += 1;
    }

    fn read_input_register(&mut self, address: u8, register: u16) -> Result<i16, BusError> {
        self.reads.push((address, register));
        if let Some(err) = self.queued_errors.pop_front() {
            return Err(err);
        }
        self.registers
            .get(&(address, register))
            .copied()
            .ok_or(BusError::Timeout)
    }
}
