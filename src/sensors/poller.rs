//! Non-blocking round-robin acquisition over the shared sensor bus.
//!
//! ```text
//!        channel due?
//!  IDLE ──── yes ────▶ WAITING(Temperature) ── settle ─▶ read ─┐
//!   ▲  │                                                      │ ok / retries spent
//!   │  no: next channel                                       ▼
//!   │                  WAITING(Humidity) ◀────────────────────┘
//!   │                        │ settle ─▶ read
//!   └──── next channel ◀─────┘ ok / retries spent
//! ```
//!
//! Each [`SensorPoller::step`] issues at most one bus transaction.  A
//! failing transaction is retried after another settle delay, up to
//! `max_retries` attempts; after that the operation is abandoned, the
//! stored value stays as it was, and the cycle moves on so one dead
//! probe cannot stall the others.

use log::{debug, warn};

use super::modbus::{HUMIDITY_REGISTER, SCALE, TEMPERATURE_REGISTER};
use super::{SensorChannel, SensorRole, SensorSnapshot, SensorSource};
use crate::app::ports::SensorBus;
use crate::config::ControllerConfig;
use crate::error::BusError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    Idle,
    Waiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reading {
    Temperature,
    Humidity,
}

impl Reading {
    fn register(self) -> u16 {
        match self {
            Self::Temperature => TEMPERATURE_REGISTER,
            Self::Humidity => HUMIDITY_REGISTER,
        }
    }
}

/// Cursor of the single in-flight operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerState {
    pub current: usize,
    pub phase: PollPhase,
    pub reading: Reading,
    pub retry_count: u8,
    pub operation_start_ms: u64,
}

/// A read abandoned after exhausting its retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollFailure {
    pub role: SensorRole,
    pub reading: Reading,
    pub error: BusError,
}

pub struct SensorPoller {
    channels: [SensorChannel; SensorRole::COUNT],
    state: PollerState,
    settle_ms: u64,
    max_retries: u8,
}

impl SensorPoller {
    pub fn new(
        addresses: [u8; SensorRole::COUNT],
        poll_interval_ms: u64,
        settle_ms: u64,
        max_retries: u8,
    ) -> Self {
        let channels =
            SensorRole::ALL.map(|role| SensorChannel::new(role, addresses[role.index()], poll_interval_ms));
        Self {
            channels,
            state: PollerState {
                current: 0,
                phase: PollPhase::Idle,
                reading: Reading::Temperature,
                retry_count: 0,
                operation_start_ms: 0,
            },
            settle_ms,
            max_retries: max_retries.max(1),
        }
    }

    pub fn from_config(config: &ControllerConfig) -> Self {
        Self::new(
            config.sensor_addresses,
            u64::from(config.sensor_poll_interval_ms),
            u64::from(config.sensor_settle_ms),
            config.sensor_max_retries,
        )
    }

    /// Register every channel address on the bus and leave it receiving.
    pub fn begin(&mut self, bus: &mut impl SensorBus) {
        bus.set_transmit(false);
        for ch in &self.channels {
            bus.begin(ch.address);
        }
    }

    /// Advance by one step.  Returns a failure when an operation is
    /// abandoned on this call.
    pub fn step(&mut self, now_ms: u64, bus: &mut impl SensorBus) -> Option<PollFailure> {
        match self.state.phase {
            PollPhase::Idle => {
                let idx = self.state.current;
                if self.channels[idx].is_due(now_ms) {
                    self.state.phase = PollPhase::Waiting;
                    self.state.reading = Reading::Temperature;
                    self.state.retry_count = 0;
                    self.state.operation_start_ms = now_ms;
                } else {
                    self.state.current = (idx + 1) % SensorRole::COUNT;
                }
                None
            }
            PollPhase::Waiting => {
                if now_ms.saturating_sub(self.state.operation_start_ms) < self.settle_ms {
                    return None;
                }
                self.transact(now_ms, bus)
            }
        }
    }

    fn transact(&mut self, now_ms: u64, bus: &mut impl SensorBus) -> Option<PollFailure> {
        let reading = self.state.reading;
        let ch = &mut self.channels[self.state.current];

        bus.set_transmit(true);
        let result = bus.read_input_register(ch.address, reading.register());
        bus.set_transmit(false);

        match result {
            Ok(raw) => {
                let value = f32::from(raw) / SCALE;
                match reading {
                    Reading::Temperature => ch.last_temperature_c = Some(value),
                    Reading::Humidity => ch.last_humidity_rh = Some(value),
                }
                debug!("POLLER: {} {:?} = {:.1}", ch.role.name(), reading, value);
                self.state.retry_count = 0;
                self.finish_operation(now_ms);
                None
            }
            Err(error) => {
                self.state.retry_count += 1;
                if self.state.retry_count < self.max_retries {
                    self.state.operation_start_ms = now_ms;
                    return None;
                }
                warn!(
                    "POLLER: {} {:?} failed after {} attempts ({})",
                    ch.role.name(),
                    reading,
                    self.state.retry_count,
                    error
                );
                ch.failures = ch.failures.saturating_add(1);
                let failure = PollFailure {
                    role: ch.role,
                    reading,
                    error,
                };
                self.state.retry_count = 0;
                self.finish_operation(now_ms);
                Some(failure)
            }
        }
    }

    fn finish_operation(&mut self, now_ms: u64) {
        match self.state.reading {
            Reading::Temperature => {
                self.state.reading = Reading::Humidity;
                self.state.operation_start_ms = now_ms;
            }
            Reading::Humidity => {
                self.channels[self.state.current].last_read_ms = Some(now_ms);
                self.state.current = (self.state.current + 1) % SensorRole::COUNT;
                self.state.phase = PollPhase::Idle;
            }
        }
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    pub fn channel(&self, role: SensorRole) -> &SensorChannel {
        &self.channels[role.index()]
    }

    pub fn channels(&self) -> &[SensorChannel; SensorRole::COUNT] {
        &self.channels
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        SensorSnapshot::from_channels(&self.channels)
    }
}

impl SensorSource for SensorPoller {
    fn temperature(&self, role: SensorRole) -> Option<f32> {
        self.channel(role).temperature().ok()
    }

    fn humidity(&self, role: SensorRole) -> Option<f32> {
        self.channel(role).humidity().ok()
    }
}
