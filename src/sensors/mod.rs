//! Sensor subsystem: channel model, the [`SensorSource`] read interface,
//! the round-robin [`poller`](poller::SensorPoller) and the Modbus-RTU
//! framing it talks over.
//!
//! Every physical probe is a [`SensorChannel`] addressed by a
//! [`SensorRole`].  Values are last-known-good: a failed read never clears
//! what a previous read stored.  Range validation happens on the way out,
//! in [`SensorSource`], so consumers see `None` for anything implausible.

pub mod modbus;
pub mod poller;

use serde::{Deserialize, Serialize};

use crate::error::SensorError;

/// Plausible temperature window for the probes (°C).
pub const TEMPERATURE_RANGE_C: (f32, f32) = (-40.0, 125.0);
/// Plausible relative-humidity window (%RH).
pub const HUMIDITY_RANGE_RH: (f32, f32) = (0.0, 100.0);

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Position of a probe along the airflow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SensorRole {
    /// Outside air.
    Ambient = 0,
    /// Intake side, upstream of the wetted medium.
    Before = 1,
    /// Downstream of the wetted medium.
    After = 2,
    /// Conditioned room.
    Room = 3,
    /// Roof cavity.
    Roof = 4,
}

impl SensorRole {
    pub const COUNT: usize = 5;

    /// Round-robin order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Ambient,
        Self::Before,
        Self::After,
        Self::Room,
        Self::Roof,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ambient => "ambient",
            Self::Before => "before",
            Self::After => "after",
            Self::Room => "room",
            Self::Roof => "roof",
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

pub fn check_temperature(value: f32) -> Result<f32, SensorError> {
    check_range(value, TEMPERATURE_RANGE_C)
}

pub fn check_humidity(value: f32) -> Result<f32, SensorError> {
    check_range(value, HUMIDITY_RANGE_RH)
}

fn check_range(value: f32, (lo, hi): (f32, f32)) -> Result<f32, SensorError> {
    if value.is_finite() && (lo..=hi).contains(&value) {
        Ok(value)
    } else {
        Err(SensorError::OutOfRange)
    }
}

// ---------------------------------------------------------------------------
// Channel state
// ---------------------------------------------------------------------------

/// One physical probe on the shared bus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorChannel {
    pub role: SensorRole,
    /// Modbus slave address.
    pub address: u8,
    /// Last raw temperature stored (°C), unvalidated.
    pub last_temperature_c: Option<f32>,
    /// Last raw humidity stored (%RH), unvalidated.
    pub last_humidity_rh: Option<f32>,
    /// Monotonic time the last read cycle finished.  `None` until the
    /// first cycle, which makes the channel due immediately.
    pub last_read_ms: Option<u64>,
    pub poll_interval_ms: u64,
    /// Read operations abandoned after exhausting retries.
    pub failures: u32,
}

impl SensorChannel {
    pub fn new(role: SensorRole, address: u8, poll_interval_ms: u64) -> Self {
        Self {
            role,
            address,
            last_temperature_c: None,
            last_humidity_rh: None,
            last_read_ms: None,
            poll_interval_ms,
            failures: 0,
        }
    }

    /// Whether this channel's poll interval has elapsed.
    pub fn is_due(&self, now_ms: u64) -> bool {
        self.last_read_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= self.poll_interval_ms)
    }

    pub fn temperature(&self) -> Result<f32, SensorError> {
        self.last_temperature_c
            .ok_or(SensorError::Unavailable)
            .and_then(check_temperature)
    }

    pub fn humidity(&self) -> Result<f32, SensorError> {
        self.last_humidity_rh
            .ok_or(SensorError::Unavailable)
            .and_then(check_humidity)
    }
}

// ---------------------------------------------------------------------------
// Read interface
// ---------------------------------------------------------------------------

/// Validated, optional access to the latest value of every role.
///
/// `None` covers both "never read" and "implausible value"; callers apply
/// the same fallback to either.
pub trait SensorSource {
    fn temperature(&self, role: SensorRole) -> Option<f32>;
    fn humidity(&self, role: SensorRole) -> Option<f32>;
}

/// Copy of every channel's last values, handed to the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SensorSnapshot {
    pub temperature_c: [Option<f32>; SensorRole::COUNT],
    pub humidity_rh: [Option<f32>; SensorRole::COUNT],
}

impl SensorSnapshot {
    pub fn from_channels(channels: &[SensorChannel; SensorRole::COUNT]) -> Self {
        let mut snap = Self::default();
        for ch in channels {
            snap.temperature_c[ch.role.index()] = ch.last_temperature_c;
            snap.humidity_rh[ch.role.index()] = ch.last_humidity_rh;
        }
        snap
    }

    /// Validated copy of whatever `source` currently reports.
    pub fn capture(source: &impl SensorSource) -> Self {
        let mut snap = Self::default();
        for role in SensorRole::ALL {
            snap.temperature_c[role.index()] = source.temperature(role);
            snap.humidity_rh[role.index()] = source.humidity(role);
        }
        snap
    }

    /// Builder used by simulations and tests.
    #[must_use]
    pub fn with_temperature(mut self, role: SensorRole, value: f32) -> Self {
        self.temperature_c[role.index()] = Some(value);
        self
    }

    #[must_use]
    pub fn with_humidity(mut self, role: SensorRole, value: f32) -> Self {
        self.humidity_rh[role.index()] = Some(value);
        self
    }
}

impl SensorSource for SensorSnapshot {
    fn temperature(&self, role: SensorRole) -> Option<f32> {
        self.temperature_c[role.index()].and_then(|v| check_temperature(v).ok())
    }

    fn humidity(&self, role: SensorRole) -> Option<f32> {
        self.humidity_rh[role.index()].and_then(|v| check_humidity(v).ok())
    }
}
