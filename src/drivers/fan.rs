//! PWM fan channel driver.
//!
//! One instance per LEDC channel.  The main bank's eight fans share a
//! single channel, so one `FanChannel` drives all of them.
//!
//! On ESP-IDF: writes the LEDC duty register via hw_init helpers.
//! On host/test: tracks the duty in-memory only.

use crate::drivers::hw_init;
use crate::pins;

/// Full-scale LEDC duty at the configured timer resolution.
pub const MAX_DUTY: u32 = (1 << pins::PWM_RESOLUTION_BITS) - 1;

pub struct FanChannel {
    channel: u32,
    percent: u8,
}

impl FanChannel {
    pub fn new(channel: u32) -> Self {
        Self { channel, percent: 0 }
    }

    /// Set duty as a percentage (0–100, clamped).
    pub fn set_percent(&mut self, percent: u8) {
        let percent = percent.min(100);
        if percent == self.percent {
            return;
        }
        hw_init::ledc_set(self.channel, duty(percent));
        self.percent = percent;
    }

    pub fn stop(&mut self) {
        hw_init::ledc_set(self.channel, 0);
        self.percent = 0;
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_running(&self) -> bool {
        self.percent > 0
    }
}

/// Map 0–100 % onto the LEDC duty range.
pub fn duty(percent: u8) -> u32 {
    u32::from(percent.min(100)) * MAX_DUTY / 100
}
