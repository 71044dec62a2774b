//! Hardware adapter: bridges the enclosure's actuators to the domain ports.
//!
//! Owns the fan channels and relay lines, exposing them through
//! [`ActuatorPort`] and [`DamperLines`].  On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs, so the adapter can
//! drive the controller on a host as well.

use crate::app::ports::{ActuatorPort, DamperLines};
use crate::drivers::fan::FanChannel;
use crate::drivers::hw_init;
use crate::drivers::relay::{DamperPins, RelayLine};
use crate::pins;

/// Concrete adapter that combines all actuators behind port traits.
pub struct HardwareAdapter {
    fans: FanChannel,
    inner_fan: FanChannel,
    dripper: RelayLine,
    sprinkler: RelayLine,
    damper: DamperPins<RelayLine, RelayLine>,
}

impl Default for HardwareAdapter {
    /// Wiring per [`pins`].
    fn default() -> Self {
        Self::new(
            FanChannel::new(hw_init::LEDC_CH_FANS),
            FanChannel::new(hw_init::LEDC_CH_INNER_FAN),
            RelayLine::new(pins::PUMP_GPIO),
            RelayLine::new(pins::SPRINKLER_GPIO),
            DamperPins::new(
                RelayLine::new(pins::DAMPER_DRIVE_GPIO),
                RelayLine::new(pins::DAMPER_POWER_GPIO),
            ),
        )
    }
}

impl HardwareAdapter {
    pub fn new(
        fans: FanChannel,
        inner_fan: FanChannel,
        dripper: RelayLine,
        sprinkler: RelayLine,
        damper: DamperPins<RelayLine, RelayLine>,
    ) -> Self {
        Self {
            fans,
            inner_fan,
            dripper,
            sprinkler,
            damper,
        }
    }

    pub fn fan_percent(&self) -> u8 {
        self.fans.percent()
    }

    pub fn inner_fan_percent(&self) -> u8 {
        self.inner_fan.percent()
    }

    pub fn is_dripper_on(&self) -> bool {
        self.dripper.is_energized()
    }

    pub fn is_sprinkler_on(&self) -> bool {
        self.sprinkler.is_energized()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn set_fan_percent(&mut self, percent: u8) {
        self.fans.set_percent(percent);
    }

    fn set_inner_fan_percent(&mut self, percent: u8) {
        self.inner_fan.set_percent(percent);
    }

    fn set_dripper(&mut self, on: bool) {
        if self.dripper.is_energized() != on {
            self.dripper.set(on);
        }
    }

    fn set_sprinkler(&mut self, on: bool) {
        if self.sprinkler.is_energized() != on {
            self.sprinkler.set(on);
        }
    }

    fn all_off(&mut self) {
        self.fans.stop();
        self.inner_fan.stop();
        self.dripper.set(false);
        self.sprinkler.set(false);
    }
}

// ── DamperLines implementation ────────────────────────────────

impl DamperLines for HardwareAdapter {
    fn set_drive(&mut self, high: bool) {
        self.damper.set_drive(high);
    }

    fn set_power(&mut self, on: bool) {
        self.damper.set_power(on);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_off_stops_fans_and_pumps() {
        let mut hw = HardwareAdapter::default();
        hw.set_fan_percent(80);
        hw.set_inner_fan_percent(40);
        hw.set_dripper(true);
        hw.set_sprinkler(true);
        assert_eq!(hw.fan_percent(), 80);
        assert!(hw.is_dripper_on());

        hw.all_off();
        assert_eq!(hw.fan_percent(), 0);
        assert_eq!(hw.inner_fan_percent(), 0);
        assert!(!hw.is_dripper_on());
        assert!(!hw.is_sprinkler_on());
    }
}
