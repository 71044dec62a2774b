//! Discrete relay outputs.
//!
//! [`RelayLine`] is a configured GPIO output exposed through the
//! `embedded-hal` [`OutputPin`] trait, so anything above it (pumps, the
//! damper motor) can be written against the trait and tested with any
//! pin.  [`DamperPins`] pairs two such lines into the damper's
//! direction + supply interface.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, PinState};

use crate::app::ports::DamperLines;
use crate::drivers::hw_init;

/// A GPIO-driven relay coil.
pub struct RelayLine {
    gpio: i32,
    active_high: bool,
    energized: bool,
}

impl RelayLine {
    /// Relay that energizes on a HIGH level.
    pub fn new(gpio: i32) -> Self {
        Self { gpio, active_high: true, energized: false }
    }

    /// Relay board with inverted inputs.
    pub fn active_low(gpio: i32) -> Self {
        Self { gpio, active_high: false, energized: false }
    }

    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }

    /// Energize or release the coil.
    pub fn set(&mut self, on: bool) {
        hw_init::gpio_write(self.gpio, on == self.active_high);
        self.energized = on;
    }
}

impl ErrorType for RelayLine {
    type Error = Infallible;
}

impl OutputPin for RelayLine {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

/// Damper motor wiring: a direction relay and a supply relay.
pub struct DamperPins<D, P> {
    drive: D,
    power: P,
}

impl<D: OutputPin, P: OutputPin> DamperPins<D, P> {
    pub fn new(drive: D, power: P) -> Self {
        Self { drive, power }
    }

    pub fn release(self) -> (D, P) {
        (self.drive, self.power)
    }
}

impl<D: OutputPin, P: OutputPin> DamperLines for DamperPins<D, P> {
    fn set_drive(&mut self, high: bool) {
        if self.drive.set_state(PinState::from(high)).is_err() {
            log::warn!("DAMPER: drive line write failed");
        }
    }

    fn set_power(&mut self, on: bool) {
        if self.power.set_state(PinState::from(on)).is_err() {
            log::warn!("DAMPER: power line write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_tracks_energized_state() {
        let mut relay = RelayLine::new(13);
        assert!(!relay.is_energized());
        relay.set_high().unwrap();
        assert!(relay.is_energized());
        relay.set_state(PinState::Low).unwrap();
        assert!(!relay.is_energized());
    }

    #[test]
    fn active_low_relay_still_reports_logical_state() {
        let mut relay = RelayLine::active_low(10);
        relay.set(true);
        assert!(relay.is_energized());
    }

    #[test]
    fn damper_pins_route_to_their_lines() {
        let mut pins = DamperPins::new(RelayLine::new(12), RelayLine::new(11));
        pins.set_drive(true);
        pins.set_power(false);
        let (drive, power) = pins.release();
        assert!(drive.is_energized());
        assert!(!power.is_energized());
        assert_eq!(drive.gpio(), 12);
        assert_eq!(power.gpio(), 11);
    }
}
