//! Actuator drivers, bus transport, and hardware initialisation.

pub mod fan;
pub mod hw_init;
pub mod relay;
pub mod rs485;
pub mod watchdog;
