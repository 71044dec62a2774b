//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements             | Connects to                |
//! |------------|------------------------|----------------------------|
//! | `hardware` | ActuatorPort           | LEDC fan channels, relays  |
//! |            | DamperLines            | Damper drive/power relays  |
//! | `log_sink` | EventSink              | Serial log output          |
//! | `nvs`      | ConfigPort             | NVS / in-memory store      |
//! | `time`     | MonotonicClock         | ESP32 high-res timer       |
//! |            | WallClock              | System RTC (gettimeofday)  |
//!
//! The sensor bus port is implemented directly by
//! [`drivers::rs485::Rs485Bus`](crate::drivers::rs485::Rs485Bus) and the
//! experiment port by [`ExperimentRunner`](crate::experiment::ExperimentRunner).

pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod time;
