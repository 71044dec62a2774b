//! ESP32 time adapter.
//!
//! Implements both clock ports for the controller.
//!
//! - **`target_os = "espidf"`**: the monotonic clock wraps
//!   `esp_timer_get_time()` (microsecond precision, never goes back); the
//!   wall clock reads `gettimeofday()` and reports `None` until something
//!   (SNTP, an RTC, a console command) has set it.
//! - **`not(target_os = "espidf")`**: `std::time::Instant` and
//!   `SystemTime`, with an optional fixed override for simulation.

use crate::app::ports::{MonotonicClock, WallClock};

/// Anything earlier than 2020-01-01 is an unset RTC, not a real time.
pub const EPOCH_2020: i64 = 1_577_836_800;

/// Time adapter for the ESP32-S3 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    fixed_unix: Option<i64>,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            fixed_unix: None,
        }
    }

    /// Pin the simulated wall clock (`None` = follow the host clock).
    #[cfg(not(target_os = "espidf"))]
    pub fn set_fixed_unix(&mut self, unix: Option<i64>) {
        self.fixed_unix = unix;
    }

    /// Seconds since boot (monotonic).
    pub fn uptime_secs(&self) -> u64 {
        self.now_ms() / 1000
    }
}

impl MonotonicClock for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        // SAFETY: esp_timer_get_time is callable from any task.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl WallClock for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn unix_secs(&self) -> Option<i64> {
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: tv is a valid out-pointer; the timezone argument may be null.
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        synced(tv.tv_sec as i64)
    }

    #[cfg(not(target_os = "espidf"))]
    fn unix_secs(&self) -> Option<i64> {
        if let Some(fixed) = self.fixed_unix {
            return synced(fixed);
        }
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?;
        synced(now.as_secs() as i64)
    }
}

fn synced(unix: i64) -> Option<i64> {
    (unix >= EPOCH_2020).then_some(unix)
}
