//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! Telemetry is serialised to a single JSON line so a serial capture can
//! be replayed into a dashboard without parsing free text.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => match serde_json::to_string(t) {
                Ok(line) => info!("TELEM | {}", line),
                Err(e) => warn!("TELEM | serialise failed: {}", e),
            },
            AppEvent::ModeChanged { from, to, source } => {
                info!("MODE | {:?} -> {:?} ({:?})", from, to, source);
            }
            AppEvent::DamperMoved(mode) => {
                info!("DAMPER | settled {:?}", mode);
            }
            AppEvent::WaterBudgetExhausted(pump) => {
                info!("WATER | {:?} budget exhausted", pump);
            }
            AppEvent::SensorReadFailed(failure) => {
                warn!(
                    "SENSOR | {} {:?} abandoned: {}",
                    failure.role.name(),
                    failure.reading,
                    failure.error
                );
            }
            AppEvent::Started(mode) => {
                info!("START | initial_mode={:?}", mode);
            }
        }
    }
}
