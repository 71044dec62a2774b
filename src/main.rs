//! Enclosure Controller Firmware: Main Entry Point
//!
//! Hexagonal architecture driven by one cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   Rs485Bus      LogEventSink   NvsAdapter     │
//! │  (Actuator+Damper) (SensorBus)   (EventSink)    (ConfigPort)   │
//! │  Esp32TimeAdapter  ExperimentRunner                            │
//! │  (Clocks)          (ExperimentPort)                            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Override chain · Mode table · Budgets · Damper        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  SensorPoller (one bus transaction per tick)                   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use regenctl::adapters::hardware::HardwareAdapter;
use regenctl::adapters::log_sink::LogEventSink;
use regenctl::adapters::nvs::NvsAdapter;
use regenctl::adapters::time::Esp32TimeAdapter;
use regenctl::app::events::AppEvent;
use regenctl::app::ports::{EventSink, MonotonicClock, WallClock};
use regenctl::app::service::Controller;
use regenctl::config::ControllerConfig;
use regenctl::drivers::rs485::Rs485Bus;
use regenctl::drivers::watchdog::Watchdog;
use regenctl::experiment::ExperimentRunner;
use regenctl::sensors::poller::SensorPoller;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  regenctl v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = regenctl::drivers::hw_init::init_peripherals() {
        // Outputs may be floating; refuse to run and let the watchdog reset.
        error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    let watchdog = Watchdog::default();

    // ── 3. Config from NVS (or defaults) ──────────────────────
    let config = match NvsAdapter::new() {
        Ok(nvs) => nvs.load_or_default(),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults", e);
            ControllerConfig::default()
        }
    };
    let tick_ms = u64::from(config.tick_interval_ms);

    // ── 4. Adapters ───────────────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut hw = HardwareAdapter::default();
    let mut bus = Rs485Bus::default();
    let mut sink = LogEventSink::new();
    let mut experiments = ExperimentRunner::new();

    let mut poller = SensorPoller::from_config(&config);
    poller.begin(&mut bus);

    // ── 5. Controller ─────────────────────────────────────────
    let mut controller = Controller::new(config);
    controller.start(clock.now_ms(), &mut hw, &mut sink);

    if clock.unix_secs().is_none() {
        warn!("Wall clock not set; holding Stop until it is");
    }
    info!("System ready. Entering control loop ({} ms tick).", tick_ms);

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        watchdog.feed();
        let now_ms = clock.now_ms();
        let now_unix = clock.unix_secs();

        if let Some(failure) = poller.step(now_ms, &mut bus) {
            sink.emit(&AppEvent::SensorReadFailed(failure));
        }

        if let Some(unix) = now_unix {
            experiments.tick(unix);
        }

        controller.tick(now_ms, now_unix, &poller, &mut hw, &mut experiments, &mut sink);

        std::thread::sleep(std::time::Duration::from_millis(tick_ms));
    }
}
