//! Damper sequencer: non-blocking two-line actuation of the air valve.
//!
//! The damper motor has a **drive** line (direction: HIGH = open) and a
//! **power** line.  A stroke takes `action_ms`; the motor must never be
//! commanded to reverse mid-stroke.
//!
//! ```text
//!            start_open (actual != Open)
//!   ┌──────┐ ─────────────────────────▶ ┌─────────┐
//!   │ Idle │                            │ Opening │
//!   └──────┘ ◀───── action elapsed ──── └─────────┘
//!     │  ▲
//!     │  └────────── action elapsed ─── ┌─────────┐
//!     └────────────────────────────────▶│ Closing │
//!            start_close (actual != Close, or forced)
//! ```
//!
//! On every return to `Idle` the sequencer compares `desired` with the
//! freshly settled `actual` and immediately starts the reconciling stroke.
//! Settle delays (power-on after drive, drive-release after an open) are
//! tracked as deadlines checked in [`DamperSequencer::update`], never slept.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::app::ports::DamperLines;

/// Target position of the air valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamperMode {
    Close,
    Open,
}

/// Sequencer activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DamperPhase {
    Idle,
    Opening,
    Closing,
}

pub struct DamperSequencer {
    phase: DamperPhase,
    desired: DamperMode,
    actual: DamperMode,
    action_start_ms: u64,
    action_ms: u64,
    settle_ms: u64,
    /// Power is asserted `settle_ms` after the drive line.
    power_pending: bool,
    /// Deadline for releasing the drive line after an open completes.
    drive_release_at: Option<u64>,
}

impl DamperSequencer {
    /// A fresh sequencer believes the damper is closed.  Call
    /// [`start_close`](Self::start_close) with `force = true` at boot to
    /// make the hardware agree.
    pub fn new(action_ms: u64, settle_ms: u64) -> Self {
        Self {
            phase: DamperPhase::Idle,
            desired: DamperMode::Close,
            actual: DamperMode::Close,
            action_start_ms: 0,
            action_ms,
            settle_ms,
            power_pending: false,
            drive_release_at: None,
        }
    }

    /// Record `mode` as the target.  Starts a stroke right away when idle;
    /// otherwise the request is honoured when the current stroke ends.
    pub fn request(&mut self, mode: DamperMode, now_ms: u64, lines: &mut impl DamperLines) {
        if self.desired != mode {
            debug!("DAMPER: desired {:?} -> {:?}", self.desired, mode);
        }
        self.desired = mode;
        if self.phase == DamperPhase::Idle && self.actual != mode {
            self.begin(mode, now_ms, lines);
        }
    }

    /// Begin opening.  No-op (returns `false`) while a stroke is in
    /// flight or if the damper already reports open.
    pub fn start_open(&mut self, now_ms: u64, lines: &mut impl DamperLines) -> bool {
        if self.phase != DamperPhase::Idle || self.actual == DamperMode::Open {
            return false;
        }
        self.desired = DamperMode::Open;
        self.begin(DamperMode::Open, now_ms, lines);
        true
    }

    /// Begin closing.  `force` re-runs the stroke even when the damper
    /// already reports closed.  Never interrupts a stroke in flight.
    pub fn start_close(&mut self, now_ms: u64, force: bool, lines: &mut impl DamperLines) -> bool {
        if self.phase != DamperPhase::Idle || (self.actual == DamperMode::Close && !force) {
            return false;
        }
        self.desired = DamperMode::Close;
        self.begin(DamperMode::Close, now_ms, lines);
        true
    }

    /// Advance timers.  Returns the mode just reached when a stroke
    /// completes on this call.
    pub fn update(&mut self, now_ms: u64, lines: &mut impl DamperLines) -> Option<DamperMode> {
        if let Some(deadline) = self.drive_release_at {
            if now_ms >= deadline {
                lines.set_drive(false);
                self.drive_release_at = None;
            }
        }

        let target = match self.phase {
            DamperPhase::Idle => return None,
            DamperPhase::Opening => DamperMode::Open,
            DamperPhase::Closing => DamperMode::Close,
        };

        let elapsed = now_ms.saturating_sub(self.action_start_ms);

        if self.power_pending && elapsed >= self.settle_ms {
            lines.set_power(true);
            self.power_pending = false;
        }

        if elapsed < self.action_ms {
            return None;
        }

        lines.set_power(false);
        self.power_pending = false;
        if target == DamperMode::Open {
            self.drive_release_at = Some(now_ms + self.settle_ms);
        }
        self.actual = target;
        self.phase = DamperPhase::Idle;
        info!("DAMPER: {:?} reached after {} ms", target, elapsed);

        if self.desired != self.actual {
            info!("DAMPER: reconciling toward {:?}", self.desired);
            self.begin(self.desired, now_ms, lines);
        }

        Some(target)
    }

    fn begin(&mut self, mode: DamperMode, now_ms: u64, lines: &mut impl DamperLines) {
        // A new stroke owns the drive line from here on.
        self.drive_release_at = None;
        lines.set_drive(mode == DamperMode::Open);
        self.power_pending = true;
        self.action_start_ms = now_ms;
        self.phase = match mode {
            DamperMode::Open => DamperPhase::Opening,
            DamperMode::Close => DamperPhase::Closing,
        };
        info!("DAMPER: {:?} started", self.phase);
    }

    pub fn phase(&self) -> DamperPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == DamperPhase::Idle
    }

    pub fn desired(&self) -> DamperMode {
        self.desired
    }

    pub fn actual(&self) -> DamperMode {
        self.actual
    }

    pub fn action_start_ms(&self) -> u64 {
        self.action_start_ms
    }
}
