//! Ordered override chain that picks the next [`SystemMode`].
//!
//! ```text
//!   ManualHold ─▶ ExperimentOverride ─▶ HumidityReentry ─▶ ScheduleRule
//!      first provider to return Some(..) wins
//! ```
//!
//! Each provider is tested in isolation; [`resolve`] only encodes the
//! precedence.

use log::info;
use serde::Serialize;

use crate::app::ports::ExperimentPort;
use crate::config::ControllerConfig;
use crate::fsm::SystemMode;
use crate::schedule::ScheduleEntry;
use crate::sensors::{SensorRole, SensorSnapshot, SensorSource};

/// Which provider decided the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModeSource {
    Manual,
    Experiment,
    HumidityReentry,
    Schedule,
    /// Schedule asked for Cool/Heat but the room temperature ruled it out.
    SensorDowngrade,
    /// No provider matched.
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedMode {
    pub mode: SystemMode,
    pub source: ModeSource,
}

impl ResolvedMode {
    pub const fn new(mode: SystemMode, source: ModeSource) -> Self {
        Self { mode, source }
    }
}

/// Everything a provider may look at for one evaluation.
pub struct ResolveInput<'a> {
    pub current: SystemMode,
    /// Provider that chose `current`.
    pub current_source: ModeSource,
    /// Synchronised wall clock (unix seconds).
    pub now_unix: i64,
    /// Schedule entry matching "now", if any.
    pub scheduled: Option<ScheduleEntry>,
    pub sensors: &'a SensorSnapshot,
    pub config: &'a ControllerConfig,
    /// "After" humidity recorded when the controller last left `Stop`.
    pub last_after_humidity: Option<f32>,
}

impl ResolveInput<'_> {
    fn scheduled_mode(&self) -> SystemMode {
        self.scheduled.map_or(SystemMode::Stop, |e| e.mode)
    }
}

pub trait ModeProvider {
    fn resolve(&mut self, input: &ResolveInput<'_>) -> Option<ResolvedMode>;
}

/// Walk `chain` in order and return the first decision.  Falls back to
/// `Stop` when nothing matches.
pub fn resolve(chain: &mut [&mut dyn ModeProvider], input: &ResolveInput<'_>) -> ResolvedMode {
    chain
        .iter_mut()
        .find_map(|p| p.resolve(input))
        .unwrap_or(ResolvedMode::new(SystemMode::Stop, ModeSource::Fallback))
}

// ───────────────────────────────────────────────────────────────
// Providers
// ───────────────────────────────────────────────────────────────

/// Manual is sticky until the operator re-enables auto mode.
pub struct ManualHold;

impl ModeProvider for ManualHold {
    fn resolve(&mut self, input: &ResolveInput<'_>) -> Option<ResolvedMode> {
        (input.current == SystemMode::Manual)
            .then_some(ResolvedMode::new(SystemMode::Manual, ModeSource::Manual))
    }
}

/// A due experiment overrides everything except Manual.
pub struct ExperimentOverride<'e, E: ExperimentPort> {
    experiments: &'e mut E,
}

impl<'e, E: ExperimentPort> ExperimentOverride<'e, E> {
    pub fn new(experiments: &'e mut E) -> Self {
        Self { experiments }
    }
}

impl<E: ExperimentPort> ModeProvider for ExperimentOverride<'_, E> {
    fn resolve(&mut self, input: &ResolveInput<'_>) -> Option<ResolvedMode> {
        self.experiments
            .is_experiment_due(input.now_unix)
            .then_some(ResolvedMode::new(SystemMode::Experiment, ModeSource::Experiment))
    }
}

/// Re-enter Regenerate from an idle Stop when ambient humidity climbs
/// past the "after" humidity recorded at the last Stop exit plus a
/// margin.  Inactive unless `regen_reentry_margin_rh` is set.
///
/// A re-entered Regenerate is held while ambient stays above the
/// reference and released once it falls back to it, so the margin acts
/// as hysteresis.
pub struct HumidityReentry;

impl ModeProvider for HumidityReentry {
    fn resolve(&mut self, input: &ResolveInput<'_>) -> Option<ResolvedMode> {
        let margin = input.config.regen_reentry_margin_rh?;
        if input.scheduled_mode() != SystemMode::Stop {
            return None;
        }
        let reference = input.last_after_humidity?;
        let ambient = input.sensors.humidity(SensorRole::Ambient)?;

        let holding = input.current == SystemMode::Regenerate
            && input.current_source == ModeSource::HumidityReentry;
        if holding {
            if ambient > reference {
                return Some(ResolvedMode::new(
                    SystemMode::Regenerate,
                    ModeSource::HumidityReentry,
                ));
            }
            info!(
                "RESOLVE: ambient {:.1}%RH back to after {:.1}%RH, releasing",
                ambient, reference
            );
            return None;
        }

        if input.current == SystemMode::Stop && ambient > reference + margin {
            info!(
                "RESOLVE: ambient {:.1}%RH > after {:.1}%RH + {:.1}, regenerating",
                ambient, reference, margin
            );
            return Some(ResolvedMode::new(
                SystemMode::Regenerate,
                ModeSource::HumidityReentry,
            ));
        }
        None
    }
}

/// Nominal schedule mode, downgraded to Stop when the room temperature
/// contradicts Cool or Heat.  A missing reading skips the check.
pub struct ScheduleRule;

impl ModeProvider for ScheduleRule {
    fn resolve(&mut self, input: &ResolveInput<'_>) -> Option<ResolvedMode> {
        let nominal = input.scheduled_mode();
        let room = input.sensors.temperature(SensorRole::Room);
        let cfg = input.config;

        let downgrade = match (nominal, room) {
            (SystemMode::Cool, Some(t)) => t < cfg.cooling_threshold_c,
            (SystemMode::Heat, Some(t)) => t > cfg.heating_threshold_c,
            _ => false,
        };

        if downgrade {
            info!(
                "RESOLVE: {:?} ruled out by room {:.1}\u{00b0}C, stopping",
                nominal,
                room.unwrap_or_default()
            );
            return Some(ResolvedMode::new(SystemMode::Stop, ModeSource::SensorDowngrade));
        }
        Some(ResolvedMode::new(nominal, ModeSource::Schedule))
    }
}
