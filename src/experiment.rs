//! Scripted experiment runner.
//!
//! Holds a fixed table of experiments.  Each experiment has a unix start
//! time, a duration, and a list of steps keyed by minutes since start.
//! While one is running it supplies every setpoint through the
//! [`ExperimentPort`] and the orchestrator switches to
//! [`SystemMode::Experiment`](crate::fsm::SystemMode::Experiment).
//!
//! ```text
//!   Idle ──start / window opens──▶ Running ◀──resume── Paused
//!                                    │  └────pause──────▶│
//!                                    │ duration elapsed / stop
//!                                    ▼
//!                                Completed
//! ```
//!
//! At most one experiment is current.  A completed experiment is never
//! restarted automatically.

use heapless::{String, Vec};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::ExperimentPort;
use crate::control::damper::DamperMode;

pub const MAX_EXPERIMENTS: usize = 10;
pub const MAX_STEPS: usize = 20;
pub const NAME_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentState {
    Idle,
    Running,
    Paused,
    Completed,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentStep {
    /// Minutes after the experiment started.
    pub offset_mins: u32,
    pub fan_percent: u8,
    pub inner_fan_percent: u8,
    pub water_budget_secs: u32,
    pub damper: DamperMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub name: String<NAME_LEN>,
    /// Scheduled start (unix seconds).
    pub start_unix: i64,
    pub duration_hours: u32,
    pub steps: Vec<ExperimentStep, MAX_STEPS>,
    #[serde(skip, default = "idle")]
    state: ExperimentState,
    #[serde(skip)]
    step_index: usize,
    #[serde(skip)]
    started_unix: i64,
}

fn idle() -> ExperimentState {
    ExperimentState::Idle
}

impl Experiment {
    /// Returns `None` if the name is empty or too long, or `steps` is empty.
    pub fn new(
        name: &str,
        start_unix: i64,
        duration_hours: u32,
        steps: &[ExperimentStep],
    ) -> Option<Self> {
        if name.is_empty() || steps.is_empty() {
            return None;
        }
        let mut n = String::new();
        n.push_str(name).ok()?;
        let mut s: Vec<ExperimentStep, MAX_STEPS> = Vec::new();
        s.extend_from_slice(steps).ok()?;
        s.sort_unstable_by_key(|st| st.offset_mins);
        Some(Self {
            name: n,
            start_unix,
            duration_hours,
            steps: s,
            state: ExperimentState::Idle,
            step_index: 0,
            started_unix: 0,
        })
    }

    pub fn state(&self) -> ExperimentState {
        self.state
    }

    fn duration_secs(&self) -> i64 {
        i64::from(self.duration_hours) * 3600
    }

    fn window_contains(&self, now_unix: i64) -> bool {
        now_unix >= self.start_unix && now_unix < self.start_unix + self.duration_secs()
    }

    fn current_step(&self) -> Option<&ExperimentStep> {
        self.steps.get(self.step_index).or(self.steps.last())
    }
}

/// Point-in-time view for telemetry and the command surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentStatus {
    pub name: String<NAME_LEN>,
    pub state: ExperimentState,
    /// 1-based.
    pub step: usize,
    pub step_count: usize,
}

#[derive(Default)]
pub struct ExperimentRunner {
    experiments: Vec<Experiment, MAX_EXPERIMENTS>,
    current: Option<usize>,
}

impl ExperimentRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an experiment to the table.  Returns `false` when full.
    pub fn add(&mut self, experiment: Experiment) -> bool {
        match self.experiments.push(experiment) {
            Ok(()) => true,
            Err(rejected) => {
                warn!("EXPERIMENT: table full, dropping '{}'", rejected.name);
                false
            }
        }
    }

    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    /// Start `name` now.  Fails if another experiment is current or the
    /// name is unknown.
    pub fn start(&mut self, name: &str, now_unix: i64) -> bool {
        if let Some(idx) = self.current {
            warn!(
                "EXPERIMENT: '{}' already current, cannot start '{}'",
                self.experiments[idx].name, name
            );
            return false;
        }
        let Some(idx) = self.experiments.iter().position(|e| e.name.as_str() == name) else {
            warn!("EXPERIMENT: '{}' not found", name);
            return false;
        };
        let exp = &mut self.experiments[idx];
        exp.state = ExperimentState::Running;
        exp.step_index = 0;
        exp.started_unix = now_unix;
        self.current = Some(idx);
        info!("EXPERIMENT: started '{}' ({} steps)", exp.name, exp.steps.len());
        true
    }

    /// Mark the current experiment completed and release it.
    pub fn stop(&mut self) {
        if let Some(idx) = self.current.take() {
            let exp = &mut self.experiments[idx];
            exp.state = ExperimentState::Completed;
            info!("EXPERIMENT: stopped '{}'", exp.name);
        }
    }

    pub fn pause(&mut self) {
        if let Some(exp) = self.current_mut() {
            if exp.state == ExperimentState::Running {
                exp.state = ExperimentState::Paused;
                info!("EXPERIMENT: paused");
            }
        }
    }

    pub fn resume(&mut self) {
        if let Some(exp) = self.current_mut() {
            if exp.state == ExperimentState::Paused {
                exp.state = ExperimentState::Running;
                info!("EXPERIMENT: resumed");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running().is_some()
    }

    pub fn status(&self) -> Option<ExperimentStatus> {
        let exp = self.current.map(|idx| &self.experiments[idx])?;
        Some(ExperimentStatus {
            name: exp.name.clone(),
            state: exp.state,
            step: exp.step_index + 1,
            step_count: exp.steps.len(),
        })
    }

    /// Advance the running experiment's step from elapsed time, and
    /// complete it once its duration has elapsed.
    pub fn tick(&mut self, now_unix: i64) {
        let Some(idx) = self.current else {
            return;
        };
        let exp = &mut self.experiments[idx];
        if exp.state != ExperimentState::Running {
            return;
        }

        let elapsed = now_unix.saturating_sub(exp.started_unix).max(0);
        if elapsed >= exp.duration_secs() {
            info!("EXPERIMENT: '{}' completed (duration reached)", exp.name);
            self.stop();
            return;
        }

        // Last step whose offset has been reached.
        let reached = exp
            .steps
            .iter()
            .take_while(|s| i64::from(s.offset_mins) * 60 <= elapsed)
            .count();
        let step = reached.saturating_sub(1);
        if step != exp.step_index {
            exp.step_index = step;
            info!("EXPERIMENT: step {}/{}", step + 1, exp.steps.len());
        }
    }

    fn current_mut(&mut self) -> Option<&mut Experiment> {
        self.current.map(|idx| &mut self.experiments[idx])
    }

    fn running(&self) -> Option<&Experiment> {
        self.current
            .map(|idx| &self.experiments[idx])
            .filter(|e| e.state == ExperimentState::Running)
    }

    fn running_step(&self) -> Option<&ExperimentStep> {
        self.running().and_then(Experiment::current_step)
    }
}

impl ExperimentPort for ExperimentRunner {
    fn is_experiment_due(&mut self, now_unix: i64) -> bool {
        if self.current.is_some() {
            return true;
        }
        let due = self
            .experiments
            .iter()
            .find(|e| e.state == ExperimentState::Idle && e.window_contains(now_unix))
            .map(|e| e.name.clone());
        match due {
            Some(name) => self.start(&name, now_unix),
            None => false,
        }
    }

    fn current_fan_percent(&self) -> u8 {
        self.running_step().map_or(0, |s| s.fan_percent)
    }

    fn current_inner_fan_percent(&self) -> u8 {
        self.running_step().map_or(0, |s| s.inner_fan_percent)
    }

    fn current_water_budget_secs(&self) -> u32 {
        self.running_step()
            .map_or(0, |s| s.water_budget_secs)
    }

    fn current_damper_state(&self) -> DamperMode {
        self.running_step().map_or(DamperMode::Close, |s| s.damper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000;

    fn step(offset_mins: u32, fan: u8, damper: DamperMode) -> ExperimentStep {
        ExperimentStep {
            offset_mins,
            fan_percent: fan,
            inner_fan_percent: fan / 2,
            water_budget_secs: 60,
            damper,
        }
    }

    fn runner() -> ExperimentRunner {
        let mut r = ExperimentRunner::new();
        let exp = Experiment::new(
            "dry-run",
            T0,
            2,
            &[step(0, 40, DamperMode::Close), step(30, 80, DamperMode::Open)],
        )
        .unwrap();
        assert!(r.add(exp));
        r
    }

    #[test]
    fn rejects_empty_definitions() {
        assert!(Experiment::new("", T0, 1, &[step(0, 10, DamperMode::Close)]).is_none());
        assert!(Experiment::new("x", T0, 1, &[]).is_none());
    }

    #[test]
    fn not_due_before_window() {
        let mut r = runner();
        assert!(!r.is_experiment_due(T0 - 1));
        assert_eq!(r.current_water_budget_secs(), 0);
        assert_eq!(r.current_damper_state(), DamperMode::Close);
    }

    #[test]
    fn window_auto_starts_and_steps_advance() {
        let mut r = runner();
        assert!(r.is_experiment_due(T0 + 10));
        assert_eq!(r.current_fan_percent(), 40);

        r.tick(T0 + 30 * 60);
        assert_eq!(r.current_fan_percent(), 80);
        assert_eq!(r.current_damper_state(), DamperMode::Open);
        assert_eq!(r.status().unwrap().step, 2);
    }

    #[test]
    fn completes_after_duration_and_never_restarts() {
        let mut r = runner();
        assert!(r.is_experiment_due(T0));
        r.tick(T0 + 2 * 3600);
        assert!(r.status().is_none());
        assert_eq!(r.experiments()[0].state(), ExperimentState::Completed);
        assert!(!r.is_experiment_due(T0 + 60));
    }

    #[test]
    fn pause_yields_defaults_but_stays_due() {
        let mut r = runner();
        assert!(r.start("dry-run", T0));
        r.pause();
        assert!(r.is_experiment_due(T0 + 60));
        assert_eq!(r.current_fan_percent(), 0);
        assert_eq!(r.current_water_budget_secs(), 0);
        assert_eq!(r.status().unwrap().state, ExperimentState::Paused);
        r.resume();
        assert_eq!(r.current_fan_percent(), 40);
    }

    #[test]
    fn only_one_experiment_at_a_time() {
        let mut r = runner();
        let other = Experiment::new("other", T0, 1, &[step(0, 10, DamperMode::Close)]).unwrap();
        r.add(other);
        assert!(r.start("dry-run", T0));
        assert!(!r.start("other", T0));
        assert!(!r.start("missing", T0));
    }

    #[test]
    fn stop_releases_the_experiment() {
        let mut r = runner();
        assert!(r.start("dry-run", T0));
        r.stop();
        assert!(!r.is_running());
        assert!(!r.is_experiment_due(T0 + 60));
    }
}
