//! Mode orchestrator, the hexagonal core.
//!
//! [`Controller`] owns the mode table, the shared [`ControllerState`], the
//! damper sequencer and both water budgets.  It exposes a clean,
//! hardware-agnostic API.  All I/O flows through port traits injected at
//! call sites, making the entire controller testable with mock adapters.
//!
//! ```text
//!  SensorSource ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                   │          Controller          │
//! ActuatorPort  ◀── │ modes · damper · budgets ·   │ ◀── ExperimentPort
//! DamperLines   ◀── │ schedule · override chain    │
//!                   └──────────────────────────────┘
//! ```
//!
//! Every [`tick`](Controller::tick) runs, in this order: damper upkeep,
//! dripper upkeep, sprinkler upkeep, then (once per evaluation period)
//! mode re-evaluation.

use log::{debug, info, warn};

use crate::config::ControllerConfig;
use crate::control::budget::{BudgetTick, TimeBudget};
use crate::control::damper::{DamperMode, DamperSequencer};
use crate::fsm::context::{ActuatorSetpoint, ControllerState, ScheduleHint, WaterMode};
use crate::fsm::states::build_mode_table;
use crate::fsm::{ModeMachine, SystemMode};
use crate::schedule::{ScheduleResolver, WallTime, Weekday};
use crate::sensors::{SensorRole, SensorSnapshot, SensorSource};

use super::commands::ManualCommand;
use super::events::{AppEvent, Pump, TelemetryData};
use super::ports::{ActuatorPort, DamperLines, EventSink, ExperimentPort};
use super::resolve::{
    resolve, ExperimentOverride, HumidityReentry, ManualHold, ModeProvider, ModeSource,
    ResolveInput, ScheduleRule,
};

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// The mode orchestrator.
pub struct Controller {
    modes: ModeMachine,
    ctx: ControllerState,
    damper: DamperSequencer,
    dripper: TimeBudget,
    sprinkler: TimeBudget,
    schedule: ScheduleResolver,
    dripper_on: bool,
    sprinkler_on: bool,
    source: ModeSource,
    last_eval_ms: Option<u64>,
    eval_pending: bool,
    last_telemetry_ms: Option<u64>,
    last_weekday: Option<Weekday>,
}

impl Controller {
    /// Construct the controller from configuration.
    ///
    /// Does **not** touch hardware; call [`start`](Self::start) next.
    pub fn new(config: ControllerConfig) -> Self {
        let damper = DamperSequencer::new(
            u64::from(config.damper_action_ms),
            u64::from(config.damper_settle_ms),
        );
        // First evaluation lowers this to the mode's budget.
        let drip_ceiling = config
            .cool_water_budget_max_secs
            .max(config.regen_budget_max_secs);
        let dripper = TimeBudget::new(
            secs_to_ms(config.dripper_slot_secs),
            secs_to_ms(drip_ceiling),
        );
        let sprinkler = TimeBudget::new(
            secs_to_ms(config.sprinkler_slot_secs),
            secs_to_ms(config.sprinkler_budget_secs),
        );
        let schedule = ScheduleResolver::new(config.schedule.clone());
        let ctx = ControllerState::new(config);
        let modes = ModeMachine::new(build_mode_table(), SystemMode::Stop);

        Self {
            modes,
            ctx,
            damper,
            dripper,
            sprinkler,
            schedule,
            dripper_on: false,
            sprinkler_on: false,
            source: ModeSource::Fallback,
            last_eval_ms: None,
            eval_pending: true,
            last_telemetry_ms: None,
            last_weekday: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put the hardware in a known state and enter `Stop`.
    ///
    /// The damper is driven closed even though the sequencer already
    /// believes it is closed, so the real valve matches.
    pub fn start(
        &mut self,
        now_ms: u64,
        hw: &mut (impl ActuatorPort + DamperLines),
        sink: &mut impl EventSink,
    ) {
        hw.all_off();
        self.damper.start_close(now_ms, true, hw);
        self.modes.start(&mut self.ctx);
        sink.emit(&AppEvent::Started(self.modes.current_mode()));
        info!("CONTROLLER: started in {}", self.modes.current_name());
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one cooperative control step.  Never blocks.
    ///
    /// `now_unix` is `None` until the wall clock is synchronised; mode
    /// resolution is skipped in that case and the current mode is held.
    pub fn tick(
        &mut self,
        now_ms: u64,
        now_unix: Option<i64>,
        sensors: &impl SensorSource,
        hw: &mut (impl ActuatorPort + DamperLines),
        experiments: &mut impl ExperimentPort,
        sink: &mut impl EventSink,
    ) {
        // 1. Damper upkeep
        if let Some(reached) = self.damper.update(now_ms, hw) {
            sink.emit(&AppEvent::DamperMoved(reached));
        }

        // 2. Dripper upkeep
        if self.dripper.tick(now_ms, self.dripper_on) == BudgetTick::Exhausted {
            info!("CONTROLLER: dripper budget exhausted");
            sink.emit(&AppEvent::WaterBudgetExhausted(Pump::Dripper));
        }
        self.drive_dripper(hw);

        // 3. Sprinkler upkeep
        if self.sprinkler.tick(now_ms, self.sprinkler_on) == BudgetTick::Exhausted {
            info!("CONTROLLER: sprinkler budget exhausted");
            sink.emit(&AppEvent::WaterBudgetExhausted(Pump::Sprinkler));
        }
        self.drive_sprinkler(hw);

        // 4. Periodic mode evaluation
        let period_ms = secs_to_ms(self.ctx.config.mode_eval_period_secs);
        let due = self.eval_pending
            || self
                .last_eval_ms
                .is_none_or(|t| now_ms.saturating_sub(t) >= period_ms);
        if due {
            self.eval_pending = false;
            self.last_eval_ms = Some(now_ms);
            self.update_system_mode(now_ms, now_unix, sensors, hw, experiments, sink);
        }

        // 5. Telemetry
        let telemetry_ms = secs_to_ms(self.ctx.config.telemetry_interval_secs);
        if self
            .last_telemetry_ms
            .is_none_or(|t| now_ms.saturating_sub(t) >= telemetry_ms)
        {
            self.last_telemetry_ms = Some(now_ms);
            sink.emit(&AppEvent::Telemetry(self.telemetry()));
        }
    }

    /// Resolve the mode for "now", run hooks on a change, synthesize the
    /// setpoint and apply it.
    pub fn update_system_mode(
        &mut self,
        now_ms: u64,
        now_unix: Option<i64>,
        sensors: &impl SensorSource,
        hw: &mut (impl ActuatorPort + DamperLines),
        experiments: &mut impl ExperimentPort,
        sink: &mut impl EventSink,
    ) {
        self.ctx.sensors = SensorSnapshot::capture(sensors);

        match now_unix {
            Some(unix) => {
                let now = WallTime::from_unix(unix, self.ctx.config.utc_offset_secs);
                self.roll_day(now.weekday);
                self.ctx.schedule = ScheduleHint {
                    fan_percent: self.schedule.current_fan_speed(now),
                    inner_fan_percent: self.schedule.current_inner_fan_speed(now),
                    water_budget_secs: self.schedule.current_water_budget_secs(now),
                    air: self.schedule.current_air_mode(now),
                };

                let resolved = {
                    let input = ResolveInput {
                        current: self.modes.current_mode(),
                        current_source: self.source,
                        now_unix: unix,
                        scheduled: self.schedule.current_entry(now),
                        sensors: &self.ctx.sensors,
                        config: &self.ctx.config,
                        last_after_humidity: self.ctx.last_after_humidity,
                    };
                    let mut manual = ManualHold;
                    let mut experiment = ExperimentOverride::new(&mut *experiments);
                    let mut reentry = HumidityReentry;
                    let mut rule = ScheduleRule;
                    let mut chain: [&mut dyn ModeProvider; 4] =
                        [&mut manual, &mut experiment, &mut reentry, &mut rule];
                    resolve(&mut chain, &input)
                };
                self.switch_mode(resolved.mode, resolved.source, sink);
            }
            None => warn!("CONTROLLER: wall clock not set, holding {}", self.modes.current_name()),
        }

        if self.modes.current_mode() == SystemMode::Experiment {
            let budget = experiments.current_water_budget_secs();
            self.ctx.experiment = ActuatorSetpoint {
                fan_percent: experiments.current_fan_percent().min(100),
                inner_fan_percent: experiments.current_inner_fan_percent().min(100),
                damper: experiments.current_damper_state(),
                water: if budget > 0 { WaterMode::On } else { WaterMode::Off },
                water_budget_secs: budget,
            };
        }

        let setpoint = self.modes.synthesize(&self.ctx);
        debug!("CONTROLLER: {} -> {:?}", self.modes.current_name(), setpoint);
        self.apply(setpoint, now_ms, hw);
    }

    /// Force mode re-evaluation on the next tick.
    pub fn evaluate_now(&mut self) {
        self.eval_pending = true;
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an operator override.  Takes effect immediately.
    pub fn handle_command(
        &mut self,
        cmd: ManualCommand,
        now_ms: u64,
        hw: &mut (impl ActuatorPort + DamperLines),
        sink: &mut impl EventSink,
    ) {
        info!("CONTROLLER: command {:?}", cmd);
        if cmd == ManualCommand::SetWaterSlot(0) {
            warn!("CONTROLLER: ignoring zero water slot");
            return;
        }
        match cmd {
            ManualCommand::SetAutoMode(true) => {
                if self.modes.current_mode() == SystemMode::Manual {
                    self.switch_mode(SystemMode::Stop, ModeSource::Fallback, sink);
                }
                self.evaluate_now();
                return;
            }
            ManualCommand::SetAutoMode(false) => {
                self.switch_mode(SystemMode::Manual, ModeSource::Manual, sink);
                return;
            }
            _ => self.switch_mode(SystemMode::Manual, ModeSource::Manual, sink),
        }

        match cmd {
            ManualCommand::SetFanSpeed(p) => self.ctx.manual.fan_percent = p.min(100),
            ManualCommand::SetInnerFanSpeed(p) => self.ctx.manual.inner_fan_percent = p.min(100),
            ManualCommand::SetDamper(mode) => self.ctx.manual.damper = mode,
            ManualCommand::SetWater(mode) => self.ctx.manual.water = mode,
            ManualCommand::SetWaterSlot(secs) => {
                self.dripper.set_slot_duration_ms(secs_to_ms(secs));
            }
            ManualCommand::SetWaterBudget(secs) => {
                self.ctx.manual.water_budget_secs = secs;
                self.dripper.set_budget_duration_ms(secs_to_ms(secs));
            }
            ManualCommand::SetSprinkler(on) => {
                self.ctx.sprinkler = if on { WaterMode::On } else { WaterMode::Off };
            }
            ManualCommand::SetAutoMode(_) => {}
        }

        let setpoint = self.modes.synthesize(&self.ctx);
        self.apply(setpoint, now_ms, hw);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Four digits: mode, fan bucket (0–3), water (0/1), damper (0/1).
    pub fn status_code(&self) -> u16 {
        let sp = &self.ctx.setpoint;
        let mode = u16::from(self.modes.current_mode().status_digit());
        let fan = u16::from(sp.fan_percent.min(100)) * 3 / 100;
        let water = u16::from(sp.water == WaterMode::On);
        let damper = u16::from(self.damper.actual() == DamperMode::Open);
        mode * 1000 + fan * 100 + water * 10 + damper
    }

    /// Build a telemetry snapshot from the current state.
    pub fn telemetry(&self) -> TelemetryData {
        TelemetryData {
            mode: self.modes.current_mode(),
            status_code: self.status_code(),
            setpoint: self.ctx.setpoint,
            damper_phase: self.damper.phase(),
            damper_actual: self.damper.actual(),
            dripper_on: self.dripper_on,
            sprinkler_on: self.sprinkler_on,
            dripper_budget_remaining_secs: self.dripper.budget_remaining_ms() / 1000,
            dripper_daily_used_secs: self.dripper.daily_used_ms() / 1000,
            sprinkler_daily_used_secs: self.sprinkler.daily_used_ms() / 1000,
            sensors: self.ctx.sensors,
        }
    }

    pub fn mode(&self) -> SystemMode {
        self.modes.current_mode()
    }

    /// Provider that decided the current mode.
    pub fn mode_source(&self) -> ModeSource {
        self.source
    }

    pub fn setpoint(&self) -> ActuatorSetpoint {
        self.ctx.setpoint
    }

    pub fn damper(&self) -> &DamperSequencer {
        &self.damper
    }

    pub fn dripper(&self) -> &TimeBudget {
        &self.dripper
    }

    pub fn sprinkler(&self) -> &TimeBudget {
        &self.sprinkler
    }

    pub fn is_dripper_on(&self) -> bool {
        self.dripper_on
    }

    pub fn is_sprinkler_on(&self) -> bool {
        self.sprinkler_on
    }

    pub fn last_after_humidity(&self) -> Option<f32> {
        self.ctx.last_after_humidity
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.ctx.config
    }

    // ── Internal ──────────────────────────────────────────────

    fn switch_mode(&mut self, next: SystemMode, source: ModeSource, sink: &mut impl EventSink) {
        let from = self.modes.current_mode();
        self.source = source;
        if from == next {
            return;
        }
        if from == SystemMode::Stop {
            if let Some(rh) = self.ctx.sensors.humidity(SensorRole::After) {
                self.ctx.last_after_humidity = Some(rh);
            }
        }
        self.modes.transition(next, &mut self.ctx);
        sink.emit(&AppEvent::ModeChanged {
            from,
            to: next,
            source,
        });
    }

    /// Translate a setpoint into port calls.  Water and damper go through
    /// their budget and sequencer, never straight to the lines.
    fn apply(
        &mut self,
        setpoint: ActuatorSetpoint,
        now_ms: u64,
        hw: &mut (impl ActuatorPort + DamperLines),
    ) {
        self.ctx.setpoint = setpoint;
        hw.set_fan_percent(setpoint.fan_percent);
        hw.set_inner_fan_percent(setpoint.inner_fan_percent);
        if setpoint.water == WaterMode::On && setpoint.water_budget_secs > 0 {
            self.dripper
                .set_budget_duration_ms(secs_to_ms(setpoint.water_budget_secs));
        }
        self.drive_dripper(hw);
        self.drive_sprinkler(hw);
        self.damper.request(setpoint.damper, now_ms, hw);
    }

    fn drive_dripper(&mut self, hw: &mut impl ActuatorPort) {
        let want = self.ctx.setpoint.water == WaterMode::On && self.dripper.is_allowed();
        if want != self.dripper_on {
            hw.set_dripper(want);
            self.dripper_on = want;
        }
    }

    fn drive_sprinkler(&mut self, hw: &mut impl ActuatorPort) {
        let want = self.ctx.sprinkler == WaterMode::On && self.sprinkler.is_allowed();
        if want != self.sprinkler_on {
            hw.set_sprinkler(want);
            self.sprinkler_on = want;
        }
    }

    /// Reset daily usage when the local day changes.
    fn roll_day(&mut self, today: Weekday) {
        if self.last_weekday.is_some_and(|d| d != today) {
            info!(
                "CONTROLLER: new day, water used dripper={}s sprinkler={}s",
                self.dripper.daily_used_ms() / 1000,
                self.sprinkler.daily_used_ms() / 1000
            );
            self.dripper.reset_daily_used();
            self.sprinkler.reset_daily_used();
        }
        self.last_weekday = Some(today);
    }
}

fn secs_to_ms(secs: u32) -> u64 {
    u64::from(secs) * 1000
}
