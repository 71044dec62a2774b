//! Time-budget admission controller
//!
//! Rate-limits an actuator's ON time within a repeating window (the
//! "slot").  The controller only gates: it never holds the actuator.
//! [`TimeBudget::tick`] reports [`BudgetTick::Exhausted`] on the tick the
//! budget runs dry and the owner switches its actuator off.

/// Outcome of one [`TimeBudget::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetTick {
    /// Nothing notable happened.
    Steady,
    /// The budget reached zero on this tick; the actuator must be shut off.
    Exhausted,
    /// The slot elapsed and both counters were reloaded.
    Rollover,
}

/// ON-time limiter for one actuator.
#[derive(Debug, Clone)]
pub struct TimeBudget {
    slot_duration_ms: u64,
    budget_duration_ms: u64,
    slot_remaining_ms: u64,
    budget_remaining_ms: u64,
    daily_used_ms: u64,
    last_tick_ms: Option<u64>,
}

/// Shortest accepted slot.  A zero slot would roll over on every tick and
/// refill the budget each time.
pub const MIN_SLOT_MS: u64 = 1_000;

impl TimeBudget {
    /// `slot_duration_ms` is raised to [`MIN_SLOT_MS`] if shorter.
    pub fn new(slot_duration_ms: u64, budget_duration_ms: u64) -> Self {
        let slot_duration_ms = slot_duration_ms.max(MIN_SLOT_MS);
        Self {
            slot_duration_ms,
            budget_duration_ms,
            slot_remaining_ms: slot_duration_ms,
            budget_remaining_ms: budget_duration_ms,
            daily_used_ms: 0,
            last_tick_ms: None,
        }
    }

    /// Advance by the wall-clock delta since the previous call.
    ///
    /// The first call only records `now_ms`.  A clock that runs backwards
    /// is treated as a zero delta.
    pub fn tick(&mut self, now_ms: u64, is_on: bool) -> BudgetTick {
        let elapsed = self
            .last_tick_ms
            .map_or(0, |last| now_ms.saturating_sub(last));
        self.last_tick_ms = Some(now_ms);

        let was_allowed = self.is_allowed();

        self.slot_remaining_ms = self.slot_remaining_ms.saturating_sub(elapsed);
        if is_on {
            self.budget_remaining_ms = self.budget_remaining_ms.saturating_sub(elapsed);
            self.daily_used_ms = self.daily_used_ms.saturating_add(elapsed);
        }

        if self.slot_remaining_ms == 0 {
            self.slot_remaining_ms = self.slot_duration_ms;
            self.budget_remaining_ms = self.budget_duration_ms;
            return BudgetTick::Rollover;
        }

        if was_allowed && !self.is_allowed() {
            BudgetTick::Exhausted
        } else {
            BudgetTick::Steady
        }
    }

    /// `true` while ON time remains in the current slot.
    pub fn is_allowed(&self) -> bool {
        self.budget_remaining_ms > 0
    }

    pub fn slot_duration_ms(&self) -> u64 {
        self.slot_duration_ms
    }

    /// Takes effect at the next rollover, except that a shorter slot
    /// also truncates the running one.  Floored at [`MIN_SLOT_MS`].
    pub fn set_slot_duration_ms(&mut self, ms: u64) {
        let ms = ms.max(MIN_SLOT_MS);
        self.slot_duration_ms = ms;
        self.slot_remaining_ms = self.slot_remaining_ms.min(ms);
    }

    pub fn budget_duration_ms(&self) -> u64 {
        self.budget_duration_ms
    }

    /// An exhausted budget stays exhausted until the next rollover.
    pub fn set_budget_duration_ms(&mut self, ms: u64) {
        self.budget_duration_ms = ms;
        self.budget_remaining_ms = self.budget_remaining_ms.min(ms);
    }

    pub fn slot_remaining_ms(&self) -> u64 {
        self.slot_remaining_ms
    }

    pub fn budget_remaining_ms(&self) -> u64 {
        self.budget_remaining_ms
    }

    /// Total ON time accumulated since the last [`reset_daily_used`](Self::reset_daily_used).
    pub fn daily_used_ms(&self) -> u64 {
        self.daily_used_ms
    }

    pub fn reset_daily_used(&mut self) {
        self.daily_used_ms = 0;
    }
}
