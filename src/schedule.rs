//! Weekly schedule table and its resolver.
//!
//! Maps (weekday, time-of-day) to a [`SystemMode`] plus ramped fan and
//! water setpoints.  Every derived query falls back to a fixed default when
//! no entry matches, so an incomplete table fails closed (Stop, damper
//! closed, a short water budget).
//!
//! Windows are half-open `[start, end)` in minutes since local midnight.
//! A window whose `start` is after its `end` wraps past midnight and
//! matches when `now >= start || now <= end`.  A window with
//! `start == end` covers the whole day.

use serde::{Deserialize, Serialize};

use crate::control::damper::DamperMode;
use crate::fsm::SystemMode;

pub const SCHEDULE_CAPACITY: usize = 32;

pub const DEFAULT_MODE: SystemMode = SystemMode::Stop;
pub const DEFAULT_FAN_PERCENT: u8 = 70;
pub const DEFAULT_INNER_FAN_PERCENT: u8 = 0;
pub const DEFAULT_WATER_BUDGET_SECS: u32 = 15;
pub const DEFAULT_AIR_MODE: DamperMode = DamperMode::Close;

const MINUTES_PER_DAY: u16 = 24 * 60;
const SECS_PER_DAY: i64 = 86_400;

// ---------------------------------------------------------------------------
// Calendar types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

impl Weekday {
    /// `0` is Sunday.
    pub fn from_index(idx: u8) -> Option<Self> {
        Some(match idx {
            0 => Self::Sunday,
            1 => Self::Monday,
            2 => Self::Tuesday,
            3 => Self::Wednesday,
            4 => Self::Thursday,
            5 => Self::Friday,
            6 => Self::Saturday,
            _ => return None,
        })
    }
}

/// Minutes since local midnight (0..1440).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);

    pub const fn hm(hour: u8, minute: u8) -> Self {
        Self((hour as u16 % 24) * 60 + (minute as u16 % 60))
    }

    pub const fn from_minutes(minutes: u16) -> Self {
        Self(minutes % MINUTES_PER_DAY)
    }

    pub const fn minutes(self) -> u16 {
        self.0
    }
}

/// Local calendar position used by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub weekday: Weekday,
    pub time: TimeOfDay,
}

impl WallTime {
    pub const fn new(weekday: Weekday, time: TimeOfDay) -> Self {
        Self { weekday, time }
    }

    /// Convert a Unix timestamp to local weekday and time of day.
    pub fn from_unix(unix_secs: i64, utc_offset_secs: i32) -> Self {
        let local = unix_secs + i64::from(utc_offset_secs);
        let days = local.div_euclid(SECS_PER_DAY);
        let secs_of_day = local.rem_euclid(SECS_PER_DAY);
        // 1970-01-01 was a Thursday.
        let weekday = Weekday::from_index((days + 4).rem_euclid(7) as u8).unwrap_or(Weekday::Sunday);
        Self {
            weekday,
            time: TimeOfDay::from_minutes((secs_of_day / 60) as u16),
        }
    }
}

// ---------------------------------------------------------------------------
// Table entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub day: Weekday,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    pub mode: SystemMode,
    pub start_fan_percent: u8,
    pub end_fan_percent: u8,
    pub inner_fan_percent: u8,
    pub water_budget_secs: u32,
}

impl ScheduleEntry {
    /// Entry with a flat fan speed.
    pub const fn new(
        day: Weekday,
        start: TimeOfDay,
        end: TimeOfDay,
        mode: SystemMode,
        fan_percent: u8,
    ) -> Self {
        Self {
            day,
            start,
            end,
            mode,
            start_fan_percent: fan_percent,
            end_fan_percent: fan_percent,
            inner_fan_percent: DEFAULT_INNER_FAN_PERCENT,
            water_budget_secs: DEFAULT_WATER_BUDGET_SECS,
        }
    }

    #[must_use]
    pub const fn with_fan_ramp(mut self, start_percent: u8, end_percent: u8) -> Self {
        self.start_fan_percent = start_percent;
        self.end_fan_percent = end_percent;
        self
    }

    #[must_use]
    pub const fn with_inner_fan(mut self, percent: u8) -> Self {
        self.inner_fan_percent = percent;
        self
    }

    #[must_use]
    pub const fn with_water_budget(mut self, secs: u32) -> Self {
        self.water_budget_secs = secs;
        self
    }

    /// Whether `time` falls inside this entry's window, ignoring the day.
    /// Plain windows are `[start, end)`; a window wrapping midnight also
    /// includes its end minute.  Equal bounds cover the whole day.
    pub fn contains(&self, time: TimeOfDay) -> bool {
        let (start, end, now) = (self.start, self.end, time);
        if start == end {
            true
        } else if start < end {
            now >= start && now < end
        } else {
            now >= start || now <= end
        }
    }

    fn window_minutes(&self) -> u16 {
        let (s, e) = (self.start.minutes(), self.end.minutes());
        if e > s { e - s } else { e + MINUTES_PER_DAY - s }
    }

    fn elapsed_minutes(&self, time: TimeOfDay) -> u16 {
        let (s, n) = (self.start.minutes(), time.minutes());
        if n >= s { n - s } else { n + MINUTES_PER_DAY - s }
    }

    /// Fan speed at `time`, linearly ramped across the window and
    /// rounded to the nearest percent.  Progress is clamped to `[0, 1]`.
    pub fn fan_speed_at(&self, time: TimeOfDay) -> u8 {
        if self.start_fan_percent == self.end_fan_percent {
            return self.start_fan_percent;
        }
        let progress = (f32::from(self.elapsed_minutes(time)) / f32::from(self.window_minutes()))
            .clamp(0.0, 1.0);
        let from = f32::from(self.start_fan_percent);
        let to = f32::from(self.end_fan_percent);
        (from + (to - from) * progress).round().clamp(0.0, 100.0) as u8
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// First-match lookup over an immutable table.
#[derive(Debug, Clone, Default)]
pub struct ScheduleResolver {
    entries: heapless::Vec<ScheduleEntry, SCHEDULE_CAPACITY>,
}

impl ScheduleResolver {
    pub fn new(entries: heapless::Vec<ScheduleEntry, SCHEDULE_CAPACITY>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// First entry in table order whose day and window contain `now`.
    pub fn current_entry(&self, now: WallTime) -> Option<ScheduleEntry> {
        self.entries
            .iter()
            .find(|e| e.day == now.weekday && e.contains(now.time))
            .copied()
    }

    pub fn current_mode(&self, now: WallTime) -> SystemMode {
        self.current_entry(now).map_or(DEFAULT_MODE, |e| e.mode)
    }

    pub fn current_fan_speed(&self, now: WallTime) -> u8 {
        self.current_entry(now)
            .map_or(DEFAULT_FAN_PERCENT, |e| e.fan_speed_at(now.time))
    }

    pub fn current_inner_fan_speed(&self, now: WallTime) -> u8 {
        self.current_entry(now)
            .map_or(DEFAULT_INNER_FAN_PERCENT, |e| e.inner_fan_percent)
    }

    pub fn current_water_budget_secs(&self, now: WallTime) -> u32 {
        self.current_entry(now)
            .map_or(DEFAULT_WATER_BUDGET_SECS, |e| e.water_budget_secs)
    }

    /// Open for Cool and Regenerate, otherwise closed.
    pub fn current_air_mode(&self, now: WallTime) -> DamperMode {
        match self.current_entry(now).map(|e| e.mode) {
            Some(SystemMode::Cool | SystemMode::Regenerate) => DamperMode::Open,
            _ => DEFAULT_AIR_MODE,
        }
    }
}

/// Factory table: weekend/Monday daytime cooling and an early-Sunday
/// regeneration run.
pub fn default_schedule() -> heapless::Vec<ScheduleEntry, SCHEDULE_CAPACITY> {
    let cool = |day| ScheduleEntry::new(day, TimeOfDay::hm(10, 0), TimeOfDay::hm(16, 0), SystemMode::Cool, 80);
    let table = [
        cool(Weekday::Friday),
        cool(Weekday::Saturday),
        ScheduleEntry::new(
            Weekday::Sunday,
            TimeOfDay::MIDNIGHT,
            TimeOfDay::hm(7, 0),
            SystemMode::Regenerate,
            80,
        )
        .with_water_budget(300),
        cool(Weekday::Sunday),
        cool(Weekday::Monday),
    ];
    table.into_iter().collect()
}
