//! Festival-local time: minute offsets with the past-midnight continuation,
//! festival day attribution, and placeholder detection.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

pub const DEFAULT_CUTOFF_HOUR: u32 = 6;
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Europe::Stockholm;

/// Sentinel pair the store uses for sets whose times are not released yet
pub const PLACEHOLDER_START: NaiveTime = match NaiveTime::from_hms_opt(12, 0, 0) {
    Some(t) => t,
    None => panic!("invalid placeholder start"),
};
pub const PLACEHOLDER_END: NaiveTime = match NaiveTime::from_hms_opt(12, 1, 0) {
    Some(t) => t,
    None => panic!("invalid placeholder end"),
};

const MINUTES_PER_HOUR: i64 = 60;
const HOURS_PER_DAY: u32 = 24;

/// Interprets instants in the festival's timezone.
///
/// Local times before `cutoff_hour` belong to the previous festival day and are
/// numbered 24:00 onwards, so a set ending at 02:00 sorts after one starting at 23:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FestivalClock {
    timezone: Tz,
    cutoff_hour: u32,
    placeholder_start: NaiveTime,
    placeholder_end: NaiveTime,
}

impl FestivalClock {
    pub fn new(
        timezone: Tz,
        cutoff_hour: u32,
        placeholder_start: NaiveTime,
        placeholder_end: NaiveTime,
    ) -> Self {
        Self {
            timezone,
            cutoff_hour,
            placeholder_start,
            placeholder_end,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn cutoff_hour(&self) -> u32 {
        self.cutoff_hour
    }

    /// Local hour with early-morning hours shifted past 24
    fn festival_hour(&self, instant: &DateTime<Utc>) -> (u32, u32) {
        let local = instant.with_timezone(&self.timezone);
        let hour = if local.hour() < self.cutoff_hour {
            local.hour() + HOURS_PER_DAY
        } else {
            local.hour()
        };
        (hour, local.minute())
    }

    /// Minutes since local midnight of the festival day the instant belongs to
    pub fn minutes_from_midnight(&self, instant: &DateTime<Utc>) -> i64 {
        let (hour, minute) = self.festival_hour(instant);
        i64::from(hour) * MINUTES_PER_HOUR + i64::from(minute)
    }

    /// Calendar date the instant is perceived to belong to
    pub fn festival_day(&self, instant: &DateTime<Utc>) -> NaiveDate {
        let local = instant.with_timezone(&self.timezone);
        let date = local.date_naive();
        if local.hour() < self.cutoff_hour {
            date.checked_sub_days(Days::new(1)).unwrap_or(date)
        } else {
            date
        }
    }

    /// True when the pair matches the "times not released yet" sentinel
    pub fn is_placeholder_time(&self, start: &DateTime<Utc>, end: &DateTime<Utc>) -> bool {
        same_minute(&start.with_timezone(&self.timezone).time(), &self.placeholder_start)
            && same_minute(&end.with_timezone(&self.timezone).time(), &self.placeholder_end)
    }
}

impl Default for FestivalClock {
    fn default() -> Self {
        Self::new(
            DEFAULT_TIMEZONE,
            DEFAULT_CUTOFF_HOUR,
            PLACEHOLDER_START,
            PLACEHOLDER_END,
        )
    }
}

fn same_minute(a: &NaiveTime, b: &NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

/// Format a festival minute offset as wall-clock "HH:MM" (25:20 -> "01:20")
pub fn format_minutes_to_time(minutes: i64) -> String {
    let hour = minutes.div_euclid(MINUTES_PER_HOUR).rem_euclid(i64::from(HOURS_PER_DAY));
    let minute = minutes.rem_euclid(MINUTES_PER_HOUR);
    format!("{:02}:{:02}", hour, minute)
}

/// Format an hour marker, folding 24+ hours back onto the clock face
pub fn format_hour(hour: i64) -> String {
    format!("{:02}:00", hour.rem_euclid(i64::from(HOURS_PER_DAY)))
}
