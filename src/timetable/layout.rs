use serde::{Deserialize, Serialize};

use super::clock::FestivalClock;
use crate::lineup::Performance;

/// Hour window that every block on a day's timetable is positioned against.
///
/// `end_hour` may exceed 24 when the day runs past midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRange {
    pub start_hour: i64,
    pub end_hour: i64,
    pub total_minutes: i64,
}

impl TimeRange {
    /// Noon to midnight, used when a day has nothing to show
    pub const DEFAULT: TimeRange = TimeRange::from_hours(12, 24);

    pub const fn from_hours(start_hour: i64, end_hour: i64) -> Self {
        Self {
            start_hour,
            end_hour,
            total_minutes: (end_hour - start_hour) * 60,
        }
    }

    pub fn start_minutes(&self) -> i64 {
        self.start_hour * 60
    }

    /// Hours labelled in the timetable header, `[start_hour, end_hour)`
    pub fn hour_markers(&self) -> Vec<i64> {
        (self.start_hour..self.end_hour).collect()
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Horizontal placement of one block, in percent of the time range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPosition {
    pub left_percent: f64,
    pub width_percent: f64,
}

/// Smallest whole-hour window containing every start and end time.
pub fn calculate_time_range(clock: &FestivalClock, performances: &[Performance]) -> TimeRange {
    let bounds = performances
        .iter()
        .flat_map(|p| {
            [
                clock.minutes_from_midnight(&p.start_time),
                clock.minutes_from_midnight(&p.end_time),
            ]
        })
        .fold(None, |acc: Option<(i64, i64)>, minutes| match acc {
            None => Some((minutes, minutes)),
            Some((min, max)) => Some((min.min(minutes), max.max(minutes))),
        });

    let Some((min_minutes, max_minutes)) = bounds else {
        return TimeRange::DEFAULT;
    };

    let start_hour = min_minutes.div_euclid(60);
    let mut end_hour = (max_minutes + 59).div_euclid(60);
    // Every instant on the same whole hour would leave a zero-width window
    if end_hour <= start_hour {
        end_hour = start_hour + 1;
    }

    TimeRange::from_hours(start_hour, end_hour)
}

/// Map a minute interval onto the range.
///
/// No clamping: a range computed from a different performance set can yield
/// values outside 0..=100, and a non-positive duration yields a non-positive width.
pub fn calculate_block_position(
    start_minutes: i64,
    duration_minutes: i64,
    time_range: &TimeRange,
) -> BlockPosition {
    let total = time_range.total_minutes as f64;
    let offset_minutes = start_minutes - time_range.start_minutes();

    BlockPosition {
        left_percent: offset_minutes as f64 / total * 100.0,
        width_percent: duration_minutes as f64 / total * 100.0,
    }
}
