//! Timetable layout: turns one festival day's performances into stage rows of
//! percentage-positioned blocks.

pub mod clock;
pub mod layout;
pub mod stages;

use serde::Serialize;

use crate::lineup::Performance;
pub use clock::{format_hour, format_minutes_to_time, FestivalClock};
pub use layout::{calculate_block_position, calculate_time_range, BlockPosition, TimeRange};
pub use stages::{group_and_order_stages, grid_view, GridPerformance, GridStage, StageGroup};

/// A performance with its place on the timetable
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionedPerformance {
    #[serde(flatten)]
    pub performance: Performance,
    pub left_percent: f64,
    pub width_percent: f64,
    pub start_minutes: i64,
    pub duration_minutes: i64,
    /// Artist names joined with `separator`
    pub display_name: String,
    pub separator: &'static str,
    /// "HH:MM - HH:MM" as printed under the artist names
    pub time_label: String,
}

impl PositionedPerformance {
    pub fn end_minutes(&self) -> i64 {
        self.start_minutes + self.duration_minutes
    }
}

/// Header label of one hour column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourMarker {
    pub hour: i64,
    pub label: String,
}

pub fn hour_markers(time_range: &TimeRange) -> Vec<HourMarker> {
    time_range
        .hour_markers()
        .into_iter()
        .map(|hour| HourMarker {
            hour,
            label: format_hour(hour),
        })
        .collect()
}

fn time_label(start_minutes: i64, end_minutes: i64) -> String {
    format!(
        "{} - {}",
        format_minutes_to_time(start_minutes),
        format_minutes_to_time(end_minutes)
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRow {
    pub id: i64,
    pub name: String,
    pub performances: Vec<PositionedPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimetableView {
    pub time_range: TimeRange,
    pub hour_markers: Vec<HourMarker>,
    pub stages: Vec<StageRow>,
}

/// What a client should draw for a selected day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DayTimetable {
    Scheduled { timetable: TimetableView },
    NotAnnounced { message: String },
}

pub const NOT_ANNOUNCED_MESSAGE: &str = "Set times for this day have not been announced yet.";

/// Build the timetable for one display day.
///
/// The time range is computed over the whole input, stages follow
/// `stage_order`, and blocks within a stage are sorted by start time
/// (ties keep their input order).
pub fn transform_to_timetable_data(
    clock: &FestivalClock,
    performances: &[Performance],
    stage_order: &[String],
) -> TimetableView {
    let time_range = calculate_time_range(clock, performances);

    let stages = group_and_order_stages(performances, stage_order)
        .into_iter()
        .map(|group| {
            let mut positioned: Vec<PositionedPerformance> = group
                .performances
                .into_iter()
                .map(|perf| position_performance(clock, perf, &time_range))
                .collect();
            positioned.sort_by_key(|p| p.start_minutes);

            StageRow {
                id: group.stage.id,
                name: group.stage.name.clone(),
                performances: positioned,
            }
        })
        .collect();

    TimetableView {
        hour_markers: hour_markers(&time_range),
        time_range,
        stages,
    }
}

fn position_performance(
    clock: &FestivalClock,
    perf: &Performance,
    time_range: &TimeRange,
) -> PositionedPerformance {
    let start_minutes = clock.minutes_from_midnight(&perf.start_time);
    let end_minutes = clock.minutes_from_midnight(&perf.end_time);
    let duration_minutes = end_minutes - start_minutes;

    if duration_minutes <= 0 {
        tracing::warn!(
            "Performance {} ({}) has non-positive duration {} min",
            perf.id,
            perf.name,
            duration_minutes
        );
    }

    let BlockPosition {
        left_percent,
        width_percent,
    } = calculate_block_position(start_minutes, duration_minutes, time_range);

    PositionedPerformance {
        performance: perf.clone(),
        left_percent,
        width_percent,
        start_minutes,
        duration_minutes,
        display_name: display_name(perf),
        separator: artist_separator(&perf.name),
        time_label: time_label(start_minutes, end_minutes),
    }
}

/// True when a non-empty day consists only of placeholder slots
pub fn is_schedule_unannounced(clock: &FestivalClock, performances: &[Performance]) -> bool {
    !performances.is_empty()
        && performances
            .iter()
            .all(|p| clock.is_placeholder_time(&p.start_time, &p.end_time))
}

pub fn day_timetable(
    clock: &FestivalClock,
    performances: &[Performance],
    stage_order: &[String],
) -> DayTimetable {
    if is_schedule_unannounced(clock, performances) {
        tracing::debug!(
            "All {} performances carry placeholder times",
            performances.len()
        );
        return DayTimetable::NotAnnounced {
            message: NOT_ANNOUNCED_MESSAGE.to_string(),
        };
    }

    DayTimetable::Scheduled {
        timetable: transform_to_timetable_data(clock, performances, stage_order),
    }
}

/// Join string between artist names, guessed from the performance name.
///
/// This is substring matching on free text; a name like "Sandy & the b2b"
/// picks " b2b ". Kept as-is because it decides what users see.
pub fn artist_separator(performance_name: &str) -> &'static str {
    if performance_name.contains("b2b") {
        " b2b "
    } else if performance_name.contains('&') {
        " & "
    } else if performance_name.contains("ft.") {
        " ft. "
    } else {
        " b2b "
    }
}

/// Artist names joined with the performance's separator
pub fn display_name(performance: &Performance) -> String {
    if performance.artists.is_empty() {
        return performance.name.clone();
    }

    let separator = artist_separator(&performance.name);
    performance
        .artists
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(separator)
}
