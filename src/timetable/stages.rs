use serde::Serialize;
use std::collections::HashMap;

use super::{artist_separator, display_name};
use crate::lineup::{Performance, Stage};

/// Priority given to stages missing from the configured order
pub const UNLISTED_STAGE_PRIORITY: usize = usize::MAX;

/// Performances sharing a stage name, in the order they were received
#[derive(Debug, Clone)]
pub struct StageGroup<'a> {
    /// First stage record seen under this name
    pub stage: &'a Stage,
    pub performances: Vec<&'a Performance>,
}

/// Grouped-but-unpositioned stage, as shown by the grid view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridStage {
    pub name: String,
    pub performances: Vec<GridPerformance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridPerformance {
    #[serde(flatten)]
    pub performance: Performance,
    pub display_name: String,
    pub separator: &'static str,
}

impl From<&Performance> for GridPerformance {
    fn from(performance: &Performance) -> Self {
        Self {
            display_name: display_name(performance),
            separator: artist_separator(&performance.name),
            performance: performance.clone(),
        }
    }
}

pub fn stage_priority(stage_name: &str, stage_order: &[String]) -> usize {
    stage_order
        .iter()
        .position(|s| s == stage_name)
        .unwrap_or(UNLISTED_STAGE_PRIORITY)
}

/// Group by stage name and order the groups by `stage_order`.
///
/// Records with the same name but different stage ids land in one group.
/// The sort is stable, so unlisted stages keep their encounter order.
pub fn group_and_order_stages<'a>(
    performances: &'a [Performance],
    stage_order: &[String],
) -> Vec<StageGroup<'a>> {
    let mut groups: Vec<StageGroup<'a>> = Vec::new();
    let mut index_by_name: HashMap<&'a str, usize> = HashMap::new();

    for perf in performances {
        let index = *index_by_name
            .entry(perf.stage.name.as_str())
            .or_insert_with(|| {
                groups.push(StageGroup {
                    stage: &perf.stage,
                    performances: Vec::new(),
                });
                groups.len() - 1
            });
        groups[index].performances.push(perf);
    }

    groups.sort_by_key(|g| stage_priority(&g.stage.name, stage_order));
    groups
}

/// Stage-grouped lineup without geometry, performances in received order
pub fn grid_view(performances: &[Performance], stage_order: &[String]) -> Vec<GridStage> {
    group_and_order_stages(performances, stage_order)
        .into_iter()
        .map(|group| GridStage {
            name: group.stage.name.clone(),
            performances: group
                .performances
                .into_iter()
                .map(GridPerformance::from)
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineup::test_support::performance;

    fn order(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn names(groups: &[StageGroup<'_>]) -> Vec<String> {
        groups.iter().map(|g| g.stage.name.clone()).collect()
    }

    #[test]
    fn test_listed_stages_first_unlisted_last() {
        let perfs = vec![
            performance("1", "B", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
            performance("2", "A", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
            performance("3", "C", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
        ];
        let groups = group_and_order_stages(&perfs, &order(&["A", "C"]));
        assert_eq!(names(&groups), vec!["A", "C", "B"]);
    }

    #[test]
    fn test_unlisted_stages_keep_encounter_order() {
        let perfs = vec![
            performance("1", "Z", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
            performance("2", "Y", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
            performance("3", "A", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
            performance("4", "X", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
        ];
        let groups = group_and_order_stages(&perfs, &order(&["A"]));
        assert_eq!(names(&groups), vec!["A", "Z", "Y", "X"]);
    }

    #[test]
    fn test_same_name_different_ids_are_merged() {
        let mut second = performance("2", "CORE", "2025-07-18T18:00:00Z", "2025-07-18T19:00:00Z");
        second.stage.id = 99;
        let perfs = vec![
            performance("1", "CORE", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
            second,
        ];
        let groups = group_and_order_stages(&perfs, &[]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].stage.id, perfs[0].stage.id);
        assert_eq!(groups[0].performances.len(), 2);
    }

    #[test]
    fn test_grid_view_keeps_received_order() {
        let perfs = vec![
            performance("late", "CAGE", "2025-07-18T22:00:00Z", "2025-07-18T23:00:00Z"),
            performance("early", "CAGE", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
            performance("main", "MAINSTAGE", "2025-07-18T16:00:00Z", "2025-07-18T17:00:00Z"),
        ];
        let grid = grid_view(&perfs, &order(&["MAINSTAGE", "CAGE"]));
        assert_eq!(grid.len(), 2);
        assert_eq!(grid[0].name, "MAINSTAGE");
        let ids: Vec<&str> = grid[1]
            .performances
            .iter()
            .map(|p| p.performance.id.as_str())
            .collect();
        assert_eq!(ids, vec!["late", "early"]);

        let json = serde_json::to_value(&grid[0].performances[0]).unwrap();
        assert_eq!(json["id"], "main");
        assert_eq!(json["displayName"], "Set main");
        assert_eq!(json["separator"], " b2b ");
    }

    #[test]
    fn test_stage_priority() {
        let stage_order = order(&["MAINSTAGE", "CORE"]);
        assert_eq!(stage_priority("CORE", &stage_order), 1);
        assert_eq!(stage_priority("UNKNOWN", &stage_order), UNLISTED_STAGE_PRIORITY);
    }
}
