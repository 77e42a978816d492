use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::WorkoutCategory;
use crate::utils::format_duration;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutStatistics {
    pub total_duration_secs: u64,
    pub workout_count: u64,
}

impl WorkoutStatistics {
    pub fn total_duration_formatted(&self) -> String {
        format_duration(self.total_duration_secs)
    }

    fn record(&mut self, duration_secs: u64) {
        self.total_duration_secs = self.total_duration_secs.saturating_add(duration_secs);
        self.workout_count += 1;
    }
}

pub type StatisticsByCategory = BTreeMap<WorkoutCategory, WorkoutStatistics>;

/// Fold `(category, duration)` pairs into per-category totals.
///
/// The `All` entry is always present and covers every pair. Input order does
/// not affect the result.
pub fn summarize<I>(workouts: I) -> StatisticsByCategory
where
    I: IntoIterator<Item = (WorkoutCategory, u64)>,
{
    let mut stats = StatisticsByCategory::new();
    let mut all = WorkoutStatistics::default();

    for (category, duration_secs) in workouts {
        if category.is_recordable() {
            stats.entry(category).or_default().record(duration_secs);
        }
        all.record(duration_secs);
    }

    stats.insert(WorkoutCategory::All, all);
    stats
}
