use chrono::{NaiveDate, TimeZone};
use serde::Serialize;

use super::WorkoutRecord;

/// Workouts that started on the same calendar day.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutGroup {
    pub date: NaiveDate,
    pub workouts: Vec<WorkoutRecord>,
}

impl WorkoutGroup {
    pub fn title(&self, today: NaiveDate) -> String {
        if self.date == today {
            "Today".to_string()
        } else if today.pred_opt() == Some(self.date) {
            "Yesterday".to_string()
        } else {
            self.date.format("%-d %B %Y").to_string()
        }
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.workouts.iter().map(|w| w.duration_secs).sum()
    }
}

/// Group workouts by the day they started in `tz`, newest day first.
/// Inside a day, workouts are ordered newest first.
pub fn group_by_day<Tz: TimeZone>(workouts: Vec<WorkoutRecord>, tz: &Tz) -> Vec<WorkoutGroup> {
    let mut sorted = workouts;
    sorted.sort_by(|a, b| b.start_date.cmp(&a.start_date));

    let mut groups: Vec<WorkoutGroup> = Vec::new();
    for workout in sorted {
        let day = workout.start_date.with_timezone(tz).date_naive();
        match groups.last_mut() {
            Some(group) if group.date == day => group.workouts.push(workout),
            _ => groups.push(WorkoutGroup {
                date: day,
                workouts: vec![workout],
            }),
        }
    }
    groups
}
