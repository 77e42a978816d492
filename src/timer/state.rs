use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{models::WorkoutRecord, utils::format_duration};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Stopped,
    Running,
    Paused,
}

impl Default for TimerStatus {
    fn default() -> Self {
        TimerStatus::Stopped
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSession {
    pub status: TimerStatus,
    pub target_end_time: NaiveDateTime,
    pub remaining_secs: u64,
    /// Countdown length fixed when the target end time was last set; the
    /// denominator for `progress`.
    pub total_duration_secs: u64,
    pub progress: f64,
    pub display: String,
    /// True between handing a finished workout to the store and its reply.
    pub saving: bool,
    pub workout: WorkoutRecord,
}

impl TimerSession {
    pub fn new(day_start: NaiveDateTime, now: DateTime<Utc>) -> Self {
        Self {
            status: TimerStatus::Stopped,
            target_end_time: day_start,
            remaining_secs: 0,
            total_duration_secs: 0,
            progress: 1.0,
            display: format_duration(0),
            saving: false,
            workout: WorkoutRecord::empty(now),
        }
    }

    /// Seconds actually spent running so far.
    pub fn elapsed_secs(&self) -> u64 {
        self.total_duration_secs.saturating_sub(self.remaining_secs)
    }

    pub fn set_total_duration(&mut self, duration_secs: u64) {
        self.total_duration_secs = duration_secs;
        self.set_remaining(duration_secs);
    }

    /// Updates the countdown together with its derived fields.
    pub fn set_remaining(&mut self, remaining_secs: u64) {
        self.remaining_secs = remaining_secs;
        self.display = format_duration(remaining_secs);
        self.progress = progress_ratio(remaining_secs, self.total_duration_secs);
    }

    /// Back to an empty stopped session with a fresh draft.
    pub fn reset(&mut self, day_start: NaiveDateTime, now: DateTime<Utc>) {
        *self = Self::new(day_start, now);
    }
}

/// `remaining / total` clamped to `[0, 1]`; a zero total counts as complete.
pub fn progress_ratio(remaining_secs: u64, total_secs: u64) -> f64 {
    if total_secs == 0 {
        return 1.0;
    }
    (remaining_secs as f64 / total_secs as f64).clamp(0.0, 1.0)
}
