use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::format_duration;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub enum WorkoutCategory {
    Strength,
    Cardio,
    Yoga,
    Stretching,
    Other,
    /// Aggregate key for statistics; never stored on a record.
    All,
}

impl Default for WorkoutCategory {
    fn default() -> Self {
        WorkoutCategory::Other
    }
}

impl WorkoutCategory {
    /// Categories a recorded workout may carry.
    pub const WORKOUT_KINDS: [WorkoutCategory; 5] = [
        WorkoutCategory::Strength,
        WorkoutCategory::Cardio,
        WorkoutCategory::Yoga,
        WorkoutCategory::Stretching,
        WorkoutCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutCategory::Strength => "Strength",
            WorkoutCategory::Cardio => "Cardio",
            WorkoutCategory::Yoga => "Yoga",
            WorkoutCategory::Stretching => "Stretching",
            WorkoutCategory::Other => "Other",
            WorkoutCategory::All => "All",
        }
    }

    pub fn is_recordable(&self) -> bool {
        *self != WorkoutCategory::All
    }
}

impl fmt::Display for WorkoutCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for WorkoutCategory {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "strength" => Ok(WorkoutCategory::Strength),
            "cardio" => Ok(WorkoutCategory::Cardio),
            "yoga" => Ok(WorkoutCategory::Yoga),
            "stretching" => Ok(WorkoutCategory::Stretching),
            "other" => Ok(WorkoutCategory::Other),
            "all" => Ok(WorkoutCategory::All),
            other => Err(anyhow!("unknown workout category '{other}'")),
        }
    }
}

/// A workout as it is drafted by the timer and later stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    pub id: Uuid,
    pub category: WorkoutCategory,
    pub duration_secs: u64,
    pub start_date: DateTime<Utc>,
    pub notes: String,
}

impl WorkoutRecord {
    /// Fresh draft with a new id, zero duration and no notes.
    pub fn empty(start_date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: WorkoutCategory::default(),
            duration_secs: 0,
            start_date,
            notes: String::new(),
        }
    }

    pub fn duration_formatted(&self) -> String {
        format_duration(self.duration_secs)
    }
}
