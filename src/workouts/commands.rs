use std::fmt::Write as _;

use anyhow::{anyhow, bail, Result};
use chrono::{Local, NaiveDate, TimeZone};
use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    models::{StatisticsByCategory, WorkoutCategory, WorkoutGroup, WorkoutRecord},
    settings::{SoundSettings, UserSettings},
    utils::format_duration,
    AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Output {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsChange {
    pub sound: Option<bool>,
    pub volume: Option<f32>,
    pub default_category: Option<WorkoutCategory>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_workout<Tz: TimeZone>(workout: &WorkoutRecord, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let started = workout.start_date.with_timezone(tz).format("%H:%M");
    let mut line = format!(
        "  {}  {:<10} {:>8}  {}",
        started,
        workout.category,
        workout.duration_formatted(),
        workout.id
    );
    if !workout.notes.is_empty() {
        let _ = write!(line, "  {}", workout.notes);
    }
    line
}

fn render_history<Tz: TimeZone>(groups: &[WorkoutGroup], today: NaiveDate, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    if groups.is_empty() {
        return "No workouts yet.\n".to_string();
    }

    let mut out = String::new();
    for group in groups {
        let count = group.workouts.len();
        let _ = writeln!(
            out,
            "{} ({} workout{}, {})",
            group.title(today),
            count,
            if count == 1 { "" } else { "s" },
            format_duration(group.total_duration_secs())
        );
        for workout in &group.workouts {
            let _ = writeln!(out, "{}", render_workout(workout, tz));
        }
    }
    out
}

fn render_statistics(stats: &StatisticsByCategory) -> String {
    let mut out = format!("{:<12}{:>9}{:>11}\n", "Category", "Workouts", "Total");
    let rows = std::iter::once(WorkoutCategory::All).chain(WorkoutCategory::WORKOUT_KINDS);
    for category in rows {
        let entry = stats.get(&category).copied().unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<12}{:>9}{:>11}",
            category.as_str(),
            entry.workout_count,
            entry.total_duration_formatted()
        );
    }
    out
}

fn render_settings(settings: &UserSettings) -> String {
    format!(
        "sound: {}\nvolume: {:.2}\ndefault category: {}\n",
        if settings.sound.enabled { "on" } else { "off" },
        settings.sound.volume,
        settings.default_category
    )
}

pub async fn show_history(state: &AppState, output: Output) -> Result<()> {
    let groups = state.db.history(&Local).await?;
    match output {
        Output::Json => print_json(&groups),
        Output::Text => {
            print!("{}", render_history(&groups, Local::now().date_naive(), &Local));
            Ok(())
        }
    }
}

pub async fn show_recent(state: &AppState, limit: usize, output: Output) -> Result<()> {
    let workouts = state.db.recent_workouts(limit).await?;
    match output {
        Output::Json => print_json(&workouts),
        Output::Text if workouts.is_empty() => {
            println!("No workouts yet.");
            Ok(())
        }
        Output::Text => {
            for workout in &workouts {
                let day = workout.start_date.with_timezone(&Local).format("%Y-%m-%d");
                println!("{day}{}", render_workout(workout, &Local));
            }
            Ok(())
        }
    }
}

pub async fn show_statistics(state: &AppState, output: Output) -> Result<()> {
    let stats = state.db.statistics_by_category().await?;
    match output {
        Output::Json => print_json(&stats),
        Output::Text => {
            print!("{}", render_statistics(&stats));
            Ok(())
        }
    }
}

/// Changes category and/or notes of a stored workout and returns the result.
pub async fn edit_workout(
    state: &AppState,
    id: Uuid,
    category: Option<WorkoutCategory>,
    notes: Option<String>,
) -> Result<WorkoutRecord> {
    if category.is_none() && notes.is_none() {
        bail!("nothing to change; pass --category and/or --notes");
    }

    let mut workout = state
        .db
        .get_workout(id)
        .await?
        .ok_or_else(|| anyhow!("Workout {id} not found"))?;

    if let Some(category) = category {
        workout.category = category;
    }
    if let Some(notes) = notes {
        workout.notes = notes;
    }

    state.db.update_workout(&workout).await?;
    info!("Updated workout {id}");
    Ok(workout)
}

pub async fn delete_workout(state: &AppState, id: Uuid) -> Result<bool> {
    let removed = state.db.delete_workout(id).await?;
    if removed {
        info!("Deleted workout {id}");
    }
    Ok(removed)
}

/// Applies any requested changes, then returns the settings now in effect.
pub fn configure(state: &AppState, change: SettingsChange) -> Result<UserSettings> {
    if let Some(volume) = change.volume {
        if !(0.0..=1.0).contains(&volume) {
            bail!("volume must be between 0.0 and 1.0, got {volume}");
        }
    }

    if change.sound.is_some() || change.volume.is_some() {
        let current = state.settings.sound();
        state.settings.update_sound(SoundSettings {
            enabled: change.sound.unwrap_or(current.enabled),
            volume: change.volume.unwrap_or(current.volume),
        })?;
    }
    if let Some(category) = change.default_category {
        state.settings.update_default_category(category)?;
    }

    Ok(state.settings.get())
}

pub fn show_settings(settings: &UserSettings, output: Output) -> Result<()> {
    match output {
        Output::Json => print_json(settings),
        Output::Text => {
            print!("{}", render_settings(settings));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use tempfile::{tempdir, TempDir};

    use super::*;
    use crate::{db::Database, models::summarize, settings::SettingsStore};

    fn state() -> (AppState, TempDir) {
        let dir = tempdir().unwrap();
        let state = AppState {
            db: Database::in_memory().unwrap(),
            settings: SettingsStore::new(dir.path().join("settings.json")).unwrap(),
        };
        (state, dir)
    }

    fn workout(start: &str, category: WorkoutCategory, secs: u64, notes: &str) -> WorkoutRecord {
        let start = DateTime::parse_from_rfc3339(start).unwrap().with_timezone(&Utc);
        WorkoutRecord {
            category,
            duration_secs: secs,
            notes: notes.into(),
            ..WorkoutRecord::empty(start)
        }
    }

    #[test]
    fn history_text_groups_by_day() {
        let groups = crate::models::group_by_day(
            vec![
                workout("2026-10-17T07:00:00Z", WorkoutCategory::Yoga, 1200, ""),
                workout("2026-10-18T08:30:00Z", WorkoutCategory::Cardio, 1800, "5k"),
                workout("2026-10-18T18:00:00Z", WorkoutCategory::Strength, 2700, ""),
                workout("2026-09-03T06:00:00Z", WorkoutCategory::Other, 65, ""),
            ],
            &Utc,
        );
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let text = render_history(&groups, today, &Utc);
        let headings: Vec<&str> = text.lines().filter(|l| !l.starts_with("  ")).collect();
        assert_eq!(
            headings,
            vec![
                "Today (2 workouts, 01:15:00)",
                "Yesterday (1 workout, 20:00)",
                "3 September 2026 (1 workout, 01:05)",
            ]
        );
        assert!(text.contains("  18:00  Strength      45:00"));
        assert!(text.contains("  08:30  Cardio        30:00"));
        assert!(text.trim_end().lines().nth(2).unwrap().ends_with("  5k"));
    }

    #[test]
    fn empty_history_says_so() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        assert_eq!(render_history(&[], today, &Utc), "No workouts yet.\n");
    }

    #[test]
    fn statistics_list_every_category_with_total_first() {
        let stats = summarize(vec![
            (WorkoutCategory::Cardio, 600),
            (WorkoutCategory::Cardio, 300),
            (WorkoutCategory::Yoga, 60),
        ]);
        let text = render_statistics(&stats);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert!(lines[1].starts_with("All"));
        assert!(lines[1].ends_with("3      16:00"));
        assert!(lines[3].starts_with("Cardio"));
        assert!(lines[3].ends_with("2      15:00"));
        assert!(lines[2].ends_with("0      00:00"));
    }

    #[tokio::test]
    async fn edit_changes_only_requested_fields() {
        let (state, _dir) = state();
        let stored = workout("2026-10-18T08:30:00Z", WorkoutCategory::Cardio, 1800, "5k");
        state.db.insert_workout(&stored).await.unwrap();

        let edited = edit_workout(&state, stored.id, None, Some("tempo 5k".into()))
            .await
            .unwrap();
        assert_eq!(edited.category, WorkoutCategory::Cardio);
        assert_eq!(edited.notes, "tempo 5k");
        assert_eq!(edited.duration_secs, 1800);

        let reloaded = state.db.get_workout(stored.id).await.unwrap().unwrap();
        assert_eq!(reloaded, edited);
    }

    #[tokio::test]
    async fn edit_rejects_missing_workouts_and_empty_changes() {
        let (state, _dir) = state();
        let missing = edit_workout(&state, Uuid::new_v4(), Some(WorkoutCategory::Yoga), None).await;
        assert!(missing.unwrap_err().to_string().contains("not found"));

        let stored = workout("2026-10-18T08:30:00Z", WorkoutCategory::Cardio, 1800, "");
        state.db.insert_workout(&stored).await.unwrap();
        assert!(edit_workout(&state, stored.id, None, None).await.is_err());
        assert!(edit_workout(&state, stored.id, Some(WorkoutCategory::All), None)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let (state, _dir) = state();
        let stored = workout("2026-10-18T08:30:00Z", WorkoutCategory::Cardio, 1800, "");
        state.db.insert_workout(&stored).await.unwrap();

        assert!(delete_workout(&state, stored.id).await.unwrap());
        assert!(!delete_workout(&state, stored.id).await.unwrap());
    }

    #[test]
    fn configure_merges_partial_changes() {
        let (state, _dir) = state();
        let settings = configure(
            &state,
            SettingsChange {
                volume: Some(0.3),
                default_category: Some(WorkoutCategory::Strength),
                ..SettingsChange::default()
            },
        )
        .unwrap();
        assert!(settings.sound.enabled);
        assert_eq!(settings.sound.volume, 0.3);
        assert_eq!(settings.default_category, WorkoutCategory::Strength);

        let settings = configure(
            &state,
            SettingsChange {
                sound: Some(false),
                ..SettingsChange::default()
            },
        )
        .unwrap();
        assert!(!settings.sound.enabled);
        assert_eq!(settings.sound.volume, 0.3);
        assert_eq!(
            render_settings(&settings),
            "sound: off\nvolume: 0.30\ndefault category: Strength\n"
        );
    }

    #[test]
    fn configure_rejects_out_of_range_volume() {
        let (state, _dir) = state();
        let change = SettingsChange {
            volume: Some(1.5),
            ..SettingsChange::default()
        };
        assert!(configure(&state, change).is_err());
        assert_eq!(state.settings.sound(), SoundSettings::default());
    }
}
