pub mod audio;
mod cli;
pub mod db;
pub mod models;
pub mod settings;
pub mod timer;
pub mod utils;
mod workouts;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Result};
use clap::Parser;
use directories::ProjectDirs;
use log::{debug, info};

use cli::{Cli, Command};
use db::Database;
use settings::SettingsStore;
use timer::commands::{start_workout, WorkoutPlan};
use workouts::commands::{self as workout_commands, SettingsChange};

const DB_FILE: &str = "sport-timer.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

pub(crate) struct AppState {
    pub(crate) db: Database,
    pub(crate) settings: SettingsStore,
}

/// Database file and settings file. An explicit `--db` keeps the settings
/// next to it.
fn resolve_paths(db_override: Option<PathBuf>) -> Result<(PathBuf, PathBuf)> {
    match db_override {
        Some(db_path) => {
            let settings_path = db_path
                .parent()
                .map(|dir| dir.join(SETTINGS_FILE))
                .unwrap_or_else(|| PathBuf::from(SETTINGS_FILE));
            Ok((db_path, settings_path))
        }
        None => {
            let dirs = ProjectDirs::from("", "", "sport-timer")
                .ok_or_else(|| anyhow!("could not determine a data directory; pass --db"))?;
            let data_dir = dirs.data_dir();
            Ok((data_dir.join(DB_FILE), data_dir.join(SETTINGS_FILE)))
        }
    }
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG still wins over the verbosity flag.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();

    let output = cli.output();
    let (db_path, settings_path) = resolve_paths(cli.db)?;
    debug!("Using database {} and settings {}", db_path.display(), settings_path.display());

    let state = AppState {
        db: Database::new(db_path)?,
        settings: SettingsStore::new(settings_path)?,
    };

    match cli.command {
        Command::Start {
            duration,
            category,
            notes,
        } => {
            let category = category.unwrap_or_else(|| state.settings.default_category());
            if !category.is_recordable() {
                bail!("'{category}' is not a workout category");
            }
            let record = start_workout(
                &state,
                WorkoutPlan {
                    duration,
                    category,
                    notes,
                },
            )
            .await?;
            info!("Workout {} saved", record.id);
            println!(
                "Saved {} workout of {} ({})",
                record.category,
                record.duration_formatted(),
                record.id
            );
        }
        Command::History => workout_commands::show_history(&state, output).await?,
        Command::Recent { limit } => workout_commands::show_recent(&state, limit, output).await?,
        Command::Stats => workout_commands::show_statistics(&state, output).await?,
        Command::Edit {
            id,
            category,
            notes,
        } => {
            let workout = workout_commands::edit_workout(&state, id, category, notes).await?;
            println!("Updated {} ({}, {})", workout.id, workout.category, workout.duration_formatted());
        }
        Command::Delete { id } => {
            if workout_commands::delete_workout(&state, id).await? {
                println!("Deleted {id}");
            } else {
                println!("No workout with id {id}");
            }
        }
        Command::Settings {
            sound,
            volume,
            default_category,
        } => {
            let settings = workout_commands::configure(
                &state,
                SettingsChange {
                    sound,
                    volume,
                    default_category,
                },
            )?;
            workout_commands::show_settings(&settings, output)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_db_keeps_settings_alongside() {
        let (db, settings) = resolve_paths(Some(PathBuf::from("/tmp/gym/log.sqlite3"))).unwrap();
        assert_eq!(db, PathBuf::from("/tmp/gym/log.sqlite3"));
        assert_eq!(settings, PathBuf::from("/tmp/gym/settings.json"));
    }
}
