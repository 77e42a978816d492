//! Command line arguments

use std::path::PathBuf;

use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::{models::WorkoutCategory, workouts::commands::Output};

#[derive(Parser, Debug)]
#[command(name = "sport-timer")]
#[command(about = "Workout countdown timer with local history and statistics")]
#[command(version)]
pub struct Cli {
    /// SQLite file holding the workout history
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a countdown and record the workout when it stops
    Start {
        /// Countdown length as HH:MM or HH:MM:SS
        #[arg(short, long, value_parser = parse_countdown)]
        duration: NaiveTime,

        /// Workout category (defaults to the configured one)
        #[arg(short, long)]
        category: Option<WorkoutCategory>,

        #[arg(short, long, default_value = "")]
        notes: String,
    },

    /// All workouts grouped by day
    History,

    /// Most recent workouts
    Recent {
        #[arg(short, long, default_value_t = 3)]
        limit: usize,
    },

    /// Totals per category
    Stats,

    /// Change category or notes of a recorded workout
    Edit {
        id: Uuid,

        #[arg(short, long)]
        category: Option<WorkoutCategory>,

        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Remove a recorded workout
    Delete { id: Uuid },

    /// Show or change preferences
    Settings {
        /// Turn start/pause/stop cues on or off
        #[arg(long)]
        sound: Option<bool>,

        /// Cue volume between 0.0 and 1.0
        #[arg(long)]
        volume: Option<f32>,

        /// Category used when `start` gets none
        #[arg(long)]
        default_category: Option<WorkoutCategory>,
    },
}

impl Cli {
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    pub fn output(&self) -> Output {
        if self.json {
            Output::Json
        } else {
            Output::Text
        }
    }
}

fn parse_countdown(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| format!("'{value}' is not a duration like 00:30 or 01:15:30"))
}
