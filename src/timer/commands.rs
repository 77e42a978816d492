use std::{
    io::{self, BufRead, Write},
    sync::Arc,
    thread,
};

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveTime, Timelike};
use log::{debug, warn};
use tokio::sync::{broadcast::error::RecvError, mpsc};

use crate::{
    audio::{AudioEngineHandle, SilentNotifier, SoundNotifier},
    models::{WorkoutCategory, WorkoutRecord},
    utils::{Clock, SystemClock},
    AppState,
};

use super::{IntervalTicker, TimerController, TimerMachine, TimerNotice, TimerSnapshot, TimerStatus};

const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone)]
pub struct WorkoutPlan {
    /// Countdown length, picked like an end time counted from midnight.
    pub duration: NaiveTime,
    pub category: WorkoutCategory,
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Pause,
    Resume,
    Stop,
    Help,
}

fn parse_control(input: &str) -> Option<Control> {
    match input.trim().to_ascii_lowercase().as_str() {
        "p" | "pause" => Some(Control::Pause),
        "r" | "resume" => Some(Control::Resume),
        "s" | "stop" | "q" | "quit" => Some(Control::Stop),
        "?" | "h" | "help" => Some(Control::Help),
        _ => None,
    }
}

fn render_line(snapshot: &TimerSnapshot) -> String {
    let filled = (snapshot.progress * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    let status = if snapshot.saving {
        "saving"
    } else {
        match snapshot.status {
            TimerStatus::Running => "running",
            TimerStatus::Paused => "paused",
            TimerStatus::Stopped => "stopped",
        }
    };
    format!(
        "{:>8} [{}{}] {:>3}% {}",
        snapshot.display,
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        (snapshot.progress * 100.0).round() as u64,
        status
    )
}

/// Forward stdin lines from a plain thread; a blocked read there cannot hold
/// up runtime shutdown.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        warn!("Failed to read stdin: {err}");
                        break;
                    }
                }
            }
        });
    if let Err(err) = spawned {
        warn!("Keyboard controls unavailable: {err}");
    }
    rx
}

fn sound_notifier(state: &AppState) -> Arc<dyn SoundNotifier> {
    let sound = state.settings.sound();
    if sound.enabled {
        Arc::new(AudioEngineHandle::new(sound.volume))
    } else {
        Arc::new(SilentNotifier)
    }
}

/// Runs one workout in the terminal and returns it once stored.
pub async fn start_workout(state: &AppState, plan: WorkoutPlan) -> Result<WorkoutRecord> {
    let (controller, _task) = TimerController::spawn(
        TimerMachine::new(),
        state.db.clone(),
        sound_notifier(state),
        IntervalTicker::every_second(),
    );

    println!("Controls: p = pause, r = resume, s = stop, ? = help");
    run_workout(&controller, &SystemClock, plan, spawn_stdin_reader()).await
}

pub async fn run_workout<C: Clock>(
    controller: &TimerController,
    clock: &C,
    plan: WorkoutPlan,
    mut input: mpsc::UnboundedReceiver<String>,
) -> Result<WorkoutRecord> {
    let mut notices = controller.subscribe_notices();
    let mut snapshots = controller.watch_snapshots();

    let countdown = Duration::seconds(i64::from(plan.duration.num_seconds_from_midnight()));
    controller.set_target_end_time(clock.start_of_day() + countdown)?;
    controller.set_category(plan.category)?;
    controller.set_notes(plan.notes)?;
    controller.start()?;

    let mut input_open = true;
    let mut stdout = io::stdout();

    loop {
        tokio::select! {
            notice = notices.recv() => match notice {
                Ok(TimerNotice::WorkoutSaved(record)) => {
                    println!();
                    return Ok(record);
                }
                Ok(TimerNotice::SaveFailed(err)) => {
                    println!();
                    return Err(anyhow::Error::new(err).context("workout was not saved"));
                }
                Err(RecvError::Lagged(skipped)) => warn!("missed {skipped} timer notices"),
                Err(RecvError::Closed) => bail!("timer task stopped unexpectedly"),
            },
            changed = snapshots.changed() => {
                changed.context("timer task stopped unexpectedly")?;
                let line = render_line(&snapshots.borrow_and_update());
                print!("\r{line}");
                stdout.flush()?;
            },
            line = input.recv(), if input_open => match line {
                Some(line) => match parse_control(&line) {
                    Some(Control::Pause) => controller.pause()?,
                    Some(Control::Resume) => controller.resume()?,
                    Some(Control::Stop) => controller.stop()?,
                    Some(Control::Help) => println!("\np = pause, r = resume, s = stop"),
                    None => debug!("ignoring input {line:?}"),
                },
                None => {
                    debug!("input closed, timer keeps running");
                    input_open = false;
                }
            },
        }
    }
}
