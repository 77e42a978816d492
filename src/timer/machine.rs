//! Timer state machine.
//!
//! ```text
//! TimerEvent -> TimerMachine::handle() -> Vec<TimerEffect>
//! ```
//!
//! The machine mutates only its own `TimerSession` and performs no I/O. Sounds,
//! tick subscriptions and the store write come back as [`TimerEffect`]s for
//! the controller to execute, and the store's reply is fed back in as
//! [`TimerEvent::SaveFinished`].
//!
//! While a finished workout is being saved, every user event is queued and
//! replayed in arrival order as soon as the save result has been applied.
//! Ticks arriving in that window are dropped.

use std::collections::VecDeque;

use chrono::NaiveDateTime;
use log::{debug, info, warn};

use crate::{
    audio::SoundEvent,
    db::StoreError,
    models::{WorkoutCategory, WorkoutRecord},
    utils::{Clock, SystemClock},
};

use super::{TimerSession, TimerStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum TimerEvent {
    SetTargetEndTime(NaiveDateTime),
    SetCategory(WorkoutCategory),
    SetNotes(String),
    Start,
    Pause,
    Resume,
    Stop,
    /// Exactly one second of running time has passed.
    Tick,
    SaveFinished(Result<WorkoutRecord, StoreError>),
}

impl TimerEvent {
    fn name(&self) -> &'static str {
        match self {
            TimerEvent::SetTargetEndTime(_) => "set-target-end-time",
            TimerEvent::SetCategory(_) => "set-category",
            TimerEvent::SetNotes(_) => "set-notes",
            TimerEvent::Start => "start",
            TimerEvent::Pause => "pause",
            TimerEvent::Resume => "resume",
            TimerEvent::Stop => "stop",
            TimerEvent::Tick => "tick",
            TimerEvent::SaveFinished(_) => "save-finished",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimerEffect {
    PlaySound(SoundEvent),
    SubscribeTicks,
    CancelTicks,
    PersistWorkout(WorkoutRecord),
    Notify(TimerNotice),
}

/// Outcome of a finished session, reported to whoever drives the timer.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerNotice {
    WorkoutSaved(WorkoutRecord),
    SaveFailed(StoreError),
}

pub struct TimerMachine<C: Clock = SystemClock> {
    session: TimerSession,
    clock: C,
    deferred: VecDeque<TimerEvent>,
}

impl TimerMachine<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for TimerMachine<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> TimerMachine<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            session: TimerSession::new(clock.start_of_day(), clock.now()),
            clock,
            deferred: VecDeque::new(),
        }
    }

    pub fn session(&self) -> &TimerSession {
        &self.session
    }

    pub fn deferred_len(&self) -> usize {
        self.deferred.len()
    }

    pub fn handle(&mut self, event: TimerEvent) -> Vec<TimerEffect> {
        let mut effects = Vec::new();
        self.apply(event, &mut effects);
        effects
    }

    fn apply(&mut self, event: TimerEvent, effects: &mut Vec<TimerEffect>) {
        if self.session.saving {
            match event {
                TimerEvent::SaveFinished(outcome) => {
                    self.finish_save(outcome, effects);
                    self.replay_deferred(effects);
                }
                TimerEvent::Tick => debug!("dropping tick while saving"),
                other => {
                    debug!("deferring {} until the workout is saved", other.name());
                    self.deferred.push_back(other);
                }
            }
            return;
        }

        match (self.session.status, event) {
            (TimerStatus::Stopped, TimerEvent::SetTargetEndTime(target)) => {
                let duration_secs = (target - self.clock.start_of_day()).num_seconds().max(0) as u64;
                self.session.target_end_time = target;
                self.session.set_total_duration(duration_secs);
            }
            (TimerStatus::Stopped, TimerEvent::SetCategory(category)) if category.is_recordable() => {
                self.session.workout.category = category;
            }
            (TimerStatus::Stopped, TimerEvent::SetNotes(notes)) => {
                self.session.workout.notes = notes;
            }
            (TimerStatus::Stopped, TimerEvent::Start) => {
                self.session.status = TimerStatus::Running;
                self.session.workout.start_date = self.clock.now();
                info!(
                    "Workout {} started with {}s on the clock",
                    self.session.workout.id, self.session.total_duration_secs
                );
                effects.push(TimerEffect::PlaySound(SoundEvent::Start));
                effects.push(TimerEffect::SubscribeTicks);
            }
            (TimerStatus::Running, TimerEvent::Tick) => {
                let remaining = self.session.remaining_secs.saturating_sub(1);
                self.session.set_remaining(remaining);
                if remaining == 0 {
                    info!("Countdown reached zero, stopping workout {}", self.session.workout.id);
                    self.stop(effects);
                }
            }
            (TimerStatus::Running, TimerEvent::Pause) => {
                self.session.status = TimerStatus::Paused;
                effects.push(TimerEffect::PlaySound(SoundEvent::Pause));
                effects.push(TimerEffect::CancelTicks);
            }
            (TimerStatus::Paused, TimerEvent::Resume) => {
                self.session.status = TimerStatus::Running;
                effects.push(TimerEffect::PlaySound(SoundEvent::Start));
                effects.push(TimerEffect::SubscribeTicks);
            }
            (TimerStatus::Running | TimerStatus::Paused, TimerEvent::Stop) => {
                self.stop(effects);
            }
            (status, event) => {
                debug!("ignoring {} while {:?}", event.name(), status);
            }
        }
    }

    fn stop(&mut self, effects: &mut Vec<TimerEffect>) {
        self.session.status = TimerStatus::Stopped;
        effects.push(TimerEffect::PlaySound(SoundEvent::Stop));
        effects.push(TimerEffect::CancelTicks);

        let fresh = WorkoutRecord::empty(self.clock.now());
        let mut record = std::mem::replace(&mut self.session.workout, fresh);
        record.duration_secs = self.session.elapsed_secs();

        self.session.saving = true;
        effects.push(TimerEffect::PersistWorkout(record));
    }

    fn finish_save(
        &mut self,
        outcome: Result<WorkoutRecord, StoreError>,
        effects: &mut Vec<TimerEffect>,
    ) {
        self.session.reset(self.clock.start_of_day(), self.clock.now());

        let notice = match outcome {
            Ok(record) => {
                info!("Workout {} saved ({}s)", record.id, record.duration_secs);
                TimerNotice::WorkoutSaved(record)
            }
            Err(err) => {
                warn!("Discarding unsaved workout: {err}");
                TimerNotice::SaveFailed(err)
            }
        };
        effects.push(TimerEffect::Notify(notice));
    }

    fn replay_deferred(&mut self, effects: &mut Vec<TimerEffect>) {
        while !self.session.saving {
            let Some(event) = self.deferred.pop_front() else {
                break;
            };
            self.apply(event, effects);
        }
    }
}
