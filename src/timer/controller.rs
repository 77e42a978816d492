use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use log::{debug, error, info};
use serde::Serialize;
use tokio::{
    sync::{broadcast, mpsc, watch},
    task::JoinHandle,
};

use crate::{
    audio::SoundNotifier,
    db::WorkoutStore,
    models::{WorkoutCategory, WorkoutRecord},
    utils::Clock,
};

use super::{
    machine::{TimerEffect, TimerEvent, TimerMachine, TimerNotice},
    ticker::{Tick, TickHandle, TickSource},
    TimerSession, TimerStatus,
};

const NOTICE_CAPACITY: usize = 16;

/// What observers see after each processed event.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub remaining_secs: u64,
    pub total_duration_secs: u64,
    pub elapsed_secs: u64,
    pub progress: f64,
    pub display: String,
    pub saving: bool,
    pub target_end_time: NaiveDateTime,
    pub category: WorkoutCategory,
    pub notes: String,
}

impl From<&TimerSession> for TimerSnapshot {
    fn from(session: &TimerSession) -> Self {
        Self {
            status: session.status,
            remaining_secs: session.remaining_secs,
            total_duration_secs: session.total_duration_secs,
            elapsed_secs: session.elapsed_secs(),
            progress: session.progress,
            display: session.display.clone(),
            saving: session.saving,
            target_end_time: session.target_end_time,
            category: session.workout.category,
            notes: session.workout.notes.clone(),
        }
    }
}

/// Handle to the task that owns the timer.
///
/// Every event goes through one channel, so the machine sees a single
/// serialized stream no matter how many clones send to it.
#[derive(Clone)]
pub struct TimerController {
    events: mpsc::UnboundedSender<TimerEvent>,
    snapshots: watch::Receiver<TimerSnapshot>,
    notices: broadcast::Sender<TimerNotice>,
}

impl TimerController {
    pub fn spawn<C, S, T>(
        machine: TimerMachine<C>,
        store: S,
        sound: Arc<dyn SoundNotifier>,
        ticks: T,
    ) -> (Self, JoinHandle<()>)
    where
        C: Clock + 'static,
        S: WorkoutStore,
        T: TickSource + 'static,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (tick_tx, tick_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(TimerSnapshot::from(machine.session()));
        let (notice_tx, _) = broadcast::channel(NOTICE_CAPACITY);

        let driver = Driver {
            machine,
            store,
            sound,
            ticks,
            ticker: None,
            next_generation: 0,
            events: events_tx.downgrade(),
            tick_tx,
            snapshots: snapshot_tx,
            notices: notice_tx.clone(),
        };
        let handle = tokio::spawn(driver.run(events_rx, tick_rx));

        let controller = Self {
            events: events_tx,
            snapshots: snapshot_rx,
            notices: notice_tx,
        };
        (controller, handle)
    }

    pub fn dispatch(&self, event: TimerEvent) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| anyhow!("timer task is no longer running"))
    }

    pub fn set_target_end_time(&self, target: NaiveDateTime) -> Result<()> {
        self.dispatch(TimerEvent::SetTargetEndTime(target))
    }

    pub fn set_category(&self, category: WorkoutCategory) -> Result<()> {
        self.dispatch(TimerEvent::SetCategory(category))
    }

    pub fn set_notes(&self, notes: impl Into<String>) -> Result<()> {
        self.dispatch(TimerEvent::SetNotes(notes.into()))
    }

    pub fn start(&self) -> Result<()> {
        self.dispatch(TimerEvent::Start)
    }

    pub fn pause(&self) -> Result<()> {
        self.dispatch(TimerEvent::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.dispatch(TimerEvent::Resume)
    }

    pub fn stop(&self) -> Result<()> {
        self.dispatch(TimerEvent::Stop)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn watch_snapshots(&self) -> watch::Receiver<TimerSnapshot> {
        self.snapshots.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<TimerNotice> {
        self.notices.subscribe()
    }
}

struct Driver<C: Clock, S, T> {
    machine: TimerMachine<C>,
    store: S,
    sound: Arc<dyn SoundNotifier>,
    ticks: T,
    ticker: Option<TickHandle>,
    next_generation: u64,
    /// Weak so the loop ends once every controller handle is gone.
    events: mpsc::WeakUnboundedSender<TimerEvent>,
    tick_tx: mpsc::UnboundedSender<Tick>,
    snapshots: watch::Sender<TimerSnapshot>,
    notices: broadcast::Sender<TimerNotice>,
}

impl<C, S, T> Driver<C, S, T>
where
    C: Clock,
    S: WorkoutStore,
    T: TickSource,
{
    async fn run(
        mut self,
        mut events_rx: mpsc::UnboundedReceiver<TimerEvent>,
        mut tick_rx: mpsc::UnboundedReceiver<Tick>,
    ) {
        loop {
            tokio::select! {
                event = events_rx.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
                Some(tick) = tick_rx.recv() => self.on_tick(tick),
            }
        }

        self.cancel_ticker();
        info!("Timer task shutting down");
    }

    fn on_tick(&mut self, tick: Tick) {
        let current = self
            .ticker
            .as_ref()
            .is_some_and(|handle| handle.generation() == tick.generation && !handle.is_cancelled());
        if current {
            self.dispatch(TimerEvent::Tick);
        } else {
            debug!("dropping stale tick from subscription {}", tick.generation);
        }
    }

    fn dispatch(&mut self, event: TimerEvent) {
        for effect in self.machine.handle(event) {
            self.execute(effect);
        }
        self.snapshots
            .send_replace(TimerSnapshot::from(self.machine.session()));
    }

    fn execute(&mut self, effect: TimerEffect) {
        match effect {
            TimerEffect::PlaySound(event) => self.sound.play(event),
            TimerEffect::SubscribeTicks => {
                self.cancel_ticker();
                self.next_generation += 1;
                let handle = self.ticks.subscribe(self.next_generation, self.tick_tx.clone());
                self.ticker = Some(handle);
            }
            TimerEffect::CancelTicks => self.cancel_ticker(),
            TimerEffect::PersistWorkout(record) => self.persist(record),
            TimerEffect::Notify(notice) => {
                // No subscribers is fine; the snapshot already reflects the reset.
                let _ = self.notices.send(notice);
            }
        }
    }

    fn cancel_ticker(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.cancel();
        }
    }

    fn persist(&self, record: WorkoutRecord) {
        let store = self.store.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let outcome = store.create(record.clone()).await.map(|()| record);
            if let Err(err) = &outcome {
                error!("Workout save failed: {err}");
            }

            match events.upgrade() {
                Some(events) => {
                    let _ = events.send(TimerEvent::SaveFinished(outcome));
                }
                None => debug!("timer task gone before save finished"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Duration as ChronoDuration;
    use tokio::time::timeout;

    use super::*;
    use crate::{
        audio::{testing::RecordingNotifier, SoundEvent},
        db::store::testing::MemoryStore,
        timer::ticker::testing::ManualTicker,
        utils::clock::testing::FixedClock,
    };

    const WAIT: Duration = Duration::from_secs(5);

    struct Harness {
        controller: TimerController,
        snapshots: watch::Receiver<TimerSnapshot>,
        notices: broadcast::Receiver<TimerNotice>,
        store: MemoryStore,
        sound: RecordingNotifier,
        ticker: ManualTicker,
        clock: FixedClock,
    }

    impl Harness {
        fn new() -> Self {
            let clock = FixedClock::at("2026-10-18T09:15:00Z");
            let store = MemoryStore::default();
            let sound = RecordingNotifier::default();
            let ticker = ManualTicker::default();
            let (controller, _task) = TimerController::spawn(
                TimerMachine::with_clock(clock),
                store.clone(),
                Arc::new(sound.clone()),
                ticker.clone(),
            );
            Self {
                snapshots: controller.watch_snapshots(),
                notices: controller.subscribe_notices(),
                controller,
                store,
                sound,
                ticker,
                clock,
            }
        }

        async fn wait_until(&mut self, check: impl FnMut(&TimerSnapshot) -> bool) -> TimerSnapshot {
            timeout(WAIT, self.snapshots.wait_for(check))
                .await
                .expect("snapshot condition within timeout")
                .expect("timer task alive")
                .clone()
        }

        async fn next_notice(&mut self) -> TimerNotice {
            timeout(WAIT, self.notices.recv())
                .await
                .expect("notice within timeout")
                .expect("notice channel open")
        }

        async fn configure_and_start(&mut self, total_secs: i64) {
            let target = self.clock.start_of_day() + ChronoDuration::seconds(total_secs);
            self.controller.set_target_end_time(target).unwrap();
            self.controller.start().unwrap();
            self.wait_until(|s| s.status == TimerStatus::Running).await;
        }

        fn fire(&self, count: u64) {
            for _ in 0..count {
                assert!(self.ticker.fire(), "a live tick subscription");
            }
        }
    }

    #[tokio::test]
    async fn countdown_to_zero_saves_full_duration() {
        let mut h = Harness::new();
        h.controller.set_category(WorkoutCategory::Strength).unwrap();
        h.configure_and_start(4).await;

        h.fire(4);
        match h.next_notice().await {
            TimerNotice::WorkoutSaved(record) => {
                assert_eq!(record.duration_secs, 4);
                assert_eq!(record.category, WorkoutCategory::Strength);
            }
            other => panic!("unexpected notice {other:?}"),
        }

        let snapshot = h.wait_until(|s| !s.saving).await;
        assert_eq!(snapshot.status, TimerStatus::Stopped);
        assert_eq!(snapshot.display, "00:00");
        assert_eq!(snapshot.progress, 1.0);
        assert_eq!(h.store.records().len(), 1);
        assert_eq!(h.ticker.live_count(), 0);
        assert_eq!(h.sound.played(), vec![SoundEvent::Start, SoundEvent::Stop]);
    }

    #[tokio::test]
    async fn pause_resume_does_not_lose_or_double_count() {
        let mut h = Harness::new();
        h.configure_and_start(10).await;

        h.fire(3);
        h.wait_until(|s| s.remaining_secs == 7).await;
        h.controller.pause().unwrap();
        h.wait_until(|s| s.status == TimerStatus::Paused).await;
        assert!(!h.ticker.fire());

        h.controller.resume().unwrap();
        h.wait_until(|s| s.status == TimerStatus::Running).await;
        assert_eq!(h.ticker.generations(), vec![1, 2]);

        // A tick from the first subscription arriving late is discarded.
        h.ticker.fire_late(1);
        h.fire(7);

        match h.next_notice().await {
            TimerNotice::WorkoutSaved(record) => assert_eq!(record.duration_secs, 10),
            other => panic!("unexpected notice {other:?}"),
        }
        assert_eq!(
            h.sound.played(),
            vec![
                SoundEvent::Start,
                SoundEvent::Pause,
                SoundEvent::Start,
                SoundEvent::Stop
            ]
        );
    }

    #[tokio::test]
    async fn manual_stop_saves_elapsed_time() {
        let mut h = Harness::new();
        h.configure_and_start(300).await;

        h.fire(12);
        h.wait_until(|s| s.elapsed_secs == 12).await;
        h.controller.stop().unwrap();

        match h.next_notice().await {
            TimerNotice::WorkoutSaved(record) => assert_eq!(record.duration_secs, 12),
            other => panic!("unexpected notice {other:?}"),
        }
        assert_eq!(h.ticker.subscription_count(), 1);
        assert_eq!(h.ticker.live_count(), 0);
    }

    #[tokio::test]
    async fn failed_save_is_reported_and_not_retried() {
        let mut h = Harness::new();
        h.store.fail_next(1);
        h.configure_and_start(60).await;

        h.fire(5);
        h.wait_until(|s| s.elapsed_secs == 5).await;
        h.controller.stop().unwrap();

        match h.next_notice().await {
            TimerNotice::SaveFailed(err) => assert!(err.to_string().contains("unavailable")),
            other => panic!("unexpected notice {other:?}"),
        }
        let snapshot = h.wait_until(|s| !s.saving).await;
        assert_eq!(snapshot.status, TimerStatus::Stopped);
        assert_eq!(snapshot.total_duration_secs, 0);

        // A second stop has nothing to write.
        h.controller.stop().unwrap();
        h.controller.set_notes("barrier").unwrap();
        h.wait_until(|s| s.notes == "barrier").await;
        assert_eq!(h.store.attempts(), 1);
        assert!(h.store.records().is_empty());
    }

    #[tokio::test]
    async fn zero_duration_auto_stops_on_first_tick() {
        let mut h = Harness::new();
        h.configure_and_start(0).await;

        h.fire(1);
        match h.next_notice().await {
            TimerNotice::WorkoutSaved(record) => assert_eq!(record.duration_secs, 0),
            other => panic!("unexpected notice {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_fails_once_task_is_gone() {
        let (controller, task) = TimerController::spawn(
            TimerMachine::with_clock(FixedClock::at("2026-10-18T09:15:00Z")),
            MemoryStore::default(),
            Arc::new(RecordingNotifier::default()),
            ManualTicker::default(),
        );
        assert!(controller.start().is_ok());

        task.abort();
        let _ = task.await;
        assert!(controller.stop().is_err());
    }
}
