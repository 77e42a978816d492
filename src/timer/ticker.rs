use std::time::Duration;

use log::debug;
use tokio::{
    sync::mpsc::UnboundedSender,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// One elapsed second, tagged with the subscription that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub generation: u64,
}

/// Cancels its subscription on `cancel` or drop. Cancelling twice is a no-op.
#[derive(Debug)]
pub struct TickHandle {
    generation: u64,
    token: CancellationToken,
}

impl TickHandle {
    pub fn new(generation: u64, token: CancellationToken) -> Self {
        Self { generation, token }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Periodic signal source. Drift correction is the source's business; each
/// delivered tick counts as exactly one second.
pub trait TickSource: Send + Sync {
    fn subscribe(&self, generation: u64, sink: UnboundedSender<Tick>) -> TickHandle;
}

/// Tokio interval ticker. Must be subscribed from inside a runtime.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTicker {
    period: Duration,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn every_second() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::every_second()
    }
}

impl TickSource for IntervalTicker {
    fn subscribe(&self, generation: u64, sink: UnboundedSender<Tick>) -> TickHandle {
        let token = CancellationToken::new();
        let cancel_token = token.clone();
        let period = self.period;

        tokio::spawn(async move {
            // First tick one full period after subscribing, not immediately.
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_token.cancelled() => break,
                    _ = interval.tick() => {
                        if sink.send(Tick { generation }).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("tick subscription {generation} finished");
        });

        TickHandle::new(generation, token)
    }
}
