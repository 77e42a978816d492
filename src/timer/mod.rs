pub(crate) mod commands;
pub mod controller;
pub mod machine;
pub mod state;
pub mod ticker;

pub use controller::{TimerController, TimerSnapshot};
pub use machine::{TimerEffect, TimerEvent, TimerMachine, TimerNotice};
pub use state::{TimerSession, TimerStatus};
pub use ticker::{IntervalTicker, Tick, TickHandle, TickSource};
