//! Cooperative tick-driven scheduler

pub mod delta_queue;
pub mod error;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod ticks;

pub use error::{Result, SchedulerError};
pub use scheduler::{LocalScheduler, Scheduler, TaskBuilder};
pub use sync::{LocalState, SharedState};
pub use task::{Callback, SchedulerStats, TaskId, TaskTable};
pub use ticks::to_ticks;

#[cfg(target_arch = "avr")]
pub use scheduler::IsrScheduler;
#[cfg(target_arch = "avr")]
pub use sync::InterruptMutex;
