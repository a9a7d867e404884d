//! Cooperative tick-driven task scheduler
//!
//! Two entry points share one [`TaskTable`]:
//!
//! - [`Scheduler::tick`] runs in the timer interrupt. It only moves the
//!   delta queue forward and marks tasks as due.
//! - [`Scheduler::dispatch`] runs in the main loop and calls due callbacks
//!   with interrupts enabled.
//!
//! Every access to the table goes through [`SharedState::with_mut`], which is
//! the critical section on the target.

use core::marker::PhantomData;

use super::error::{Result, SchedulerError};
use super::sync::{LocalState, SharedState};
use super::task::{Callback, SchedulerStats, TaskId, TaskTable};
use super::ticks::to_ticks;
use crate::config::MAX_TASKS;

#[cfg(target_arch = "avr")]
use super::sync::InterruptMutex;

/// Scheduler for single-context use (host tools, tests).
pub type LocalScheduler<'a> = Scheduler<'a, LocalState<TaskTable<'a>>>;

/// Scheduler shared between the timer ISR and the main loop.
#[cfg(target_arch = "avr")]
pub type IsrScheduler = Scheduler<'static, InterruptMutex<TaskTable<'static>>>;

pub struct Scheduler<'a, S> {
    state: S,
    tick_period_ms: u32,
    _callbacks: PhantomData<Callback<'a>>,
}

impl<'a> LocalScheduler<'a> {
    pub const fn local(tick_period_ms: u32) -> Self {
        Scheduler::new(LocalState::new(TaskTable::new()), tick_period_ms)
    }
}

#[cfg(target_arch = "avr")]
impl IsrScheduler {
    pub const fn interrupt_safe(tick_period_ms: u32) -> Self {
        Scheduler::new(InterruptMutex::new(TaskTable::new()), tick_period_ms)
    }
}

impl<'a, S> Scheduler<'a, S>
where
    S: SharedState<TaskTable<'a>>,
{
    /// Wrap an empty table. `tick_period_ms` is the hardware tick length;
    /// 0 is read as 1 ms.
    pub const fn new(state: S, tick_period_ms: u32) -> Self {
        Self {
            state,
            tick_period_ms,
            _callbacks: PhantomData,
        }
    }

    /// Drop all tasks and counters. Call before enabling the tick interrupt.
    pub fn init(&self) {
        self.state.with_mut(|table| table.reset());
        log_info!(
            "scheduler: {} slots, {} ms tick",
            MAX_TASKS,
            self.tick_period_ms()
        );
    }

    /// Tick length used for millisecond conversion.
    pub fn tick_period_ms(&self) -> u32 {
        self.tick_period_ms.max(1)
    }

    /// Register `callback` to run `delay_ms` from now and then every
    /// `period_ms` (0 = run once).
    ///
    /// Returns [`SchedulerError::Full`] when every slot is taken; existing
    /// tasks are unaffected.
    pub fn add_task(&self, callback: Callback<'a>, delay_ms: u32, period_ms: u32) -> Result<TaskId> {
        let delay_ticks = to_ticks(delay_ms, self.tick_period_ms);
        let period_ticks = to_ticks(period_ms, self.tick_period_ms);

        let result = self
            .state
            .with_mut(|table| table.allocate(callback, delay_ticks, period_ticks));

        match result {
            Ok(id) => log_debug!(
                "task {} added: delay {} ticks, period {} ticks",
                id.index(),
                delay_ticks,
                period_ticks
            ),
            Err(_) => log_warn!("task table full, {} slots in use", MAX_TASKS),
        }
        result
    }

    /// Remove a task. Any run that is due but not yet dispatched is dropped.
    pub fn delete_task(&self, id: TaskId) -> Result<()> {
        let result = self.state.with_mut(|table| table.release(id));
        match result {
            Ok(()) => log_debug!("task {} deleted", id.index()),
            Err(_) => log_debug!("delete of unknown task {}", id.index()),
        }
        result
    }

    /// Advance scheduler time by one tick. Call from the timer interrupt,
    /// exactly once per tick period.
    #[inline]
    pub fn tick(&self) {
        self.state.with_mut(|table| {
            table.advance();
        });
    }

    /// Run every due task once, in slot order. Call from the main loop.
    ///
    /// Callbacks run outside the critical section and may add or delete
    /// tasks, including their own. A slot owing more than one run gives up
    /// one per call. Returns the number of callbacks invoked.
    pub fn dispatch(&self) -> usize {
        let mut ran = 0;
        for index in 0..MAX_TASKS {
            let Some(due) = self.state.with_mut(|table| table.take_due(index)) else {
                continue;
            };

            (due.callback)();
            ran += 1;

            self.state
                .with_mut(|table| table.finish_run(index, due.generation));
        }
        ran
    }

    /// Main loop: dispatch, then `idle` (typically sleep until the next
    /// interrupt).
    pub fn run<F: FnMut()>(&self, mut idle: F) -> ! {
        loop {
            self.dispatch();
            idle();
        }
    }

    /// Ticks since `init`, wrapping.
    pub fn ticks(&self) -> u32 {
        self.state.with(|table| table.stats().ticks)
    }

    pub fn stats(&self) -> SchedulerStats {
        self.state.with(|table| table.stats())
    }

    pub const fn capacity(&self) -> usize {
        MAX_TASKS
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.state.with(|table| table.len())
    }

    pub fn is_empty(&self) -> bool {
        self.state.with(|table| table.is_empty())
    }

    /// True while `id` names a registered task.
    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.state.with(|table| table.slot(id).is_some())
    }

    pub fn pending_runs(&self, id: TaskId) -> Option<u8> {
        self.state.with(|table| table.slot(id).map(|s| s.pending_runs()))
    }

    pub fn period_ticks(&self, id: TaskId) -> Option<u32> {
        self.state.with(|table| table.slot(id).map(|s| s.period_ticks()))
    }

    /// Ticks until `id` fires; `None` if it is not waiting (free or due).
    pub fn ticks_until(&self, id: TaskId) -> Option<u32> {
        self.state.with(|table| table.ticks_until(id))
    }
}

/// Builder for registering a task.
///
/// Defaults to a one-shot task that is due on the next tick.
pub struct TaskBuilder<'a> {
    callback: Option<Callback<'a>>,
    delay_ms: u32,
    period_ms: u32,
}

impl<'a> TaskBuilder<'a> {
    pub fn new() -> Self {
        Self {
            callback: None,
            delay_ms: 0,
            period_ms: 0,
        }
    }

    pub fn callback(mut self, callback: Callback<'a>) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn delay(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn period(mut self, period_ms: u32) -> Self {
        self.period_ms = period_ms;
        self
    }

    /// Register with `scheduler`. A builder without a callback is rejected
    /// with [`SchedulerError::Full`], the same as a full table.
    pub fn build<S>(self, scheduler: &Scheduler<'a, S>) -> Result<TaskId>
    where
        S: SharedState<TaskTable<'a>>,
    {
        match self.callback {
            Some(callback) => scheduler.add_task(callback, self.delay_ms, self.period_ms),
            None => {
                log_warn!("task builder has no callback");
                Err(SchedulerError::Full)
            }
        }
    }
}

impl Default for TaskBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}
