//! Task slots and the fixed-capacity task table.

use super::delta_queue::{self, DeltaQueue, QueueLink, QueueNode};
use super::error::{Result, SchedulerError};
use crate::config::MAX_TASKS;

/// A registered task body.
///
/// Borrowed for `'a`, so the callback has to outlive the slot it occupies.
/// `Sync` is required because the table may sit in a `static` shared with
/// the timer interrupt.
pub type Callback<'a> = &'a (dyn Fn() + Sync);

/// Stable handle to a table slot, valid until the task is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(usize);

impl TaskId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for TaskId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Scheduler counters, all wrapping or saturating, never reset except by `init`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SchedulerStats {
    /// Ticks seen since init (wraps)
    pub ticks: u32,
    /// Callbacks invoked by the dispatcher
    pub runs: u32,
    /// Runs dispatched one or more ticks after they became due
    pub overruns: u32,
    /// `add_task` calls rejected because the table was full
    pub rejected: u32,
}

impl SchedulerStats {
    pub const fn new() -> Self {
        Self {
            ticks: 0,
            runs: 0,
            overruns: 0,
            rejected: 0,
        }
    }
}

/// One entry of the task table.
#[derive(Clone, Copy)]
pub struct TaskSlot<'a> {
    callback: Option<Callback<'a>>,
    period_ticks: u32,
    pending_runs: u8,
    /// Tick count at which the slot last became due
    due_tick: u32,
    /// Bumped on every allocation so a run can tell if its slot was reused
    generation: u16,
    link: QueueLink,
}

impl<'a> TaskSlot<'a> {
    pub const FREE: Self = Self {
        callback: None,
        period_ticks: 0,
        pending_runs: 0,
        due_tick: 0,
        generation: 0,
        link: QueueLink::UNLINKED,
    };

    #[inline]
    pub fn is_free(&self) -> bool {
        self.callback.is_none()
    }

    #[inline]
    pub fn period_ticks(&self) -> u32 {
        self.period_ticks
    }

    #[inline]
    pub fn pending_runs(&self) -> u8 {
        self.pending_runs
    }

    #[inline]
    pub fn is_queued(&self) -> bool {
        self.link.is_queued()
    }

    fn clear(&mut self) {
        *self = Self {
            generation: self.generation,
            ..Self::FREE
        };
    }
}

impl QueueNode for TaskSlot<'_> {
    fn link(&self) -> &QueueLink {
        &self.link
    }

    fn link_mut(&mut self) -> &mut QueueLink {
        &mut self.link
    }
}

/// A run handed out by [`TaskTable::take_due`].
#[derive(Clone, Copy)]
pub struct DueRun<'a> {
    pub callback: Callback<'a>,
    pub generation: u16,
}

/// Fixed table of task slots plus the delta queue threading through them.
///
/// All methods assume the caller already holds exclusive access; see
/// [`crate::rtos::sync::SharedState`].
pub struct TaskTable<'a> {
    slots: [TaskSlot<'a>; MAX_TASKS],
    queue: DeltaQueue,
    stats: SchedulerStats,
}

impl<'a> TaskTable<'a> {
    pub const fn new() -> Self {
        Self {
            slots: [TaskSlot::FREE; MAX_TASKS],
            queue: DeltaQueue::new(),
            stats: SchedulerStats::new(),
        }
    }

    /// Drop every task and zero the counters.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub const fn capacity(&self) -> usize {
        MAX_TASKS
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| !s.is_free()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(TaskSlot::is_free)
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Occupied slot for `id`, if any.
    pub fn slot(&self, id: TaskId) -> Option<&TaskSlot<'a>> {
        self.slots.get(id.index()).filter(|s| !s.is_free())
    }

    /// Claim the lowest free slot and arm it `delay_ticks` from now.
    ///
    /// A delay of 0 is armed as 1 tick: the task is due on the next tick.
    pub fn allocate(
        &mut self,
        callback: Callback<'a>,
        delay_ticks: u32,
        period_ticks: u32,
    ) -> Result<TaskId> {
        let Some(index) = self.slots.iter().position(TaskSlot::is_free) else {
            self.stats.rejected = self.stats.rejected.saturating_add(1);
            return Err(SchedulerError::Full);
        };

        let slot = &mut self.slots[index];
        *slot = TaskSlot {
            callback: Some(callback),
            period_ticks,
            pending_runs: 0,
            due_tick: 0,
            generation: slot.generation.wrapping_add(1),
            link: QueueLink::UNLINKED,
        };
        self.queue.insert(&mut self.slots, index, delay_ticks.max(1));

        Ok(TaskId(index))
    }

    /// Free the slot behind `id`, discarding any pending runs.
    pub fn release(&mut self, id: TaskId) -> Result<()> {
        let index = id.index();
        match self.slots.get(index) {
            Some(slot) if !slot.is_free() => {}
            _ => return Err(SchedulerError::NotFound),
        }

        self.queue.remove(&mut self.slots, index);
        self.slots[index].clear();
        Ok(())
    }

    /// One timer tick: decrement the queue head and mark every slot that
    /// reaches zero as due. Returns the number of slots that became due.
    pub fn advance(&mut self) -> usize {
        self.stats.ticks = self.stats.ticks.wrapping_add(1);

        let now = self.stats.ticks;
        self.queue.advance(&mut self.slots, |_, slot| {
            slot.pending_runs = slot.pending_runs.saturating_add(1);
            slot.due_tick = now;
        })
    }

    /// Consume one pending run of slot `index`, if it has one.
    pub fn take_due(&mut self, index: usize) -> Option<DueRun<'a>> {
        let slot = self.slots.get_mut(index)?;
        let callback = slot.callback?;
        if slot.pending_runs == 0 {
            return None;
        }

        slot.pending_runs -= 1;
        self.stats.runs = self.stats.runs.wrapping_add(1);
        if slot.due_tick != self.stats.ticks {
            self.stats.overruns = self.stats.overruns.saturating_add(1);
        }
        Some(DueRun {
            callback,
            generation: slot.generation,
        })
    }

    /// Post-run bookkeeping for slot `index`: re-arm a periodic task, free a
    /// one-shot. Skipped when the slot was deleted or reallocated while the
    /// callback ran.
    pub fn finish_run(&mut self, index: usize, generation: u16) {
        let Some(slot) = self.slots.get(index) else {
            return;
        };
        if slot.is_free() || slot.generation != generation {
            return;
        }

        if slot.period_ticks == 0 {
            self.slots[index].clear();
            return;
        }

        // A slot with runs still owed stays off the queue until they drain
        if slot.pending_runs == 0 && !slot.is_queued() {
            let period = slot.period_ticks;
            self.queue.insert(&mut self.slots, index, period);
        }
    }

    /// Absolute ticks until `id` fires, or `None` if it is not queued.
    pub fn ticks_until(&self, id: TaskId) -> Option<u32> {
        let slot = self.slot(id)?;
        if !slot.is_queued() {
            return None;
        }
        self.queue
            .iter(&self.slots)
            .find(|&(i, _)| i == id.index())
            .map(|(_, ticks)| ticks)
    }

    /// Queued slots in firing order with their absolute deadlines.
    pub fn queued(&self) -> delta_queue::Iter<'_, TaskSlot<'a>> {
        self.queue.iter(&self.slots)
    }
}

impl Default for TaskTable<'_> {
    fn default() -> Self {
        Self::new()
    }
}
