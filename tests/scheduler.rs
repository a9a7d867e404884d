//! Black-box scheduler behaviour, checked against an absolute-deadline model.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use atmega128_sched::config::MAX_TASKS;
use atmega128_sched::rtos::{
    to_ticks, LocalScheduler, SchedulerError, TaskBuilder, TaskId,
};
use proptest::prelude::*;

const TICK_MS: u32 = 10;

fn cycle(sched: &LocalScheduler<'_>) -> usize {
    sched.tick();
    sched.dispatch()
}

#[test]
fn mixed_workload_timeline() {
    let fast = AtomicU32::new(0);
    let slow = AtomicU32::new(0);
    let once = AtomicU32::new(0);
    let fast_task = || {
        fast.fetch_add(1, Ordering::Relaxed);
    };
    let slow_task = || {
        slow.fetch_add(1, Ordering::Relaxed);
    };
    let once_task = || {
        once.fetch_add(1, Ordering::Relaxed);
    };

    let sched = LocalScheduler::local(TICK_MS);
    sched.init();

    let fast_id = sched.add_task(&fast_task, 20, 20).unwrap();
    let slow_id = sched.add_task(&slow_task, 100, 100).unwrap();
    sched.add_task(&once_task, 55, 0).unwrap();

    for _ in 0..50 {
        cycle(&sched);
    }

    // 50 ticks = 500 ms
    assert_eq!(fast.load(Ordering::Relaxed), 25);
    assert_eq!(slow.load(Ordering::Relaxed), 5);
    assert_eq!(once.load(Ordering::Relaxed), 1);
    assert_eq!(sched.len(), 2);
    assert_eq!(sched.stats().runs, 31);
    assert_eq!(sched.stats().overruns, 0);
    assert_eq!(sched.ticks(), 50);

    sched.delete_task(fast_id).unwrap();
    for _ in 0..10 {
        cycle(&sched);
    }
    assert_eq!(fast.load(Ordering::Relaxed), 25);
    assert_eq!(slow.load(Ordering::Relaxed), 6);
    assert!(sched.is_scheduled(slow_id));
}

#[test]
fn late_dispatch_still_runs_once_per_due_tick() {
    let hits = AtomicU32::new(0);
    let task = || {
        hits.fetch_add(1, Ordering::Relaxed);
    };
    let sched = LocalScheduler::local(TICK_MS);

    let id = sched.add_task(&task, 10, 10).unwrap();

    // Main loop stalls for several ticks
    for _ in 0..5 {
        sched.tick();
    }
    assert_eq!(sched.pending_runs(id), Some(1));
    assert_eq!(sched.ticks_until(id), None);

    assert_eq!(sched.dispatch(), 1);
    assert_eq!(sched.dispatch(), 0);
    assert_eq!(hits.load(Ordering::Relaxed), 1);
    assert_eq!(sched.ticks_until(id), Some(1));
    assert_eq!(sched.stats().overruns, 1);
}

#[test]
fn builder_and_direct_add_share_slots() {
    fn noop() {}
    let sched = LocalScheduler::local(TICK_MS);

    let a = TaskBuilder::new().callback(&noop).delay(10).build(&sched).unwrap();
    let b = sched.add_task(&noop, 10, 0).unwrap();

    assert_eq!(a, TaskId::new(0));
    assert_eq!(b, TaskId::new(1));
}

#[test]
fn full_table_does_not_disturb_existing_tasks() {
    fn noop() {}
    let sched = LocalScheduler::local(TICK_MS);

    for i in 0..MAX_TASKS as u32 {
        sched.add_task(&noop, (i + 1) * TICK_MS, 0).unwrap();
    }
    let before: Vec<_> = (0..MAX_TASKS)
        .map(|i| sched.ticks_until(TaskId::new(i)))
        .collect();

    assert_eq!(sched.add_task(&noop, 0, 0), Err(SchedulerError::Full));

    let after: Vec<_> = (0..MAX_TASKS)
        .map(|i| sched.ticks_until(TaskId::new(i)))
        .collect();
    assert_eq!(before, after);
}

// ============================================================================
// Model check
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Add { delay_ms: u32, period_ms: u32 },
    Delete(usize),
    Tick,
    Dispatch,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u32..200, prop_oneof![Just(0u32), 1u32..120])
            .prop_map(|(delay_ms, period_ms)| Op::Add { delay_ms, period_ms }),
        1 => (0..MAX_TASKS + 2).prop_map(Op::Delete),
        4 => Just(Op::Tick),
        2 => Just(Op::Dispatch),
    ]
}

/// Absolute-deadline reference for one slot.
#[derive(Debug, Clone, Copy)]
struct ModelTask {
    remaining: Option<u32>,
    period: u32,
    pending: u32,
}

struct Model {
    slots: Vec<Option<ModelTask>>,
    runs: usize,
}

impl Model {
    fn new() -> Self {
        Self {
            slots: vec![None; MAX_TASKS],
            runs: 0,
        }
    }

    fn add(&mut self, delay_ms: u32, period_ms: u32) -> Result<TaskId, SchedulerError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(SchedulerError::Full)?;
        self.slots[index] = Some(ModelTask {
            remaining: Some(to_ticks(delay_ms, TICK_MS).max(1)),
            period: to_ticks(period_ms, TICK_MS),
            pending: 0,
        });
        Ok(TaskId::new(index))
    }

    fn delete(&mut self, index: usize) -> Result<(), SchedulerError> {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_some() => {
                *slot = None;
                Ok(())
            }
            _ => Err(SchedulerError::NotFound),
        }
    }

    fn tick(&mut self) {
        for task in self.slots.iter_mut().flatten() {
            if let Some(r) = task.remaining {
                if r <= 1 {
                    task.remaining = None;
                    task.pending += 1;
                } else {
                    task.remaining = Some(r - 1);
                }
            }
        }
    }

    fn dispatch(&mut self) -> usize {
        let mut ran = 0;
        for slot in self.slots.iter_mut() {
            let Some(task) = slot else { continue };
            if task.pending == 0 {
                continue;
            }
            task.pending -= 1;
            ran += 1;
            if task.period == 0 {
                *slot = None;
            } else if task.pending == 0 {
                task.remaining = Some(task.period);
            }
        }
        self.runs += ran;
        ran
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn delta_queue_matches_absolute_model(ops in prop::collection::vec(op(), 1..300)) {
        let runs = AtomicUsize::new(0);
        let task = || {
            runs.fetch_add(1, Ordering::Relaxed);
        };
        let sched = LocalScheduler::local(TICK_MS);
        sched.init();
        let mut model = Model::new();

        for op in ops {
            match op {
                Op::Add { delay_ms, period_ms } => {
                    prop_assert_eq!(
                        sched.add_task(&task, delay_ms, period_ms),
                        model.add(delay_ms, period_ms)
                    );
                }
                Op::Delete(index) => {
                    prop_assert_eq!(
                        sched.delete_task(TaskId::new(index)),
                        model.delete(index)
                    );
                }
                Op::Tick => {
                    sched.tick();
                    model.tick();
                }
                Op::Dispatch => {
                    prop_assert_eq!(sched.dispatch(), model.dispatch());
                }
            }

            for (index, slot) in model.slots.iter().enumerate() {
                let id = TaskId::new(index);
                prop_assert_eq!(sched.is_scheduled(id), slot.is_some());
                prop_assert_eq!(sched.ticks_until(id), slot.and_then(|t| t.remaining));
                prop_assert_eq!(
                    sched.pending_runs(id).map(u32::from),
                    slot.map(|t| t.pending)
                );
            }
            prop_assert_eq!(runs.load(Ordering::Relaxed), model.runs);
        }
    }

    #[test]
    fn to_ticks_never_drops_nonzero(duration_ms in 1u32.., period_ms in 0u32..) {
        let ticks = to_ticks(duration_ms, period_ms);
        prop_assert!(ticks >= 1);
        let period = u64::from(period_ms.max(1));
        prop_assert!(u64::from(ticks) * period >= u64::from(duration_ms));
        prop_assert!((u64::from(ticks) - 1) * period < u64::from(duration_ms));
    }
}
