//! Timer scheduling ports
//!
//! Two primitives cover every timer the exam page uses: "repeat every N" for
//! the countdown tick and autosave, and "run once after N" for the grace
//! delay before auto-submission. Both hand back a [`TaskHandle`].

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use tokio::{
    runtime::Handle,
    task::AbortHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::debug;

use super::clock::{Clock, ManualClock};

/// Task run on every period
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;
/// Task run a single time
pub type OneShotTask = Box<dyn FnOnce() + Send + 'static>;

/// Scheduling primitives injected into the timer components
pub trait Scheduler: Send + Sync {
    /// Run `task` every `period`, first run one period from now
    fn every(&self, period: Duration, task: RepeatingTask) -> TaskHandle;

    /// Run `task` once, `delay` from now
    fn after(&self, delay: Duration, task: OneShotTask) -> TaskHandle;
}

/// Cancellation handle for a scheduled task
#[derive(Debug, Clone, Default)]
pub struct TaskHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<Arc<AbortHandle>>,
}

impl TaskHandle {
    fn new() -> Self {
        Self::default()
    }

    fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(Arc::new(abort));
        self
    }

    /// Stop the task. Safe to call any number of times, including from
    /// inside the task itself.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            debug!("Scheduled task cancelled");
        }
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Scheduler that spawns onto a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Use the runtime of the calling context. Panics outside a runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, mut task: RepeatingTask) -> TaskHandle {
        let handle = TaskHandle::new();
        let cancelled = Arc::clone(&handle.cancelled);

        let join = self.runtime.spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                if cancelled.load(Ordering::SeqCst) {
                    break;
                }
                task();
            }
        });

        handle.with_abort(join.abort_handle())
    }

    fn after(&self, delay: Duration, task: OneShotTask) -> TaskHandle {
        let handle = TaskHandle::new();
        let cancelled = Arc::clone(&handle.cancelled);

        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !cancelled.load(Ordering::SeqCst) {
                task();
            }
        });

        handle.with_abort(join.abort_handle())
    }
}

enum Job {
    Repeat(RepeatingTask),
    Once(OneShotTask),
}

struct Entry {
    id: u64,
    due_ms: i64,
    period_ms: Option<i64>,
    job: Job,
    handle: TaskHandle,
}

#[derive(Default)]
struct Queue {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Deterministic scheduler driven by a [`ManualClock`]
///
/// Nothing runs until [`ManualScheduler::advance`] is called. Due tasks then
/// run one at a time in due order, with the clock set to each task's due
/// time. Tasks may schedule or cancel other tasks while running.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: ManualClock,
    queue: Arc<Mutex<Queue>>,
}

impl ManualScheduler {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            queue: Arc::new(Mutex::new(Queue::default())),
        }
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Number of live (not cancelled) scheduled tasks
    pub fn pending(&self) -> usize {
        self.queue()
            .entries
            .iter()
            .filter(|entry| !entry.handle.is_cancelled())
            .count()
    }

    /// Move time forward by `by`, running everything that falls due
    pub fn advance(&self, by: Duration) {
        let target = self.clock.now_ms() + by.as_millis() as i64;

        while let Some(entry) = self.pop_due(target) {
            self.clock.set(entry.due_ms);

            match entry.job {
                Job::Repeat(mut task) => {
                    task();
                    if let Some(period_ms) = entry.period_ms {
                        if !entry.handle.is_cancelled() {
                            self.queue().entries.push(Entry {
                                id: entry.id,
                                due_ms: entry.due_ms + period_ms,
                                period_ms: entry.period_ms,
                                job: Job::Repeat(task),
                                handle: entry.handle,
                            });
                        }
                    }
                }
                Job::Once(task) => task(),
            }
        }

        self.clock.set(target);
    }

    fn pop_due(&self, target: i64) -> Option<Entry> {
        let mut queue = self.queue();
        queue.entries.retain(|entry| !entry.handle.is_cancelled());

        let index = queue
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due_ms <= target)
            .min_by_key(|(_, entry)| (entry.due_ms, entry.id))
            .map(|(index, _)| index)?;

        Some(queue.entries.remove(index))
    }

    fn push(&self, delay: Duration, period: Option<Duration>, job: Job) -> TaskHandle {
        let handle = TaskHandle::new();
        let mut queue = self.queue();
        let id = queue.next_id;
        queue.next_id += 1;

        queue.entries.push(Entry {
            id,
            due_ms: self.clock.now_ms() + delay.as_millis() as i64,
            period_ms: period.map(|period| period.as_millis() as i64),
            job,
            handle: handle.clone(),
        });

        handle
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, task: RepeatingTask) -> TaskHandle {
        // A zero period would spin forever inside `advance`
        let period = period.max(Duration::from_millis(1));
        self.push(period, Some(period), Job::Repeat(task))
    }

    fn after(&self, delay: Duration, task: OneShotTask) -> TaskHandle {
        self.push(delay, None, Job::Once(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize) {
        let count = Arc::new(AtomicUsize::new(0));
        let read = Arc::clone(&count);
        (count, move || read.load(Ordering::SeqCst))
    }

    #[test]
    fn repeating_task_runs_once_per_period() {
        let scheduler = ManualScheduler::new(ManualClock::new(0));
        let (count, read) = counter();

        scheduler.every(
            Duration::from_secs(1),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        scheduler.advance(Duration::from_millis(999));
        assert_eq!(read(), 0);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(read(), 1);
        scheduler.advance(Duration::from_secs(4));
        assert_eq!(read(), 5);
        assert_eq!(scheduler.clock().now_ms(), 5_000);
    }

    #[test]
    fn one_shot_runs_once_at_due_time() {
        let scheduler = ManualScheduler::new(ManualClock::new(10_000));
        let seen_at = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen_at);
        let clock = scheduler.clock().clone();

        scheduler.after(
            Duration::from_millis(1500),
            Box::new(move || {
                *slot.lock().unwrap() = Some(clock.now_ms());
            }),
        );

        scheduler.advance(Duration::from_secs(10));
        assert_eq!(*seen_at.lock().unwrap(), Some(11_500));
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn cancel_is_idempotent_and_stops_task() {
        let scheduler = ManualScheduler::new(ManualClock::new(0));
        let (count, read) = counter();

        let handle = scheduler.every(
            Duration::from_secs(1),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        scheduler.advance(Duration::from_secs(2));
        handle.cancel();
        handle.cancel();
        scheduler.advance(Duration::from_secs(5));

        assert_eq!(read(), 2);
        assert!(handle.is_cancelled());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn task_can_cancel_itself_and_schedule_followup() {
        let scheduler = ManualScheduler::new(ManualClock::new(0));
        let (count, read) = counter();
        let (followups, read_followups) = counter();
        let own_handle: Arc<Mutex<Option<TaskHandle>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&own_handle);
        let inner = scheduler.clone();
        let handle = scheduler.every(
            Duration::from_secs(1),
            Box::new(move || {
                if count.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    if let Some(handle) = slot.lock().unwrap().as_ref() {
                        handle.cancel();
                    }
                    let followups = Arc::clone(&followups);
                    inner.after(
                        Duration::from_millis(500),
                        Box::new(move || {
                            followups.fetch_add(1, Ordering::SeqCst);
                        }),
                    );
                }
            }),
        );
        *own_handle.lock().unwrap() = Some(handle);

        scheduler.advance(Duration::from_secs(10));
        assert_eq!(read(), 3);
        assert_eq!(read_followups(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_ticks_and_cancels() {
        let scheduler = TokioScheduler::current();
        let (count, read) = counter();

        let handle = scheduler.every(
            Duration::from_secs(1),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(read(), 3);

        handle.cancel();
        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(read(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_cancelled_one_shot_never_runs() {
        let scheduler = TokioScheduler::current();
        let (fired, read_fired) = counter();
        let (skipped, read_skipped) = counter();

        scheduler.after(
            Duration::from_millis(1500),
            Box::new(move || {
                fired.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let cancelled = scheduler.after(
            Duration::from_millis(1500),
            Box::new(move || {
                skipped.fetch_add(1, Ordering::SeqCst);
            }),
        );
        cancelled.cancel();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(read_fired(), 1);
        assert_eq!(read_skipped(), 0);
    }
}
