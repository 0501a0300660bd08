//! Timer abstraction used for the intro delay, spawn ticks, and the end
//! panel reveal.
//!
//! The session only needs two capabilities: run a callback once after a
//! delay, and run a callback repeatedly at a fixed period. Both return a
//! [`TimerHandle`] that cancels the callback. Two implementations:
//!
//! - [`TokioTimer`] -- real time, backed by tasks on a Tokio runtime.
//! - [`ManualTimer`] -- virtual time that only moves when
//!   [`ManualTimer::advance`] is called. Used by tests and by headless
//!   replays that must be deterministic.
//!
//! Cancellation is cooperative: a cancelled callback is never invoked
//! again, but a callback that is already executing runs to completion.
//! Callers that need a stronger guarantee re-check their own predicate
//! inside the callback.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// One-shot timer callback.
pub type OnceTask = Box<dyn FnOnce() + Send + 'static>;

/// Repeating timer callback.
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

/// Shortest period accepted by [`Timer::every`].
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Errors that can occur when constructing a timer.
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    /// No Tokio runtime is available on the current thread.
    #[error("no tokio runtime available: {message}")]
    NoRuntime {
        /// Description from the runtime lookup.
        message: String,
    },
}

/// Scheduling capability the session depends on.
pub trait Timer: Send + Sync {
    /// Run `task` once after `delay`.
    fn after(&self, delay: Duration, task: OnceTask) -> TimerHandle;

    /// Run `task` every `period`, first firing one period from now.
    fn every(&self, period: Duration, task: RepeatingTask) -> TimerHandle;
}

/// Cancels a scheduled callback.
///
/// Clones share the same cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
    abort: Option<Arc<AbortHandle>>,
}

impl TimerHandle {
    /// Create a handle that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the callback from firing again.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(Arc::new(abort));
        self
    }
}

// ---------------------------------------------------------------------------
// Tokio
// ---------------------------------------------------------------------------

/// Real-time timer that spawns one Tokio task per scheduled callback.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
}

impl TokioTimer {
    /// Create a timer on an explicit runtime.
    pub const fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Create a timer on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`TimerError::NoRuntime`] when called outside a runtime.
    pub fn current() -> Result<Self, TimerError> {
        let runtime = Handle::try_current().map_err(|e| TimerError::NoRuntime {
            message: e.to_string(),
        })?;
        Ok(Self::new(runtime))
    }
}

impl Timer for TokioTimer {
    fn after(&self, delay: Duration, task: OnceTask) -> TimerHandle {
        let handle = TimerHandle::new();
        let cancelled = handle.flag();
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if !cancelled.load(Ordering::Acquire) {
                task();
            }
        });
        handle.with_abort(join.abort_handle())
    }

    fn every(&self, period: Duration, mut task: RepeatingTask) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        let handle = TimerHandle::new();
        let cancelled = handle.flag();
        let join = self.runtime.spawn(async move {
            let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if cancelled.load(Ordering::Acquire) {
                    break;
                }
                task();
            }
        });
        handle.with_abort(join.abort_handle())
    }
}

// ---------------------------------------------------------------------------
// Manual
// ---------------------------------------------------------------------------

enum Scheduled {
    Once(OnceTask),
    Repeating {
        period: Duration,
        task: RepeatingTask,
    },
}

struct Entry {
    due: Duration,
    seq: u64,
    cancelled: Arc<AtomicBool>,
    scheduled: Scheduled,
}

impl Entry {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    next_seq: u64,
    entries: Vec<Entry>,
}

impl ManualQueue {
    fn push(&mut self, due: Duration, cancelled: Arc<AtomicBool>, scheduled: Scheduled) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.saturating_add(1);
        self.entries.push(Entry {
            due,
            seq,
            cancelled,
            scheduled,
        });
    }

    /// Remove and return the earliest live entry due at or before `until`.
    fn pop_due(&mut self, until: Duration) -> Option<Entry> {
        self.entries.retain(|entry| !entry.is_cancelled());
        let position = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.due <= until)
            .min_by_key(|(_, entry)| (entry.due, entry.seq))
            .map(|(i, _)| i)?;
        Some(self.entries.remove(position))
    }
}

/// Virtual-time timer driven by explicit [`advance`](Self::advance) calls.
///
/// Callbacks run on the thread that calls `advance`, outside the timer's
/// internal lock, so a callback may schedule further callbacks.
#[derive(Default)]
pub struct ManualTimer {
    queue: Mutex<ManualQueue>,
}

impl ManualTimer {
    /// Create a timer at virtual time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of scheduled callbacks that have not been cancelled.
    pub fn pending(&self) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|entry| !entry.is_cancelled())
            .count()
    }

    /// Move virtual time forward by `by`, firing every callback that falls
    /// due, in time order (ties in scheduling order). Returns the number of
    /// callbacks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        let mut fired: usize = 0;

        loop {
            let entry = {
                let mut queue = self.lock();
                match queue.pop_due(target) {
                    Some(entry) => {
                        queue.now = entry.due;
                        entry
                    }
                    None => {
                        queue.now = target;
                        break;
                    }
                }
            };

            fired = fired.saturating_add(1);
            match entry.scheduled {
                Scheduled::Once(task) => task(),
                Scheduled::Repeating { period, mut task } => {
                    task();
                    if !entry.cancelled.load(Ordering::Acquire) {
                        let due = entry.due.saturating_add(period);
                        self.lock().push(
                            due,
                            entry.cancelled,
                            Scheduled::Repeating { period, task },
                        );
                    }
                }
            }
        }

        fired
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Timer for ManualTimer {
    fn after(&self, delay: Duration, task: OnceTask) -> TimerHandle {
        let handle = TimerHandle::new();
        let mut queue = self.lock();
        let due = queue.now.saturating_add(delay);
        queue.push(due, handle.flag(), Scheduled::Once(task));
        handle
    }

    fn every(&self, period: Duration, task: RepeatingTask) -> TimerHandle {
        let period = period.max(MIN_PERIOD);
        let handle = TimerHandle::new();
        let mut queue = self.lock();
        let due = queue.now.saturating_add(period);
        queue.push(due, handle.flag(), Scheduled::Repeating { period, task });
        handle
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicU32;

    use super::*;

    fn counter() -> (Arc<AtomicU32>, Arc<AtomicU32>) {
        let count = Arc::new(AtomicU32::new(0));
        (Arc::clone(&count), count)
    }

    #[test]
    fn manual_after_fires_once_when_due() {
        let timer = ManualTimer::new();
        let (count, seen) = counter();
        let _handle = timer.after(
            Duration::from_millis(500),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(timer.advance(Duration::from_millis(499)), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        assert_eq!(timer.advance(Duration::from_millis(1)), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(timer.advance(Duration::from_secs(10)), 0);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn manual_every_fires_each_period() {
        let timer = ManualTimer::new();
        let (count, seen) = counter();
        let _handle = timer.every(
            Duration::from_millis(100),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(timer.advance(Duration::from_millis(350)), 3);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(timer.now(), Duration::from_millis(350));
        assert_eq!(timer.advance(Duration::from_millis(50)), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn manual_cancel_stops_repeating() {
        let timer = ManualTimer::new();
        let (count, seen) = counter();
        let handle = timer.every(
            Duration::from_millis(100),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let _ = timer.advance(Duration::from_millis(200));
        handle.cancel();
        assert!(handle.is_cancelled());
        assert_eq!(timer.pending(), 0);
        let _ = timer.advance(Duration::from_secs(1));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn manual_cancel_before_due_suppresses_once() {
        let timer = ManualTimer::new();
        let (count, seen) = counter();
        let handle = timer.after(
            Duration::from_millis(10),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );
        handle.cancel();
        assert_eq!(timer.advance(Duration::from_millis(20)), 0);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn manual_fires_in_time_order() {
        let timer = ManualTimer::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for (label, delay) in [("late", 30_u64), ("early", 10), ("middle", 20)] {
            let order = Arc::clone(&order);
            let _ = timer.after(
                Duration::from_millis(delay),
                Box::new(move || order.lock().unwrap().push(label)),
            );
        }

        let _ = timer.advance(Duration::from_millis(30));
        assert_eq!(*order.lock().unwrap(), vec!["early", "middle", "late"]);
    }

    #[test]
    fn manual_callback_can_schedule_more_work() {
        let timer = Arc::new(ManualTimer::new());
        let (count, seen) = counter();

        let inner_timer = Arc::clone(&timer);
        let _ = timer.after(
            Duration::from_millis(10),
            Box::new(move || {
                let _ = inner_timer.after(
                    Duration::from_millis(10),
                    Box::new(move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    }),
                );
            }),
        );

        assert_eq!(timer.advance(Duration::from_millis(20)), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_repeating_task_can_cancel_itself() {
        let timer = ManualTimer::new();
        let slot: Arc<Mutex<Option<TimerHandle>>> = Arc::new(Mutex::new(None));
        let (count, seen) = counter();

        let own = Arc::clone(&slot);
        let handle = timer.every(
            Duration::from_millis(10),
            Box::new(move || {
                if count.fetch_add(1, Ordering::SeqCst) == 1 {
                    if let Some(handle) = own.lock().unwrap().as_ref() {
                        handle.cancel();
                    }
                }
            }),
        );
        *slot.lock().unwrap() = Some(handle);

        let _ = timer.advance(Duration::from_millis(100));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_after_fires_after_delay() {
        let timer = TokioTimer::current().unwrap();
        let (count, seen) = counter();
        let _handle = timer.after(
            Duration::from_millis(500),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_every_stops_on_cancel() {
        let timer = TokioTimer::current().unwrap();
        let (count, seen) = counter();
        let handle = timer.every(
            Duration::from_millis(100),
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn tokio_timer_requires_runtime() {
        assert!(matches!(
            TokioTimer::current(),
            Err(TimerError::NoRuntime { .. })
        ));
    }
}
