//! Background scheduling for one-shot and periodic tasks.
//!
//! [`TaskScheduler`] is a passive queue of timed tasks that runs whatever is
//! due when [`TaskScheduler::process_ready`] is called. [`BackgroundScheduler`]
//! owns one on a dedicated thread that sleeps until the next task is due and
//! is woken through a control channel whenever the schedule changes.
//!
//! Background tasks never touch layer state. Work that must happen on the UI
//! thread is handed to a [`UiExecutor`](crate::UiExecutor).
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! use lattice_grid_core::BackgroundScheduler;
//!
//! let scheduler = BackgroundScheduler::spawn("example-sweep")?;
//! let ticks = Arc::new(AtomicUsize::new(0));
//! let counter = ticks.clone();
//!
//! let id = scheduler.schedule_repeating_with_delay(
//!     Duration::from_millis(5),
//!     Duration::from_millis(5),
//!     move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!     },
//! )?;
//!
//! std::thread::sleep(Duration::from_millis(50));
//! scheduler.cancel(id)?;
//! assert!(ticks.load(Ordering::SeqCst) >= 1);
//! # Ok::<(), lattice_grid_core::GridError>(())
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender};
use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::error::{GridError, Result};
use crate::logging::{span_names, targets};

new_key_type! {
    /// A unique identifier for a scheduled task.
    pub struct ScheduledTaskId;
}

/// The type of scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduledTaskKind {
    /// Executes once at the scheduled time.
    OneShot,
    /// Executes repeatedly at the specified interval.
    Repeating,
}

type BoxedScheduledTask = Box<dyn FnMut() + Send + 'static>;

struct ScheduledTaskData {
    next_run: Instant,
    interval: Duration,
    kind: ScheduledTaskKind,
    task: BoxedScheduledTask,
}

/// An entry in the scheduler queue (min-heap by execution time).
#[derive(Debug, Clone, Copy)]
struct SchedulerQueueEntry {
    id: ScheduledTaskId,
    run_time: Instant,
}

impl PartialEq for SchedulerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.run_time == other.run_time
    }
}

impl Eq for SchedulerQueueEntry {}

impl PartialOrd for SchedulerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchedulerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other.run_time.cmp(&self.run_time)
    }
}

/// A priority queue of timed tasks.
///
/// Tasks are ordered by their next execution time. Cancelled tasks leave a
/// stale heap entry behind which is skipped when it surfaces.
pub struct TaskScheduler {
    tasks: SlotMap<ScheduledTaskId, ScheduledTaskData>,
    queue: BinaryHeap<SchedulerQueueEntry>,
}

impl TaskScheduler {
    /// Create a new task scheduler.
    pub fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            queue: BinaryHeap::new(),
        }
    }

    fn insert(
        &mut self,
        next_run: Instant,
        interval: Duration,
        kind: ScheduledTaskKind,
        task: BoxedScheduledTask,
    ) -> ScheduledTaskId {
        let id = self.tasks.insert(ScheduledTaskData {
            next_run,
            interval,
            kind,
            task,
        });
        self.queue.push(SchedulerQueueEntry {
            id,
            run_time: next_run,
        });
        id
    }

    /// Schedule a one-shot task to execute after the specified delay.
    pub fn schedule_once<F>(&mut self, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.insert(
            Instant::now() + delay,
            delay,
            ScheduledTaskKind::OneShot,
            Box::new(task),
        )
    }

    /// Schedule a repeating task; the first execution occurs after `interval`.
    pub fn schedule_repeating<F>(&mut self, interval: Duration, task: F) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.schedule_repeating_with_delay(interval, interval, task)
    }

    /// Schedule a repeating task with an initial delay different from the interval.
    pub fn schedule_repeating_with_delay<F>(
        &mut self,
        initial_delay: Duration,
        interval: Duration,
        task: F,
    ) -> ScheduledTaskId
    where
        F: FnMut() + Send + 'static,
    {
        self.insert(
            Instant::now() + initial_delay,
            interval,
            ScheduledTaskKind::Repeating,
            Box::new(task),
        )
    }

    /// Cancel and remove a scheduled task.
    pub fn cancel(&mut self, id: ScheduledTaskId) -> Result<()> {
        match self.tasks.remove(id) {
            Some(_) => Ok(()),
            None => Err(GridError::Scheduler(format!("unknown task {id:?}"))),
        }
    }

    /// Check if a scheduled task is still pending.
    pub fn is_active(&self, id: ScheduledTaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Get the number of pending tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    /// Get the duration until the next task should execute, if any.
    pub fn time_until_next(&mut self) -> Option<Duration> {
        // Drop stale entries from the front of the queue.
        while let Some(entry) = self.queue.peek() {
            match self.tasks.get(entry.id) {
                Some(task) if task.next_run == entry.run_time => break,
                _ => {
                    self.queue.pop();
                }
            }
        }

        self.queue
            .peek()
            .map(|entry| entry.run_time.saturating_duration_since(Instant::now()))
    }

    /// Process all tasks that should execute now.
    ///
    /// Returns the number of tasks that were executed.
    #[tracing::instrument(skip(self), target = "lattice_grid::scheduler", level = "trace")]
    pub fn process_ready(&mut self) -> usize {
        let now = Instant::now();
        let mut executed_count = 0;

        while self.queue.peek().is_some_and(|entry| entry.run_time <= now) {
            let Some(entry) = self.queue.pop() else {
                break;
            };
            let id = entry.id;

            let Some(task_data) = self.tasks.get_mut(id) else {
                continue;
            };
            if entry.run_time != task_data.next_run {
                continue;
            }

            tracing::trace!(target: targets::SCHEDULER, ?id, "executing scheduled task");
            (task_data.task)();
            executed_count += 1;

            match task_data.kind {
                ScheduledTaskKind::OneShot => {
                    self.tasks.remove(id);
                }
                ScheduledTaskKind::Repeating => {
                    // Advance from the scheduled time to avoid drift, but never
                    // queue a backlog of catch-up runs.
                    let mut next_run = entry.run_time + task_data.interval;
                    if next_run <= now {
                        next_run = now + task_data.interval;
                    }
                    task_data.next_run = next_run;
                    self.queue.push(SchedulerQueueEntry {
                        id,
                        run_time: next_run,
                    });
                }
            }
        }

        executed_count
    }
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new()
    }
}

enum Control {
    Wake,
    Shutdown,
}

/// A [`TaskScheduler`] driven by its own thread.
///
/// Dropping the scheduler stops the thread. A task that is executing when
/// the scheduler is stopped runs to completion first.
pub struct BackgroundScheduler {
    name: String,
    inner: Arc<Mutex<TaskScheduler>>,
    control: Sender<Control>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl BackgroundScheduler {
    /// Start a scheduler thread with the given name.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let inner = Arc::new(Mutex::new(TaskScheduler::new()));
        let (control, receiver) = crossbeam_channel::unbounded();

        let thread_inner = inner.clone();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                loop {
                    let wait = thread_inner.lock().time_until_next();
                    let message = match wait {
                        Some(timeout) => receiver.recv_timeout(timeout),
                        None => receiver
                            .recv()
                            .map_err(|_| RecvTimeoutError::Disconnected),
                    };
                    match message {
                        Ok(Control::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                        Ok(Control::Wake) | Err(RecvTimeoutError::Timeout) => {
                            let _span = tracing::trace_span!(target: targets::SCHEDULER, span_names::SCHEDULER).entered();
                            thread_inner.lock().process_ready();
                        }
                    }
                }
            })
            .map_err(|e| GridError::Scheduler(format!("failed to spawn '{name}': {e}")))?;

        tracing::debug!(target: targets::SCHEDULER, name = %name, "background scheduler started");

        Ok(Self {
            name,
            inner,
            control,
            handle: Mutex::new(Some(handle)),
            stopped: AtomicBool::new(false),
        })
    }

    /// The thread name of this scheduler.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schedule a one-shot task.
    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> Result<ScheduledTaskId>
    where
        F: FnMut() + Send + 'static,
    {
        self.ensure_running()?;
        let id = self.inner.lock().schedule_once(delay, task);
        self.wake();
        Ok(id)
    }

    /// Schedule a repeating task with an initial delay.
    pub fn schedule_repeating_with_delay<F>(
        &self,
        initial_delay: Duration,
        interval: Duration,
        task: F,
    ) -> Result<ScheduledTaskId>
    where
        F: FnMut() + Send + 'static,
    {
        self.ensure_running()?;
        let id = self
            .inner
            .lock()
            .schedule_repeating_with_delay(initial_delay, interval, task);
        self.wake();
        Ok(id)
    }

    /// Cancel a scheduled task.
    pub fn cancel(&self, id: ScheduledTaskId) -> Result<()> {
        self.inner.lock().cancel(id)?;
        self.wake();
        Ok(())
    }

    /// Check if a scheduled task is still pending.
    pub fn is_active(&self, id: ScheduledTaskId) -> bool {
        self.inner.lock().is_active(id)
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(AtomicOrdering::Acquire)
    }

    /// Stop the thread and wait for it to exit. Pending tasks are dropped.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        let _ = self.control.send(Control::Shutdown);

        if let Some(handle) = self.handle.lock().take() {
            // A task that drops its own scheduler cannot join itself.
            if handle.thread().id() != std::thread::current().id() {
                let _ = handle.join();
            }
        }
        tracing::debug!(target: targets::SCHEDULER, name = %self.name, "background scheduler stopped");
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(GridError::SchedulerStopped);
        }
        Ok(())
    }

    fn wake(&self) {
        let _ = self.control.send(Control::Wake);
    }
}

impl Drop for BackgroundScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for BackgroundScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundScheduler")
            .field("name", &self.name)
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

static_assertions::assert_impl_all!(BackgroundScheduler: Send, Sync);

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_schedule_once() {
        let mut scheduler = TaskScheduler::new();
        let executed = Arc::new(AtomicUsize::new(0));
        let executed_clone = executed.clone();

        let id = scheduler.schedule_once(Duration::from_millis(10), move || {
            executed_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert!(scheduler.is_active(id));
        assert_eq!(scheduler.active_count(), 1);

        // Task shouldn't execute immediately
        assert_eq!(scheduler.process_ready(), 0);
        assert_eq!(executed.load(Ordering::SeqCst), 0);

        std::thread::sleep(Duration::from_millis(15));

        assert_eq!(scheduler.process_ready(), 1);
        assert_eq!(executed.load(Ordering::SeqCst), 1);

        // Task should be removed after execution
        assert!(!scheduler.is_active(id));
        assert_eq!(scheduler.active_count(), 0);
    }

    #[test]
    fn test_repeating_with_delay() {
        let mut scheduler = TaskScheduler::new();
        let executed = Arc::new(AtomicUsize::new(0));
        let executed_clone = executed.clone();

        let id = scheduler.schedule_repeating_with_delay(
            Duration::from_millis(20),
            Duration::from_millis(100),
            move || {
                executed_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(scheduler.process_ready(), 1);

        // Next run is a full interval away
        assert_eq!(scheduler.process_ready(), 0);
        assert!(scheduler.time_until_next().unwrap() > Duration::from_millis(50));
        assert!(scheduler.is_active(id));

        scheduler.cancel(id).unwrap();
        assert!(!scheduler.is_active(id));
        assert!(scheduler.time_until_next().is_none());
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_late_repeating_task_runs_once() {
        let mut scheduler = TaskScheduler::new();
        let executed = Arc::new(AtomicUsize::new(0));
        let executed_clone = executed.clone();

        scheduler.schedule_repeating(Duration::from_millis(5), move || {
            executed_clone.fetch_add(1, Ordering::SeqCst);
        });

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(scheduler.process_ready(), 1);
        assert_eq!(executed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_task() {
        let mut scheduler = TaskScheduler::new();
        let executed = Arc::new(AtomicUsize::new(0));
        let executed_clone = executed.clone();

        let id = scheduler.schedule_once(Duration::from_millis(10), move || {
            executed_clone.fetch_add(1, Ordering::SeqCst);
        });

        scheduler.cancel(id).unwrap();
        assert!(!scheduler.is_active(id));

        std::thread::sleep(Duration::from_millis(15));
        assert_eq!(scheduler.process_ready(), 0);
        assert_eq!(executed.load(Ordering::SeqCst), 0);

        // Cancelling again should fail
        assert!(scheduler.cancel(id).is_err());
    }

    #[test]
    fn test_multiple_tasks_order() {
        let mut scheduler = TaskScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let order1 = order.clone();
        scheduler.schedule_once(Duration::from_millis(30), move || {
            order1.lock().push(3);
        });

        let order2 = order.clone();
        scheduler.schedule_once(Duration::from_millis(10), move || {
            order2.lock().push(1);
        });

        let order3 = order.clone();
        scheduler.schedule_once(Duration::from_millis(20), move || {
            order3.lock().push(2);
        });

        std::thread::sleep(Duration::from_millis(35));
        scheduler.process_ready();

        assert_eq!(*order.lock(), vec![1, 2, 3]);
    }

    #[test]
    fn test_background_scheduler_runs_tasks() {
        let scheduler = BackgroundScheduler::spawn("test-scheduler").unwrap();
        let executed = Arc::new(AtomicUsize::new(0));
        let executed_clone = executed.clone();

        let id = scheduler
            .schedule_once(Duration::from_millis(10), move || {
                executed_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(executed.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_active(id));
    }

    #[test]
    fn test_background_scheduler_cancel_stops_repeats() {
        let scheduler = BackgroundScheduler::spawn("test-cancel").unwrap();
        let executed = Arc::new(AtomicUsize::new(0));
        let executed_clone = executed.clone();

        let id = scheduler
            .schedule_repeating_with_delay(
                Duration::from_millis(5),
                Duration::from_millis(5),
                move || {
                    executed_clone.fetch_add(1, Ordering::SeqCst);
                },
            )
            .unwrap();

        std::thread::sleep(Duration::from_millis(60));
        scheduler.cancel(id).unwrap();
        let after_cancel = executed.load(Ordering::SeqCst);
        assert!(after_cancel >= 1);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(executed.load(Ordering::SeqCst), after_cancel);
    }

    #[test]
    fn test_shutdown_rejects_new_tasks() {
        let scheduler = BackgroundScheduler::spawn("test-shutdown").unwrap();
        scheduler.shutdown();
        assert!(scheduler.is_stopped());

        let result = scheduler.schedule_once(Duration::from_millis(1), || {});
        assert!(matches!(result, Err(GridError::SchedulerStopped)));

        // Shutting down twice is harmless
        scheduler.shutdown();
    }
}
