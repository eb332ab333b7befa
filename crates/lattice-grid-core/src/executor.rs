//! Marshalling work onto the UI thread.
//!
//! Layer state belongs to a single UI thread. Background tasks that need to
//! touch it (the conflation chain's refresh, for example) post a closure to a
//! [`UiExecutor`] instead. Two executors are provided:
//!
//! - [`UiQueue`]: a queue the host's own event loop drains by calling
//!   [`UiQueue::process_pending`].
//! - [`UiThread`]: a dedicated consumer thread for hosts without a loop of
//!   their own (and for tests).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::error::{GridError, Result};
use crate::logging::targets;

/// A boxed unit of UI work.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Posts work to the UI execution context.
///
/// `post` must not run the task re-entrantly on the calling thread; callers
/// may hold their own state while posting.
pub trait UiExecutor: Send + Sync {
    /// Queue a task to run on the UI context.
    fn post(&self, task: UiTask);
}

/// A UI task queue drained by the host event loop.
#[derive(Default)]
pub struct UiQueue {
    tasks: Mutex<VecDeque<UiTask>>,
}

impl UiQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Runs every task queued so far and returns how many ran.
    ///
    /// Tasks posted while draining are left for the next call.
    pub fn process_pending(&self) -> usize {
        let batch = std::mem::take(&mut *self.tasks.lock());
        let count = batch.len();
        for task in batch {
            task();
        }
        count
    }
}

impl UiExecutor for UiQueue {
    fn post(&self, task: UiTask) {
        self.tasks.lock().push_back(task);
    }
}

impl std::fmt::Debug for UiQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiQueue")
            .field("pending", &self.pending_count())
            .finish()
    }
}

enum UiMessage {
    Run(UiTask),
    Shutdown,
}

/// A dedicated thread that runs posted UI tasks in order.
pub struct UiThread {
    sender: Sender<UiMessage>,
    handle: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl UiThread {
    /// Start the UI thread.
    pub fn spawn(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = crossbeam_channel::unbounded::<UiMessage>();

        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                while let Ok(message) = receiver.recv() {
                    match message {
                        UiMessage::Run(task) => task(),
                        UiMessage::Shutdown => break,
                    }
                }
            })
            .map_err(|e| GridError::Scheduler(format!("failed to spawn '{name}': {e}")))?;

        Ok(Self {
            sender,
            handle: Mutex::new(Some(handle)),
            stopped: AtomicBool::new(false),
        })
    }

    /// Stop accepting tasks, run what is already queued, and join the thread.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.sender.send(UiMessage::Shutdown);
        if let Some(handle) = self.handle.lock().take()
            && handle.thread().id() != std::thread::current().id()
        {
            let _ = handle.join();
        }
    }
}

impl UiExecutor for UiThread {
    fn post(&self, task: UiTask) {
        if self.stopped.load(Ordering::Acquire) || self.sender.send(UiMessage::Run(task)).is_err()
        {
            tracing::debug!(target: targets::SCHEDULER, "UI thread stopped; dropping task");
        }
    }
}

impl Drop for UiThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

static_assertions::assert_impl_all!(UiQueue: Send, Sync);
static_assertions::assert_impl_all!(UiThread: Send, Sync);
