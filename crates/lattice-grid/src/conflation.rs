//! Coalescing of high-frequency visual events.
//!
//! An [`EventConflaterChain`] listens to a layer and hands every event to its
//! conflaters, which queue what they are interested in. A background task
//! drains the queues periodically and posts a single refresh to the UI
//! executor per tick. While a posted refresh has not run yet, later ticks
//! leave the queues alone, so a slow UI thread never accumulates refreshes.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use lattice_grid_core::logging::{span_names, targets};
use lattice_grid_core::{BackgroundScheduler, ConflationConfig, Result, ScheduledTaskId, UiExecutor, UiTask};
use parking_lot::{Mutex, RwLock};

use crate::event::LayerEvent;
use crate::layer::LayerListener;

/// Queues events and turns a queue into one unit of UI work.
pub trait EventConflater: Send + Sync {
    /// Queues the event if this conflater is interested. Returns whether it was queued.
    fn add_event(&self, event: &LayerEvent) -> bool;

    /// Number of queued events.
    fn count(&self) -> usize;

    /// Drops every queued event.
    fn clear(&self);

    /// Drains the queue into UI work, `None` when nothing is queued.
    fn take_refresh(&self) -> Option<UiTask>;
}

/// Receives a drained batch of visual events on the UI thread.
pub type RefreshCallback = Arc<dyn Fn(Vec<LayerEvent>) + Send + Sync>;

/// Queues visual events and hands each batch to a refresh callback.
pub struct VisualChangeEventConflater {
    queue: Mutex<Vec<LayerEvent>>,
    refresh: RefreshCallback,
}

impl VisualChangeEventConflater {
    /// Creates a conflater calling `refresh` with each drained batch.
    pub fn new(refresh: impl Fn(Vec<LayerEvent>) + Send + Sync + 'static) -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
            refresh: Arc::new(refresh),
        }
    }
}

impl EventConflater for VisualChangeEventConflater {
    fn add_event(&self, event: &LayerEvent) -> bool {
        if !event.is_visual() {
            return false;
        }
        self.queue.lock().push(event.clone_event());
        true
    }

    fn count(&self) -> usize {
        self.queue.lock().len()
    }

    fn clear(&self) {
        self.queue.lock().clear();
    }

    fn take_refresh(&self) -> Option<UiTask> {
        let batch = std::mem::take(&mut *self.queue.lock());
        if batch.is_empty() {
            return None;
        }
        let refresh = self.refresh.clone();
        Some(Box::new(move || refresh(batch)))
    }
}

impl std::fmt::Debug for VisualChangeEventConflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualChangeEventConflater")
            .field("queued", &self.count())
            .finish_non_exhaustive()
    }
}

struct ChainShared {
    conflaters: RwLock<Vec<Arc<dyn EventConflater>>>,
    executor: Arc<dyn UiExecutor>,
    /// Set from posting a refresh until it has run.
    in_flight: Arc<AtomicBool>,
    refreshes: AtomicU64,
}

impl ChainShared {
    fn add_event(&self, event: &LayerEvent) {
        let conflaters = self.conflaters.read().clone();
        for conflater in conflaters {
            conflater.add_event(event);
        }
    }

    fn tick(&self) {
        let _span = tracing::trace_span!(target: targets::CONFLATION, span_names::CONFLATE).entered();
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::trace!(target: targets::CONFLATION, "refresh still pending, tick skipped");
            return;
        }

        let conflaters = self.conflaters.read().clone();
        let tasks: Vec<UiTask> = conflaters
            .iter()
            .filter_map(|conflater| conflater.take_refresh())
            .collect();
        if tasks.is_empty() {
            self.in_flight.store(false, Ordering::Release);
            return;
        }

        let refresh = self.refreshes.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!(target: targets::CONFLATION, refresh, batches = tasks.len(), "posting refresh");
        let in_flight = self.in_flight.clone();
        self.executor.post(Box::new(move || {
            for task in tasks {
                task();
            }
            in_flight.store(false, Ordering::Release);
        }));
    }
}

/// Fans layer events out to conflaters and flushes them on a timer.
///
/// Register it on a layer with [`register_listener`](crate::layer::register_listener);
/// the layer holds it weakly.
pub struct EventConflaterChain {
    shared: Arc<ChainShared>,
    config: ConflationConfig,
    scheduler: BackgroundScheduler,
    task: Mutex<Option<ScheduledTaskId>>,
}

impl EventConflaterChain {
    /// Creates a stopped chain posting refreshes to `executor`.
    pub fn new(executor: Arc<dyn UiExecutor>, config: &ConflationConfig) -> Result<Self> {
        let scheduler = BackgroundScheduler::spawn("lattice-grid-conflation")?;
        Ok(Self {
            shared: Arc::new(ChainShared {
                conflaters: RwLock::new(Vec::new()),
                executor,
                in_flight: Arc::new(AtomicBool::new(false)),
                refreshes: AtomicU64::new(0),
            }),
            config: *config,
            scheduler,
            task: Mutex::new(None),
        })
    }

    /// Adds a conflater; events are offered to conflaters in the order added.
    pub fn add_conflater(&self, conflater: Arc<dyn EventConflater>) {
        self.shared.conflaters.write().push(conflater);
    }

    /// Queued events over all conflaters.
    pub fn count(&self) -> usize {
        self.shared
            .conflaters
            .read()
            .iter()
            .map(|conflater| conflater.count())
            .sum()
    }

    /// Drops every queued event.
    pub fn clear(&self) {
        for conflater in self.shared.conflaters.read().iter() {
            conflater.clear();
        }
    }

    /// Starts the periodic flush. Does nothing when already running.
    pub fn start(&self) -> Result<()> {
        let mut task = self.task.lock();
        if task.is_some() {
            return Ok(());
        }
        let weak: Weak<ChainShared> = Arc::downgrade(&self.shared);
        let id = self.scheduler.schedule_repeating_with_delay(
            self.config.initial_delay(),
            self.config.refresh_interval(),
            move || {
                if let Some(shared) = weak.upgrade() {
                    shared.tick();
                }
            },
        )?;
        *task = Some(id);
        tracing::debug!(
            target: targets::CONFLATION,
            initial_delay_ms = self.config.initial_delay_ms,
            refresh_interval_ms = self.config.refresh_interval_ms,
            "conflation started"
        );
        Ok(())
    }

    /// Cancels the periodic flush. A refresh already posted still runs.
    pub fn stop(&self) {
        if let Some(id) = self.task.lock().take() {
            if let Err(error) = self.scheduler.cancel(id) {
                tracing::debug!(target: targets::CONFLATION, %error, "conflation task already gone");
            }
            tracing::debug!(target: targets::CONFLATION, "conflation stopped");
        }
    }

    /// Whether the periodic flush is scheduled.
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .is_some_and(|id| self.scheduler.is_active(id))
    }

    /// Runs one flush on the calling thread.
    pub fn flush(&self) {
        self.shared.tick();
    }

    /// Whether a posted refresh has not run yet.
    pub fn is_refresh_pending(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Number of refreshes posted so far.
    pub fn refresh_count(&self) -> u64 {
        self.shared.refreshes.load(Ordering::Relaxed)
    }
}

impl LayerListener for EventConflaterChain {
    fn handle_layer_event(&self, event: &LayerEvent) {
        self.shared.add_event(event);
    }
}

impl Drop for EventConflaterChain {
    fn drop(&mut self) {
        self.stop();
        self.scheduler.shutdown();
    }
}

impl std::fmt::Debug for EventConflaterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventConflaterChain")
            .field("conflaters", &self.shared.conflaters.read().len())
            .field("queued", &self.count())
            .field("refreshes", &self.refresh_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(EventConflaterChain: Send, Sync);
static_assertions::assert_impl_all!(VisualChangeEventConflater: Send, Sync);

#[cfg(test)]
mod tests {
    use lattice_grid_core::{LayerId, Orientation, UiQueue};

    use super::*;

    fn chain_with_recorder() -> (Arc<UiQueue>, EventConflaterChain, Arc<Mutex<Vec<usize>>>) {
        let queue = Arc::new(UiQueue::new());
        let chain = EventConflaterChain::new(queue.clone(), &ConflationConfig::default()).unwrap();
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = batches.clone();
        chain.add_conflater(Arc::new(VisualChangeEventConflater::new(move |events| {
            sink.lock().push(events.len());
        })));
        (queue, chain, batches)
    }

    fn visual() -> LayerEvent {
        LayerEvent::VisualRefresh { layer: LayerId::next() }
    }

    #[test]
    fn test_only_visual_events_are_queued() {
        let conflater = VisualChangeEventConflater::new(|_| {});
        assert!(conflater.add_event(&visual()));
        assert!(conflater.add_event(&LayerEvent::Scroll {
            layer: LayerId::next(),
            orientation: Orientation::Horizontal,
        }));
        assert!(!conflater.add_event(&LayerEvent::StructuralRefresh { layer: LayerId::next() }));
        assert_eq!(conflater.count(), 2);

        conflater.clear();
        assert_eq!(conflater.count(), 0);
        assert!(conflater.take_refresh().is_none());
    }

    #[test]
    fn test_flush_posts_one_refresh() {
        let (queue, chain, batches) = chain_with_recorder();
        for _ in 0..5 {
            chain.handle_layer_event(&visual());
        }
        chain.flush();
        assert_eq!(chain.count(), 0);
        assert_eq!(queue.pending_count(), 1);
        assert!(chain.is_refresh_pending());

        assert_eq!(queue.process_pending(), 1);
        assert_eq!(*batches.lock(), vec![5]);
        assert!(!chain.is_refresh_pending());
    }

    #[test]
    fn test_pending_refresh_blocks_next_tick() {
        let (queue, chain, batches) = chain_with_recorder();
        chain.handle_layer_event(&visual());
        chain.flush();
        chain.handle_layer_event(&visual());
        chain.flush();
        assert_eq!(queue.pending_count(), 1);
        assert_eq!(chain.count(), 1);

        queue.process_pending();
        chain.flush();
        queue.process_pending();
        assert_eq!(*batches.lock(), vec![1, 1]);
        assert_eq!(chain.refresh_count(), 2);
    }

    #[test]
    fn test_empty_tick_posts_nothing() {
        let (queue, chain, _) = chain_with_recorder();
        chain.flush();
        assert_eq!(queue.pending_count(), 0);
        assert!(!chain.is_refresh_pending());
    }

    #[test]
    fn test_start_and_stop() {
        let (_, chain, _) = chain_with_recorder();
        assert!(!chain.is_running());
        chain.start().unwrap();
        chain.start().unwrap();
        assert!(chain.is_running());
        chain.stop();
        assert!(!chain.is_running());
    }
}
