//! Recently updated cells, for "blink on update" painting.
//!
//! [`UpdateEventsCache`] remembers [`LayerEvent::DataUpdate`] events by cell
//! index for a configurable time to live. A sweep on its own background
//! scheduler drops expired entries; it touches nothing but the cache.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use lattice_grid_core::logging::targets;
use lattice_grid_core::{BackgroundScheduler, Result, ScheduledTaskId, UpdateCacheConfig};
use parking_lot::Mutex;

use crate::event::LayerEvent;
use crate::layer::LayerListener;

#[derive(Debug, Clone)]
struct CachedUpdate {
    event: LayerEvent,
    inserted: Instant,
}

struct CacheShared {
    entries: Mutex<HashMap<(usize, usize), CachedUpdate>>,
    time_to_live: Duration,
}

impl CacheShared {
    fn sweep(&self) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted.elapsed() < self.time_to_live);
        let removed = before - entries.len();
        if removed > 0 {
            tracing::trace!(target: targets::CACHE, removed, remaining = entries.len(), "expired updates swept");
        }
        removed
    }
}

/// Time-bounded cache of data updates keyed by `(column index, row index)`.
///
/// A newer update of the same cell replaces the older one and restarts its
/// time to live.
pub struct UpdateEventsCache {
    shared: Arc<CacheShared>,
    scheduler: BackgroundScheduler,
    task: ScheduledTaskId,
}

impl UpdateEventsCache {
    /// Creates the cache and starts its sweep: first after the initial delay,
    /// then once per time to live.
    pub fn new(config: &UpdateCacheConfig) -> Result<Self> {
        let shared = Arc::new(CacheShared {
            entries: Mutex::new(HashMap::new()),
            time_to_live: config.time_to_live(),
        });
        let scheduler = BackgroundScheduler::spawn("lattice-grid-update-cache")?;
        let weak: Weak<CacheShared> = Arc::downgrade(&shared);
        let task = scheduler.schedule_repeating_with_delay(config.initial_delay(), config.time_to_live(), move || {
            if let Some(shared) = weak.upgrade() {
                shared.sweep();
            }
        })?;
        tracing::debug!(
            target: targets::CACHE,
            time_to_live_ms = config.time_to_live_ms,
            initial_delay_ms = config.initial_delay_ms,
            "update cache started"
        );
        Ok(Self { shared, scheduler, task })
    }

    /// Caches a [`LayerEvent::DataUpdate`]. Other events are ignored.
    pub fn add_event(&self, event: &LayerEvent) -> bool {
        let LayerEvent::DataUpdate {
            column_index,
            row_index,
            ..
        } = event
        else {
            return false;
        };
        let entry = CachedUpdate {
            event: event.clone_event(),
            inserted: Instant::now(),
        };
        self.shared.entries.lock().insert((*column_index, *row_index), entry);
        true
    }

    /// Number of live entries.
    pub fn count(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// Whether the cell was updated within the time to live.
    pub fn contains(&self, column_index: usize, row_index: usize) -> bool {
        self.event(column_index, row_index).is_some()
    }

    /// The most recent unexpired update of a cell.
    pub fn event(&self, column_index: usize, row_index: usize) -> Option<LayerEvent> {
        self.shared
            .entries
            .lock()
            .get(&(column_index, row_index))
            .filter(|entry| entry.inserted.elapsed() < self.shared.time_to_live)
            .map(|entry| entry.event.clone())
    }

    /// Drops expired entries now and returns how many went.
    pub fn sweep(&self) -> usize {
        self.shared.sweep()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.shared.entries.lock().clear();
    }

    /// How long an entry stays alive.
    pub fn time_to_live(&self) -> Duration {
        self.shared.time_to_live
    }
}

impl LayerListener for UpdateEventsCache {
    fn handle_layer_event(&self, event: &LayerEvent) {
        self.add_event(event);
    }
}

impl Drop for UpdateEventsCache {
    fn drop(&mut self) {
        let _ = self.scheduler.cancel(self.task);
        self.scheduler.shutdown();
    }
}

impl std::fmt::Debug for UpdateEventsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateEventsCache")
            .field("entries", &self.count())
            .field("time_to_live", &self.shared.time_to_live)
            .finish()
    }
}

static_assertions::assert_impl_all!(UpdateEventsCache: Send, Sync);
