//! Public cache surface.
//!
//! [`ItemCache`] owns the work queue and the worker thread. Producers call
//! [`submit`](ItemCache::submit) to hand over items and
//! [`barrier`](ItemCache::barrier) to wait until everything they submitted
//! so far has been processed. Dropping the cache enqueues a shutdown
//! sentinel and joins the worker; entries already queued ahead of the
//! sentinel are processed normally, so the destructor drains before freeing.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use lorica_core::{Collector, ProbeItem};
use thiserror::Error;
use tracing::warn;

use crate::config::CacheConfig;
use crate::metrics::{CacheMetrics, MetricsSnapshot};
use crate::queue::{BarrierSignal, WorkEntry, WorkQueue};
use crate::worker::{self, WorkerShared};

/// Errors that can occur on the cache surface.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Invalid configuration.
    #[error("invalid cache configuration: {0}")]
    Config(String),

    /// The worker thread could not be started.
    #[error("failed to start the cache worker thread")]
    Spawn(#[source] io::Error),

    /// The worker halted after a fatal failure; the cache accepts no more
    /// work.
    #[error("cache worker is no longer running")]
    WorkerDead,

    /// A synchronization primitive was poisoned by a panicking thread.
    #[error("cache synchronization primitive was poisoned")]
    Poisoned,
}

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Item-deduplicating collection cache.
///
/// Submission is synchronous from the producer's perspective; dedup,
/// stamping, and destination appends happen on the cache's worker thread.
/// See the crate docs for an end-to-end example.
pub struct ItemCache<I: ProbeItem> {
    shared: Arc<WorkerShared<I>>,
    worker: Option<JoinHandle<()>>,
}

impl<I: ProbeItem> ItemCache<I> {
    /// Create a cache with default configuration and start its worker.
    pub fn new() -> Result<Self> {
        Self::with_config(CacheConfig::default())
    }

    /// Create a cache with the given configuration and start its worker.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        if config.queue_capacity == 0 {
            return Err(CacheError::Config(
                "queue_capacity must be at least 1".to_string(),
            ));
        }

        let shared = Arc::new(WorkerShared {
            queue: WorkQueue::with_capacity(config.queue_capacity),
            worker_dead: AtomicBool::new(false),
            metrics: CacheMetrics::new(),
        });

        let worker = thread::Builder::new()
            .name("lorica-icache".to_string())
            .spawn({
                let shared = Arc::clone(&shared);
                move || worker::run(shared)
            })
            .map_err(CacheError::Spawn)?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Hand an item over to the cache for deduplication and collection into
    /// `dest`.
    ///
    /// Blocks while the work queue is full. Fails fast with
    /// [`CacheError::WorkerDead`] once the worker has halted.
    pub fn submit(&self, dest: Arc<dyn Collector<I>>, item: I) -> Result<()> {
        if self.shared.worker_dead.load(Ordering::SeqCst) {
            return Err(CacheError::WorkerDead);
        }

        self.shared.queue.push(WorkEntry::Insert {
            dest,
            item: Box::new(item),
        })?;
        self.shared.metrics.record_submit();
        Ok(())
    }

    /// Wait until every item this thread submitted before the call has been
    /// fully processed: canonicalized or collapsed, and appended to its
    /// destination.
    ///
    /// Reports [`CacheError::WorkerDead`] if the worker halted before or
    /// while the barrier drained, in which case some prior appends may not
    /// have happened.
    pub fn barrier(&self) -> Result<()> {
        if self.shared.worker_dead.load(Ordering::SeqCst) {
            return Err(CacheError::WorkerDead);
        }

        let signal = Arc::new(BarrierSignal::new());
        self.shared.queue.push(WorkEntry::Barrier {
            signal: Arc::clone(&signal),
        })?;
        signal.wait()?;

        if self.shared.worker_dead.load(Ordering::SeqCst) {
            return Err(CacheError::WorkerDead);
        }
        Ok(())
    }

    /// Point-in-time metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    pub(crate) fn metrics_handle(&self) -> &CacheMetrics {
        &self.shared.metrics
    }
}

impl<I: ProbeItem> Drop for ItemCache<I> {
    fn drop(&mut self) {
        // Entries already queued are processed before the sentinel is
        // reached, so pending inserts still land in their destinations.
        if self.shared.queue.push(WorkEntry::Shutdown).is_err() {
            warn!("work queue poisoned during cache shutdown");
        }
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("item cache worker panicked");
            }
        }
    }
}
