//! Cache metrics collection and reporting.
//!
//! ## Example
//!
//! ```rust
//! use lorica_cache::metrics::CacheMetrics;
//!
//! let metrics = CacheMetrics::new();
//!
//! metrics.record_miss();
//! metrics.record_hit();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.hits, 1);
//! println!("{}", metrics.export_json());
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Thread-safe metrics collector shared between the cache surface, the
/// collect helper, and the worker.
///
/// All operations are lock-free.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Items handed to the cache via submit
    submitted: AtomicU64,
    /// Structural duplicates collapsed onto an existing canonical
    hits: AtomicU64,
    /// First-seen fingerprints
    misses: AtomicU64,
    /// Unequal items sharing a fingerprint with an existing bucket
    collisions: AtomicU64,
    /// Items rejected by filters before submission
    filtered: AtomicU64,
    /// Barrier entries processed
    barriers: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item handed to the cache.
    pub fn record_submit(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a structural duplicate collapsing onto a canonical.
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a first-seen fingerprint.
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an unequal item sharing a fingerprint with an existing bucket.
    pub fn record_collision(&self) {
        self.collisions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an item rejected by a filter.
    pub fn record_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a processed barrier entry.
    pub fn record_barrier(&self) {
        self.barriers.fetch_add(1, Ordering::Relaxed);
    }

    /// Total items handed to the cache.
    #[must_use]
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Total structural duplicates collapsed.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Total first-seen fingerprints.
    #[must_use]
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Total fingerprint collisions between unequal items.
    #[must_use]
    pub fn collisions(&self) -> u64 {
        self.collisions.load(Ordering::Relaxed)
    }

    /// Get the current snapshot of metrics.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let collisions = self.collisions.load(Ordering::Relaxed);
        let processed = hits + misses + collisions;

        MetricsSnapshot {
            submitted: self.submitted.load(Ordering::Relaxed),
            hits,
            misses,
            collisions,
            filtered: self.filtered.load(Ordering::Relaxed),
            barriers: self.barriers.load(Ordering::Relaxed),
            hit_rate: if processed > 0 {
                hits as f64 / processed as f64
            } else {
                0.0
            },
        }
    }

    /// Export metrics in JSON format.
    #[must_use]
    pub fn export_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Reset all metrics to zero.
    pub fn reset(&self) {
        self.submitted.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.collisions.store(0, Ordering::Relaxed);
        self.filtered.store(0, Ordering::Relaxed);
        self.barriers.store(0, Ordering::Relaxed);
    }
}

/// A point-in-time snapshot of cache metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Items handed to the cache via submit
    pub submitted: u64,
    /// Structural duplicates collapsed onto an existing canonical
    pub hits: u64,
    /// First-seen fingerprints
    pub misses: u64,
    /// Unequal items that shared a fingerprint with an existing bucket
    pub collisions: u64,
    /// Items rejected by filters before submission
    pub filtered: u64,
    /// Barrier entries processed
    pub barriers: u64,
    /// Fraction of processed inserts that were duplicates (0.0 to 1.0)
    pub hit_rate: f64,
}

impl MetricsSnapshot {
    /// Number of canonical items the worker has created.
    #[must_use]
    pub fn distinct_items(&self) -> u64 {
        self.misses + self.collisions
    }
}
