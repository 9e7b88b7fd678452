//! Boundary helper tying filters, destination, and cache together.
//!
//! Probes call [`collect`] for every item they produce. Filter predicates
//! run here, on the producer thread; only accepted items reach the cache
//! worker.

use std::sync::Arc;

use lorica_core::{Collector, ItemFilter, ProbeItem};
use tracing::{debug, error};

use crate::cache::ItemCache;

/// Per-run context a probe collects into.
pub struct ProbeContext<I: ProbeItem> {
    cache: Arc<ItemCache<I>>,
    dest: Arc<dyn Collector<I>>,
    filters: Vec<Box<dyn ItemFilter<I>>>,
}

impl<I: ProbeItem> ProbeContext<I> {
    /// Create a context with no filters.
    #[must_use]
    pub fn new(cache: Arc<ItemCache<I>>, dest: Arc<dyn Collector<I>>) -> Self {
        Self {
            cache,
            dest,
            filters: Vec::new(),
        }
    }

    /// Add a filter predicate.
    #[must_use]
    pub fn with_filter(mut self, filter: Box<dyn ItemFilter<I>>) -> Self {
        self.filters.push(filter);
        self
    }

    /// The cache this context submits into.
    #[must_use]
    pub fn cache(&self) -> &ItemCache<I> {
        &self.cache
    }
}

/// Outcome of a [`collect`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    /// The item was accepted and handed to the cache.
    Collected,
    /// A filter rejected the item; it was dropped without touching the cache.
    Filtered,
    /// Submission failed; the item was dropped.
    Failed,
}

/// Filter and submit one produced item.
///
/// The item is consumed in every case: accepted items move into the cache,
/// rejected and failed items are dropped here.
pub fn collect<I: ProbeItem>(ctx: &ProbeContext<I>, item: I) -> CollectOutcome {
    if ctx.filters.iter().any(|filter| filter.excludes(&item)) {
        debug!("item rejected by filter");
        ctx.cache.metrics_handle().record_filtered();
        return CollectOutcome::Filtered;
    }

    match ctx.cache.submit(Arc::clone(&ctx.dest), item) {
        Ok(()) => CollectOutcome::Collected,
        Err(err) => {
            error!(error = %err, "failed to hand item to the cache");
            CollectOutcome::Failed
        }
    }
}
