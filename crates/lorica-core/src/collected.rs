//! Destination aggregates and filter predicates.
//!
//! A probe run accumulates accepted items into an externally owned
//! *collected object*. The cache only ever calls [`Collector::append`] on
//! it, from a single worker thread, in submission order. Items arrive as
//! `Arc` handles to canonical items owned by the cache's dedup index.

use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::item::ProbeItem;

/// Error returned by a destination aggregate that refuses an item.
///
/// Append failures are fatal for the run; the cache worker halts on the
/// first one.
#[derive(Debug, Error)]
#[error("collected object rejected item: {0}")]
pub struct CollectError(pub String);

/// Destination aggregate seam.
///
/// Implementations must tolerate being appended to from a thread other than
/// the one that created them; the cache guarantees appends are sequential.
pub trait Collector<I: ProbeItem>: Send + Sync {
    /// Append one canonical item reference to the aggregate.
    fn append(&self, item: Arc<I>) -> Result<(), CollectError>;
}

/// Filter predicate evaluated on the producer thread before submission.
pub trait ItemFilter<I: ProbeItem>: Send + Sync {
    /// `true` if the item must not be collected.
    fn excludes(&self, item: &I) -> bool;
}

impl<I, F> ItemFilter<I> for F
where
    I: ProbeItem,
    F: Fn(&I) -> bool + Send + Sync,
{
    fn excludes(&self, item: &I) -> bool {
        self(item)
    }
}

/// In-memory collected object: an append-ordered list of canonical items.
///
/// The reference implementation of [`Collector`]. Probes that stream their
/// results elsewhere provide their own.
#[derive(Debug, Default)]
pub struct CollectedObject<I: ProbeItem> {
    items: Mutex<Vec<Arc<I>>>,
}

impl<I: ProbeItem> CollectedObject<I> {
    /// Create an empty collected object.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    /// Number of collected item references.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().map(|items| items.len()).unwrap_or(0)
    }

    /// `true` if nothing has been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone out the collected references in append order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<I>> {
        self.items.lock().map(|items| items.clone()).unwrap_or_default()
    }
}

impl<I: ProbeItem> Collector<I> for CollectedObject<I> {
    fn append(&self, item: Arc<I>) -> Result<(), CollectError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| CollectError("collected object lock poisoned".to_string()))?;
        items.push(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Record;

    #[test]
    fn test_collected_object_append_order() {
        let collected = CollectedObject::new();

        for i in 0..5_i64 {
            let item = Arc::new(Record::new("entry").with_field("seq", i));
            collected.append(item).unwrap();
        }

        let snapshot = collected.snapshot();
        assert_eq!(snapshot.len(), 5);
        for (i, item) in snapshot.iter().enumerate() {
            assert_eq!(item.fields[0].1, crate::item::FieldValue::Int(i as i64));
        }
    }

    #[test]
    fn test_collected_object_shares_references() {
        let collected = CollectedObject::new();
        let item = Arc::new(Record::new("entry"));

        collected.append(Arc::clone(&item)).unwrap();
        collected.append(Arc::clone(&item)).unwrap();

        let snapshot = collected.snapshot();
        assert!(Arc::ptr_eq(&snapshot[0], &snapshot[1]));
        assert!(Arc::ptr_eq(&snapshot[0], &item));
    }

    #[test]
    fn test_closure_filter() {
        let filter: Box<dyn ItemFilter<Record>> = Box::new(|r: &Record| r.name == "noise");

        assert!(filter.excludes(&Record::new("noise")));
        assert!(!filter.excludes(&Record::new("signal")));
    }
}
