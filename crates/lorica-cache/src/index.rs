//! Fingerprint-keyed dedup index.
//!
//! An ordered map from 64-bit content fingerprint to the bucket of canonical
//! items sharing that fingerprint. A bucket almost always holds one item;
//! fingerprint collisions between unequal items grow the chain. Only the
//! worker thread ever touches the index, so it carries no locks.

use std::collections::BTreeMap;
use std::sync::Arc;

use lorica_core::ProbeItem;

/// Canonical items sharing one fingerprint. Never empty.
pub(crate) struct Bucket<I> {
    items: Vec<Arc<I>>,
}

impl<I: ProbeItem> Bucket<I> {
    pub(crate) fn single(item: Arc<I>) -> Self {
        Self { items: vec![item] }
    }

    /// Walk the collision chain for a structural match.
    pub(crate) fn find(&self, probe: &I) -> Option<Arc<I>> {
        self.items
            .iter()
            .find(|canonical| canonical.content_eq(probe))
            .map(Arc::clone)
    }

    /// Extend the chain with a new canonical item.
    pub(crate) fn push(&mut self, item: Arc<I>) {
        self.items.push(item);
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }
}

/// Map from fingerprint to collision bucket.
pub(crate) struct DedupIndex<I: ProbeItem> {
    tree: BTreeMap<u64, Bucket<I>>,
}

impl<I: ProbeItem> DedupIndex<I> {
    pub(crate) fn new() -> Self {
        Self {
            tree: BTreeMap::new(),
        }
    }

    pub(crate) fn get_mut(&mut self, fingerprint: u64) -> Option<&mut Bucket<I>> {
        self.tree.get_mut(&fingerprint)
    }

    pub(crate) fn insert(&mut self, fingerprint: u64, bucket: Bucket<I>) {
        self.tree.insert(fingerprint, bucket);
    }

    /// Number of distinct fingerprints.
    pub(crate) fn len(&self) -> usize {
        self.tree.len()
    }

    /// Total canonical items across all buckets.
    pub(crate) fn item_count(&self) -> usize {
        self.tree.values().map(Bucket::len).sum()
    }
}
