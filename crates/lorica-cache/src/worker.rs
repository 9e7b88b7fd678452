//! The cache worker.
//!
//! A single long-running thread drains the work queue, deduplicates items
//! against the fingerprint index, stamps first-seen items, appends the
//! canonical reference to the entry's destination aggregate, and signals
//! barriers. The dedup index lives on the worker's stack and is never shared;
//! it drops with the worker at shutdown, releasing every canonical item.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lorica_core::{identity, ProbeItem};
use tracing::{debug, error, info};

use crate::index::{Bucket, DedupIndex};
use crate::metrics::CacheMetrics;
use crate::queue::{WorkEntry, WorkQueue};

/// State shared between the cache surface and its worker thread.
pub(crate) struct WorkerShared<I: ProbeItem> {
    pub(crate) queue: WorkQueue<I>,
    /// Latched on the first fatal append failure; submits fail fast once set.
    pub(crate) worker_dead: AtomicBool,
    pub(crate) metrics: CacheMetrics,
}

/// Worker entry point.
pub(crate) fn run<I: ProbeItem>(shared: Arc<WorkerShared<I>>) {
    let mut index: DedupIndex<I> = DedupIndex::new();

    info!("item cache worker ready");

    loop {
        let entry = match shared.queue.pop() {
            Ok(entry) => entry,
            Err(_) => {
                // Queue mutex poisoned by a panicking producer; nothing left
                // to serve.
                shared.worker_dead.store(true, Ordering::SeqCst);
                error!("work queue poisoned, item cache worker exiting");
                return;
            }
        };

        match entry {
            WorkEntry::Shutdown => break,
            WorkEntry::Barrier { signal } => {
                debug!("handling barrier");
                shared.metrics.record_barrier();
                signal.notify();
            }
            WorkEntry::Insert { dest, item } => {
                if shared.worker_dead.load(Ordering::SeqCst) {
                    // Drain-and-discard mode after a fatal append failure.
                    drop(item);
                    continue;
                }

                let canonical = canonicalize(&mut index, &shared.metrics, item);
                if let Err(err) = dest.append(canonical) {
                    error!(error = %err, "collected object append failed, halting item processing");
                    shared.worker_dead.store(true, Ordering::SeqCst);
                }
            }
        }
    }

    debug!(
        fingerprints = index.len(),
        canonical_items = index.item_count(),
        "item cache worker shut down"
    );
}

/// Resolve an incoming item to its canonical representative.
///
/// True miss: the item becomes canonical in a fresh bucket. Hit: the incoming
/// item is dropped and the existing canonical returned. Collision miss: the
/// item becomes canonical at the end of the bucket's chain. First-seen items
/// are stamped here, while the worker still holds exclusive ownership.
fn canonicalize<I: ProbeItem>(
    index: &mut DedupIndex<I>,
    metrics: &CacheMetrics,
    mut item: Box<I>,
) -> Arc<I> {
    let fid = item.fingerprint();

    match index.get_mut(fid) {
        Some(bucket) => {
            if let Some(canonical) = bucket.find(&item) {
                debug!(fingerprint = fid, "cache hit");
                metrics.record_hit();
                canonical
            } else {
                debug!(fingerprint = fid, chain = bucket.len(), "fingerprint collision");
                metrics.record_collision();
                item.set_stamp(identity::mint());
                let canonical: Arc<I> = Arc::from(item);
                bucket.push(Arc::clone(&canonical));
                canonical
            }
        }
        None => {
            debug!(fingerprint = fid, "cache miss");
            metrics.record_miss();
            item.set_stamp(identity::mint());
            let canonical: Arc<I> = Arc::from(item);
            index.insert(fid, Bucket::single(Arc::clone(&canonical)));
            canonical
        }
    }
}
