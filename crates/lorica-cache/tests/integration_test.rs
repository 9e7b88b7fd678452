//! Integration tests for lorica-cache.
//!
//! Exercises the full producer → queue → worker → collected-object path:
//! dedup and canonicalization, fingerprint collisions, back-pressure,
//! barriers under concurrency, filtered collection, shutdown draining, and
//! the worker-dead latch.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

use lorica_cache::{collect, CacheConfig, CacheError, CollectOutcome, ItemCache, ProbeContext};
use lorica_core::{CollectError, CollectedObject, Collector, FieldValue, ProbeItem, Record};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn int_field(record: &Record, key: &str) -> i64 {
    match record
        .fields
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
    {
        Some(FieldValue::Int(value)) => *value,
        other => panic!("missing or non-int field {key:?}: {other:?}"),
    }
}

// ============================================================================
// Test item types
// ============================================================================

/// Item with a forced fingerprint, for driving collision chains.
struct CollidingItem {
    label: String,
    stamp: Option<String>,
}

impl CollidingItem {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            stamp: None,
        }
    }
}

impl ProbeItem for CollidingItem {
    fn fingerprint(&self) -> u64 {
        42
    }

    fn content_eq(&self, other: &Self) -> bool {
        self.label == other.label
    }

    fn set_stamp(&mut self, stamp: String) {
        self.stamp = Some(stamp);
    }

    fn stamp(&self) -> Option<&str> {
        self.stamp.as_deref()
    }
}

/// Item that tracks how many instances are alive, for release accounting.
struct DropProbe {
    key: u64,
    stamp: Option<String>,
    live: Arc<AtomicUsize>,
}

impl DropProbe {
    fn new(key: u64, live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            key,
            stamp: None,
            live: Arc::clone(live),
        }
    }
}

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ProbeItem for DropProbe {
    fn fingerprint(&self) -> u64 {
        self.key
    }

    fn content_eq(&self, other: &Self) -> bool {
        self.key == other.key
    }

    fn set_stamp(&mut self, stamp: String) {
        self.stamp = Some(stamp);
    }

    fn stamp(&self) -> Option<&str> {
        self.stamp.as_deref()
    }
}

// ============================================================================
// Test collectors
// ============================================================================

/// Collector whose first append blocks until the test opens the gate.
struct GatedCollector {
    gate: Mutex<bool>,
    gate_cond: Condvar,
    entered: Mutex<bool>,
    entered_cond: Condvar,
    inner: CollectedObject<Record>,
}

impl GatedCollector {
    fn new() -> Self {
        Self {
            gate: Mutex::new(false),
            gate_cond: Condvar::new(),
            entered: Mutex::new(false),
            entered_cond: Condvar::new(),
            inner: CollectedObject::new(),
        }
    }

    /// Block until the worker has entered append at least once.
    fn wait_entered(&self) {
        let mut entered = self.entered.lock().unwrap();
        while !*entered {
            entered = self.entered_cond.wait(entered).unwrap();
        }
    }

    fn open(&self) {
        *self.gate.lock().unwrap() = true;
        self.gate_cond.notify_all();
    }
}

impl Collector<Record> for GatedCollector {
    fn append(&self, item: Arc<Record>) -> Result<(), CollectError> {
        {
            let mut entered = self.entered.lock().unwrap();
            *entered = true;
            self.entered_cond.notify_all();
        }

        let mut open = self.gate.lock().unwrap();
        while !*open {
            open = self.gate_cond.wait(open).unwrap();
        }
        drop(open);

        self.inner.append(item)
    }
}

/// Collector that rejects everything, for driving the worker-dead latch.
struct FailingCollector;

impl Collector<Record> for FailingCollector {
    fn append(&self, _item: Arc<Record>) -> Result<(), CollectError> {
        Err(CollectError("injected append failure".to_string()))
    }
}

// ============================================================================
// Dedup and canonicalization
// ============================================================================

#[test]
fn test_trivial_hit_shares_canonical_and_stamp() {
    let cache: ItemCache<Record> = ItemCache::new().unwrap();
    let dest = Arc::new(CollectedObject::new());

    let item = Record::new("file_item").with_field("path", "/etc/passwd");
    cache.submit(dest.clone(), item.clone()).unwrap();
    cache.submit(dest.clone(), item).unwrap();
    cache.barrier().unwrap();

    let items = dest.snapshot();
    assert_eq!(items.len(), 2);
    assert!(Arc::ptr_eq(&items[0], &items[1]));

    let stamp = items[0].stamp().unwrap();
    assert_eq!(items[1].stamp().unwrap(), stamp);
    assert!(stamp.starts_with('1'));
    assert!(stamp.chars().all(|c| c.is_ascii_digit()));
}

#[test]
fn test_fingerprint_collision_gets_distinct_stamps() {
    let cache: ItemCache<CollidingItem> = ItemCache::new().unwrap();
    let dest = Arc::new(CollectedObject::new());

    cache.submit(dest.clone(), CollidingItem::new("alpha")).unwrap();
    cache.submit(dest.clone(), CollidingItem::new("beta")).unwrap();
    cache.submit(dest.clone(), CollidingItem::new("alpha")).unwrap();
    cache.barrier().unwrap();

    let items = dest.snapshot();
    assert_eq!(items.len(), 3);

    // First and third share the canonical; the collided item stands alone.
    assert!(Arc::ptr_eq(&items[0], &items[2]));
    assert!(!Arc::ptr_eq(&items[0], &items[1]));
    assert_eq!(items[0].stamp(), items[2].stamp());
    assert_ne!(items[0].stamp(), items[1].stamp());

    let snapshot = cache.metrics();
    assert_eq!(snapshot.misses, 1);
    assert_eq!(snapshot.collisions, 1);
    assert_eq!(snapshot.hits, 1);
}

#[test]
fn test_order_preserved_in_destination() {
    let cache: ItemCache<Record> = ItemCache::new().unwrap();
    let dest = Arc::new(CollectedObject::new());

    for seq in 0..50_i64 {
        cache
            .submit(dest.clone(), Record::new("entry").with_field("seq", seq))
            .unwrap();
    }
    cache.barrier().unwrap();

    let seqs: Vec<i64> = dest.snapshot().iter().map(|r| int_field(r, "seq")).collect();
    assert_eq!(seqs, (0..50).collect::<Vec<_>>());
}

#[test]
fn test_randomized_dedup_correctness() {
    let cache: ItemCache<Record> = ItemCache::new().unwrap();
    let dest = Arc::new(CollectedObject::new());
    let mut rng = StdRng::seed_from_u64(42);

    let mut expected_distinct = HashSet::new();
    let total = 600;

    for _ in 0..total {
        let a = rng.gen_range(0..10_i64);
        let b = rng.gen_range(0..5_i64);
        expected_distinct.insert((a, b));
        cache
            .submit(
                dest.clone(),
                Record::new("entry").with_field("a", a).with_field("b", b),
            )
            .unwrap();
    }
    cache.barrier().unwrap();

    let snapshot = cache.metrics();
    assert_eq!(snapshot.submitted, total);
    assert_eq!(snapshot.distinct_items(), expected_distinct.len() as u64);
    assert_eq!(dest.len(), total as usize);

    // Every equality class maps to exactly one stamp, and classes never
    // share stamps.
    let mut class_stamps: HashMap<(i64, i64), String> = HashMap::new();
    for item in dest.snapshot() {
        let key = (int_field(&item, "a"), int_field(&item, "b"));
        let stamp = item.stamp().unwrap().to_string();
        match class_stamps.get(&key) {
            Some(existing) => assert_eq!(existing, &stamp),
            None => {
                class_stamps.insert(key, stamp);
            }
        }
    }
    let unique_stamps: HashSet<&String> = class_stamps.values().collect();
    assert_eq!(unique_stamps.len(), expected_distinct.len());
}

#[test]
fn test_stamps_unique_across_cache_instances() {
    let dest_a: Arc<CollectedObject<Record>> = Arc::new(CollectedObject::new());
    let dest_b: Arc<CollectedObject<Record>> = Arc::new(CollectedObject::new());

    // Two caches in the same process mint from the same counter, so the
    // same record gets different stamps in each.
    for dest in [&dest_a, &dest_b] {
        let cache: ItemCache<Record> = ItemCache::new().unwrap();
        for i in 0..20_i64 {
            cache
                .submit(
                    Arc::clone(dest) as Arc<dyn Collector<Record>>,
                    Record::new("entry").with_field("seq", i),
                )
                .unwrap();
        }
        cache.barrier().unwrap();
    }

    let mut stamps = HashSet::new();
    for item in dest_a.snapshot().iter().chain(dest_b.snapshot().iter()) {
        stamps.insert(item.stamp().unwrap().to_string());
    }
    assert_eq!(stamps.len(), 40);
}

// ============================================================================
// Back-pressure and barriers
// ============================================================================

#[test]
fn test_full_queue_blocks_producer() {
    let cache: ItemCache<Record> =
        ItemCache::with_config(CacheConfig::new().with_queue_capacity(4)).unwrap();
    let cache = Arc::new(cache);
    let dest = Arc::new(GatedCollector::new());

    // The worker pops this entry and blocks inside append.
    cache
        .submit(dest.clone(), Record::new("entry").with_field("seq", 0_i64))
        .unwrap();
    dest.wait_entered();

    // The queue is empty again; four more submissions fill it without
    // blocking.
    for seq in 1..=4_i64 {
        cache
            .submit(dest.clone(), Record::new("entry").with_field("seq", seq))
            .unwrap();
    }

    let unblocked = Arc::new(AtomicBool::new(false));
    let producer = {
        let cache = Arc::clone(&cache);
        let dest = dest.clone();
        let unblocked = Arc::clone(&unblocked);
        thread::spawn(move || {
            cache
                .submit(dest, Record::new("entry").with_field("seq", 5_i64))
                .unwrap();
            unblocked.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert!(
        !unblocked.load(Ordering::SeqCst),
        "fifth submit must block on the full queue"
    );

    dest.open();
    producer.join().unwrap();
    assert!(unblocked.load(Ordering::SeqCst));

    cache.barrier().unwrap();
    assert_eq!(dest.inner.len(), 6);
}

#[test]
fn test_single_producer_liveness_at_capacity_one() {
    let cache: ItemCache<Record> =
        ItemCache::with_config(CacheConfig::new().with_queue_capacity(1)).unwrap();
    let dest = Arc::new(CollectedObject::new());

    for seq in 0..100_i64 {
        cache
            .submit(dest.clone(), Record::new("entry").with_field("seq", seq))
            .unwrap();
    }
    cache.barrier().unwrap();
    assert_eq!(dest.len(), 100);
}

#[test]
fn test_barrier_flush_across_producers() {
    let cache: Arc<ItemCache<Record>> = Arc::new(ItemCache::new().unwrap());
    let dest = Arc::new(CollectedObject::new());
    let per_producer = 250_i64;

    let mut producers = vec![];
    for producer_id in 0..4_i64 {
        let cache = Arc::clone(&cache);
        let dest = Arc::clone(&dest);
        producers.push(thread::spawn(move || {
            let mut submitted = 0usize;
            for seq in 0..per_producer {
                cache
                    .submit(
                        dest.clone(),
                        Record::new("entry")
                            .with_field("producer", producer_id)
                            .with_field("seq", seq),
                    )
                    .unwrap();
                submitted += 1;

                // Periodic flush: everything this producer submitted so far
                // must be visible in the destination afterwards.
                if submitted % 50 == 0 {
                    cache.barrier().unwrap();
                    assert!(dest.len() >= submitted);
                }
            }
            cache.barrier().unwrap();
            assert!(dest.len() >= submitted);
        }));
    }

    for producer in producers {
        producer.join().unwrap();
    }

    assert_eq!(dest.len(), 1000);
    assert_eq!(cache.metrics().distinct_items(), 1000);
}

// ============================================================================
// Filtered collection
// ============================================================================

#[test]
fn test_filter_rejects_before_submission() {
    let cache = Arc::new(ItemCache::new().unwrap());
    let dest = Arc::new(CollectedObject::new());
    let ctx = ProbeContext::new(Arc::clone(&cache), dest.clone() as _)
        .with_filter(Box::new(|record: &Record| {
            int_field(record, "seq") % 2 == 1
        }));

    for seq in 1..=10_i64 {
        let outcome = collect(&ctx, Record::new("entry").with_field("seq", seq));
        let expected = if seq % 2 == 1 {
            CollectOutcome::Filtered
        } else {
            CollectOutcome::Collected
        };
        assert_eq!(outcome, expected);
    }

    cache.barrier().unwrap();
    let seqs: Vec<i64> = dest.snapshot().iter().map(|r| int_field(r, "seq")).collect();
    assert_eq!(seqs, vec![2, 4, 6, 8, 10]);

    let snapshot = cache.metrics();
    assert_eq!(snapshot.filtered, 5);
    assert_eq!(snapshot.submitted, 5);
}

// ============================================================================
// Shutdown and release accounting
// ============================================================================

#[test]
fn test_shutdown_with_pending_drains_without_leaks() {
    let live = Arc::new(AtomicUsize::new(0));
    let dest = Arc::new(CollectedObject::new());

    {
        let cache: ItemCache<DropProbe> = ItemCache::new().unwrap();
        // 100 submissions over 50 distinct keys; duplicates are released by
        // the worker as they collapse.
        for i in 0..100_u64 {
            cache
                .submit(dest.clone(), DropProbe::new(i % 50, &live))
                .unwrap();
        }
        // No barrier: the destructor drains the queue before the worker
        // exits.
    }

    assert_eq!(dest.len(), 100);
    assert_eq!(live.load(Ordering::SeqCst), 50);

    drop(dest);
    assert_eq!(live.load(Ordering::SeqCst), 0, "every item released exactly once");
}

#[test]
fn test_worker_dead_latch_fails_fast() {
    let cache: ItemCache<Record> = ItemCache::new().unwrap();
    let failing: Arc<dyn Collector<Record>> = Arc::new(FailingCollector);

    cache
        .submit(failing.clone(), Record::new("entry").with_field("seq", 0_i64))
        .unwrap();

    // The insert ahead of the barrier kills the worker, so the barrier
    // reports it.
    assert!(matches!(cache.barrier(), Err(CacheError::WorkerDead)));

    // Subsequent submissions fail fast instead of queueing silently.
    assert!(matches!(
        cache.submit(failing, Record::new("entry").with_field("seq", 1_i64)),
        Err(CacheError::WorkerDead)
    ));
}
