//! Bounded work queue between producers and the cache worker.
//!
//! A fixed-capacity ring buffer guarded by a single mutex, with two
//! condition variables: `not_empty` wakes the single worker, `not_full`
//! wakes a producer blocked on back-pressure. Entries are processed strictly
//! in submission order.

use std::sync::{Arc, Condvar, Mutex};

use lorica_core::{Collector, ProbeItem};

use crate::cache::CacheError;

/// One-shot completion handle carried by a barrier entry.
///
/// The producer waits on it; the worker signals it when the barrier entry is
/// popped. The signal's own mutex provides the happens-before edge between
/// the worker's prior index and append work and the producer's wakeup.
pub(crate) struct BarrierSignal {
    done: Mutex<bool>,
    cond: Condvar,
}

impl BarrierSignal {
    pub(crate) fn new() -> Self {
        Self {
            done: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    /// Mark the barrier reached and wake the waiting producer.
    ///
    /// Called from the worker; must not panic, so a poisoned signal mutex is
    /// recovered rather than propagated.
    pub(crate) fn notify(&self) {
        let mut done = self
            .done
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *done = true;
        drop(done);
        self.cond.notify_one();
    }

    /// Block until the worker signals this handle.
    pub(crate) fn wait(&self) -> Result<(), CacheError> {
        let mut done = self.done.lock().map_err(|_| CacheError::Poisoned)?;
        while !*done {
            done = self.cond.wait(done).map_err(|_| CacheError::Poisoned)?;
        }
        Ok(())
    }
}

/// A unit of work handed to the worker.
pub(crate) enum WorkEntry<I: ProbeItem> {
    /// Deduplicate, stamp, and append `item` to `dest`.
    Insert {
        dest: Arc<dyn Collector<I>>,
        item: Box<I>,
    },
    /// Synchronization token; the worker signals and moves on.
    Barrier { signal: Arc<BarrierSignal> },
    /// Sentinel enqueued by the cache destructor; the worker exits on it.
    Shutdown,
}

struct RingState<I: ProbeItem> {
    slots: Box<[Option<WorkEntry<I>>]>,
    head: usize,
    tail: usize,
    count: usize,
}

/// Fixed-capacity FIFO between any number of producers and one worker.
pub(crate) struct WorkQueue<I: ProbeItem> {
    state: Mutex<RingState<I>>,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<I: ProbeItem> WorkQueue<I> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity >= 1);
        Self {
            state: Mutex::new(RingState {
                slots: (0..capacity).map(|_| None).collect(),
                head: 0,
                tail: 0,
                count: 0,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Enqueue one entry, blocking while the queue is full.
    pub(crate) fn push(&self, entry: WorkEntry<I>) -> Result<(), CacheError> {
        let mut state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        while state.count == state.slots.len() {
            state = self.not_full.wait(state).map_err(|_| CacheError::Poisoned)?;
        }

        let tail = state.tail;
        state.slots[tail] = Some(entry);
        state.tail = (state.tail + 1) % state.slots.len();
        state.count += 1;
        drop(state);

        // Single consumer, so signal-one is enough.
        self.not_empty.notify_one();
        Ok(())
    }

    /// Dequeue one entry, blocking while the queue is empty.
    pub(crate) fn pop(&self) -> Result<WorkEntry<I>, CacheError> {
        let mut state = self.state.lock().map_err(|_| CacheError::Poisoned)?;
        while state.count == 0 {
            state = self
                .not_empty
                .wait(state)
                .map_err(|_| CacheError::Poisoned)?;
        }

        let head = state.head;
        let entry = state.slots[head]
            .take()
            .expect("occupied queue slot below count");
        state.head = (state.head + 1) % state.slots.len();
        state.count -= 1;
        drop(state);

        // At most one producer is blocked per freed slot.
        self.not_full.notify_one();
        Ok(entry)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.state.lock().map(|state| state.count).unwrap_or(0)
    }
}
