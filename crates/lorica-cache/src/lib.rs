//! # lorica-cache
//!
//! Item-deduplicating, asynchronous collection cache for the lorica probe
//! runtime.
//!
//! A probe produces structured result items as it scans a target system;
//! many of them are structurally identical to ones already produced. The
//! cache stamps each distinct item with a stable unique identifier,
//! collapses structural duplicates so repeat observations share storage, and
//! appends each accepted item to a caller-supplied collected object.
//! Submission is synchronous from the probe's perspective; deduplication,
//! identifier assignment, and destination appends happen on a single
//! background worker thread.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use lorica_cache::cache::ItemCache;
//! use lorica_core::{CollectedObject, ProbeItem, Record};
//!
//! # fn main() -> lorica_cache::cache::Result<()> {
//! let cache: ItemCache<Record> = ItemCache::new()?;
//! let dest = Arc::new(CollectedObject::new());
//!
//! // The same file record observed twice.
//! cache.submit(dest.clone(), Record::new("file_item").with_field("path", "/etc/passwd"))?;
//! cache.submit(dest.clone(), Record::new("file_item").with_field("path", "/etc/passwd"))?;
//!
//! // Wait until both submissions have been processed.
//! cache.barrier()?;
//!
//! let items = dest.snapshot();
//! assert_eq!(items.len(), 2);
//! // Duplicates collapse onto one canonical item with one stamp.
//! assert!(Arc::ptr_eq(&items[0], &items[1]));
//! assert!(items[0].stamp().is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! producers ──submit──▶ [ bounded work queue ] ──▶ worker thread
//!                                                    │
//!                                         fingerprint lookup
//!                                                    │
//!                                  ┌─── hit: reuse canonical + stamp
//!                                  ├─── miss: stamp, new bucket
//!                                  └─── collision: stamp, extend bucket
//!                                                    │
//!                                          append to collected object
//! ```
//!
//! ## Modules
//!
//! - [`cache`]: the [`ItemCache`](cache::ItemCache) surface
//! - [`collect`]: filtered-submit boundary helper for probes
//! - [`config`]: cache configuration
//! - [`metrics`]: lock-free cache metrics

pub mod cache;
pub mod collect;
pub mod config;
pub mod metrics;

mod index;
mod queue;
mod worker;

pub use cache::{CacheError, ItemCache, Result};
pub use collect::{collect, CollectOutcome, ProbeContext};
pub use config::CacheConfig;
pub use metrics::{CacheMetrics, MetricsSnapshot};
