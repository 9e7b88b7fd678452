//! Cache configuration.

use serde::{Deserialize, Serialize};

/// Default work queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Configuration for an [`ItemCache`](crate::cache::ItemCache).
///
/// # Example
///
/// ```
/// use lorica_cache::config::CacheConfig;
///
/// let config = CacheConfig::new().with_queue_capacity(64);
/// assert_eq!(config.queue_capacity, 64);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Capacity of the bounded work queue between producers and the worker.
    /// Producers block when the queue holds this many entries.
    pub queue_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl CacheConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the work queue capacity.
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Supported variables:
    /// - `LORICA_QUEUE_CAPACITY`: work queue capacity
    #[must_use]
    pub fn from_env() -> Self {
        let queue_capacity = std::env::var("LORICA_QUEUE_CAPACITY")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_QUEUE_CAPACITY);

        Self { queue_capacity }
    }
}
