//! Cache configuration.
//!
//! Selects the cache backend, the expiration applied to every entry this
//! service writes, and the entry bound of the in-process backend.

use std::{num::NonZeroUsize, time::Duration};

use serde::Deserialize;

const DEFAULT_TTL_SECONDS: u64 = 300;
pub(crate) const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

/// Where cached entries live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    Redis,
    /// Process-local map; entries vanish on restart.
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Expiration for film and search entries, in seconds.
    pub ttl_seconds: u64,
    /// Maximum entries held by the memory backend before LRU eviction.
    pub memory_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            ttl_seconds: DEFAULT_TTL_SECONDS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            backend: settings.backend,
            ttl_seconds: settings.ttl.as_secs(),
            memory_capacity: settings.memory_capacity.get(),
        }
    }
}

impl CacheConfig {
    /// Entry expiration, clamped to at least one second.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.max(1))
    }

    /// Memory backend capacity, clamped to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }
}
