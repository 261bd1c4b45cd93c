//! Adapter traits describing the cache store and the search index.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::query::NativeQuery;
use crate::domain::film::Film;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache command failed: {0}")]
    Command(String),
    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),
}

impl CacheError {
    pub fn command(err: impl std::fmt::Display) -> Self {
        Self::Command(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("search index transport error: {0}")]
    Transport(String),
    #[error("search index returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed search index response: {0}")]
    Decode(String),
    #[error("search index request timed out")]
    Timeout,
}

impl IndexError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Raw outcome of a native query: the authoritative hit count and the
/// documents of the overfetched window, in index order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    pub total: u64,
    pub documents: Vec<Film>,
}

/// Key-value store with per-entry expiration.
///
/// Implementations enforce their own deadlines and report a bounded-time
/// failure instead of hanging.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

/// Document search service holding the film collection.
#[async_trait]
pub trait FilmIndex: Send + Sync {
    /// `Ok(None)` means the index answered and has no such document.
    async fn get_by_id(&self, id: &str) -> Result<Option<Film>, IndexError>;

    async fn execute(&self, query: &NativeQuery) -> Result<SearchHits, IndexError>;
}
