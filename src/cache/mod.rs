//! Film Search Cache Layer
//!
//! Cache-aside support for the film service:
//!
//! - **Keys**: film entries keyed by id, search pages keyed by a stable
//!   digest of the request
//! - **Codec**: JSON wire format shared by every backend
//! - **Writer**: fire-and-forget population with a failure channel
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! backend = "redis"   # or "memory"
//! ttl_seconds = 300
//! memory_capacity = 10000   # entry bound for the memory backend
//! ```

mod codec;
mod config;
mod keys;
pub(crate) mod lock;
mod writer;

pub use codec::{CodecError, decode, encode};
pub use config::{CacheBackend, CacheConfig};
pub use keys::{CacheKey, SEARCH_KEY_PREFIX, search_fields, stable_hash};
pub use writer::{CacheWriter, WriteFailure};
