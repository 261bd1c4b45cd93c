//! Infrastructure adapters and runtime bootstrap.

pub mod elastic;
pub mod error;
pub mod http;
pub mod memory;
pub mod redis_cache;
pub mod telemetry;
