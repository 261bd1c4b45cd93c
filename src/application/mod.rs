//! Application services: query translation, pagination and cache-aside
//! orchestration.

pub mod error;
pub mod films;
pub mod pagination;
pub mod query;
pub mod repos;
pub mod search;
