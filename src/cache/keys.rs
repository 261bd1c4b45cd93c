//! Cache key derivation.
//!
//! Film lookups are keyed by the film id itself. Searches are keyed by a
//! SHA-256 digest over the request's normalized fields, taken in sorted
//! field-name order so the digest does not depend on how the fields were
//! declared or assembled.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::application::search::SearchRequest;

/// Namespace for search result entries.
pub const SEARCH_KEY_PREFIX: &str = "films:search:";

/// Key of a single cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A film document, stored under its id.
    Film(String),
    /// A search result page, stored under the prefixed request digest.
    Search(String),
}

impl CacheKey {
    pub fn film(id: &str) -> Self {
        Self::Film(id.to_string())
    }

    pub fn search(request: &SearchRequest) -> Self {
        let digest = stable_hash(search_fields(request));
        Self::Search(format!("{SEARCH_KEY_PREFIX}{digest}"))
    }

    pub fn as_str(&self) -> &str {
        match self {
            CacheKey::Film(key) | CacheKey::Search(key) => key,
        }
    }

    /// Metric and log label for the entry type.
    pub fn kind(&self) -> &'static str {
        match self {
            CacheKey::Film(_) => "film",
            CacheKey::Search(_) => "search",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named field values of a search request after normalization.
pub fn search_fields(request: &SearchRequest) -> Vec<(&'static str, Option<String>)> {
    let normalized = request.normalized();
    vec![
        ("query", normalized.query),
        ("sort", normalized.sort),
        ("page", normalized.page.map(|page| page.to_string())),
        ("filter", normalized.filter),
    ]
}

/// Hex SHA-256 over `(name, value)` pairs sorted by name.
///
/// Every component is length-prefixed and absent values carry their own tag,
/// so `None` never collides with `Some("")` and values cannot bleed into
/// adjacent fields.
pub fn stable_hash<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<String>)>,
{
    let mut fields: Vec<(&str, Option<String>)> = fields.into_iter().collect();
    fields.sort_by(|left, right| left.0.cmp(right.0));

    let mut hasher = Sha256::new();
    for (name, value) in &fields {
        hasher.update((name.len() as u64).to_be_bytes());
        hasher.update(name.as_bytes());
        match value {
            None => hasher.update([0u8]),
            Some(value) => {
                hasher.update([1u8]);
                hasher.update((value.len() as u64).to_be_bytes());
                hasher.update(value.as_bytes());
            }
        }
    }
    hex::encode(hasher.finalize())
}
