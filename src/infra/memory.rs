//! Process-local adapters.
//!
//! `MemoryCacheStore` backs the `memory` cache backend. `MemoryFilmIndex`
//! evaluates native queries over an in-process document set and serves as
//! the index in tests and local runs without Elasticsearch.

use std::{
    cmp::Ordering,
    num::NonZeroUsize,
    sync::{
        Mutex,
        atomic::{AtomicU64, Ordering as AtomicOrdering},
    },
    time::{Duration, Instant},
};

use async_trait::async_trait;
use dashmap::DashMap;
use lru::LruCache;

use crate::application::query::{
    NativeQuery, QueryClause, RATING_SORT_FIELD, SortClause, SortOrder, TITLE_SORT_FIELD,
};
use crate::application::repos::{CacheError, CacheStore, FilmIndex, IndexError, SearchHits};
use crate::cache::{CacheConfig, lock::lock_entries};
use crate::domain::{error::DomainError, film::Film};

const SOURCE: &str = "infra::memory";

struct Entry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl Entry {
    fn expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// Expiring key-value map bounded by entry count.
///
/// Past capacity the least recently used entry is evicted. Every read and
/// write also drops expired entries from the cold end of the recency list.
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, Entry>>,
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::with_capacity(CacheConfig::default().memory_capacity_non_zero())
    }
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        lock_entries(&self.entries, SOURCE, "len")
            .iter()
            .filter(|(_, entry)| !entry.expired(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries currently held, expired ones included.
    pub fn stored_entries(&self) -> usize {
        lock_entries(&self.entries, SOURCE, "stored_entries").len()
    }

    /// Remaining lifetime of `key`, if present.
    pub fn ttl_of(&self, key: &str) -> Option<Duration> {
        let entries = lock_entries(&self.entries, SOURCE, "ttl_of");
        entries
            .peek(key)?
            .expires_at
            .checked_duration_since(Instant::now())
    }

    /// Overwrite a raw entry, bypassing the service.
    pub fn insert_raw(&self, key: impl Into<String>, value: Vec<u8>, ttl: Duration) {
        let now = Instant::now();
        let mut entries = lock_entries(&self.entries, SOURCE, "insert");
        purge_expired(&mut entries, now);
        entries.put(
            key.into(),
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

fn purge_expired(entries: &mut LruCache<String, Entry>, now: Instant) {
    while entries
        .peek_lru()
        .is_some_and(|(_, entry)| entry.expired(now))
    {
        entries.pop_lru();
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let now = Instant::now();
        let mut entries = lock_entries(&self.entries, SOURCE, "get");
        purge_expired(&mut entries, now);

        if entries.peek(key).is_some_and(|entry| entry.expired(now)) {
            entries.pop(key);
            return Ok(None);
        }
        Ok(entries.get(key).map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.insert_raw(key, value, ttl);
        Ok(())
    }
}

/// In-process film collection answering native queries.
///
/// Multi-match clauses match case-insensitively on whole words of the listed
/// fields; any query word is enough. Without a sort clause, documents are
/// ranked by the number of matched words, then insertion order.
#[derive(Default)]
pub struct MemoryFilmIndex {
    documents: DashMap<String, (u64, Film)>,
    sequence: AtomicU64,
}

impl MemoryFilmIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_films(films: impl IntoIterator<Item = Film>) -> Result<Self, DomainError> {
        let index = Self::new();
        for film in films {
            index.insert(film)?;
        }
        Ok(index)
    }

    /// Add or replace a document.
    pub fn insert(&self, film: Film) -> Result<(), DomainError> {
        film.validate()?;
        let position = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        self.documents.insert(film.id.clone(), (position, film));
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl FilmIndex for MemoryFilmIndex {
    async fn get_by_id(&self, id: &str) -> Result<Option<Film>, IndexError> {
        Ok(self.documents.get(id).map(|entry| entry.1.clone()))
    }

    async fn execute(&self, query: &NativeQuery) -> Result<SearchHits, IndexError> {
        let terms = match &query.query {
            Some(QueryClause::MultiMatch(clause)) => Some((tokenize(&clause.query), &clause.fields)),
            None => None,
        };

        let mut matched: Vec<(usize, u64, Film)> = self
            .documents
            .iter()
            .filter_map(|entry| {
                let (position, film) = entry.value();
                let score = match &terms {
                    Some((words, fields)) => match_score(film, words, fields),
                    None => 1,
                };
                (score > 0).then(|| (score, *position, film.clone()))
            })
            .collect();

        matched.sort_by(|a, b| {
            if query.sort.is_empty() {
                b.0.cmp(&a.0).then(a.1.cmp(&b.1))
            } else {
                compare_by_clauses(&a.2, &b.2, &query.sort).then(a.1.cmp(&b.1))
            }
        });

        let total = matched.len() as u64;
        let documents = matched
            .into_iter()
            .take(query.size)
            .map(|(_, _, film)| film)
            .collect();

        Ok(SearchHits { total, documents })
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn field_text(film: &Film, field: &str) -> String {
    match field {
        "title" => film.title.clone(),
        "description" => film.description.clone().unwrap_or_default(),
        "genre" => film.genre.join(" "),
        "actors_names" => film.actors_names.join(" "),
        "writers_names" => film.writers_names.join(" "),
        "director" => film.director.join(" "),
        _ => String::new(),
    }
}

fn match_score(film: &Film, words: &[String], fields: &[&'static str]) -> usize {
    let haystack: Vec<String> = fields
        .iter()
        .flat_map(|field| tokenize(&field_text(film, field)))
        .collect();
    words
        .iter()
        .filter(|word| haystack.iter().any(|candidate| candidate == *word))
        .count()
}

fn compare_by_clauses(a: &Film, b: &Film, clauses: &[SortClause]) -> Ordering {
    for clause in clauses {
        let ordering = match clause.field {
            RATING_SORT_FIELD => a.imdb_rating.total_cmp(&b.imdb_rating),
            TITLE_SORT_FIELD => a.title.cmp(&b.title),
            _ => Ordering::Equal,
        };
        let ordering = match clause.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
