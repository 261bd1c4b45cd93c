//! Cache-aside film lookup and search.

use std::sync::Arc;

use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, instrument, warn};

use crate::application::pagination::{DEFAULT_PAGE_SIZE, paginate};
use crate::application::query::QueryBuilder;
use crate::application::repos::{CacheStore, FilmIndex, IndexError};
use crate::application::search::{SearchRequest, SearchResult};
use crate::cache::{CacheKey, CacheWriter, decode, encode};
use crate::domain::film::Film;

const SOURCE: &str = "application::films::FilmService";
const METRIC_CACHE_HIT: &str = "film_search_cache_hit_total";
const METRIC_CACHE_MISS: &str = "film_search_cache_miss_total";
const METRIC_INDEX_ERROR: &str = "film_search_index_error_total";

/// How a film lookup was resolved.
///
/// Callers of [`FilmService::get_by_id`] only see found/absent; this keeps
/// "the index said no" apart from "the index could not answer".
#[derive(Debug)]
pub enum FilmLookup {
    Cached(Film),
    Indexed(Film),
    NotFound,
    IndexUnavailable(IndexError),
}

impl FilmLookup {
    pub fn into_film(self) -> Option<Film> {
        match self {
            FilmLookup::Cached(film) | FilmLookup::Indexed(film) => Some(film),
            FilmLookup::NotFound | FilmLookup::IndexUnavailable(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilmLookup::Cached(_) => "cached",
            FilmLookup::Indexed(_) => "indexed",
            FilmLookup::NotFound => "not_found",
            FilmLookup::IndexUnavailable(_) => "index_unavailable",
        }
    }
}

/// How a search was resolved.
#[derive(Debug)]
pub enum SearchOutcome {
    Cached(SearchResult),
    Fresh(SearchResult),
    IndexUnavailable(IndexError),
}

impl SearchOutcome {
    pub fn into_result(self) -> Option<SearchResult> {
        match self {
            SearchOutcome::Cached(result) | SearchOutcome::Fresh(result) => Some(result),
            SearchOutcome::IndexUnavailable(_) => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SearchOutcome::Cached(_) => "cached",
            SearchOutcome::Fresh(_) => "fresh",
            SearchOutcome::IndexUnavailable(_) => "index_unavailable",
        }
    }
}

/// Film retrieval over a search index fronted by a cache store.
///
/// Holds shared adapter handles only; cloning is cheap and every request is
/// independent.
#[derive(Clone)]
pub struct FilmService {
    index: Arc<dyn FilmIndex>,
    cache: Arc<dyn CacheStore>,
    writer: CacheWriter,
    builder: QueryBuilder,
    page_size: usize,
}

impl FilmService {
    pub fn new(index: Arc<dyn FilmIndex>, cache: Arc<dyn CacheStore>, writer: CacheWriter) -> Self {
        Self {
            index,
            cache,
            writer,
            builder: QueryBuilder::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_query_builder(mut self, builder: QueryBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn writer(&self) -> &CacheWriter {
        &self.writer
    }

    /// Film by id, or `None` when it does not exist or cannot be loaded.
    pub async fn get_by_id(&self, id: &str) -> Option<Film> {
        self.lookup(id).await.into_film()
    }

    #[instrument(skip(self))]
    pub async fn lookup(&self, id: &str) -> FilmLookup {
        if id.trim().is_empty() {
            return FilmLookup::NotFound;
        }

        let key = CacheKey::film(id);
        if let Some(film) = self.read_cached::<Film>(&key).await {
            return FilmLookup::Cached(film);
        }

        match self.index.get_by_id(id).await {
            Ok(Some(film)) => {
                self.populate(key, &film);
                FilmLookup::Indexed(film)
            }
            Ok(None) => {
                debug!(film_id = id, outcome = "not_found", "film not in index");
                FilmLookup::NotFound
            }
            Err(err) => {
                warn!(
                    target_module = SOURCE,
                    film_id = id,
                    outcome = "index_unavailable",
                    error = %err,
                    "film lookup failed; reporting as not found"
                );
                counter!(METRIC_INDEX_ERROR, "kind" => "film").increment(1);
                FilmLookup::IndexUnavailable(err)
            }
        }
    }

    /// One page of results, or `None` when the index could not be queried.
    pub async fn search(&self, request: &SearchRequest) -> Option<SearchResult> {
        self.search_outcome(request).await.into_result()
    }

    #[instrument(skip(self))]
    pub async fn search_outcome(&self, request: &SearchRequest) -> SearchOutcome {
        let request = request.normalized();
        let key = CacheKey::search(&request);

        if let Some(result) = self.read_cached::<SearchResult>(&key).await {
            return SearchOutcome::Cached(result);
        }

        let native = self.builder.build(&request);
        let hits = match self.index.execute(&native).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(
                    target_module = SOURCE,
                    key = %key,
                    outcome = "index_unavailable",
                    error = %err,
                    "film search failed"
                );
                counter!(METRIC_INDEX_ERROR, "kind" => "search").increment(1);
                return SearchOutcome::IndexUnavailable(err);
            }
        };

        let window = paginate(
            hits.total,
            hits.documents,
            request.requested_page(),
            self.page_size,
        );
        let result = SearchResult {
            total: hits.total,
            page: window.page,
            results: window.hits,
        };

        self.populate(key, &result);
        SearchOutcome::Fresh(result)
    }

    /// Cached value for `key`. Store failures and undecodable entries count
    /// as misses.
    async fn read_cached<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let bytes = match self.cache.get(key.as_str()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                counter!(METRIC_CACHE_MISS, "kind" => key.kind()).increment(1);
                return None;
            }
            Err(err) => {
                warn!(
                    target_module = SOURCE,
                    key = %key,
                    error = %err,
                    "cache read failed; treating as miss"
                );
                counter!(METRIC_CACHE_MISS, "kind" => key.kind()).increment(1);
                return None;
            }
        };

        match decode(&bytes) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT, "kind" => key.kind()).increment(1);
                Some(value)
            }
            Err(err) => {
                warn!(
                    target_module = SOURCE,
                    key = %key,
                    error = %err,
                    "discarding undecodable cache entry"
                );
                counter!(METRIC_CACHE_MISS, "kind" => key.kind()).increment(1);
                None
            }
        }
    }

    fn populate<T: Serialize>(&self, key: CacheKey, value: &T) {
        match encode(value) {
            Ok(bytes) => self.writer.submit(key, bytes),
            Err(err) => warn!(
                target_module = SOURCE,
                key = %key,
                error = %err,
                "skipping cache population"
            ),
        }
    }
}
