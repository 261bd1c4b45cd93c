//! Test doubles shared by the integration suites.
#![allow(dead_code)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;

use film_search::{
    application::{
        films::FilmService,
        query::NativeQuery,
        repos::{CacheError, CacheStore, FilmIndex, IndexError, SearchHits},
    },
    cache::{CacheWriter, WriteFailure},
    domain::film::Film,
    infra::memory::{MemoryCacheStore, MemoryFilmIndex},
};
use tokio::sync::mpsc;

pub const TTL: Duration = Duration::from_secs(300);

/// Index wrapper counting every round trip.
pub struct CountingIndex {
    inner: MemoryFilmIndex,
    lookups: AtomicUsize,
    searches: AtomicUsize,
}

impl CountingIndex {
    pub fn new(films: impl IntoIterator<Item = Film>) -> Self {
        Self {
            inner: MemoryFilmIndex::from_films(films).expect("valid films"),
            lookups: AtomicUsize::new(0),
            searches: AtomicUsize::new(0),
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FilmIndex for CountingIndex {
    async fn get_by_id(&self, id: &str) -> Result<Option<Film>, IndexError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.get_by_id(id).await
    }

    async fn execute(&self, query: &NativeQuery) -> Result<SearchHits, IndexError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(query).await
    }
}

/// Index that is always unreachable.
pub struct UnreachableIndex;

#[async_trait]
impl FilmIndex for UnreachableIndex {
    async fn get_by_id(&self, _id: &str) -> Result<Option<Film>, IndexError> {
        Err(IndexError::Transport("connection refused".to_string()))
    }

    async fn execute(&self, _query: &NativeQuery) -> Result<SearchHits, IndexError> {
        Err(IndexError::Timeout)
    }
}

/// Cache store whose every command fails.
pub struct BrokenCache {
    sets: AtomicUsize,
}

impl BrokenCache {
    pub fn new() -> Self {
        Self {
            sets: AtomicUsize::new(0),
        }
    }

    pub fn attempted_sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for BrokenCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Connection("connection reset by peer".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Timeout(Duration::from_millis(500)))
    }
}

pub fn film(id: &str, title: &str, rating: f64) -> Film {
    let mut film = Film::new(id, title);
    film.imdb_rating = rating;
    film
}

pub fn fight_club() -> Film {
    let mut film = film("tt001", "Fight Club", 8.8);
    film.genre = vec!["Drama".to_string()];
    film
}

/// Numbered films `m000..` with ratings decreasing by position.
pub fn catalogue(count: usize) -> Vec<Film> {
    (0..count)
        .map(|n| {
            film(
                &format!("m{n:03}"),
                &format!("Movie {n}"),
                10.0 - n as f64 / 100.0,
            )
        })
        .collect()
}

pub struct Harness<I, C> {
    pub service: FilmService,
    pub index: Arc<I>,
    pub cache: Arc<C>,
    pub failures: mpsc::UnboundedReceiver<WriteFailure>,
}

impl<I, C> Harness<I, C> {
    pub async fn flush(&self) {
        self.service.writer().flush().await;
    }
}

pub fn harness<I, C>(index: I, cache: C) -> Harness<I, C>
where
    I: FilmIndex + 'static,
    C: CacheStore + 'static,
{
    let index = Arc::new(index);
    let cache = Arc::new(cache);
    let (writer, failures) = CacheWriter::spawn(cache.clone(), TTL);
    let service = FilmService::new(index.clone(), cache.clone(), writer);
    Harness {
        service,
        index,
        cache,
        failures,
    }
}

pub fn memory_harness(
    films: impl IntoIterator<Item = Film>,
) -> Harness<CountingIndex, MemoryCacheStore> {
    harness(CountingIndex::new(films), MemoryCacheStore::new())
}
