//! Cache-aside behavior of the film service against in-memory adapters.

mod support;

use film_search::{
    application::{
        films::{FilmLookup, SearchOutcome},
        repos::{CacheError, CacheStore},
        search::SearchRequest,
    },
    cache::{CacheKey, decode},
    domain::film::Film,
    infra::memory::MemoryCacheStore,
};

use support::{
    BrokenCache, CountingIndex, TTL, UnreachableIndex, catalogue, fight_club, film, harness,
    memory_harness,
};

#[tokio::test]
async fn cold_lookup_populates_cache_and_second_lookup_skips_index() {
    let h = memory_harness([fight_club()]);

    let first = h.service.get_by_id("tt001").await.expect("film exists");
    assert_eq!(first, fight_club());
    assert_eq!(h.index.lookups(), 1);

    h.flush().await;

    let second = h.service.lookup("tt001").await;
    assert!(matches!(second, FilmLookup::Cached(ref cached) if *cached == fight_club()));
    assert_eq!(h.index.lookups(), 1);
}

#[tokio::test]
async fn cached_film_entry_is_keyed_by_raw_id_with_ttl() {
    let h = memory_harness([fight_club()]);

    h.service.get_by_id("tt001").await.expect("film exists");
    h.flush().await;

    let bytes = h
        .cache
        .get("tt001")
        .await
        .expect("memory get")
        .expect("entry written");
    let cached: Film = decode(&bytes).expect("cached film decodes");
    assert_eq!(cached, fight_club());

    let ttl = h.cache.ttl_of("tt001").expect("entry has ttl");
    assert!(ttl <= TTL);
}

#[tokio::test]
async fn missing_film_is_absent_and_never_cached() {
    let h = memory_harness([fight_club()]);

    assert!(h.service.get_by_id("tt404").await.is_none());
    assert!(matches!(
        h.service.lookup("tt404").await,
        FilmLookup::NotFound
    ));
    h.flush().await;

    assert!(h.cache.is_empty());
    assert_eq!(h.index.lookups(), 2);
}

#[tokio::test]
async fn blank_id_is_absent_without_touching_the_index() {
    let h = memory_harness([fight_club()]);

    assert!(h.service.get_by_id("").await.is_none());
    assert!(h.service.get_by_id("   ").await.is_none());
    assert_eq!(h.index.lookups(), 0);
}

#[tokio::test]
async fn index_failure_on_lookup_reads_as_absent_but_stays_distinct() {
    let h = harness(UnreachableIndex, MemoryCacheStore::new());

    assert!(h.service.get_by_id("tt001").await.is_none());
    assert!(matches!(
        h.service.lookup("tt001").await,
        FilmLookup::IndexUnavailable(_)
    ));
    h.flush().await;
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn index_failure_on_search_is_not_an_empty_result() {
    let h = harness(UnreachableIndex, MemoryCacheStore::new());
    let request = SearchRequest::new().with_query("fight");

    assert!(h.service.search(&request).await.is_none());
    assert!(matches!(
        h.service.search_outcome(&request).await,
        SearchOutcome::IndexUnavailable(_)
    ));
    h.flush().await;
    assert!(h.cache.is_empty());
}

#[tokio::test]
async fn cache_outage_degrades_to_index_reads() {
    let mut h = harness(CountingIndex::new([fight_club()]), BrokenCache::new());

    let found = h.service.get_by_id("tt001").await.expect("served from index");
    assert_eq!(found.title, "Fight Club");
    h.service.get_by_id("tt001").await.expect("served from index");
    assert_eq!(h.index.lookups(), 2);

    h.flush().await;
    assert_eq!(h.cache.attempted_sets(), 2);

    let failure = h.failures.recv().await.expect("write failure reported");
    assert_eq!(failure.key, CacheKey::film("tt001"));
    assert!(matches!(failure.error, CacheError::Timeout(_)));
}

#[tokio::test]
async fn malformed_cache_entry_is_treated_as_miss_and_replaced() {
    let h = memory_harness([fight_club()]);
    h.cache.insert_raw("tt001", b"{\"id\": 42".to_vec(), TTL);

    let found = h.service.get_by_id("tt001").await.expect("served from index");
    assert_eq!(found, fight_club());
    assert_eq!(h.index.lookups(), 1);

    h.flush().await;
    let bytes = h
        .cache
        .get("tt001")
        .await
        .expect("memory get")
        .expect("entry rewritten");
    assert_eq!(decode::<Film>(&bytes).expect("valid entry"), fight_club());
}

#[tokio::test]
async fn cache_outage_during_search_queries_the_index() {
    let mut h = harness(CountingIndex::new(catalogue(5)), BrokenCache::new());
    let request = SearchRequest::new().with_query("movie");

    let outcome = h.service.search_outcome(&request).await;
    let SearchOutcome::Fresh(result) = outcome else {
        panic!("search should be answered by the index");
    };
    assert_eq!(result.total, 5);
    assert_eq!(h.index.searches(), 1);

    h.flush().await;
    assert_eq!(h.cache.attempted_sets(), 1);
    let failure = h.failures.recv().await.expect("write failure reported");
    assert_eq!(failure.key, CacheKey::search(&request.normalized()));
}

#[tokio::test]
async fn malformed_search_entry_is_treated_as_miss_and_replaced() {
    let h = memory_harness(catalogue(5));
    let request = SearchRequest::new().with_query("movie");
    let key = CacheKey::search(&request.normalized());
    h.cache.insert_raw(key.as_str(), b"garbage".to_vec(), TTL);

    let outcome = h.service.search_outcome(&request).await;
    let SearchOutcome::Fresh(result) = outcome else {
        panic!("unreadable entry should fall through to the index");
    };
    assert_eq!(result.total, 5);
    assert_eq!(h.index.searches(), 1);

    h.flush().await;
    let bytes = h
        .cache
        .get(key.as_str())
        .await
        .expect("memory get")
        .expect("entry rewritten");
    assert_eq!(bytes, serde_json::to_vec(&result).expect("encode"));
}

#[tokio::test]
async fn repeated_search_is_byte_identical_and_cached() {
    let h = memory_harness(catalogue(40));
    let request = SearchRequest::new().with_query("movie").with_sort("rating");

    let first = h.service.search(&request).await.expect("first search");
    h.flush().await;

    let second = h.service.search_outcome(&request).await;
    let SearchOutcome::Cached(second) = second else {
        panic!("second search should be served from cache");
    };

    assert_eq!(h.index.searches(), 1);
    assert_eq!(
        serde_json::to_vec(&first).expect("encode first"),
        serde_json::to_vec(&second).expect("encode second")
    );
}

#[tokio::test]
async fn separately_built_requests_share_one_cache_entry() {
    let h = memory_harness(catalogue(10));

    let a = SearchRequest::new().with_query("movie").with_page(2);
    let b = SearchRequest {
        page: Some(2),
        query: Some("movie".to_string()),
        ..SearchRequest::new()
    };

    h.service.search(&a).await.expect("first search");
    h.flush().await;
    h.service.search(&b).await.expect("second search");

    assert_eq!(h.index.searches(), 1);
}

#[tokio::test]
async fn differing_requests_use_distinct_entries() {
    let h = memory_harness(catalogue(60));

    let base = SearchRequest::new().with_query("movie");
    h.service.search(&base).await.expect("base");
    h.flush().await;
    h.service
        .search(&base.clone().with_page(2))
        .await
        .expect("page 2");
    h.service
        .search(&base.clone().with_sort("title"))
        .await
        .expect("sorted");
    h.service
        .search(&base.clone().with_filter("genre:drama"))
        .await
        .expect("filtered");

    assert_eq!(h.index.searches(), 4);
}

#[tokio::test]
async fn page_zero_shares_the_entry_of_an_absent_page() {
    let h = memory_harness(catalogue(30));

    let absent = h
        .service
        .search(&SearchRequest::new())
        .await
        .expect("no page");
    h.flush().await;
    let zero = h
        .service
        .search(&SearchRequest::new().with_page(0))
        .await
        .expect("page zero");

    assert_eq!(absent, zero);
    assert_eq!(zero.page, 1);
    assert_eq!(h.index.searches(), 1);
}

#[tokio::test]
async fn search_entry_lands_under_namespaced_key() {
    let h = memory_harness(catalogue(5));
    let request = SearchRequest::new().with_query("movie");

    let result = h.service.search(&request).await.expect("search");
    h.flush().await;

    let key = CacheKey::search(&request.normalized());
    assert!(key.as_str().starts_with("films:search:"));
    let bytes = h
        .cache
        .get(key.as_str())
        .await
        .expect("memory get")
        .expect("search cached");
    assert_eq!(bytes, serde_json::to_vec(&result).expect("encode"));
}

#[tokio::test]
async fn third_page_starts_one_hit_early() {
    let h = memory_harness(catalogue(100));

    let page = h
        .service
        .search(&SearchRequest::new().with_page(3))
        .await
        .expect("page 3");

    // Adjacent pages overlap by one hit; offset is page_size * page - 1.
    assert_eq!(page.total, 100);
    assert_eq!(page.page, 3);
    assert_eq!(page.results.len(), 26);
    assert_eq!(page.results.first().map(|f| f.id.as_str()), Some("m074"));
    assert_eq!(page.results.last().map(|f| f.id.as_str()), Some("m099"));
}

#[tokio::test]
async fn out_of_range_page_falls_back_to_first_page() {
    let h = memory_harness(catalogue(100));

    let page = h
        .service
        .search(&SearchRequest::new().with_page(10))
        .await
        .expect("page 10");

    assert_eq!(page.page, 1);
    assert_eq!(page.results.len(), 25);
    assert_eq!(page.results[0].id, "m000");
    assert_eq!(page.results[24].id, "m024");
}

#[tokio::test]
async fn rating_sort_orders_results_descending() {
    let h = memory_harness([
        film("a", "Alpha", 6.1),
        film("b", "Bravo", 9.3),
        film("c", "Charlie", 7.5),
    ]);

    let result = h
        .service
        .search(&SearchRequest::new().with_sort("rating"))
        .await
        .expect("search");

    let ids: Vec<_> = result.results.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

#[tokio::test]
async fn empty_index_yields_empty_first_page() {
    let h = memory_harness(Vec::new());

    let result = h
        .service
        .search(&SearchRequest::new().with_query("anything"))
        .await
        .expect("search");

    assert_eq!(result.total, 0);
    assert_eq!(result.page, 1);
    assert!(result.results.is_empty());
}

#[tokio::test]
async fn fight_club_end_to_end() {
    let h = memory_harness([
        fight_club(),
        film("tt002", "Pulp Fiction", 8.9),
        film("tt003", "The Matrix", 8.7),
    ]);

    let found = h.service.get_by_id("tt001").await.expect("cold lookup");
    assert_eq!(found.title, "Fight Club");
    assert_eq!(found.imdb_rating, 8.8);
    assert_eq!(found.genre, vec!["Drama".to_string()]);

    let result = h
        .service
        .search(
            &SearchRequest::new()
                .with_query("fight")
                .with_sort("rating")
                .with_page(1),
        )
        .await
        .expect("search");

    assert!(result.total >= 1);
    assert!(result.results.iter().any(|film| film.id == "tt001"));
}
