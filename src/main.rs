use std::{process, sync::Arc, time::Duration};

use film_search::{
    application::{
        error::AppError,
        films::FilmService,
        query::QueryBuilder,
        repos::{CacheStore, FilmIndex},
    },
    cache::{CacheBackend, CacheConfig, CacheWriter, WriteFailure},
    config,
    infra::{
        elastic::ElasticFilmIndex,
        error::InfraError,
        http::{self, HttpState},
        memory::MemoryCacheStore,
        redis_cache::RedisCacheStore,
        telemetry,
    },
};
use tokio::sync::mpsc;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = init_cache_store(&settings, &cache_config).await?;
    let index: Arc<dyn FilmIndex> = Arc::new(ElasticFilmIndex::new(&settings.elastic)?);

    let (writer, failures) = CacheWriter::spawn(cache.clone(), cache_config.ttl());
    tokio::spawn(drain_write_failures(failures));

    let films = FilmService::new(index, cache, writer.clone())
        .with_page_size(settings.search.page_size.get() as usize)
        .with_query_builder(QueryBuilder::new(
            settings.search.max_window.get() as usize,
        ));

    let result = serve_http(&settings, HttpState::new(films)).await;

    info!(
        timeout_secs = settings.server.graceful_shutdown.as_secs(),
        "flushing pending cache writes"
    );
    if tokio::time::timeout(settings.server.graceful_shutdown, writer.flush())
        .await
        .is_err()
    {
        warn!("pending cache writes did not finish before shutdown timeout");
    }

    result
}

async fn init_cache_store(
    settings: &config::Settings,
    cache_config: &CacheConfig,
) -> Result<Arc<dyn CacheStore>, AppError> {
    let backend = cache_config.backend;
    let store: Arc<dyn CacheStore> = match backend {
        CacheBackend::Redis => Arc::new(RedisCacheStore::connect(&settings.redis).await?),
        CacheBackend::Memory => Arc::new(MemoryCacheStore::with_capacity(
            cache_config.memory_capacity_non_zero(),
        )),
    };
    info!(
        backend = ?backend,
        ttl_secs = cache_config.ttl().as_secs(),
        memory_capacity = cache_config.memory_capacity,
        "cache store ready"
    );
    Ok(store)
}

/// Failures are already logged and counted by the writer; this only
/// escalates when they keep piling up.
async fn drain_write_failures(mut failures: mpsc::UnboundedReceiver<WriteFailure>) {
    let mut count: u64 = 0;
    while let Some(failure) = failures.recv().await {
        count += 1;
        if count.is_power_of_two() {
            warn!(
                key = %failure.key,
                failed_writes = count,
                "cache writes are failing"
            );
        }
    }
    if count > 0 {
        warn!(failed_writes = count, "cache writer stopped with failed writes");
    }
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal(settings.server.graceful_shutdown))
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

async fn shutdown_signal(grace: Duration) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(grace_secs = grace.as_secs(), "shutdown signal received");
}
