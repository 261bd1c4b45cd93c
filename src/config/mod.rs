//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::cache::CacheBackend;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "film-search";
const ENV_PREFIX: &str = "FILM_SEARCH";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_REDIS_COMMAND_TIMEOUT_MS: u64 = 500;
const DEFAULT_ELASTIC_URL: &str = "http://127.0.0.1:9200";
const DEFAULT_ELASTIC_INDEX: &str = "movies";
const DEFAULT_ELASTIC_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_MEMORY_CAPACITY: u64 = 10_000;
const DEFAULT_PAGE_SIZE: u64 = 25;
const DEFAULT_MAX_WINDOW: u64 = 250;

/// Command-line arguments for the film-search binary.
#[derive(Debug, Parser)]
#[command(name = "film-search", version, about = "Film lookup and search service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FILM_SEARCH_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL")]
    pub redis_url: Option<String>,

    /// Override the Elasticsearch base URL.
    #[arg(long = "elastic-url", value_name = "URL")]
    pub elastic_url: Option<String>,

    /// Override the Elasticsearch index holding film documents.
    #[arg(long = "elastic-index", value_name = "NAME")]
    pub elastic_index: Option<String>,

    /// Override the cache backend (redis|memory).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the cache entry expiration.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the entry bound of the memory cache backend.
    #[arg(long = "cache-memory-capacity", value_name = "ENTRIES")]
    pub cache_memory_capacity: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub redis: RedisSettings,
    pub elastic: ElasticSettings,
    pub cache: CacheSettings,
    pub search: SearchSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RedisSettings {
    pub url: String,
    pub command_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ElasticSettings {
    pub url: Url,
    pub index: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub ttl: Duration,
    pub memory_capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub page_size: NonZeroU32,
    pub max_window: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    redis: RawRedisSettings,
    elastic: RawElasticSettings,
    cache: RawCacheSettings,
    search: RawSearchSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.redis.url = Some(url.clone());
        }
        if let Some(url) = overrides.elastic_url.as_ref() {
            self.elastic.url = Some(url.clone());
        }
        if let Some(index) = overrides.elastic_index.as_ref() {
            self.elastic.index = Some(index.clone());
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(capacity) = overrides.cache_memory_capacity {
            self.cache.memory_capacity = Some(capacity);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            redis,
            elastic,
            cache,
            search,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            redis: build_redis_settings(redis)?,
            elastic: build_elastic_settings(elastic)?,
            cache: build_cache_settings(cache)?,
            search: build_search_settings(search)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_redis_settings(redis: RawRedisSettings) -> Result<RedisSettings, LoadError> {
    let url = non_blank(redis.url).unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
    if !url.starts_with("redis://") && !url.starts_with("rediss://") {
        return Err(LoadError::invalid(
            "redis.url",
            format!("`{url}` is not a redis:// or rediss:// URL"),
        ));
    }

    let timeout_ms = redis
        .command_timeout_ms
        .unwrap_or(DEFAULT_REDIS_COMMAND_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "redis.command_timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(RedisSettings {
        url,
        command_timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_elastic_settings(elastic: RawElasticSettings) -> Result<ElasticSettings, LoadError> {
    let raw_url = non_blank(elastic.url).unwrap_or_else(|| DEFAULT_ELASTIC_URL.to_string());
    let url = Url::parse(&raw_url)
        .map_err(|err| LoadError::invalid("elastic.url", format!("`{raw_url}`: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(
            "elastic.url",
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }

    let index = non_blank(elastic.index).unwrap_or_else(|| DEFAULT_ELASTIC_INDEX.to_string());
    if index.contains('/') {
        return Err(LoadError::invalid(
            "elastic.index",
            "index name must not contain `/`",
        ));
    }

    let user = non_blank(elastic.user);
    let password = non_blank(elastic.password);
    if password.is_some() && user.is_none() {
        return Err(LoadError::invalid(
            "elastic.user",
            "a password was configured without a user",
        ));
    }

    let timeout_ms = elastic.timeout_ms.unwrap_or(DEFAULT_ELASTIC_TIMEOUT_MS);
    if timeout_ms == 0 {
        return Err(LoadError::invalid(
            "elastic.timeout_ms",
            "must be greater than zero",
        ));
    }

    Ok(ElasticSettings {
        url,
        index,
        user,
        password,
        timeout: Duration::from_millis(timeout_ms),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match non_blank(cache.backend).as_deref() {
        None | Some("redis") => CacheBackend::Redis,
        Some("memory") => CacheBackend::Memory,
        Some(other) => {
            return Err(LoadError::invalid(
                "cache.backend",
                format!("unknown backend `{other}` (expected redis or memory)"),
            ));
        }
    };

    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let capacity = cache
        .memory_capacity
        .unwrap_or(DEFAULT_CACHE_MEMORY_CAPACITY);
    let memory_capacity = usize::try_from(capacity)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid(
                "cache.memory_capacity",
                "must be greater than zero and fit in usize",
            )
        })?;

    Ok(CacheSettings {
        backend,
        ttl: Duration::from_secs(ttl_seconds),
        memory_capacity,
    })
}

fn build_search_settings(search: RawSearchSettings) -> Result<SearchSettings, LoadError> {
    let page_size = non_zero_u32(
        search.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        "search.page_size",
    )?;
    let max_window = non_zero_u32(
        search.max_window.unwrap_or(DEFAULT_MAX_WINDOW),
        "search.max_window",
    )?;
    if max_window < page_size {
        return Err(LoadError::invalid(
            "search.max_window",
            "must be at least search.page_size",
        ));
    }

    Ok(SearchSettings {
        page_size,
        max_window,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRedisSettings {
    url: Option<String>,
    command_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawElasticSettings {
    url: Option<String>,
    index: Option<String>,
    user: Option<String>,
    password: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    ttl_seconds: Option<u64>,
    memory_capacity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSearchSettings {
    page_size: Option<u64>,
    max_window: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
