//! Redis-backed cache store.

use std::time::Duration;

use async_trait::async_trait;
use ::redis::{AsyncCommands, aio::ConnectionManager};
use tokio::time::timeout;
use tracing::info;

use crate::application::repos::{CacheError, CacheStore};
use crate::config::RedisSettings;

use super::error::InfraError;

const SOURCE: &str = "infra::redis_cache::RedisCacheStore";

/// Cache store over a multiplexed, auto-reconnecting Redis connection.
///
/// Every command runs under the configured deadline.
#[derive(Clone)]
pub struct RedisCacheStore {
    connection: ConnectionManager,
    command_timeout: Duration,
}

impl RedisCacheStore {
    pub async fn connect(settings: &RedisSettings) -> Result<Self, InfraError> {
        let client = ::redis::Client::open(settings.url.as_str())
            .map_err(|err| InfraError::backend("redis", err.to_string()))?;
        let connection = timeout(settings.command_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| InfraError::backend("redis", "timed out while connecting"))?
            .map_err(|err| InfraError::backend("redis", err.to_string()))?;

        info!(
            target_module = SOURCE,
            command_timeout_ms = settings.command_timeout.as_millis() as u64,
            "connected to redis"
        );

        Ok(Self {
            connection,
            command_timeout: settings.command_timeout,
        })
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.connection.clone();
        timeout(self.command_timeout, conn.get::<_, Option<Vec<u8>>>(key))
            .await
            .map_err(|_| CacheError::Timeout(self.command_timeout))?
            .map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection.clone();
        let seconds = ttl.as_secs().max(1);
        timeout(
            self.command_timeout,
            conn.set_ex::<_, _, ()>(key, value, seconds),
        )
        .await
        .map_err(|_| CacheError::Timeout(self.command_timeout))?
        .map_err(map_redis_error)
    }
}

fn map_redis_error(err: ::redis::RedisError) -> CacheError {
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        CacheError::Connection(err.to_string())
    } else {
        CacheError::command(err)
    }
}
