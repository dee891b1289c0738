//! Accelerator cache for Ordinal.
//!
//! The cache holds disposable, time-bounded copies of items keyed by
//! `(id, scope)`. It is never authoritative: the orchestration layer reads
//! through it, evicts entries after every committed write and repopulates on
//! the next miss.
//!
//! ## Graceful Degradation
//!
//! If Redis is disabled or unreachable at startup, [`create_cache`] falls back
//! to a per-instance [`LocalCache`]. At runtime, [`BestEffortCache`] turns
//! every backend failure into a logged miss.

mod backend;
mod best_effort;
mod error;
mod key;
pub mod metrics;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use backend::{CachedEntry, ItemCache, LocalCache, RedisCache};
pub use best_effort::BestEffortCache;
pub use error::CacheError;
pub use key::CacheKey;

/// Redis connection settings shared by the cache and the Redis event sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Use Redis for the cache. Default: false (local cache only).
    #[serde(default = "default_redis_enabled")]
    pub enabled: bool,

    /// Redis connection URL (e.g., "redis://localhost:6379")
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size
    #[serde(default = "default_redis_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_redis_enabled() -> bool {
    false
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_redis_pool_size() -> usize {
    10
}

fn default_redis_timeout_ms() -> u64 {
    5000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: default_redis_enabled(),
            url: default_redis_url(),
            pool_size: default_redis_pool_size(),
            timeout_ms: default_redis_timeout_ms(),
        }
    }
}

/// Builds a Redis pool and checks that one connection can be opened.
pub async fn connect_redis(config: &RedisConfig) -> Result<deadpool_redis::Pool, CacheError> {
    let mut redis_config = deadpool_redis::Config::from_url(&config.url);
    let timeout = Some(Duration::from_millis(config.timeout_ms));
    let pool_config = redis_config
        .pool
        .get_or_insert_with(|| deadpool_redis::PoolConfig::new(config.pool_size));
    pool_config.max_size = config.pool_size;
    pool_config.timeouts.wait = timeout;
    pool_config.timeouts.create = timeout;
    pool_config.timeouts.recycle = timeout;

    let pool = redis_config
        .create_pool(Some(deadpool_redis::Runtime::Tokio1))
        .map_err(|e| CacheError::connection(e.to_string()))?;

    pool.get().await?;
    Ok(pool)
}

/// Selects the cache backend.
///
/// Redis when `pool` is given, otherwise a local DashMap cache.
pub fn create_cache(pool: Option<deadpool_redis::Pool>) -> Arc<dyn ItemCache> {
    match pool {
        Some(pool) => {
            tracing::info!("Using Redis item cache");
            Arc::new(RedisCache::new(pool))
        }
        None => {
            tracing::info!("Using local item cache");
            Arc::new(LocalCache::new())
        }
    }
}

/// Connects to Redis when enabled, falling back to `None` with a warning.
pub async fn try_connect_redis(config: &RedisConfig) -> Option<deadpool_redis::Pool> {
    if !config.enabled {
        tracing::info!("Redis disabled, using local cache only");
        return None;
    }

    tracing::info!(url = %config.url, "Connecting to Redis");
    match connect_redis(config).await {
        Ok(pool) => {
            tracing::info!("Connected to Redis");
            Some(pool)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to connect to Redis. Falling back to local cache.");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redis_defaults_to_disabled() {
        let config = RedisConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, 10);
    }

    #[tokio::test]
    async fn disabled_redis_falls_back_to_local() {
        let pool = try_connect_redis(&RedisConfig::default()).await;
        assert!(pool.is_none());
        assert_eq!(create_cache(pool).mode(), "local");
    }

    #[tokio::test]
    async fn unreachable_redis_falls_back_to_local() {
        let config = RedisConfig {
            enabled: true,
            url: "redis://127.0.0.1:1".to_string(),
            pool_size: 1,
            timeout_ms: 200,
        };
        assert!(try_connect_redis(&config).await.is_none());
    }
}
