//! Cache backends: local (DashMap) and shared (Redis).

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use deadpool_redis::Pool;
use ordinal_core::Item;
use redis::AsyncCommands;

use crate::error::CacheError;
use crate::key::CacheKey;

/// A volatile, keyed copy of items. Never authoritative.
///
/// A miss is `Ok(None)`; an `Err` means the backend could not answer.
#[async_trait]
pub trait ItemCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Result<Option<Item>, CacheError>;

    async fn set(&self, key: &CacheKey, item: &Item, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError>;

    /// Backend name used as a log and metric label.
    fn mode(&self) -> &'static str;
}

/// A cached entry with TTL support.
#[derive(Clone, Debug)]
pub struct CachedEntry {
    pub item: Arc<Item>,
    pub cached_at: Instant,
    pub ttl: Duration,
}

impl CachedEntry {
    pub fn new(item: Item, ttl: Duration) -> Self {
        Self {
            item: Arc::new(item),
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// Single-instance cache backed by a DashMap.
#[derive(Clone, Default)]
pub struct LocalCache {
    entries: Arc<DashMap<String, CachedEntry>>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries currently held, expired ones included until next read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl ItemCache for LocalCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Item>, CacheError> {
        let Some(entry) = self.entries.get(key.as_str()) else {
            return Ok(None);
        };
        if entry.is_expired() {
            drop(entry);
            self.entries.remove(key.as_str());
            return Ok(None);
        }
        Ok(Some(Item::clone(&entry.item)))
    }

    async fn set(&self, key: &CacheKey, item: &Item, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .insert(key.as_str().to_string(), CachedEntry::new(item.clone(), ttl));
        crate::metrics::set_cache_entries(self.entries.len());
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.entries.remove(key.as_str());
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "local"
    }
}

/// Shared cache in Redis. Values are the item wire JSON.
#[derive(Clone)]
pub struct RedisCache {
    pool: Pool,
}

impl RedisCache {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemCache for RedisCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Item>, CacheError> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(key.as_str()).await?;
        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(CacheError::from)
    }

    async fn set(&self, key: &CacheKey, item: &Item, ttl: Duration) -> Result<(), CacheError> {
        let json = serde_json::to_string(item)?;
        // EX must be at least one second.
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(key.as_str(), json, ttl_secs).await?;
        tracing::debug!(key = %key, ttl_secs, "cache set (redis)");
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        let mut conn = self.pool.get().await?;
        conn.del::<_, ()>(key.as_str()).await?;
        tracing::debug!(key = %key, "cache invalidated (redis)");
        Ok(())
    }

    fn mode(&self) -> &'static str {
        "redis"
    }
}
