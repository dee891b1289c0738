//! The boundary where cache failures stop.

use std::sync::Arc;
use std::time::Duration;

use ordinal_core::{Item, ItemKey};
use tracing::{debug, warn};

use crate::backend::ItemCache;
use crate::key::CacheKey;
use crate::metrics;

/// Wraps any [`ItemCache`] so that no cache error can reach the caller.
///
/// `get` turns an error into a miss; `set` and `invalidate` log and move on.
/// Every call is awaited, so an invalidation has finished by the time it
/// returns.
#[derive(Clone)]
pub struct BestEffortCache {
    inner: Arc<dyn ItemCache>,
}

impl BestEffortCache {
    pub fn new(inner: Arc<dyn ItemCache>) -> Self {
        Self { inner }
    }

    pub fn mode(&self) -> &'static str {
        self.inner.mode()
    }

    pub async fn get(&self, key: ItemKey) -> Option<Item> {
        let cache_key = CacheKey::item(key);
        let mode = self.inner.mode();
        match self.inner.get(&cache_key).await {
            Ok(Some(item)) => {
                debug!(key = %cache_key, mode, "cache hit");
                metrics::record_cache_hit(mode);
                Some(item)
            }
            Ok(None) => {
                debug!(key = %cache_key, mode, "cache miss");
                metrics::record_cache_miss(mode);
                None
            }
            Err(error) => {
                warn!(key = %cache_key, mode, %error, "cache read failed, treating as miss");
                metrics::record_cache_error(mode, "get");
                metrics::record_cache_miss(mode);
                None
            }
        }
    }

    pub async fn set(&self, item: &Item, ttl: Duration) {
        let cache_key = CacheKey::item(item.key());
        if let Err(error) = self.inner.set(&cache_key, item, ttl).await {
            let mode = self.inner.mode();
            warn!(key = %cache_key, mode, %error, "cache populate failed");
            metrics::record_cache_error(mode, "set");
        }
    }

    pub async fn invalidate(&self, key: ItemKey) {
        let cache_key = CacheKey::item(key);
        if let Err(error) = self.inner.delete(&cache_key).await {
            let mode = self.inner.mode();
            warn!(key = %cache_key, mode, %error, "cache invalidation failed");
            metrics::record_cache_error(mode, "delete");
        }
    }
}
