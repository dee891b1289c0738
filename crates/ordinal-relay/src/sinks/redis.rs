use async_trait::async_trait;
use deadpool_redis::Pool;
use ordinal_core::Item;
use redis::AsyncCommands;
use tracing::debug;

use super::{EventSink, encode};
use crate::error::PublishError;

/// Default Redis channel for item events.
pub const DEFAULT_CHANNEL: &str = "ordinal:items";

/// Publishes each item as JSON on a Redis pub/sub channel.
#[derive(Clone)]
pub struct RedisSink {
    pool: Pool,
    channel: String,
}

impl RedisSink {
    pub fn new(pool: Pool, channel: impl Into<String>) -> Self {
        Self {
            pool,
            channel: channel.into(),
        }
    }
}

#[async_trait]
impl EventSink for RedisSink {
    async fn publish(&self, item: &Item) -> Result<(), PublishError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|e| PublishError::Connection(format!("Redis pool error: {e}")))?;

        let message = encode(item)?;
        conn.publish::<_, _, ()>(&self.channel, message)
            .await
            .map_err(|e| PublishError::Publish(format!("Redis publish error: {e}")))?;

        debug!(item.id = item.id, channel = %self.channel, "published item to Redis");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
