//! Downstream publish targets.

mod log;
mod nats;
mod redis;

use async_trait::async_trait;
use ordinal_core::Item;

use crate::error::PublishError;

pub use log::LogSink;
pub use nats::NatsSink;
pub use redis::{DEFAULT_CHANNEL, RedisSink};

/// Where relayed events end up. One synchronous publish per item, no acknowledgement.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, item: &Item) -> Result<(), PublishError>;

    /// Sink name used as a log and metric label.
    fn name(&self) -> &'static str;
}

/// Encodes an item in its wire shape.
pub fn encode(item: &Item) -> Result<Vec<u8>, PublishError> {
    Ok(serde_json::to_vec(item)?)
}
