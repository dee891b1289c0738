use async_trait::async_trait;
use ordinal_core::Item;
use tracing::debug;

use super::EventSink;
use crate::error::PublishError;

/// Writes events to the log. Used when no broker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn publish(&self, item: &Item) -> Result<(), PublishError> {
        debug!(
            item.id = item.id,
            item.scope = item.scope,
            priority = item.priority,
            removed = item.removed,
            "item event"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
