use std::time::Duration;

use async_nats::{Client, ConnectOptions};
use async_trait::async_trait;
use bytes::Bytes;
use ordinal_core::Item;
use tracing::{debug, info};

use super::{EventSink, encode};
use crate::error::PublishError;

const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(120);

/// Publishes each item as JSON on a NATS subject.
#[derive(Clone)]
pub struct NatsSink {
    client: Client,
    subject: String,
}

impl NatsSink {
    /// Connects to NATS. Fails fast if the server is unreachable; reconnection
    /// after a successful first connect is handled by the client.
    pub async fn connect(
        url: &str,
        subject: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PublishError> {
        info!(url, "Connecting to NATS");

        let client = ConnectOptions::new()
            .name("ordinal-relay")
            .ping_interval(DEFAULT_PING_INTERVAL)
            .connection_timeout(timeout)
            .connect(url)
            .await
            .map_err(|e| PublishError::Connection(format!("Failed to connect: {e}")))?;

        info!(url, "Connected to NATS");
        Ok(Self::new(client, subject))
    }

    pub fn new(client: Client, subject: impl Into<String>) -> Self {
        Self {
            client,
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl EventSink for NatsSink {
    async fn publish(&self, item: &Item) -> Result<(), PublishError> {
        let payload = Bytes::from(encode(item)?);
        self.client
            .publish(self.subject.clone(), payload)
            .await
            .map_err(|e| PublishError::Publish(e.to_string()))?;

        debug!(item.id = item.id, subject = %self.subject, "published item to NATS");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "nats"
    }
}
