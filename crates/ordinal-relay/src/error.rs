use std::time::Duration;

use thiserror::Error;

/// Failure reported by an [`EventSink`](crate::EventSink). Logged, never retried.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Sink connection failed: {0}")]
    Connection(String),

    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Publish failed: {0}")]
    Publish(String),
}

/// Why an event did not make it onto the queue.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Relay queue full after waiting {0:?}")]
    QueueFull(Duration),

    #[error("Relay is shut down")]
    Closed,

    #[error("Relay drain did not finish within {0:?}")]
    DrainTimedOut(Duration),
}
