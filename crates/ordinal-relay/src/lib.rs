//! Best-effort event relay for Ordinal.
//!
//! Committed item changes are handed to a [`RelayHandle`], queued in a bounded
//! channel and forwarded one at a time, in order, by a single dispatcher task
//! to an [`EventSink`]. Nothing is persisted: events still queued when the
//! process dies are lost, and a failed publish is logged and dropped.
//!
//! ```ignore
//! let relay = EventRelay::start(Arc::new(LogSink), RelayConfig::default());
//! relay.handle().enqueue(item).await?;
//! relay.shutdown(Duration::from_secs(5)).await?;
//! ```

mod error;
pub mod metrics;
mod relay;
pub mod sinks;

pub use error::{PublishError, RelayError};
pub use relay::{
    DEFAULT_CAPACITY, DispatchStats, EventRelay, OverflowPolicy, RelayConfig, RelayHandle,
};
pub use sinks::{EventSink, LogSink, NatsSink, RedisSink};
