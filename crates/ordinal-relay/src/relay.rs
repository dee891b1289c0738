//! Bounded queue plus one dispatcher task.

use std::sync::Arc;
use std::time::Duration;

use ordinal_core::Item;
use tokio::sync::mpsc::{self, error::SendTimeoutError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::metrics;
use crate::sinks::EventSink;

/// Default queue capacity.
pub const DEFAULT_CAPACITY: usize = 100;

/// What `enqueue` does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait until the dispatcher makes room, however long that takes.
    #[default]
    Block,
    /// Wait up to the given duration, then drop the event.
    DropAfter(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            overflow: OverflowPolicy::Block,
        }
    }
}

/// What the dispatcher did over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub published: u64,
    pub failed: u64,
}

/// Producer side of the relay. Cheap to clone.
#[derive(Clone)]
pub struct RelayHandle {
    tx: mpsc::Sender<Item>,
    overflow: OverflowPolicy,
    closed: CancellationToken,
}

impl RelayHandle {
    /// Queues one event for delivery.
    ///
    /// Under [`OverflowPolicy::Block`] this waits for room. A drop is logged
    /// and counted here, so callers may ignore the error.
    pub async fn enqueue(&self, item: Item) -> Result<(), RelayError> {
        let (id, scope) = (item.id, item.scope);
        let result = if self.closed.is_cancelled() {
            Err(RelayError::Closed)
        } else {
            match self.overflow {
                OverflowPolicy::Block => self.tx.send(item).await.map_err(|_| RelayError::Closed),
                OverflowPolicy::DropAfter(wait) => {
                    self.tx.send_timeout(item, wait).await.map_err(|e| match e {
                        SendTimeoutError::Timeout(_) => RelayError::QueueFull(wait),
                        SendTimeoutError::Closed(_) => RelayError::Closed,
                    })
                }
            }
        };

        match result {
            Ok(()) => {
                metrics::record_enqueued(self.depth());
                debug!(item.id = id, item.scope = scope, "event enqueued");
                Ok(())
            }
            Err(err) => {
                let reason = match err {
                    RelayError::QueueFull(_) => "full",
                    _ => "closed",
                };
                warn!(item.id = id, item.scope = scope, error = %err, "event dropped");
                metrics::record_dropped(reason);
                Err(err)
            }
        }
    }

    /// Events currently waiting for the dispatcher.
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

/// The relay: owns the dispatcher task.
pub struct EventRelay {
    handle: RelayHandle,
    dispatcher: JoinHandle<DispatchStats>,
}

impl EventRelay {
    /// Starts the dispatcher on the current tokio runtime.
    pub fn start(sink: Arc<dyn EventSink>, config: RelayConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let closed = CancellationToken::new();

        info!(
            capacity = config.capacity,
            overflow = ?config.overflow,
            sink = sink.name(),
            "event relay started"
        );

        let dispatcher = tokio::spawn(dispatch(rx, sink, closed.clone()));
        Self {
            handle: RelayHandle {
                tx,
                overflow: config.overflow,
                closed,
            },
            dispatcher,
        }
    }

    pub fn handle(&self) -> RelayHandle {
        self.handle.clone()
    }

    /// Stops accepting events and waits up to `timeout` for queued ones to be
    /// delivered in order.
    ///
    /// On timeout the dispatcher is aborted and whatever is still queued is lost.
    pub async fn shutdown(self, timeout: Duration) -> Result<DispatchStats, RelayError> {
        info!(pending = self.handle.depth(), "draining event relay");
        self.handle.closed.cancel();

        let abort = self.dispatcher.abort_handle();
        match tokio::time::timeout(timeout, self.dispatcher).await {
            Ok(Ok(stats)) => {
                info!(
                    published = stats.published,
                    failed = stats.failed,
                    "event relay stopped"
                );
                Ok(stats)
            }
            Ok(Err(join_error)) => {
                warn!(error = %join_error, "event relay dispatcher ended abnormally");
                Ok(DispatchStats::default())
            }
            Err(_) => {
                abort.abort();
                warn!(?timeout, "event relay drain timed out, remaining events dropped");
                Err(RelayError::DrainTimedOut(timeout))
            }
        }
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<Item>,
    sink: Arc<dyn EventSink>,
    closed: CancellationToken,
) -> DispatchStats {
    let mut stats = DispatchStats::default();

    loop {
        tokio::select! {
            biased;
            next = rx.recv() => match next {
                Some(item) => forward(sink.as_ref(), &item, &mut stats).await,
                None => break,
            },
            _ = closed.cancelled() => {
                // Refuse new sends, then flush what is already queued.
                rx.close();
                while let Some(item) = rx.recv().await {
                    forward(sink.as_ref(), &item, &mut stats).await;
                }
                break;
            }
        }
    }

    stats
}

async fn forward(sink: &dyn EventSink, item: &Item, stats: &mut DispatchStats) {
    match sink.publish(item).await {
        Ok(()) => {
            stats.published += 1;
            metrics::record_published(sink.name());
        }
        Err(error) => {
            stats.failed += 1;
            metrics::record_publish_failed(sink.name());
            warn!(
                item.id = item.id,
                item.scope = item.scope,
                sink = sink.name(),
                %error,
                "publish failed, event dropped"
            );
        }
    }
}
