//! Event relay behaviour: ordering, backpressure, failure isolation, shutdown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ordinal_core::Item;
use ordinal_relay::{
    EventRelay, EventSink, OverflowPolicy, PublishError, RelayConfig, RelayError,
};
use tokio::sync::{Semaphore, mpsc};
use tokio_test::{assert_pending, assert_ready};

/// Records published ids. With a gate, every publish waits for one permit
/// and reports the id it started on.
struct RecordingSink {
    seen: Mutex<Vec<i64>>,
    fail_on: Option<i64>,
    gate: Option<Arc<Semaphore>>,
    started: Option<mpsc::UnboundedSender<i64>>,
}

impl RecordingSink {
    fn open() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail_on: None,
            gate: None,
            started: None,
        }
    }

    fn gated() -> (Self, Arc<Semaphore>, mpsc::UnboundedReceiver<i64>) {
        let gate = Arc::new(Semaphore::new(0));
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            gate: Some(gate.clone()),
            started: Some(tx),
            ..Self::open()
        };
        (sink, gate, rx)
    }

    fn seen(&self) -> Vec<i64> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, item: &Item) -> Result<(), PublishError> {
        if let Some(started) = &self.started {
            let _ = started.send(item.id);
        }
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail_on == Some(item.id) {
            return Err(PublishError::Publish("broker unavailable".into()));
        }
        self.seen.lock().unwrap().push(item.id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

fn event(id: i64) -> Item {
    Item {
        priority: id,
        ..Item::tombstone(id, 1)
    }
}

fn config(capacity: usize, overflow: OverflowPolicy) -> RelayConfig {
    RelayConfig { capacity, overflow }
}

#[tokio::test]
async fn delivers_in_enqueue_order() {
    let sink = Arc::new(RecordingSink::open());
    let relay = EventRelay::start(sink.clone(), RelayConfig::default());
    let handle = relay.handle();

    for id in 1..=30 {
        handle.enqueue(event(id)).await.unwrap();
    }
    let stats = relay.shutdown(Duration::from_secs(5)).await.unwrap();

    assert_eq!(sink.seen(), (1..=30).collect::<Vec<_>>());
    assert_eq!(stats.published, 30);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn publish_failure_does_not_stop_the_dispatcher() {
    let sink = Arc::new(RecordingSink {
        fail_on: Some(2),
        ..RecordingSink::open()
    });
    let relay = EventRelay::start(sink.clone(), RelayConfig::default());
    let handle = relay.handle();

    for id in 1..=4 {
        handle.enqueue(event(id)).await.unwrap();
    }
    let stats = relay.shutdown(Duration::from_secs(5)).await.unwrap();

    assert_eq!(sink.seen(), vec![1, 3, 4]);
    assert_eq!(stats.failed, 1);
}

#[tokio::test]
async fn full_queue_blocks_the_producer() {
    let (sink, gate, mut started) = RecordingSink::gated();
    let sink = Arc::new(sink);
    let relay = EventRelay::start(sink.clone(), config(1, OverflowPolicy::Block));
    let handle = relay.handle();

    // First event is taken by the dispatcher, second fills the queue.
    handle.enqueue(event(1)).await.unwrap();
    assert_eq!(started.recv().await, Some(1));
    handle.enqueue(event(2)).await.unwrap();

    let mut third = tokio_test::task::spawn(handle.enqueue(event(3)));
    assert_pending!(third.poll());

    gate.add_permits(1);
    assert_eq!(started.recv().await, Some(2));
    tokio::time::timeout(Duration::from_secs(1), async {
        while !third.is_woken() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_ready!(third.poll()).unwrap();

    gate.add_permits(2);
    relay.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(sink.seen(), vec![1, 2, 3]);
}

#[tokio::test]
async fn drop_after_policy_gives_up_on_a_full_queue() {
    let (sink, gate, mut started) = RecordingSink::gated();
    let sink = Arc::new(sink);
    let wait = Duration::from_millis(30);
    let relay = EventRelay::start(sink.clone(), config(1, OverflowPolicy::DropAfter(wait)));
    let handle = relay.handle();

    handle.enqueue(event(1)).await.unwrap();
    assert_eq!(started.recv().await, Some(1));
    handle.enqueue(event(2)).await.unwrap();

    assert_eq!(
        handle.enqueue(event(3)).await,
        Err(RelayError::QueueFull(wait))
    );

    gate.add_permits(2);
    relay.shutdown(Duration::from_secs(5)).await.unwrap();
    assert_eq!(sink.seen(), vec![1, 2]);
}

#[tokio::test]
async fn shutdown_drains_then_refuses() {
    let sink = Arc::new(RecordingSink::open());
    let relay = EventRelay::start(sink.clone(), config(10, OverflowPolicy::Block));
    let handle = relay.handle();

    for id in 1..=5 {
        handle.enqueue(event(id)).await.unwrap();
    }
    relay.shutdown(Duration::from_secs(5)).await.unwrap();

    assert_eq!(sink.seen(), vec![1, 2, 3, 4, 5]);
    assert!(handle.is_closed());
    assert_eq!(handle.enqueue(event(6)).await, Err(RelayError::Closed));
}

#[tokio::test]
async fn shutdown_gives_up_on_a_stuck_sink() {
    let (sink, _gate, mut started) = RecordingSink::gated();
    let relay = EventRelay::start(Arc::new(sink), config(4, OverflowPolicy::Block));
    let handle = relay.handle();

    handle.enqueue(event(1)).await.unwrap();
    assert_eq!(started.recv().await, Some(1));

    let timeout = Duration::from_millis(50);
    assert_eq!(
        relay.shutdown(timeout).await,
        Err(RelayError::DrainTimedOut(timeout))
    );
}
