//! End-to-end orchestration against the in-memory store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ordinal_cache::{BestEffortCache, CacheError, CacheKey, ItemCache, LocalCache};
use ordinal_core::{Item, ItemDraft, ItemKey, ItemUpdate, Priority};
use ordinal_db_memory::InMemoryStore;
use ordinal_relay::{EventRelay, EventSink, PublishError, RelayConfig};
use ordinal_service::{ItemService, ServiceError, ServiceSettings};
use ordinal_storage::{PageRequest, PriorityStore, StorageError};

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<Item>>,
}

impl RecordingSink {
    fn events(&self) -> Vec<Item> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for RecordingSink {
    async fn publish(&self, item: &Item) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(item.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

/// Local cache that remembers every deleted key.
#[derive(Default)]
struct SpyCache {
    inner: LocalCache,
    deleted: Mutex<Vec<CacheKey>>,
}

#[async_trait]
impl ItemCache for SpyCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Item>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, item: &Item, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set(key, item, ttl).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        self.deleted.lock().unwrap().push(key.clone());
        self.inner.delete(key).await
    }

    fn mode(&self) -> &'static str {
        "spy"
    }
}

/// Local cache whose deletes take `delay` each.
struct SlowEvictCache {
    inner: LocalCache,
    delay: Duration,
}

#[async_trait]
impl ItemCache for SlowEvictCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<Item>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &CacheKey, item: &Item, ttl: Duration) -> Result<(), CacheError> {
        self.inner.set(key, item, ttl).await
    }

    async fn delete(&self, key: &CacheKey) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(key).await
    }

    fn mode(&self) -> &'static str {
        "slow-evict"
    }
}

struct DownCache;

#[async_trait]
impl ItemCache for DownCache {
    async fn get(&self, _: &CacheKey) -> Result<Option<Item>, CacheError> {
        Err(CacheError::connection("refused"))
    }

    async fn set(&self, _: &CacheKey, _: &Item, _: Duration) -> Result<(), CacheError> {
        Err(CacheError::connection("refused"))
    }

    async fn delete(&self, _: &CacheKey) -> Result<(), CacheError> {
        Err(CacheError::connection("refused"))
    }

    fn mode(&self) -> &'static str {
        "down"
    }
}

/// Delegates to the in-memory store; reprioritize stalls first, and so does
/// `count_all` when `stall_counts` is set.
struct StallingStore {
    inner: InMemoryStore,
    stall: Duration,
    stall_counts: bool,
}

#[async_trait]
impl PriorityStore for StallingStore {
    async fn fetch_one(&self, key: ItemKey) -> Result<Option<Item>, StorageError> {
        self.inner.fetch_one(key).await
    }

    async fn fetch_page(&self, page: PageRequest) -> Result<Vec<Item>, StorageError> {
        self.inner.fetch_page(page).await
    }

    async fn insert(&self, draft: &ItemDraft) -> Result<Item, StorageError> {
        self.inner.insert(draft).await
    }

    async fn update(&self, update: &ItemUpdate) -> Result<(), StorageError> {
        self.inner.update(update).await
    }

    async fn soft_delete(&self, key: ItemKey) -> Result<(), StorageError> {
        self.inner.soft_delete(key).await
    }

    async fn reprioritize(
        &self,
        key: ItemKey,
        new_priority: Priority,
    ) -> Result<Vec<Item>, StorageError> {
        tokio::time::sleep(self.stall).await;
        self.inner.reprioritize(key, new_priority).await
    }

    async fn count_all(&self) -> Result<i64, StorageError> {
        if self.stall_counts {
            tokio::time::sleep(self.stall).await;
        }
        self.inner.count_all().await
    }

    async fn count_removed(&self) -> Result<i64, StorageError> {
        self.inner.count_removed().await
    }

    fn backend_name(&self) -> &'static str {
        "stalling"
    }
}

struct Harness {
    service: ItemService,
    store: Arc<dyn PriorityStore>,
    relay: EventRelay,
    sink: Arc<RecordingSink>,
}

impl Harness {
    fn new(store: Arc<dyn PriorityStore>, cache: Arc<dyn ItemCache>, settings: ServiceSettings) -> Self {
        let sink = Arc::new(RecordingSink::default());
        let relay = EventRelay::start(sink.clone(), RelayConfig::default());
        let service = ItemService::new(
            store.clone(),
            BestEffortCache::new(cache),
            relay.handle(),
            settings,
        );
        Self {
            service,
            store,
            relay,
            sink,
        }
    }

    fn memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(LocalCache::new()),
            ServiceSettings::default(),
        )
    }

    async fn seed(&self, names: &[&str]) -> Vec<Item> {
        let mut items = Vec::new();
        for name in names {
            items.push(self.service.create(ItemDraft::new(1, *name, "")).await.unwrap());
        }
        items
    }

    /// Drains the relay and returns everything it published.
    async fn events(self) -> Vec<Item> {
        self.relay.shutdown(Duration::from_secs(5)).await.unwrap();
        self.sink.events()
    }
}

#[tokio::test]
async fn reprioritize_returns_and_publishes_every_shifted_row() {
    let h = Harness::memory();
    let seeded = h.seed(&["A", "B", "C", "D", "E"]).await;
    let d = seeded[3].key();

    let affected = h.service.reprioritize(d, 2).await.unwrap();

    let moved: Vec<(String, i64)> = affected
        .iter()
        .map(|item| (item.name.clone(), item.priority))
        .collect();
    assert_eq!(
        moved,
        vec![("D".into(), 2), ("B".into(), 3), ("C".into(), 4)]
    );

    let page = h.service.list(PageRequest::new(10, 0)).await.unwrap();
    let order: Vec<&str> = page.items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(order, vec!["A", "D", "B", "C", "E"]);

    let events = h.events().await;
    // Five creates, then the three shifted rows in returned order.
    assert_eq!(events.len(), 8);
    assert_eq!(&events[5..], affected.as_slice());
}

#[tokio::test]
async fn reprioritize_evicts_every_shifted_row() {
    let spy = Arc::new(SpyCache::default());
    let h = Harness::new(
        Arc::new(InMemoryStore::new()),
        spy.clone(),
        ServiceSettings::default(),
    );
    let seeded = h.seed(&["A", "B", "C", "D"]).await;
    for item in &seeded {
        h.service.get(item.key()).await.unwrap();
    }

    let affected = h.service.reprioritize(seeded[2].key(), 1).await.unwrap();

    let evicted: Vec<CacheKey> = affected
        .iter()
        .map(|item| CacheKey::item(item.key()))
        .collect();
    assert_eq!(spy.deleted.lock().unwrap().clone(), evicted);

    let mut served = Vec::new();
    for item in &seeded {
        let item = h.service.get(item.key()).await.unwrap();
        served.push((item.name, item.priority));
    }
    assert_eq!(
        served,
        vec![
            ("A".into(), 2),
            ("B".into(), 3),
            ("C".into(), 1),
            ("D".into(), 4)
        ]
    );
}

#[tokio::test]
async fn dropped_caller_does_not_cut_short_a_committed_reprioritize() {
    let h = Harness::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(SlowEvictCache {
            inner: LocalCache::new(),
            delay: Duration::from_millis(50),
        }),
        ServiceSettings::default(),
    );
    let seeded = h.seed(&["A", "B", "C"]).await;
    for item in &seeded {
        h.service.get(item.key()).await.unwrap();
    }

    // Gives up after the commit and the first eviction.
    let call = tokio::time::timeout(
        Duration::from_millis(70),
        h.service.reprioritize(seeded[2].key(), 1),
    )
    .await;
    assert!(call.is_err());

    tokio::time::sleep(Duration::from_millis(300)).await;

    let b = h.service.get(seeded[1].key()).await.unwrap();
    assert_eq!(b.priority, 3);
    let a = h.service.get(seeded[0].key()).await.unwrap();
    assert_eq!(a.priority, 2);

    // Three creates, then all three shifted rows.
    assert_eq!(h.events().await.len(), 6);
}

#[tokio::test]
async fn reprioritize_to_current_rank_emits_nothing() {
    let h = Harness::memory();
    let seeded = h.seed(&["A", "B"]).await;

    let affected = h.service.reprioritize(seeded[1].key(), 2).await.unwrap();
    assert!(affected.is_empty());
    assert_eq!(h.events().await.len(), 2);
}

#[tokio::test]
async fn reprioritize_out_of_range_is_a_validation_error() {
    let h = Harness::memory();
    let seeded = h.seed(&["A", "B"]).await;

    let err = h.service.reprioritize(seeded[0].key(), 3).await.unwrap_err();
    assert!(err.is_validation());
    let err = h.service.reprioritize(ItemKey::new(99, 1), 1).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn cached_reads_are_stale_for_at_most_one_ttl() {
    let ttl = Duration::from_millis(100);
    let h = Harness::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(LocalCache::new()),
        ServiceSettings {
            cache_ttl: ttl,
            ..ServiceSettings::default()
        },
    );
    let item = h.seed(&["before"]).await.remove(0);

    assert_eq!(h.service.get(item.key()).await.unwrap().name, "before");

    // Written behind the service's back: the cache is not told.
    h.store
        .update(&ItemUpdate::new(item.key(), "after", ""))
        .await
        .unwrap();
    assert_eq!(h.service.get(item.key()).await.unwrap().name, "before");

    tokio::time::sleep(ttl * 2).await;
    assert_eq!(h.service.get(item.key()).await.unwrap().name, "after");
}

#[tokio::test]
async fn update_invalidates_then_publishes_the_reread_row() {
    let spy = Arc::new(SpyCache::default());
    let h = Harness::new(
        Arc::new(InMemoryStore::new()),
        spy.clone(),
        ServiceSettings::default(),
    );
    let item = h.seed(&["draft"]).await.remove(0);
    h.service.get(item.key()).await.unwrap();

    let updated = h
        .service
        .update(ItemUpdate::new(item.key(), "final", "done"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(updated.name, "final");
    assert_eq!(updated.priority, item.priority);
    assert_eq!(spy.deleted.lock().unwrap().clone(), vec![CacheKey::item(item.key())]);
    assert_eq!(h.service.get(item.key()).await.unwrap().description, "done");
    assert_eq!(h.events().await.last(), Some(&updated));
}

#[tokio::test]
async fn failed_update_touches_neither_cache_nor_relay() {
    let spy = Arc::new(SpyCache::default());
    let h = Harness::new(
        Arc::new(InMemoryStore::new()),
        spy.clone(),
        ServiceSettings::default(),
    );

    let err = h
        .service
        .update(ItemUpdate::new(ItemKey::new(7, 1), "name", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { id: 7, scope: 1 }));

    let err = h
        .service
        .update(ItemUpdate::new(ItemKey::new(7, 1), "", ""))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    assert!(spy.deleted.lock().unwrap().is_empty());
    assert!(h.events().await.is_empty());
}

#[tokio::test]
async fn create_rejects_an_empty_name() {
    let h = Harness::memory();

    let err = h.service.create(ItemDraft::new(1, "", "")).await.unwrap_err();
    assert!(err.is_validation());
    assert_eq!(h.store.count_all().await.unwrap(), 0);
    assert!(h.events().await.is_empty());
}

#[tokio::test]
async fn delete_publishes_a_tombstone() {
    let h = Harness::memory();
    let item = h.seed(&["gone"]).await.remove(0);

    let tombstone = h.service.delete(item.key()).await.unwrap();
    assert!(tombstone.removed);
    assert_eq!(tombstone.key(), item.key());

    let stored = h.service.get(item.key()).await.unwrap();
    assert!(stored.removed);
    assert_eq!(stored.priority, item.priority);

    assert!(h.service.delete(ItemKey::new(42, 1)).await.unwrap_err().is_not_found());
    assert_eq!(h.events().await.last(), Some(&tombstone));
}

#[tokio::test]
async fn unavailable_cache_is_invisible_to_callers() {
    let h = Harness::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(DownCache),
        ServiceSettings::default(),
    );
    let seeded = h.seed(&["A", "B", "C"]).await;

    assert_eq!(h.service.get(seeded[2].key()).await.unwrap().name, "C");
    let affected = h.service.reprioritize(seeded[2].key(), 1).await.unwrap();
    assert_eq!(affected.len(), 3);
    h.service.delete(seeded[0].key()).await.unwrap();

    assert_eq!(h.events().await.len(), 3 + 3 + 1);
}

#[tokio::test]
async fn timed_out_reprioritize_changes_nothing() {
    let store = Arc::new(StallingStore {
        inner: InMemoryStore::new(),
        stall: Duration::from_millis(500),
        stall_counts: false,
    });
    let h = Harness::new(
        store,
        Arc::new(LocalCache::new()),
        ServiceSettings {
            store_timeout: Duration::from_millis(50),
            ..ServiceSettings::default()
        },
    );
    let seeded = h.seed(&["A", "B"]).await;

    let err = h.service.reprioritize(seeded[1].key(), 1).await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(StorageError::TransactionError { .. })));

    let page = h.service.list(PageRequest::default()).await.unwrap();
    let order: Vec<&str> = page.items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(order, vec!["A", "B"]);
    assert_eq!(h.events().await.len(), 2);
}

#[tokio::test]
async fn readiness_fails_once_the_store_deadline_passes() {
    let h = Harness::memory();
    h.service.ready().await.unwrap();

    let hung = Harness::new(
        Arc::new(StallingStore {
            inner: InMemoryStore::new(),
            stall: Duration::from_secs(5),
            stall_counts: true,
        }),
        Arc::new(LocalCache::new()),
        ServiceSettings {
            store_timeout: Duration::from_millis(50),
            ..ServiceSettings::default()
        },
    );
    let started = std::time::Instant::now();
    let err = hung.service.ready().await.unwrap_err();
    assert!(matches!(err, ServiceError::Store(StorageError::TransactionError { .. })));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn list_reports_counts_and_paging() {
    let h = Harness::memory();
    let seeded = h.seed(&["A", "B", "C", "D"]).await;
    h.service.delete(seeded[1].key()).await.unwrap();

    let page = h.service.list(PageRequest::new(2, 1)).await.unwrap();
    assert_eq!(page.meta.total, 4);
    assert_eq!(page.meta.removed, 1);
    assert_eq!(page.meta.limit, 2);
    assert_eq!(page.meta.offset, 1);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].name, "B");
    assert!(page.items[0].removed);

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["meta"]["removed"], 1);
    assert_eq!(json["items"][1]["name"], "C");
}
