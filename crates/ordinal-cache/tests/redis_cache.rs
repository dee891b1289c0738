//! Redis cache tests against a real Redis (Docker required).

use std::time::Duration;

use ordinal_cache::{
    BestEffortCache, CacheKey, ItemCache, RedisCache, RedisConfig, create_cache, try_connect_redis,
};
use ordinal_core::{Item, ItemKey};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{host_port}");

            (container, url)
        })
        .await;

    url.clone()
}

fn config(url: String) -> RedisConfig {
    RedisConfig {
        enabled: true,
        url,
        pool_size: 5,
        timeout_ms: 5000,
    }
}

fn item(id: i64, scope: i64) -> Item {
    Item {
        id,
        scope,
        name: format!("item-{id}"),
        description: "cached".into(),
        priority: id,
        removed: false,
        created_at: ordinal_core::now_utc(),
    }
}

#[tokio::test]
async fn redis_round_trips_the_wire_shape() {
    let pool = try_connect_redis(&config(get_redis_url().await))
        .await
        .expect("redis should be reachable");
    let cache = RedisCache::new(pool);

    let stored = item(10, 2);
    let key = CacheKey::item(stored.key());
    cache.set(&key, &stored, Duration::from_secs(60)).await.unwrap();

    let loaded = cache.get(&key).await.unwrap().unwrap();
    assert_eq!(loaded.name, stored.name);
    assert_eq!(loaded.priority, stored.priority);
    assert_eq!(
        loaded.created_at.unix_timestamp(),
        stored.created_at.unix_timestamp()
    );

    cache.delete(&key).await.unwrap();
    assert!(cache.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn redis_entries_expire() {
    let pool = try_connect_redis(&config(get_redis_url().await))
        .await
        .expect("redis should be reachable");
    let cache = BestEffortCache::new(create_cache(Some(pool)));
    assert_eq!(cache.mode(), "redis");

    let stored = item(11, 2);
    cache.set(&stored, Duration::from_secs(1)).await;
    assert!(cache.get(stored.key()).await.is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(cache.get(ItemKey::new(11, 2)).await.is_none());
}
