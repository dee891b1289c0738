//! Wiring of store, cache, relay and service from configuration.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use ordinal_cache::{BestEffortCache, create_cache, try_connect_redis};
use ordinal_db_postgres::PostgresStore;
use ordinal_relay::{EventRelay, EventSink, LogSink, NatsSink, RedisSink};
use ordinal_service::ItemService;
use ordinal_storage::DynStore;

use crate::config::{AppConfig, RelaySettings, SinkKind, StorageBackend, StorageConfig};

const NATS_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything a running server owns besides the HTTP listener.
pub struct Components {
    pub service: ItemService,
    pub relay: EventRelay,
}

pub async fn build_components(cfg: &AppConfig) -> anyhow::Result<Components> {
    let store = connect_store(&cfg.storage).await?;

    let redis_pool = try_connect_redis(&cfg.redis).await;
    let cache = BestEffortCache::new(create_cache(redis_pool.clone()));

    let sink = create_sink(&cfg.relay, redis_pool).await;
    let relay = EventRelay::start(sink, cfg.relay.relay_config());

    let service = ItemService::new(store, cache, relay.handle(), cfg.service_settings());
    Ok(Components { service, relay })
}

/// Opens the configured store. Postgres is retried with a fixed delay.
pub async fn connect_store(cfg: &StorageConfig) -> anyhow::Result<DynStore> {
    if cfg.backend == StorageBackend::Memory {
        tracing::info!("Using in-memory store");
        return Ok(ordinal_db_memory::create_store());
    }

    let pg = cfg.postgres_store_config();
    let attempts = cfg.connect_retries.max(1);
    let delay = Duration::from_millis(cfg.connect_retry_delay_ms);

    let mut attempt = 1;
    loop {
        match PostgresStore::new(pg.clone()).await {
            Ok(store) => {
                tracing::info!(attempt, "Connected to PostgreSQL");
                return Ok(Arc::new(store));
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    attempts,
                    retry_in_ms = delay.as_millis() as u64,
                    "PostgreSQL connection failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("could not connect to PostgreSQL after {attempts} attempts")
                });
            }
        }
    }
}

/// Picks the event sink. An unreachable broker degrades to [`LogSink`].
pub async fn create_sink(
    cfg: &RelaySettings,
    redis_pool: Option<deadpool_redis::Pool>,
) -> Arc<dyn EventSink> {
    match cfg.sink {
        SinkKind::Nats => {
            match NatsSink::connect(&cfg.nats_url, cfg.subject.clone(), NATS_CONNECT_TIMEOUT).await
            {
                Ok(sink) => {
                    tracing::info!(subject = %cfg.subject, "Relaying item events to NATS");
                    Arc::new(sink)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "NATS unavailable, item events will only be logged");
                    Arc::new(LogSink)
                }
            }
        }
        SinkKind::Redis => match redis_pool {
            Some(pool) => {
                tracing::info!(channel = %cfg.redis_channel, "Relaying item events to Redis");
                Arc::new(RedisSink::new(pool, cfg.redis_channel.clone()))
            }
            None => {
                tracing::warn!("relay.sink = \"redis\" but Redis is unavailable, item events will only be logged");
                Arc::new(LogSink)
            }
        },
        SinkKind::Log => {
            tracing::info!("Relaying item events to the log");
            Arc::new(LogSink)
        }
    }
}
