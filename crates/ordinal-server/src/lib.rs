pub mod bootstrap;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod observability;
pub mod server;

pub use bootstrap::{Components, build_components};
pub use config::{
    AppConfig, CacheConfig, PostgresStorageConfig, RelaySettings, ServerConfig, StorageBackend,
    StorageConfig,
};
pub use observability::init_tracing;
pub use server::{AppState, OrdinalServer, ServerBuilder, build_app};
