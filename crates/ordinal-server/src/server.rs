use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    routing::{delete, get, patch, post},
};
use ordinal_relay::EventRelay;
use ordinal_service::ItemService;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::bootstrap::{Components, build_components};
use crate::{config::AppConfig, handlers, middleware as app_middleware};

#[derive(Clone)]
pub struct AppState {
    pub service: ItemService,
}

pub struct OrdinalServer {
    addr: SocketAddr,
    app: Router,
    relay: EventRelay,
    relay_shutdown_timeout: Duration,
}

pub fn build_app(cfg: &AppConfig, state: AppState) -> Router {
    let api = Router::new()
        .route("/item", get(handlers::get_item))
        .route("/item/create", post(handlers::create_item))
        .route("/item/update", patch(handlers::update_item))
        .route("/item/remove", delete(handlers::remove_item))
        .route("/item/reprioritize", patch(handlers::reprioritize_item))
        .route("/items/list", get(handlers::list_items));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        .route("/metrics", get(handlers::metrics))
        .nest("/api/v1", api)
        .route_layer(middleware::from_fn(app_middleware::http_metrics))
        .with_state(state)
        // Outermost first: request id -> trace -> timeout
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(app_middleware::request_id))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(|req: &axum::http::Request<_>| {
                            use tracing::field::Empty;
                            let req_id = req
                                .extensions()
                                .get::<axum::http::HeaderValue>()
                                .and_then(|v| v.to_str().ok())
                                .unwrap_or("")
                                .to_string();
                            tracing::info_span!(
                                "http.request",
                                http.method = %req.method(),
                                http.target = %req.uri(),
                                http.status_code = Empty,
                                request_id = %req_id
                            )
                        })
                        .on_response(
                            |res: &axum::http::Response<_>,
                             latency: Duration,
                             span: &tracing::Span| {
                                span.record(
                                    "http.status_code",
                                    tracing::field::display(res.status().as_u16()),
                                );
                                tracing::info!(
                                    http.status = %res.status().as_u16(),
                                    elapsed_ms = %latency.as_millis(),
                                    "request handled"
                                );
                            },
                        ),
                )
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    cfg.request_timeout(),
                )),
        )
        .layer(DefaultBodyLimit::max(cfg.server.body_limit_bytes))
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub async fn build(self) -> anyhow::Result<OrdinalServer> {
        let Components { service, relay } = build_components(&self.config).await?;
        let app = build_app(&self.config, AppState { service });

        Ok(OrdinalServer {
            addr: self.addr,
            app,
            relay,
            relay_shutdown_timeout: self.config.relay.shutdown_timeout(),
        })
    }
}

impl OrdinalServer {
    /// Serves until a shutdown signal, then drains the relay.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        match self.relay.shutdown(self.relay_shutdown_timeout).await {
            Ok(stats) => tracing::info!(
                published = stats.published,
                failed = stats.failed,
                "event relay drained"
            ),
            Err(e) => tracing::warn!(error = %e, "event relay did not drain"),
        }
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
