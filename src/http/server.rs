//! HTTP server setup.
//!
//! # Responsibilities
//! - Hold the shared application state
//! - Build the router for the API, catcher, and log viewer routes
//! - Wire up middleware (request ID, tracing, CORS, timeout, body limit)
//! - Serve until a shutdown signal arrives

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;

use crate::config::AppConfig;
use crate::http::error::ApiError;
use crate::http::request::with_request_tracing;
use crate::http::{api, catchall};
use crate::lifecycle::signals::shutdown_requested;
use crate::lifecycle::startup::{self, StartupError};
use crate::proxy::{HostResolver, ProxyExecutor, Transport};
use crate::records::LogWriter;
use crate::security::headers::{preflight, with_cors};
use crate::security::limits::with_body_limit;
use crate::storage::{RequestRingBuffer, SelectionStore, TemplateStore};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub log_writer: Arc<LogWriter>,
    pub requests: Arc<RequestRingBuffer>,
    pub templates: Arc<TemplateStore>,
    pub selection: Arc<SelectionStore>,
    pub proxy: Arc<ProxyExecutor>,
}

impl AppState {
    /// Wire the stores and proxy executor from `config`. The transport
    /// and resolver are injected so tests can run without a network.
    pub fn new(config: AppConfig, transport: Arc<dyn Transport>, resolver: Arc<dyn HostResolver>) -> Self {
        let log_writer = Arc::new(LogWriter::from_config(&config));
        let proxy = ProxyExecutor::new(
            transport,
            resolver,
            log_writer.clone(),
            Duration::from_millis(config.proxy.default_timeout_ms),
        )
        .with_timeout_cap(proxy_timeout_cap(config.timeouts.request_secs));

        Self {
            requests: Arc::new(RequestRingBuffer::new(config.storage.requests_file())),
            templates: Arc::new(TemplateStore::new(config.storage.templates_file())),
            selection: Arc::new(SelectionStore::new(config.storage.selection_file())),
            proxy: Arc::new(proxy),
            log_writer,
            config: Arc::new(config),
        }
    }
}

/// Longest proxy timeout that still leaves room to log the failure and
/// answer before the router's request deadline fires.
fn proxy_timeout_cap(request_secs: u64) -> Duration {
    let deadline = Duration::from_secs(request_secs);
    deadline.saturating_sub(Duration::from_secs(1).min(deadline / 2))
}

pub struct HttpServer {
    router: Router,
    config: Arc<AppConfig>,
}

impl HttpServer {
    /// Prepare directories and the real network transport, then build the router.
    pub fn new(config: AppConfig) -> Result<Self, StartupError> {
        let state = startup::prepare(config)?;
        Ok(Self::with_state(state))
    }

    pub fn with_state(state: AppState) -> Self {
        let config = state.config.clone();
        let router = build_router(state);
        Self { router, config }
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Serve on `listener` until `shutdown` fires or the process is signalled.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, base_url = %self.config.base_url, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_requested(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router with all middleware layers.
#[allow(deprecated)]
pub fn build_router(state: AppState) -> Router {
    let config = state.config.clone();

    let api_routes = get(api::get)
        .post(api::post)
        .delete(api::delete)
        .options(preflight)
        .fallback(api::method_not_allowed);

    let catcher_routes = post(catchall::handle)
        .options(preflight)
        .fallback(catchall::method_not_allowed);

    let router = Router::new()
        .route("/api", api_routes.clone())
        .route("/api.php", api_routes)
        .route("/api/logs/{filename}", get(api::show_log).options(preflight))
        .route("/catchall", catcher_routes.clone())
        .route("/catchall/", catcher_routes.clone())
        .route("/catchall/api.php", catcher_routes)
        .fallback(not_found)
        .with_state(state);

    let router = with_body_limit(router, config.security.max_body_size)
        .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

    let router = if config.security.cors_enabled {
        with_cors(router)
    } else {
        router
    };

    with_request_tracing(router)
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Not found.".into())
}
