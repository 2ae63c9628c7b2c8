//! Core server implementation

use crate::{
    config::ServerConfig,
    error::{ServerError, ServerResult},
    handlers,
    profiling::ProfilingHook,
};

use axum::{routing::get, Router};
use std::sync::Arc;
use storefront_core::ResultCache;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub cache: Arc<ResultCache>,
    pub profiling: Arc<ProfilingHook>,
}

impl ServerState {
    /// State with a fresh cache and the build's default profiler
    pub fn new(config: ServerConfig) -> Self {
        let profiling = ProfilingHook::from_config(&config.profiling);
        Self::with_profiling(config, profiling)
    }

    pub fn with_profiling(config: ServerConfig, profiling: ProfilingHook) -> Self {
        Self {
            config: Arc::new(config),
            cache: Arc::new(ResultCache::new()),
            profiling: Arc::new(profiling),
        }
    }
}

/// Build the router with all routes and middleware
pub fn create_router(state: ServerState) -> Router {
    let api_routes = Router::new()
        .route("/public-heavy", get(handlers::heavy::public_heavy))
        .route("/private-user", get(handlers::user::private_user));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/health/ready", get(handlers::health::readiness_check))
        .route("/health/live", get(handlers::health::liveness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Storefront HTTP server
pub struct StorefrontServer {
    state: ServerState,
}

impl StorefrontServer {
    /// Create a new server instance
    pub fn new(config: ServerConfig) -> Self {
        Self {
            state: ServerState::new(config),
        }
    }

    pub fn from_state(state: ServerState) -> Self {
        Self { state }
    }

    /// Serve until the shutdown future resolves, then stop the profiler
    pub async fn start<F>(self, shutdown: F) -> ServerResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.state.config.bind;
        let app = create_router(self.state.clone());

        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        self.state.profiling.shutdown();
        info!("Server stopped");
        Ok(())
    }

    /// Get server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    /// Get server state
    pub fn state(&self) -> &ServerState {
        &self.state
    }
}

/// Run server until Ctrl-C
pub async fn run_server(server: StorefrontServer) -> ServerResult<()> {
    server.start(shutdown_signal()).await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
