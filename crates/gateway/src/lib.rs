//! HTTP API gateway for agentbridge.
//!
//! Exposes the orchestration loop and the provider's tool and resource
//! catalog over REST, plus a health check.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;
pub mod wiring;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::{Router, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{info, warn};

use agentbridge_config::AppConfig;
use agentbridge_core::event::EventBus;
use agentbridge_core::provider::Provider;
use agentbridge_mcp::ConnectionManager;

/// Shared application state for the gateway.
///
/// Built once at startup. Per-request state (conversation, loop bookkeeping)
/// never lives here.
pub struct GatewayState {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub connection: Arc<ConnectionManager>,
    pub event_bus: Arc<EventBus>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Build the provider and the lazily connected tool/resource provider
    /// from configuration.
    pub fn from_config(
        config: AppConfig,
        event_bus: Arc<EventBus>,
    ) -> Result<Self, agentbridge_core::Error> {
        let provider = agentbridge_providers::build_from_config(&config.model);
        let connection = wiring::connection_from_config(&config, event_bus.clone())?;
        Ok(Self {
            config,
            provider,
            connection,
            event_bus,
        })
    }
}

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - CORS per `gateway.allowed_origins`
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = cors_layer(&state.config.gateway.allowed_origins);
    let body_limit = state.config.gateway.body_limit_bytes;

    Router::new()
        .route("/health", get(health_handler))
        .merge(api::api_router(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .max_age(std::time::Duration::from_secs(3600));

    if allowed_origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any()).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %o, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();
    layer
        .allow_origin(AllowOrigin::list(origins))
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Start the gateway HTTP server and run until Ctrl-C.
///
/// The provider connection is closed on the way out.
pub async fn start(state: SharedState, host: &str, port: u16) -> std::io::Result<()> {
    let addr = format!("{host}:{port}");
    let connection = state.connection.clone();
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    connection.shutdown().await;
    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}
