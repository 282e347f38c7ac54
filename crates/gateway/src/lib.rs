//! HTTP API gateway for MindMate.
//!
//! Exposes a health check and the v1 chat API. Each request runs one turn
//! of the response pipeline against a server-side session.
//!
//! Built on Axum for high performance async HTTP.

pub mod api_v1;
pub mod sessions;

use axum::extract::DefaultBodyLimit;
use axum::{Router, extract::State, http::Method, response::Json, routing::get};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use mindmate_agent::ResponsePipeline;
use mindmate_config::AppConfig;

use crate::sessions::SessionStore;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub pipeline: Arc<ResponsePipeline>,
    pub sessions: SessionStore,
}

impl GatewayState {
    pub fn new(pipeline: Arc<ResponsePipeline>, config: &AppConfig) -> Self {
        Self {
            pipeline,
            sessions: SessionStore::new(config.gateway.max_sessions, config.context.max_turns),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the full router.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - CORS for browser clients
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .with_state(state.clone())
        .nest("/v1", api_v1::v1_router(state))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// The pipeline (providers, knowledge index) is built once and shared by
/// every session.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let pipeline = Arc::new(mindmate_agent::build_pipeline(&config).await?);
    let state = Arc::new(GatewayState::new(pipeline, &config));
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub knowledge_entries: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        knowledge_entries: state.pipeline.index().len(),
    })
}
