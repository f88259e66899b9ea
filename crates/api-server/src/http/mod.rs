use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::llm::LlmGateway;
use shared::repos::Store;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

mod errors;
mod health;
mod query;
mod upload;

// Slack over the configured file cap so multipart framing does not trip the
// body limit before the per-file size check runs.
const BODY_LIMIT_SLACK_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub llm: Arc<dyn LlmGateway>,
    pub upload_dir: PathBuf,
    pub max_file_size_bytes: usize,
    pub session_ttl_seconds: u64,
    pub cors_origins: Vec<String>,
}

pub fn build_router(app_state: AppState) -> Router {
    let cors = cors_layer(&app_state.cors_origins);
    let body_limit = app_state
        .max_file_size_bytes
        .saturating_add(BODY_LIMIT_SLACK_BYTES);

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/upload", post(upload::upload_file))
        .route("/query", post(query::process_query))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(app_state)
}

async fn banner() -> Json<Value> {
    Json(json!({
        "message": "Conversational data analysis API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/upload", "/query", "/health", "/ready"],
    }))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    if parsed.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
