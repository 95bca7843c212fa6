use std::sync::Arc;

use axum::{http::HeaderValue, http::StatusCode, routing::get, Json, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub mod graphql;

use crate::infrastructure::config::Config;

pub fn build_router(config: Arc<Config>) -> Router {
    let prefix = format!("/{}", config.graphql.prefix.trim_matches('/'));
    let router = Router::new()
        .route("/health", get(healthcheck))
        .nest(&prefix, graphql::router())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http());

    match cors_layer(config.as_ref()) {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

pub async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "not_found"})),
    )
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

fn cors_layer(config: &Config) -> Option<CorsLayer> {
    if config.app.cors_origins.is_empty() {
        return None;
    }

    let origins: Vec<HeaderValue> = config
        .app
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, error = %err, "ignoring invalid cors origin");
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any),
    )
}
