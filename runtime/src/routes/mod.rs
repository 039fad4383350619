use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::AppState;

pub mod rfp;

pub mod types;

pub use rfp::rfp_routes;

/// Full HTTP surface with the health check, the RFP routes and permissive CORS.
pub fn app_router(state: Arc<AppState>) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;
    Router::new()
        .route("/health", get(health))
        .merge(rfp_routes(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[inline]
async fn health() -> &'static str {
    "ok"
}
