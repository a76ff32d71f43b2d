use axum::{extract::DefaultBodyLimit, http::Method, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod data;
pub mod upload;

pub fn routes(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    // Dashboard assets and anything else not routed above.
    let static_files = ServeDir::new(&state.config().static_dir).append_index_html_on_directories(true);

    Router::new()
        .route("/health", get(health_check))
        .merge(upload::routes())
        .merge(data::routes())
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(state.config().max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
