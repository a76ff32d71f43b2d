use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{DocumentSummary, IngestDocument},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/current-data", get(current_data))
        .route("/api/data", get(all_data))
}

const NO_DATA: &str = "Nenhum dado carregado ainda";

/// The loaded document. A cold cache reads the store, so this runs off the
/// async workers.
async fn load_document(state: Arc<AppState>) -> Result<Arc<IngestDocument>, AppError> {
    tokio::task::spawn_blocking(move || state.current_document())
        .await??
        .ok_or_else(|| AppError::NotFound(NO_DATA.to_string()))
}

/// Summary of the loaded document.
async fn current_data(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let document = load_document(state).await?;
    Ok(Json(json!({
        "success": true,
        "data": DocumentSummary::from(&*document),
    })))
}

/// The full document, in the same shape as the stored file. Serialized
/// straight from the model so ranked tables and records keep their order.
async fn all_data(State(state): State<Arc<AppState>>) -> Result<Json<Arc<IngestDocument>>, AppError> {
    Ok(Json(load_document(state).await?))
}
