use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::{DocumentSummary, IngestDocument},
    services::excel::{
        utils::{secure_filename, supported_extension},
        SheetAssembler, WorkbookReader,
    },
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload_file))
}

#[derive(Debug, Serialize)]
pub struct UploadSummary {
    filename: String,
    #[serde(flatten)]
    document: DocumentSummary,
}

/// Validates the client-supplied name and returns the sanitized one.
pub fn checked_file_name(file_name: &str) -> Result<String, AppError> {
    if file_name.trim().is_empty() {
        return Err(AppError::InvalidInput("Nenhum arquivo selecionado".to_string()));
    }
    let safe = secure_filename(file_name);
    if supported_extension(file_name).is_none() || supported_extension(&safe).is_none() {
        return Err(AppError::InvalidInput(
            "Tipo de arquivo não permitido. Use .xlsx ou .xls".to_string(),
        ));
    }
    Ok(safe)
}

/// Reads, assembles and persists one upload. Runs on a blocking thread and
/// holds the ingestion lock for the whole run.
pub fn ingest_upload(state: &AppState, file_name: &str, bytes: &[u8]) -> Result<Arc<IngestDocument>, AppError> {
    let _guard = state.ingest_lock();
    let start = std::time::Instant::now();

    let document = {
        let mut reader = WorkbookReader::from_upload(bytes, file_name)?;
        let source_file = reader.file().to_string();
        SheetAssembler::new(state.config().sheet_error_policy).assemble(&mut reader, &source_file)?
        // scratch copy is removed here, before anything is persisted
    };

    state.store().save(&document)?;
    tracing::info!(
        "Ingested {} ({} sheets) in {:?}",
        file_name,
        document.sheets.len(),
        start.elapsed()
    );
    Ok(state.replace_document(document))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(e.body_text()))?
    {
        if field.name() == Some("file") {
            let file_name = field.file_name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::InvalidInput(e.body_text()))?;
            upload = Some((file_name, bytes));
            break;
        }
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::InvalidInput("Nenhum arquivo enviado".to_string()))?;
    let file_name = checked_file_name(&file_name)?;
    tracing::info!("Received upload {} ({}KB)", file_name, bytes.len() / 1024);

    let document = {
        let state = state.clone();
        let file_name = file_name.clone();
        tokio::task::spawn_blocking(move || ingest_upload(&state, &file_name, &bytes)).await??
    };

    Ok(Json(json!({
        "success": true,
        "message": "Arquivo processado com sucesso",
        "data": UploadSummary {
            filename: file_name,
            document: DocumentSummary::from(&*document),
        }
    })))
}
