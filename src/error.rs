use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
};
use serde_json::json;
use axum::Json;
use thiserror::Error;

/// Errors raised by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The file is not a spreadsheet container we can decode.
    #[error("unreadable workbook {file}: {reason}")]
    UnreadableWorkbook { file: String, reason: String },

    /// A declared sheet could not be turned into a grid.
    #[error("failed to process sheet '{sheet}': {reason}")]
    SheetProcessing { sheet: String, reason: String },

    /// A mapped column is not part of the sheet's header.
    #[error("column '{column}' is not present in the sheet")]
    UnknownColumn { column: String },

    /// The evaluation time cannot be shifted back by the trailing window.
    #[error("evaluation time {evaluated_at} is outside the supported date range")]
    TemporalWindow { evaluated_at: String },

    /// A non-finite number reached the output boundary.
    #[error("non-serializable value in sheet '{sheet}', column '{column}', row {row}")]
    SerializationInvariant {
        sheet: String,
        column: String,
        row: usize,
    },

    #[error("scratch file error: {0}")]
    Scratch(#[from] std::io::Error),
}

/// Errors raised by document stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid stored document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid stored timestamp '{0}'")]
    Timestamp(String),

    #[error("database lock poisoned")]
    Poisoned,
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;

#[derive(Debug)]
pub enum AppError {
    InvalidInput(String),
    NotFound(String),
    Ingest(IngestError),
    Store(StoreError),
    Internal(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Ingest(err) => write!(f, "Erro ao processar arquivo: {}", err),
            AppError::Store(err) => write!(f, "Storage error: {}", err),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Ingest(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Ingest(IngestError::UnreadableWorkbook { .. })
            | AppError::Ingest(IngestError::SheetProcessing { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::InvalidInput(msg) | AppError::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_workbook_maps_to_422() {
        let err = AppError::from(IngestError::UnreadableWorkbook {
            file: "lista.xlsx".to_string(),
            reason: "truncated".to_string(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_invalid_input_maps_to_400() {
        let err = AppError::InvalidInput("Nenhum arquivo enviado".to_string());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid input: Nenhum arquivo enviado");
    }

    #[test]
    fn test_sheet_error_display_names_sheet() {
        let err = IngestError::SheetProcessing {
            sheet: "Hospitais SP".to_string(),
            reason: "missing part".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to process sheet 'Hospitais SP': missing part"
        );
    }
}
