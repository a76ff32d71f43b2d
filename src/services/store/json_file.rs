use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::DocumentStore;
use crate::error::StoreError;
use crate::models::IngestDocument;

/// Keeps the document as a pretty-printed JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl DocumentStore for JsonFileStore {
    /// Writes next to the target and renames over it, so readers never see a
    /// partial file.
    fn save(&self, document: &IngestDocument) -> Result<(), StoreError> {
        let body = serde_json::to_vec_pretty(document)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&body).map_err(|e| self.io_error(e))?;
        tmp.flush().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::info!(
            "Saved {} sheets to {} ({}KB)",
            document.sheets.len(),
            self.path.display(),
            body.len() / 1024
        );
        Ok(())
    }

    fn load_all(&self) -> Result<Option<IngestDocument>, StoreError> {
        let body = match std::fs::read(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No document at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(self.io_error(e)),
        };
        Ok(Some(serde_json::from_slice(&body)?))
    }
}
