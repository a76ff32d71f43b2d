use std::str::FromStr;
use std::sync::Arc;

use crate::error::StoreError;
use crate::models::IngestDocument;

pub mod json_file;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

/// Persists the latest ingestion result. Every save replaces the previous
/// document as a whole.
pub trait DocumentStore: Send + Sync {
    fn save(&self, document: &IngestDocument) -> Result<(), StoreError>;

    /// The stored document, or `None` if nothing was ingested yet.
    fn load_all(&self) -> Result<Option<IngestDocument>, StoreError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "file" => Ok(StorageBackend::Json),
            "sqlite" | "db" => Ok(StorageBackend::Sqlite),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

pub fn open_store(config: &crate::config::Config) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let store: Arc<dyn DocumentStore> = match config.storage_backend {
        StorageBackend::Json => Arc::new(JsonFileStore::new(&config.data_file)),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open(&config.database_path)?),
    };
    tracing::info!("Using {:?} document store", config.storage_backend);
    Ok(store)
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::NaiveDate;

    use crate::models::{CellValue, ColumnMapping, IngestDocument, Record, SheetResult, Statistics};

    /// A two-sheet document exercising every value kind and statistic shape.
    pub fn sample_document() -> IngestDocument {
        let mut first = Record::new();
        first.insert("Nome".into(), CellValue::Text("Hospital A".into()));
        first.insert("Leitos".into(), CellValue::Int(120));
        first.insert("Taxa".into(), CellValue::Float(2.0));
        first.insert("Ativo".into(), CellValue::Bool(true));
        first.insert("Contrato".into(), CellValue::Null);
        let mut second = Record::new();
        second.insert("Nome".into(), CellValue::Text("Hospital B".into()));
        second.insert("Leitos".into(), CellValue::Null);
        second.insert("Taxa".into(), CellValue::Float(0.75));
        second.insert("Ativo".into(), CellValue::Bool(false));
        second.insert("Contrato".into(), CellValue::Text("SIM".into()));

        let mut statistics = Statistics {
            with_contract: Some(1),
            without_contract: Some(1),
            ..Statistics::default()
        };
        statistics.top_cities = Some([("Zurique".to_string(), 3), ("Atibaia".to_string(), 1)].into_iter().collect());
        statistics.monthly = Some([("2023-01".to_string(), 2)].into_iter().collect());

        IngestDocument {
            sheets: vec![
                SheetResult {
                    name: "Hospitais SP".into(),
                    total_records: 2,
                    columns: vec!["Nome".into(), "Leitos".into(), "Taxa".into(), "Ativo".into(), "Contrato".into()],
                    records: vec![first, second],
                    column_mapping: ColumnMapping {
                        nome: Some("Nome".into()),
                        contrato: Some("Contrato".into()),
                        ..ColumnMapping::default()
                    },
                    statistics,
                },
                SheetResult {
                    name: "Oportunidades".into(),
                    total_records: 0,
                    columns: vec!["Empresa".into()],
                    records: vec![],
                    column_mapping: ColumnMapping::default(),
                    statistics: Statistics::default(),
                },
            ],
            last_updated: NaiveDate::from_ymd_opt(2024, 3, 5)
                .unwrap()
                .and_hms_micro_opt(14, 7, 9, 250_000)
                .unwrap(),
            source_file: "Lista_Prospeccao.xlsx".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_from_str() {
        assert_eq!("json".parse::<StorageBackend>(), Ok(StorageBackend::Json));
        assert_eq!(" SQLite ".parse::<StorageBackend>(), Ok(StorageBackend::Sqlite));
        assert!("postgres".parse::<StorageBackend>().is_err());
    }
}
