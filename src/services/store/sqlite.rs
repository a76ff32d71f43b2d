use std::path::Path;
use std::sync::Mutex;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, error, info};

use super::DocumentStore;
use crate::error::StoreError;
use crate::models::{ColumnMapping, IngestDocument, Record, SheetResult, Statistics};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS ingest_runs (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        source_file TEXT NOT NULL,
        last_updated TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS sheets (
        id INTEGER PRIMARY KEY,
        position INTEGER NOT NULL,
        name TEXT NOT NULL,
        total_records INTEGER NOT NULL,
        columns TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sheet_id INTEGER NOT NULL REFERENCES sheets(id),
        row_index INTEGER NOT NULL,
        data TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS statistics (
        sheet_id INTEGER PRIMARY KEY REFERENCES sheets(id),
        stats_data TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS column_mappings (
        sheet_id INTEGER PRIMARY KEY REFERENCES sheets(id),
        nome TEXT,
        tipo TEXT,
        cidade TEXT,
        contato TEXT,
        data_contato TEXT,
        contrato TEXT,
        grupo TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_records_sheet ON records(sheet_id, row_index);
";

/// Relational store: one row per sheet and per record, with statistics and
/// column mappings alongside each sheet.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        info!("Opening SQLite store at {}", path.display());
        let conn = Connection::open(path).map_err(|e| {
            error!("Failed to open database {}: {}", path.display(), e);
            e
        })?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA).map_err(|e| {
            error!("Failed to create schema: {}", e);
            e
        })?;
        debug!("SQLite schema ready");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| {
            error!("Failed to acquire database lock: {}", e);
            StoreError::Poisoned
        })
    }
}

impl DocumentStore for SqliteStore {
    fn save(&self, document: &IngestDocument) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute_batch(
            "DELETE FROM records;
             DELETE FROM statistics;
             DELETE FROM column_mappings;
             DELETE FROM sheets;
             DELETE FROM ingest_runs;",
        )?;

        tx.execute(
            "INSERT INTO ingest_runs (id, source_file, last_updated) VALUES (1, ?1, ?2)",
            params![
                document.source_file,
                document.last_updated.format(TIMESTAMP_FORMAT).to_string()
            ],
        )?;

        for (position, sheet) in document.sheets.iter().enumerate() {
            tx.execute(
                "INSERT INTO sheets (position, name, total_records, columns) VALUES (?1, ?2, ?3, ?4)",
                params![
                    position as i64,
                    sheet.name,
                    sheet.total_records as i64,
                    serde_json::to_string(&sheet.columns)?
                ],
            )?;
            let sheet_id = tx.last_insert_rowid();

            {
                let mut insert = tx.prepare_cached(
                    "INSERT INTO records (sheet_id, row_index, data) VALUES (?1, ?2, ?3)",
                )?;
                for (row_index, record) in sheet.records.iter().enumerate() {
                    insert.execute(params![
                        sheet_id,
                        row_index as i64,
                        serde_json::to_string(record)?
                    ])?;
                }
            }

            // Serialized straight to text so frequency tables keep their order.
            tx.execute(
                "INSERT INTO statistics (sheet_id, stats_data) VALUES (?1, ?2)",
                params![sheet_id, serde_json::to_string(&sheet.statistics)?],
            )?;

            let m = &sheet.column_mapping;
            tx.execute(
                "INSERT INTO column_mappings
                    (sheet_id, nome, tipo, cidade, contato, data_contato, contrato, grupo)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![sheet_id, m.nome, m.tipo, m.cidade, m.contato, m.data_contato, m.contrato, m.grupo],
            )?;
            debug!("Stored sheet {} with {} records", sheet.name, sheet.records.len());
        }

        tx.commit()?;
        info!("Saved {} sheets to SQLite", document.sheets.len());
        Ok(())
    }

    fn load_all(&self) -> Result<Option<IngestDocument>, StoreError> {
        let conn = self.lock()?;

        let run: Option<(String, String)> = conn
            .query_row(
                "SELECT source_file, last_updated FROM ingest_runs WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((source_file, last_updated)) = run else {
            return Ok(None);
        };
        let last_updated = NaiveDateTime::parse_from_str(&last_updated, TIMESTAMP_FORMAT)
            .map_err(|_| StoreError::Timestamp(last_updated.clone()))?;

        let mut sheet_stmt =
            conn.prepare("SELECT id, name, total_records, columns FROM sheets ORDER BY position")?;
        let sheet_rows: Vec<(i64, String, i64, String)> = sheet_stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))?
            .collect::<Result<_, _>>()?;

        let mut record_stmt =
            conn.prepare("SELECT data FROM records WHERE sheet_id = ?1 ORDER BY row_index")?;
        let mut stats_stmt = conn.prepare("SELECT stats_data FROM statistics WHERE sheet_id = ?1")?;
        let mut mapping_stmt = conn.prepare(
            "SELECT nome, tipo, cidade, contato, data_contato, contrato, grupo
             FROM column_mappings WHERE sheet_id = ?1",
        )?;

        let mut sheets = Vec::with_capacity(sheet_rows.len());
        for (sheet_id, name, total_records, columns) in sheet_rows {
            let records = record_stmt
                .query_map([sheet_id], |row| row.get::<_, String>(0))?
                .map(|data| Ok(serde_json::from_str::<Record>(&data?)?))
                .collect::<Result<Vec<_>, StoreError>>()?;

            let statistics = match stats_stmt
                .query_row([sheet_id], |row| row.get::<_, String>(0))
                .optional()?
            {
                Some(data) => serde_json::from_str::<Statistics>(&data)?,
                None => Statistics::default(),
            };

            let column_mapping = mapping_stmt
                .query_row([sheet_id], |row| {
                    Ok(ColumnMapping {
                        nome: row.get(0)?,
                        tipo: row.get(1)?,
                        cidade: row.get(2)?,
                        contato: row.get(3)?,
                        data_contato: row.get(4)?,
                        contrato: row.get(5)?,
                        grupo: row.get(6)?,
                    })
                })
                .optional()?
                .unwrap_or_default();

            sheets.push(SheetResult {
                name,
                total_records: total_records as usize,
                columns: serde_json::from_str(&columns)?,
                records,
                column_mapping,
                statistics,
            });
        }

        debug!("Loaded {} sheets from SQLite", sheets.len());
        Ok(Some(IngestDocument {
            sheets,
            last_updated,
            source_file,
        }))
    }
}
