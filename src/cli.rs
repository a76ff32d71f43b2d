use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::models::DocumentSummary;
use crate::services::excel::{SheetAssembler, SheetErrorPolicy, WorkbookReader};
use crate::services::store::{DocumentStore, JsonFileStore, SqliteStore};

#[derive(Debug, Parser)]
#[command(name = "prospect-sheets", about = "Prospecting spreadsheet ingestion service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP service (default)
    Serve,
    /// Process a local workbook and write the JSON document
    Process {
        file: PathBuf,
        /// Where to write the document; defaults to DATA_FILE
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Leave out sheets that cannot be read instead of aborting
        #[arg(long)]
        skip_failed_sheets: bool,
    },
    /// Copy the JSON document into the SQLite store
    Migrate {
        #[arg(long)]
        from: Option<PathBuf>,
        #[arg(long)]
        to: Option<PathBuf>,
    },
}

pub fn process(config: &Config, file: &Path, output: Option<PathBuf>, skip_failed_sheets: bool) -> Result<DocumentSummary> {
    let policy = if skip_failed_sheets {
        SheetErrorPolicy::Skip
    } else {
        config.sheet_error_policy
    };
    let source_file = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());

    let mut reader = WorkbookReader::open(file)?;
    let document = SheetAssembler::new(policy).assemble(&mut reader, &source_file)?;

    let store = JsonFileStore::new(output.unwrap_or_else(|| config.data_file.clone()));
    store
        .save(&document)
        .with_context(|| format!("Failed to write {}", store.path().display()))?;
    Ok(DocumentSummary::from(&document))
}

pub fn migrate(config: &Config, from: Option<PathBuf>, to: Option<PathBuf>) -> Result<DocumentSummary> {
    let source = JsonFileStore::new(from.unwrap_or_else(|| config.data_file.clone()));
    let Some(document) = source.load_all()? else {
        bail!("No document found at {}", source.path().display());
    };

    let target_path = to.unwrap_or_else(|| config.database_path.clone());
    let target = SqliteStore::open(&target_path)?;
    target.save(&document)?;
    tracing::info!(
        "Migrated {} sheets from {} to {}",
        document.sheets.len(),
        source.path().display(),
        target_path.display()
    );
    Ok(DocumentSummary::from(&document))
}

pub fn print_summary(summary: &DocumentSummary) {
    println!("Processed {} sheets ({})", summary.sheets_count, summary.last_updated);
    for sheet in &summary.sheets {
        println!("  {}: {} records", sheet.name, sheet.records);
    }
}
