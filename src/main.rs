use anyhow::Result;
use clap::Parser;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::sync::Arc;

mod cli;
mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use error::StoreError;
use models::IngestDocument;
use services::store::DocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse arguments first so --help works without a valid environment
    let cli = cli::Cli::parse();

    // Load configuration
    let config = config::Config::new()?;

    // Initialize logging
    logging::init_logging(&config.log_filter)?;

    match cli.command.unwrap_or(cli::Command::Serve) {
        cli::Command::Serve => serve(config).await,
        cli::Command::Process {
            file,
            output,
            skip_failed_sheets,
        } => {
            let summary = cli::process(&config, &file, output, skip_failed_sheets)?;
            cli::print_summary(&summary);
            Ok(())
        }
        cli::Command::Migrate { from, to } => {
            let summary = cli::migrate(&config, from, to)?;
            cli::print_summary(&summary);
            Ok(())
        }
    }
}

async fn serve(config: config::Config) -> Result<()> {
    let store = services::store::open_store(&config)?;
    let addr = config.bind_addr;

    // Build our application state
    let state = Arc::new(AppState::new(config, store));
    let app = routes::routes(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

// Application state
pub struct AppState {
    config: config::Config,
    store: Arc<dyn DocumentStore>,
    current: RwLock<Option<Arc<IngestDocument>>>,
    ingest_lock: Mutex<()>,
}

impl AppState {
    fn new(config: config::Config, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            config,
            store,
            current: RwLock::new(None),
            ingest_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &config::Config {
        &self.config
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Serializes ingestion runs.
    pub fn ingest_lock(&self) -> MutexGuard<'_, ()> {
        self.ingest_lock.lock()
    }

    /// The latest document, loaded from the store on first access.
    pub fn current_document(&self) -> Result<Option<Arc<IngestDocument>>, StoreError> {
        if let Some(document) = self.current.read().as_ref() {
            return Ok(Some(document.clone()));
        }
        let loaded = self.store.load_all()?.map(Arc::new);
        if let Some(document) = &loaded {
            let mut current = self.current.write();
            // An upload may have landed while the store was being read.
            if current.is_none() {
                *current = Some(document.clone());
            } else {
                return Ok(current.clone());
            }
        }
        Ok(loaded)
    }

    pub fn replace_document(&self, document: IngestDocument) -> Arc<IngestDocument> {
        let document = Arc::new(document);
        *self.current.write() = Some(document.clone());
        document
    }
}
