use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use dotenvy::dotenv;

use crate::services::excel::SheetErrorPolicy;
use crate::services::store::StorageBackend;

fn default_max_upload_bytes() -> usize {
    // 50 MB in bytes
    50 * 1024 * 1024
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub storage_backend: StorageBackend,
    pub data_file: PathBuf,
    pub database_path: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub sheet_error_policy: SheetErrorPolicy,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            storage_backend: StorageBackend::Json,
            data_file: PathBuf::from("all_sheets_data.json"),
            database_path: PathBuf::from("prospeccao.db"),
            static_dir: PathBuf::from("static"),
            max_upload_bytes: default_max_upload_bytes(),
            sheet_error_policy: SheetErrorPolicy::FailFast,
            log_filter: "info".to_string(),
        }
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", name, e))
}

impl Config {
    pub fn new() -> Result<Self> {
        // Load .env file first
        dotenv().ok();
        Self::from_vars(|name| std::env::var(name).ok()).context("Failed to load configuration")
    }

    /// Builds the configuration from a variable lookup, falling back to the
    /// defaults for anything unset.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(raw) = lookup("BIND_ADDR") {
            config.bind_addr = parse_var("BIND_ADDR", &raw)?;
        }
        if let Some(raw) = lookup("STORAGE_BACKEND") {
            config.storage_backend = parse_var("STORAGE_BACKEND", &raw)?;
        }
        if let Some(raw) = lookup("DATA_FILE") {
            config.data_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("DATABASE_PATH") {
            config.database_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("STATIC_DIR") {
            config.static_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", &raw)?;
        }
        if let Some(raw) = lookup("SHEET_ERROR_POLICY") {
            config.sheet_error_policy = parse_var("SHEET_ERROR_POLICY", &raw)?;
        }
        if let Some(raw) = lookup("LOG_FILTER") {
            config.log_filter = raw;
        }

        Ok(config)
    }
}
