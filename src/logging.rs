use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins over the configured default filter.
pub fn init_logging(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))?)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    Ok(())
}
