//! HTTP server for bill evaluation and annual comparison.  Catalog
//! location and bind address come from the environment; see [`config`].

use anyhow::Result;
use tariff_engine::{api, config};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let settings = config::Settings::from_env();
    tracing::info!(
        catalog = %settings.catalog_path.display(),
        addr = %settings.bind_addr,
        "starting tariff engine"
    );
    if let Err(err) = api::serve(&settings.bind_addr, &settings.catalog_path).await {
        tracing::error!(error = %format!("{err:#}"), "server stopped");
        return Err(err);
    }
    Ok(())
}
