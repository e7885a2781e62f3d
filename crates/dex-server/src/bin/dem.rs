//! `dem`: the data exchange service.
//!
//! Registers providers, extracts and normalizes their batches, snapshots raw
//! and processed artifacts, and pushes clean records to the registry at
//! `registry_url`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use dex_api::{ExchangeState, exchange_router};
use dex_pipeline::{Pipeline, RemoteRegistry};
use dex_server::{Defaults, ServiceConfig};

#[derive(Parser)]
#[command(author, version, about = "dex exchange service (DEM)")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();
  dex_server::init_tracing();

  let cli = Cli::parse();
  let config = ServiceConfig::load(&cli.config, Defaults::DEM)?;
  let pipeline_config = config.pipeline();

  // Extraction needs a push target; without one the service still serves
  // reads and reports the missing setting on every extraction.
  let sink = if pipeline_config.registry_url().is_ok() {
    let remote = RemoteRegistry::from_config(&pipeline_config)
      .context("invalid registry configuration")?;
    Some(Arc::new(remote))
  } else {
    tracing::warn!("DEX_REGISTRY_URL is not set; extraction requests will fail");
    None
  };

  let store = dex_server::open_store(&config).await?;
  let pipeline = Pipeline::new(Arc::clone(&store), pipeline_config)
    .context("failed to build pipeline")?;

  let app = exchange_router(ExchangeState { store, pipeline: Arc::new(pipeline), sink });
  dex_server::serve(app, &config).await
}
