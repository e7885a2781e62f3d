//! `mdm`: the master-data service.
//!
//! Holds the canonical country registry and can pull the exchange service's
//! latest processed batch from `upstream_url`.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::Parser;
use dex_api::{RegistryState, registry_router};
use dex_pipeline::Pipeline;
use dex_server::{Defaults, ServiceConfig};

#[derive(Parser)]
#[command(author, version, about = "dex registry service (MDM)")]
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
  let config = ServiceConfig::load(&cli.config, Defaults::MDM)?;
  if config.upstream_url.is_none() {
    tracing::warn!("DEX_UPSTREAM_URL is not set; POST /sync will fail");
  }

  let store = dex_server::open_store(&config).await?;
  let pipeline = Pipeline::new(Arc::clone(&store), config.pipeline())
    .context("failed to build pipeline")?;

  let app = registry_router(RegistryState { store, pipeline: Arc::new(pipeline) });
  dex_server::serve(app, &config).await
}
