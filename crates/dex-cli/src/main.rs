//! `dex`: operator CLI for the exchange (DEM) and registry (MDM) services.
//!
//! # Usage
//!
//! ```
//! dex providers add restcountries https://restcountries.com/v3.1/all
//! dex sync
//! dex countries list --region Europe
//! dex --config ~/.config/dex/cli.toml countries pull
//! ```
//!
//! Every command prints the service's JSON answer to stdout.

mod client;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use client::ApiClient;
use serde::Deserialize;
use serde_json::{Value, json};
use uuid::Uuid;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "dex", about = "Operate the dex exchange and registry services")]
struct Args {
  /// Path to a TOML config file (dem_url, mdm_url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the exchange service (default: http://localhost:8000).
  #[arg(long, env = "DEX_DEM_URL")]
  dem_url: Option<String>,

  /// Base URL of the registry service (default: http://localhost:8001).
  #[arg(long, env = "DEX_MDM_URL")]
  mdm_url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
  /// Manage registered providers.
  #[command(subcommand)]
  Providers(ProvidersCmd),
  /// Extract once from a source without registering it.
  Extract { name: String, url: String },
  /// Extract every registered provider.
  Sync,
  /// Show run provenance (exchange runs, or registry pull runs with --mdm).
  Runs {
    id:  Option<Uuid>,
    #[arg(long)]
    mdm: bool,
  },
  /// Query and maintain the registry.
  #[command(subcommand)]
  Countries(CountriesCmd),
}

#[derive(Subcommand, Debug, PartialEq)]
enum ProvidersCmd {
  List,
  /// Register a provider and extract from it immediately.
  Add { name: String, url: String },
  Remove { id: Uuid },
  /// Re-run extraction for a registered provider.
  Extract { id: Uuid },
}

#[derive(Subcommand, Debug, PartialEq)]
enum CountriesCmd {
  List(ListFilters),
  Get { cca3: String },
  /// Delete every country.
  Reset,
  /// Pull the exchange's latest processed batch into the registry.
  Pull,
}

#[derive(ClapArgs, Debug, PartialEq, Default)]
struct ListFilters {
  #[arg(long)]
  region: Option<String>,
  /// Case-insensitive substring of the name.
  #[arg(long)]
  name:   Option<String>,
  #[arg(long)]
  skip:   Option<usize>,
  #[arg(long)]
  limit:  Option<usize>,
}

impl ListFilters {
  fn query(&self) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(region) = &self.region {
      query.push(("region", region.clone()));
    }
    if let Some(name) = &self.name {
      query.push(("name", name.clone()));
    }
    if let Some(skip) = self.skip {
      query.push(("skip", skip.to_string()));
    }
    if let Some(limit) = self.limit {
      query.push(("limit", limit.to_string()));
    }
    query
  }
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
  #[serde(default)]
  dem_url: String,
  #[serde(default)]
  mdm_url: String,
}

/// Flag (or env) beats file, file beats the default.
fn resolve(flag: Option<String>, file: &str, default: &str) -> String {
  flag
    .or_else(|| (!file.is_empty()).then(|| file.to_owned()))
    .unwrap_or_else(|| default.to_owned())
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let dem = ApiClient::new(resolve(args.dem_url, &file_cfg.dem_url, "http://localhost:8000"))?;
  let mdm = ApiClient::new(resolve(args.mdm_url, &file_cfg.mdm_url, "http://localhost:8001"))?;

  let output = run(args.command, &dem, &mdm).await?;
  if !output.is_null() {
    println!("{}", serde_json::to_string_pretty(&output)?);
  }
  Ok(())
}

async fn run(command: Command, dem: &ApiClient, mdm: &ApiClient) -> Result<Value> {
  match command {
    Command::Providers(cmd) => match cmd {
      ProvidersCmd::List => dem.get("/providers").await,
      ProvidersCmd::Add { name, url } => {
        dem.post("/providers", Some(&json!({ "name": name, "url": url }))).await
      }
      ProvidersCmd::Remove { id } => dem.delete(&format!("/providers/{id}")).await,
      ProvidersCmd::Extract { id } => dem.post(&format!("/providers/{id}/extract"), None).await,
    },
    Command::Extract { name, url } => {
      dem.post("/extract", Some(&json!({ "name": name, "url": url }))).await
    }
    Command::Sync => dem.post("/sync", None).await,
    Command::Runs { id, mdm: on_mdm } => {
      let client = if on_mdm { mdm } else { dem };
      match id {
        Some(id) => client.get(&format!("/runs/{id}")).await,
        None => client.get("/runs").await,
      }
    }
    Command::Countries(cmd) => match cmd {
      CountriesCmd::List(filters) => mdm.get_query("/countries", &filters.query()).await,
      CountriesCmd::Get { cca3 } => mdm.get(&format!("/countries/{cca3}")).await,
      CountriesCmd::Reset => mdm.delete("/countries").await,
      CountriesCmd::Pull => mdm.post("/sync", None).await,
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_beat_file_beats_default() {
    assert_eq!(resolve(Some("http://a".into()), "http://b", "http://c"), "http://a");
    assert_eq!(resolve(None, "http://b", "http://c"), "http://b");
    assert_eq!(resolve(None, "", "http://c"), "http://c");
  }

  #[test]
  fn parses_nested_subcommands() {
    let args = Args::try_parse_from([
      "dex",
      "--mdm-url",
      "http://mdm:8001",
      "countries",
      "list",
      "--region",
      "Europe",
      "--limit",
      "5",
    ])
    .unwrap();
    assert_eq!(args.mdm_url.as_deref(), Some("http://mdm:8001"));
    let Command::Countries(CountriesCmd::List(filters)) = args.command else {
      panic!("expected `countries list`");
    };
    assert_eq!(filters.query(), vec![("region", "Europe".to_owned()), ("limit", "5".to_owned())]);

    let args = Args::try_parse_from(["dex", "providers", "add", "rc", "http://src"]).unwrap();
    assert_eq!(
      args.command,
      Command::Providers(ProvidersCmd::Add { name: "rc".into(), url: "http://src".into() })
    );
  }

  #[test]
  fn config_file_fields_are_optional() {
    let cfg: ConfigFile = toml::from_str(r#"mdm_url = "http://mdm""#).unwrap();
    assert_eq!(cfg.mdm_url, "http://mdm");
    assert!(cfg.dem_url.is_empty());
  }
}
