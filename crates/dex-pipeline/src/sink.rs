//! Where clean records go after a run has snapshotted them.
//!
//! A push never fails the run. Each record yields a [`PushOutcome`] and the
//! run reports the tally.

use std::{future::Future, sync::Arc, time::Duration};

use dex_core::{country::CanonicalCountry, store::CountryRegistry};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use tracing::warn;

use crate::{Error, PipelineConfig, Result};

// ─── Outcomes ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
  Inserted,
  /// The registry already held this code; its row now matches the record.
  AlreadyExists,
  Failed(String),
}

/// Per-run tally of push outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PushCounts {
  pub inserted:       u64,
  pub already_exists: u64,
  pub failed:         u64,
}

impl PushCounts {
  pub fn record(&mut self, outcome: &PushOutcome) {
    match outcome {
      PushOutcome::Inserted => self.inserted += 1,
      PushOutcome::AlreadyExists => self.already_exists += 1,
      PushOutcome::Failed(_) => self.failed += 1,
    }
  }
}

impl std::fmt::Display for PushCounts {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(
      f,
      "{} inserted, {} already existed, {} failed",
      self.inserted, self.already_exists, self.failed
    )
  }
}

// ─── Sink trait ──────────────────────────────────────────────────────────────

pub trait RegistrySink: Send + Sync {
  fn push<'a>(
    &'a self,
    country: &'a CanonicalCountry,
  ) -> impl Future<Output = PushOutcome> + Send + 'a;
}

// ─── Remote registry ─────────────────────────────────────────────────────────

/// Pushes records to a registry service with `PUT {base}/countries/{cca3}`.
///
/// `201` means the record was created; `200` (replaced) and `409` both count
/// as already present.
#[derive(Debug, Clone)]
pub struct RemoteRegistry {
  client: Client,
  base:   Url,
}

impl RemoteRegistry {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
    let base = Url::parse(base_url)
      .map_err(|e| Error::Config(format!("invalid registry url {base_url:?}: {e}")))?;
    if base.cannot_be_a_base() {
      return Err(Error::Config(format!("registry url {base_url:?} cannot be a base")));
    }
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client, base })
  }

  /// Fails with [`Error::Config`] when no registry URL is configured.
  pub fn from_config(config: &PipelineConfig) -> Result<Self> {
    Self::new(config.registry_url()?, config.fetch_timeout())
  }

  fn country_url(&self, cca3: &str) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
      segments.pop_if_empty().push("countries").push(cca3);
    }
    url
  }
}

impl RegistrySink for RemoteRegistry {
  async fn push<'a>(&'a self, country: &'a CanonicalCountry) -> PushOutcome {
    let url = self.country_url(&country.cca3);
    let outcome = match self.client.put(url).json(country).send().await {
      Ok(resp) => match resp.status() {
        StatusCode::CREATED => PushOutcome::Inserted,
        StatusCode::OK | StatusCode::CONFLICT => PushOutcome::AlreadyExists,
        status => PushOutcome::Failed(format!("registry answered {status}")),
      },
      Err(e) => PushOutcome::Failed(e.to_string()),
    };
    if let PushOutcome::Failed(reason) = &outcome {
      warn!(cca3 = %country.cca3, %reason, "push failed");
    }
    outcome
  }
}

// ─── Local registry ──────────────────────────────────────────────────────────

/// Upserts records straight into a registry store in this process.
pub struct LocalRegistry<R> {
  store: Arc<R>,
}

impl<R> LocalRegistry<R> {
  pub fn new(store: Arc<R>) -> Self { Self { store } }
}

impl<R> Clone for LocalRegistry<R> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<R: CountryRegistry> RegistrySink for LocalRegistry<R> {
  async fn push<'a>(&'a self, country: &'a CanonicalCountry) -> PushOutcome {
    if let Err(e) = country.validate() {
      return PushOutcome::Failed(e.to_string());
    }
    match self.store.upsert(country.clone()).await {
      Ok(done) if done.is_insert() => PushOutcome::Inserted,
      Ok(_) => PushOutcome::AlreadyExists,
      Err(e) => {
        warn!(cca3 = %country.cca3, error = %e, "local upsert failed");
        PushOutcome::Failed(e.to_string())
      }
    }
  }
}
