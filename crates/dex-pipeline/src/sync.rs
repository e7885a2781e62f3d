//! Sync: fan-out over registered providers, and pull-and-reconcile from a
//! sibling service.

use std::sync::Arc;

use dex_core::store::{CountryRegistry, ProviderRegistry, RunLog};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
  Decode, Error, Fetcher, LocalRegistry, Pipeline, RegistrySink, Result, RunResult, RunTarget,
};

/// Provider name recorded for pull-mode runs.
pub const UPSTREAM_PROVIDER: &str = "upstream";

/// Outcome of a fan-out sync. Every provider lands in exactly one of `runs`
/// and `errors`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncReport {
  pub providers: usize,
  pub succeeded: usize,
  pub failed:    usize,
  pub runs:      Vec<RunResult>,
  /// Providers whose run could not be recorded in the provenance log.
  pub errors:    Vec<ProviderError>,
}

/// A provider the fan-out could not produce a [`RunResult`] for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderError {
  pub provider_name: String,
  pub error:         String,
}

/// Outcome of a pull-and-reconcile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileReport {
  /// Records upserted into the local registry.
  pub reconciled: u64,
  /// Records that failed validation or whose upsert failed.
  pub skipped:    u64,
  pub result:     RunResult,
}

impl<L: RunLog, F: Fetcher> Pipeline<L, F> {
  /// Extract every registered provider in turn. A provider whose run fails
  /// still gets its own failed provenance entry and never stops the others,
  /// even when the provenance log itself errors for that provider.
  #[instrument(skip_all)]
  pub async fn sync_providers<P, K>(&self, providers: &P, sink: &K) -> Result<SyncReport>
  where
    P: ProviderRegistry,
    K: RegistrySink,
  {
    let all = providers.list_providers().await.map_err(Error::store)?;
    let mut report = SyncReport {
      providers: all.len(),
      succeeded: 0,
      failed:    0,
      runs:      Vec::with_capacity(all.len()),
      errors:    Vec::new(),
    };

    for provider in &all {
      match self.extract_provider(provider, sink).await {
        Ok(result) => {
          if result.is_success() {
            report.succeeded += 1;
          } else {
            report.failed += 1;
          }
          report.runs.push(result);
        }
        Err(error) => {
          warn!(provider = %provider.name, %error, "provider run not recorded");
          report.failed += 1;
          report.errors.push(ProviderError {
            provider_name: provider.name.clone(),
            error:         error.to_string(),
          });
        }
      }
    }

    info!(
      providers = report.providers,
      succeeded = report.succeeded,
      failed = report.failed,
      "sync finished"
    );
    Ok(report)
  }

  /// Pull the sibling service's latest processed batch and upsert every valid
  /// record into `registry`.
  ///
  /// Fails with [`Error::Config`] before any I/O when no upstream URL is set.
  #[instrument(skip_all)]
  pub async fn pull_and_reconcile<R>(&self, registry: Arc<R>) -> Result<ReconcileReport>
  where
    R: CountryRegistry,
  {
    let url = format!("{}/processed/latest", self.config().upstream_url()?.trim_end_matches('/'));
    let sink = LocalRegistry::new(registry);
    let result = self
      .run(RunTarget::adhoc(UPSTREAM_PROVIDER, url), Decode::Canonical, &sink)
      .await?;

    let (reconciled, skipped) = match &result {
      RunResult::Success { rejected_count, pushes, .. } => {
        (pushes.inserted + pushes.already_exists, rejected_count + pushes.failed)
      }
      RunResult::Failure { error, .. } => {
        warn!(%error, "pull failed");
        (0, 0)
      }
    };
    info!(reconciled, skipped, "reconcile finished");
    Ok(ReconcileReport { reconciled, skipped, result })
  }
}

