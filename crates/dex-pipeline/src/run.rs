//! The run engine shared by every orchestrator.

use std::{path::PathBuf, sync::Arc};

use dex_core::{
  normalize::{self, Normalized, json_kind},
  provenance::{MAX_REJECTED_SAMPLES, NewRun, RunOutcome, RunStatus},
  provider::Provider,
  store::RunLog,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
  ArtifactStore, Error, Fetcher, HttpFetcher, PipelineConfig, PushCounts, RegistrySink, Result,
  artifact,
};

// ─── Inputs ──────────────────────────────────────────────────────────────────

/// How a fetched batch is turned into canonical records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decode {
  /// Provider-shaped records, run through the normalizer.
  Provider,
  /// Records already in canonical shape, validated with the same taxonomy.
  Canonical,
}

impl Decode {
  pub fn apply(self, batch: &[Value]) -> Normalized {
    match self {
      Self::Provider => normalize::normalize(batch),
      Self::Canonical => normalize::validate_canonical(batch),
    }
  }
}

/// The source of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTarget {
  /// `None` for ad hoc extractions and pulls.
  pub provider_id:   Option<Uuid>,
  pub provider_name: String,
  pub url:           String,
}

impl RunTarget {
  pub fn adhoc(name: impl Into<String>, url: impl Into<String>) -> Self {
    Self { provider_id: None, provider_name: name.into(), url: url.into() }
  }

  pub fn provider(provider: &Provider) -> Self {
    Self {
      provider_id:   Some(provider.id),
      provider_name: provider.name.clone(),
      url:           provider.url.clone(),
    }
  }
}

// ─── Result ──────────────────────────────────────────────────────────────────

/// What a run reports to its caller. The same facts are in its provenance
/// entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunResult {
  Success {
    run_id:                 Uuid,
    provider_name:          String,
    detail:                 String,
    raw_artifact_ref:       String,
    processed_artifact_ref: String,
    processed_count:        u64,
    rejected_count:         u64,
    pushes:                 PushCounts,
  },
  Failure {
    run_id:        Uuid,
    provider_name: String,
    error:         String,
  },
}

impl RunResult {
  pub fn is_success(&self) -> bool { matches!(self, Self::Success { .. }) }

  pub fn run_id(&self) -> Uuid {
    match self {
      Self::Success { run_id, .. } | Self::Failure { run_id, .. } => *run_id,
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Runs extractions against a provenance log.
///
/// Cheap to share behind an `Arc`; holds no per-run state.
pub struct Pipeline<L, F = HttpFetcher> {
  log:       Arc<L>,
  fetcher:   F,
  artifacts: ArtifactStore,
  config:    PipelineConfig,
}

impl<L: RunLog> Pipeline<L, HttpFetcher> {
  /// A pipeline that fetches over HTTP with the configured timeout.
  pub fn new(log: Arc<L>, config: PipelineConfig) -> Result<Self> {
    let fetcher = HttpFetcher::new(config.fetch_timeout())?;
    Ok(Self::with_fetcher(log, fetcher, config))
  }
}

/// Artifacts written before a stage failed.
struct StageFailure {
  error:   Error,
  raw_ref: Option<String>,
}

struct Staged {
  raw_ref:       String,
  processed_ref: String,
  batch:         Normalized,
}

impl<L: RunLog, F: Fetcher> Pipeline<L, F> {
  pub fn with_fetcher(log: Arc<L>, fetcher: F, config: PipelineConfig) -> Self {
    let artifacts = ArtifactStore::from_config(&config);
    Self { log, fetcher, artifacts, config }
  }

  pub fn config(&self) -> &PipelineConfig { &self.config }

  /// Execute one run end to end and finalize its provenance entry.
  ///
  /// Source and artifact failures are reported as [`RunResult::Failure`];
  /// only provenance log errors come back as `Err`. If recording a success
  /// fails, the entry is finalized as a failure where the log allows it.
  #[instrument(
    skip(self, target, sink),
    fields(provider = %target.provider_name, url = %target.url)
  )]
  pub async fn run<K: RegistrySink>(
    &self,
    target: RunTarget,
    decode: Decode,
    sink: &K,
  ) -> Result<RunResult> {
    let entry = self
      .log
      .begin_run(NewRun {
        provider_id:   target.provider_id,
        provider_name: target.provider_name.clone(),
      })
      .await
      .map_err(Error::store)?;
    let run_id = entry.id;
    info!(%run_id, "run started");

    let stem = artifact::stem(&target.provider_name, entry.created_at);
    let staged = match self.stage(&target.url, decode, &stem).await {
      Ok(staged) => staged,
      Err(StageFailure { error, raw_ref }) => {
        let message = error.to_string();
        warn!(%run_id, error = %message, "run failed");
        self
          .log
          .finish_run(run_id, RunOutcome::failure(message.clone(), raw_ref))
          .await
          .map_err(Error::store)?;
        return Ok(RunResult::Failure {
          run_id,
          provider_name: target.provider_name,
          error: message,
        });
      }
    };

    let mut pushes = PushCounts::default();
    for country in &staged.batch.clean {
      pushes.record(&sink.push(country).await);
    }

    let processed_count = staged.batch.clean.len() as u64;
    let rejected_count = staged.batch.rejected.len() as u64;
    let detail = format!(
      "fetched {} records: {processed_count} processed, {rejected_count} rejected; pushes: {pushes}",
      staged.batch.total(),
    );
    info!(%run_id, processed_count, rejected_count, pushed = %pushes, "run succeeded");

    let recorded = self
      .log
      .finish_run(run_id, RunOutcome {
        status:                 RunStatus::Success,
        log:                    Some(detail.clone()),
        raw_artifact_ref:       Some(staged.raw_ref.clone()),
        processed_artifact_ref: Some(staged.processed_ref.clone()),
        processed_count,
        rejected_count,
        rejected_samples:       staged.batch.rejected_samples(MAX_REJECTED_SAMPLES),
      })
      .await;
    if let Err(e) = recorded {
      let error = Error::store(e);
      warn!(%run_id, %error, "recording run success failed");
      let fallback = RunOutcome::failure(
        format!("{detail}; recording success failed: {error}"),
        Some(staged.raw_ref.clone()),
      );
      if let Err(e) = self.log.finish_run(run_id, fallback).await {
        warn!(%run_id, error = %e, "run left unfinalized");
      }
      return Err(error);
    }

    Ok(RunResult::Success {
      run_id,
      provider_name: target.provider_name,
      detail,
      raw_artifact_ref: staged.raw_ref,
      processed_artifact_ref: staged.processed_ref,
      processed_count,
      rejected_count,
      pushes,
    })
  }

  /// Fetch, snapshot and decode. Nothing here touches the provenance log.
  async fn stage(
    &self,
    url: &str,
    decode: Decode,
    stem: &str,
  ) -> Result<Staged, StageFailure> {
    let failed = |raw_ref: Option<&PathBuf>| {
      let raw_ref = raw_ref.map(|p| p.display().to_string());
      move |error: Error| StageFailure { error, raw_ref }
    };

    let body = self.fetcher.fetch(url).await.map_err(failed(None))?;
    let raw_path = self.artifacts.write_raw(stem, &body).await.map_err(failed(None))?;
    debug!(path = %raw_path.display(), bytes = body.len(), "raw artifact written");

    let records = parse_batch(&body).map_err(failed(Some(&raw_path)))?;
    let batch = decode.apply(&records);
    for rejected in &batch.rejected {
      debug!(
        reason = rejected.reason.as_str(),
        sample = %rejected.sample(),
        detail = rejected.error_detail.as_deref().unwrap_or(""),
        "record rejected"
      );
    }

    let processed_path = self
      .artifacts
      .write_processed(stem, &batch.clean)
      .await
      .map_err(failed(Some(&raw_path)))?;
    debug!(path = %processed_path.display(), "processed artifact written");

    Ok(Staged {
      raw_ref: raw_path.display().to_string(),
      processed_ref: processed_path.display().to_string(),
      batch,
    })
  }
}

/// The payload must be a JSON array of records.
fn parse_batch(body: &[u8]) -> Result<Vec<Value>> {
  match serde_json::from_slice::<Value>(body) {
    Ok(Value::Array(records)) => Ok(records),
    Ok(other) => Err(Error::Payload(format!(
      "expected a JSON array of records, got {}",
      json_kind(&other)
    ))),
    Err(e) => Err(Error::Payload(format!("body is not valid JSON: {e}"))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn only_arrays_are_batches() {
    assert_eq!(parse_batch(b"[{\"cca3\":\"BRA\"}]").unwrap().len(), 1);
    assert!(matches!(parse_batch(b"{\"cca3\":\"BRA\"}"), Err(Error::Payload(m)) if m.contains("an object")));
    assert!(matches!(parse_batch(b"<html>"), Err(Error::Payload(_))));
  }

  #[test]
  fn result_serializes_with_outcome_tag() {
    let result = RunResult::Failure {
      run_id:        Uuid::nil(),
      provider_name: "p".into(),
      error:         "boom".into(),
    };
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["outcome"], "failure");
    assert_eq!(json["error"], "boom");
    assert!(!result.is_success());
  }
}
