//! Handlers for ad hoc extraction and fan-out sync.

use axum::{Json, extract::State};
use dex_core::{
  provider::NewProvider,
  store::{ProviderRegistry, RunLog},
};
use dex_pipeline::{Fetcher, RegistrySink, RunResult, SyncReport};

use crate::{ExchangeState, error::ApiError, providers::require_complete};

/// `POST /extract`: Body: `{"name": "...", "url": "..."}`. Nothing is
/// registered; the run is recorded without a provider id.
pub async fn adhoc<S, F, K>(
  State(state): State<ExchangeState<S, F, K>>,
  Json(body): Json<NewProvider>,
) -> Result<Json<RunResult>, ApiError>
where
  S: ProviderRegistry + RunLog,
  F: Fetcher,
  K: RegistrySink,
{
  require_complete(&body)?;
  let sink = state.sink()?;
  let result = state.pipeline.extract_without_registering(body, sink).await?;
  Ok(Json(result))
}

/// `POST /sync`: Extract every registered provider.
pub async fn sync<S, F, K>(
  State(state): State<ExchangeState<S, F, K>>,
) -> Result<Json<SyncReport>, ApiError>
where
  S: ProviderRegistry + RunLog,
  F: Fetcher,
  K: RegistrySink,
{
  let sink = state.sink()?;
  let report = state.pipeline.sync_providers(state.store.as_ref(), sink).await?;
  Ok(Json(report))
}
