//! Handlers for `/providers`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use dex_core::{
  provider::{NewProvider, Provider},
  store::{ProviderRegistry, RunLog},
};
use dex_pipeline::{Fetcher, RegistrySink, RunResult};
use serde::Serialize;
use uuid::Uuid;

use crate::{ExchangeState, error::ApiError};

pub(crate) fn require_complete(input: &NewProvider) -> Result<(), ApiError> {
  if input.is_complete() {
    Ok(())
  } else {
    Err(ApiError::BadRequest("both `name` and `url` are required".into()))
  }
}

/// `GET /providers`
pub async fn list<S: ProviderRegistry>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Provider>>, ApiError> {
  let providers = store.list_providers().await.map_err(ApiError::store)?;
  Ok(Json(providers))
}

#[derive(Debug, Serialize)]
pub struct Registered {
  pub provider: Provider,
  pub run:      RunResult,
}

/// `POST /providers`: Body: `{"name": "...", "url": "..."}`. Registers the
/// provider and extracts from it straight away.
pub async fn register<S, F, K>(
  State(state): State<ExchangeState<S, F, K>>,
  Json(body): Json<NewProvider>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProviderRegistry + RunLog,
  F: Fetcher,
  K: RegistrySink,
{
  require_complete(&body)?;
  let sink = state.sink()?;
  let (provider, run) = state
    .pipeline
    .register_and_extract(state.store.as_ref(), body, sink)
    .await?;
  Ok((StatusCode::CREATED, Json(Registered { provider, run })))
}

/// `GET /providers/{id}`
pub async fn get_one<S: ProviderRegistry>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Provider>, ApiError> {
  let provider = store
    .get_provider(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("provider {id} not found")))?;
  Ok(Json(provider))
}

/// `DELETE /providers/{id}`: Artifacts and run history are kept.
pub async fn delete_one<S: ProviderRegistry>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
  if store.delete_provider(id).await.map_err(ApiError::store)? {
    tracing::info!(provider_id = %id, "provider deleted");
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("provider {id} not found")))
  }
}

/// `POST /providers/{id}/extract`
pub async fn extract_one<S, F, K>(
  State(state): State<ExchangeState<S, F, K>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RunResult>, ApiError>
where
  S: ProviderRegistry + RunLog,
  F: Fetcher,
  K: RegistrySink,
{
  let provider = state
    .store
    .get_provider(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("provider {id} not found")))?;
  let sink = state.sink()?;
  let result = state.pipeline.extract_provider(&provider, sink).await?;
  Ok(Json(result))
}
