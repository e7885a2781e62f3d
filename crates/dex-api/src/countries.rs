//! Handlers for `/countries` and the registry's pull-mode `/sync`.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use dex_core::{
  country::{CanonicalCountry, CountryQuery, Upsert},
  store::{CountryRegistry, RunLog},
};
use dex_pipeline::{Fetcher, ReconcileReport, RunResult};
use serde_json::json;

use crate::{RegistryState, error::ApiError};

fn validated(country: CanonicalCountry) -> Result<CanonicalCountry, ApiError> {
  country.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;
  Ok(country)
}

// ─── Collection ──────────────────────────────────────────────────────────────

/// `GET /countries[?region=..&name=..&skip=..&limit=..]`
pub async fn list<S: CountryRegistry>(
  State(store): State<Arc<S>>,
  Query(query): Query<CountryQuery>,
) -> Result<Json<Vec<CanonicalCountry>>, ApiError> {
  let countries = store.list_countries(&query).await.map_err(ApiError::store)?;
  Ok(Json(countries))
}

/// `POST /countries`: Create only.
pub async fn create<S: CountryRegistry>(
  State(store): State<Arc<S>>,
  Json(body): Json<CanonicalCountry>,
) -> Result<impl IntoResponse, ApiError> {
  let country = validated(body)?;
  if store.get_country(&country.cca3).await.map_err(ApiError::store)?.is_some() {
    return Err(ApiError::Conflict(format!("country {} already exists", country.cca3)));
  }
  let stored = store.upsert(country).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(stored.into_country())))
}

/// `DELETE /countries`: Remove every country.
pub async fn reset<S: CountryRegistry>(
  State(store): State<Arc<S>>,
) -> Result<impl IntoResponse, ApiError> {
  let deleted = store.reset_countries().await.map_err(ApiError::store)?;
  tracing::info!(deleted, "registry reset");
  Ok(Json(json!({ "deleted": deleted })))
}

// ─── Single country ──────────────────────────────────────────────────────────

/// `GET /countries/{cca3}`
pub async fn get_one<S: CountryRegistry>(
  State(store): State<Arc<S>>,
  Path(cca3): Path<String>,
) -> Result<Json<CanonicalCountry>, ApiError> {
  let country = store
    .get_country(&cca3)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("country {cca3} not found")))?;
  Ok(Json(country))
}

/// `PUT /countries/{cca3}`: Full replace. 201 when the code was new, 200 when
/// an existing row was overwritten.
pub async fn upsert<S: CountryRegistry>(
  State(store): State<Arc<S>>,
  Path(cca3): Path<String>,
  Json(body): Json<CanonicalCountry>,
) -> Result<impl IntoResponse, ApiError> {
  if body.cca3 != cca3 {
    return Err(ApiError::BadRequest(format!(
      "body cca3 {:?} does not match path {cca3:?}",
      body.cca3
    )));
  }
  let country = validated(body)?;
  let (status, stored) = match store.upsert(country).await.map_err(ApiError::store)? {
    Upsert::Inserted(c) => (StatusCode::CREATED, c),
    Upsert::Replaced(c) => (StatusCode::OK, c),
  };
  Ok((status, Json(stored)))
}

/// `DELETE /countries/{cca3}`
pub async fn delete_one<S: CountryRegistry>(
  State(store): State<Arc<S>>,
  Path(cca3): Path<String>,
) -> Result<StatusCode, ApiError> {
  if store.delete_country(&cca3).await.map_err(ApiError::store)? {
    Ok(StatusCode::NO_CONTENT)
  } else {
    Err(ApiError::NotFound(format!("country {cca3} not found")))
  }
}

// ─── Pull ────────────────────────────────────────────────────────────────────

/// `POST /sync`: Pull the upstream's latest processed batch and upsert it.
///
/// An unreachable or unusable upstream is a 502; the failed run is still in
/// `/runs`.
pub async fn pull<S, F>(
  State(state): State<RegistryState<S, F>>,
) -> Result<Json<ReconcileReport>, ApiError>
where
  S: CountryRegistry + RunLog,
  F: Fetcher,
{
  let report = state.pipeline.pull_and_reconcile(Arc::clone(&state.store)).await?;
  if let RunResult::Failure { run_id, error, .. } = &report.result {
    return Err(ApiError::Upstream(format!("pull run {run_id} failed: {error}")));
  }
  Ok(Json(report))
}
