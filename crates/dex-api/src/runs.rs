//! Handlers for the provenance log, shared by both services.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/runs` | Newest first |
//! | `GET`  | `/runs/{id}` | 404 if not found |
//! | `GET`  | `/processed/latest` | DEM only; 404 until a run succeeds |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use dex_core::{country::CanonicalCountry, provenance::ProvenanceEntry, store::RunLog};
use dex_pipeline::ArtifactStore;
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /runs`
pub async fn list<S: RunLog>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<ProvenanceEntry>>, ApiError> {
  let runs = store.list_runs().await.map_err(ApiError::store)?;
  Ok(Json(runs))
}

/// `GET /runs/{id}`
pub async fn get_one<S: RunLog>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ProvenanceEntry>, ApiError> {
  let run = store
    .get_run(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("run {id} not found")))?;
  Ok(Json(run))
}

/// `GET /processed/latest`: The clean batch written by the newest successful
/// run.
pub async fn latest_processed<S: RunLog>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<CanonicalCountry>>, ApiError> {
  let artifact = store
    .latest_successful_run()
    .await
    .map_err(ApiError::store)?
    .and_then(|run| run.processed_artifact_ref)
    .ok_or_else(|| ApiError::NotFound("no successful run has produced a batch yet".into()))?;
  let countries = ArtifactStore::read_processed(std::path::Path::new(&artifact)).await?;
  Ok(Json(countries))
}
