//! Shared state threaded through the handlers.

use std::sync::Arc;

use axum::extract::FromRef;
use dex_pipeline::{HttpFetcher, Pipeline, RemoteRegistry};

use crate::ApiError;

// ─── Registry (MDM) ──────────────────────────────────────────────────────────

pub struct RegistryState<S, F = HttpFetcher> {
  pub store:    Arc<S>,
  /// Runs pull-and-reconcile, recording into `store`.
  pub pipeline: Arc<Pipeline<S, F>>,
}

impl<S, F> Clone for RegistryState<S, F> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), pipeline: Arc::clone(&self.pipeline) }
  }
}

impl<S, F> FromRef<RegistryState<S, F>> for Arc<S> {
  fn from_ref(state: &RegistryState<S, F>) -> Self { Arc::clone(&state.store) }
}

// ─── Exchange (DEM) ──────────────────────────────────────────────────────────

pub struct ExchangeState<S, F = HttpFetcher, K = RemoteRegistry> {
  pub store:    Arc<S>,
  pub pipeline: Arc<Pipeline<S, F>>,
  /// Where extracted records are pushed. `None` when no registry URL is
  /// configured; extraction then fails with a configuration error.
  pub sink:     Option<Arc<K>>,
}

impl<S, F, K> ExchangeState<S, F, K> {
  pub(crate) fn sink(&self) -> Result<&K, ApiError> {
    self.sink.as_deref().ok_or_else(|| {
      ApiError::Config(
        "registry_url is not configured (set DEX_REGISTRY_URL or `registry_url` in the config \
         file)"
          .into(),
      )
    })
  }
}

impl<S, F, K> Clone for ExchangeState<S, F, K> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      pipeline: Arc::clone(&self.pipeline),
      sink:     self.sink.clone(),
    }
  }
}

impl<S, F, K> FromRef<ExchangeState<S, F, K>> for Arc<S> {
  fn from_ref(state: &ExchangeState<S, F, K>) -> Self { Arc::clone(&state.store) }
}
