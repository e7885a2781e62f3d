//! JSON HTTP surfaces for dex.
//!
//! Two routers, one per service:
//!
//! - [`registry_router`] serves the canonical country registry (MDM) and its
//!   pull-mode sync.
//! - [`exchange_router`] serves provider registration, extraction, fan-out
//!   sync and the latest processed batch (DEM).
//!
//! Both expose the provenance log under `/runs`. Transport concerns are the
//! caller's responsibility.

pub mod countries;
pub mod error;
pub mod extract;
pub mod providers;
pub mod runs;
pub mod state;

use axum::{
  Router,
  routing::{get, post},
};
use dex_core::store::{CountryRegistry, ProviderRegistry, RunLog};
use dex_pipeline::{Fetcher, RegistrySink};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::{ExchangeState, RegistryState};

/// Build the registry (MDM) router.
///
/// | Method | Path | Notes |
/// |--------|------|-------|
/// | `GET` | `/countries` | `?region&name&skip&limit` |
/// | `POST` | `/countries` | Create only; 409 if the code exists |
/// | `DELETE` | `/countries` | Bulk reset |
/// | `GET`/`PUT`/`DELETE` | `/countries/{cca3}` | PUT is a full-replace upsert |
/// | `POST` | `/sync` | Pull and reconcile from the upstream service |
/// | `GET` | `/runs`, `/runs/{id}` | Pull-run provenance |
pub fn registry_router<S, F>(state: RegistryState<S, F>) -> Router<()>
where
  S: CountryRegistry + RunLog + 'static,
  F: Fetcher + 'static,
{
  Router::new()
    .route(
      "/countries",
      get(countries::list::<S>)
        .post(countries::create::<S>)
        .delete(countries::reset::<S>),
    )
    .route(
      "/countries/{cca3}",
      get(countries::get_one::<S>)
        .put(countries::upsert::<S>)
        .delete(countries::delete_one::<S>),
    )
    .route("/sync", post(countries::pull::<S, F>))
    .route("/runs", get(runs::list::<S>))
    .route("/runs/{id}", get(runs::get_one::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Build the exchange (DEM) router.
///
/// | Method | Path | Notes |
/// |--------|------|-------|
/// | `GET`/`POST` | `/providers` | POST registers and extracts |
/// | `GET`/`DELETE` | `/providers/{id}` | Deleting keeps history |
/// | `POST` | `/providers/{id}/extract` | Re-run one provider |
/// | `POST` | `/extract` | Ad hoc extraction, nothing registered |
/// | `POST` | `/sync` | Fan out over every provider |
/// | `GET` | `/runs`, `/runs/{id}` | Provenance |
/// | `GET` | `/processed/latest` | Clean batch of the newest successful run |
pub fn exchange_router<S, F, K>(state: ExchangeState<S, F, K>) -> Router<()>
where
  S: ProviderRegistry + RunLog + 'static,
  F: Fetcher + 'static,
  K: RegistrySink + 'static,
{
  Router::new()
    .route(
      "/providers",
      get(providers::list::<S>).post(providers::register::<S, F, K>),
    )
    .route(
      "/providers/{id}",
      get(providers::get_one::<S>).delete(providers::delete_one::<S>),
    )
    .route("/providers/{id}/extract", post(providers::extract_one::<S, F, K>))
    .route("/extract", post(extract::adhoc::<S, F, K>))
    .route("/sync", post(extract::sync::<S, F, K>))
    .route("/runs", get(runs::list::<S>))
    .route("/runs/{id}", get(runs::get_one::<S>))
    .route("/processed/latest", get(runs::latest_processed::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
