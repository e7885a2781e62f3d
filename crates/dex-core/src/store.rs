//! Storage traits.
//!
//! The traits are implemented by storage backends (e.g. `dex-store-sqlite`).
//! The pipeline and the HTTP layer depend on these abstractions, not on any
//! concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use uuid::Uuid;

use crate::{
  country::{CanonicalCountry, CountryQuery, Upsert},
  provenance::{NewRun, ProvenanceEntry, RunOutcome},
  provider::{NewProvider, Provider, Registration},
};

// ─── Registry (MDM) ──────────────────────────────────────────────────────────

/// The canonical, queryable country registry.
pub trait CountryRegistry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert `country`, or fully replace the row with the same `cca3`.
  ///
  /// Every field is overwritten, including optional fields that are now
  /// absent. Repeating the call with identical input leaves the store
  /// unchanged.
  fn upsert(
    &self,
    country: CanonicalCountry,
  ) -> impl Future<Output = Result<Upsert, Self::Error>> + Send + '_;

  /// Retrieve a country by code. Returns `None` if not found.
  fn get_country<'a>(
    &'a self,
    cca3: &'a str,
  ) -> impl Future<Output = Result<Option<CanonicalCountry>, Self::Error>> + Send + 'a;

  /// List countries matching `query`, ordered by `cca3`.
  fn list_countries<'a>(
    &'a self,
    query: &'a CountryQuery,
  ) -> impl Future<Output = Result<Vec<CanonicalCountry>, Self::Error>> + Send + 'a;

  /// Delete one country. Returns `false` if it did not exist.
  fn delete_country<'a>(
    &'a self,
    cca3: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;

  /// Delete every country. Returns the number of rows removed.
  fn reset_countries(
    &self,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;
}

// ─── Providers (DEM) ─────────────────────────────────────────────────────────

/// Registered providers. Deleting a provider never touches its run history.
pub trait ProviderRegistry: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new provider. The name check and the insert are atomic; a
  /// taken name is reported as [`Registration::NameTaken`].
  fn add_provider(
    &self,
    input: NewProvider,
  ) -> impl Future<Output = Result<Registration, Self::Error>> + Send + '_;

  fn get_provider(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Provider>, Self::Error>> + Send + '_;

  /// All providers in registration order.
  fn list_providers(
    &self,
  ) -> impl Future<Output = Result<Vec<Provider>, Self::Error>> + Send + '_;

  /// Returns `false` if the provider did not exist.
  fn delete_provider(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Provenance log ──────────────────────────────────────────────────────────

/// Append-only record of runs.
pub trait RunLog: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Create an entry with status `running`.
  fn begin_run(
    &self,
    input: NewRun,
  ) -> impl Future<Output = Result<ProvenanceEntry, Self::Error>> + Send + '_;

  /// Write the terminal status and results of a run.
  ///
  /// Returns an error if the run does not exist, is already finalized, or if
  /// `outcome.status` is not terminal.
  fn finish_run(
    &self,
    id: Uuid,
    outcome: RunOutcome,
  ) -> impl Future<Output = Result<ProvenanceEntry, Self::Error>> + Send + '_;

  fn get_run(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ProvenanceEntry>, Self::Error>> + Send + '_;

  /// All runs, newest first.
  fn list_runs(
    &self,
  ) -> impl Future<Output = Result<Vec<ProvenanceEntry>, Self::Error>> + Send + '_;

  /// The newest successful run that produced a processed artifact.
  fn latest_successful_run(
    &self,
  ) -> impl Future<Output = Result<Option<ProvenanceEntry>, Self::Error>> + Send + '_;
}
