//! Extraction and sync orchestrators for dex.
//!
//! Every run goes through the same engine ([`Pipeline::run`]): fetch the
//! source, snapshot the raw bytes, decode the batch, snapshot the clean
//! records, push each record into a [`RegistrySink`], and finalize exactly one
//! provenance entry. Extraction, fan-out sync and pull-and-reconcile differ
//! only in the source, the decoder and the sink they hand to the engine.

#![allow(async_fn_in_trait)]

pub mod artifact;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod run;
pub mod sink;
pub mod sync;

pub use artifact::ArtifactStore;
pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use run::{Decode, Pipeline, RunResult, RunTarget};
pub use sink::{LocalRegistry, PushCounts, PushOutcome, RegistrySink, RemoteRegistry};
pub use sync::{ProviderError, ReconcileReport, SyncReport, UPSTREAM_PROVIDER};
