//! Extraction: one source, one run.

use dex_core::{
  provider::{NewProvider, Provider, Registration},
  store::{ProviderRegistry, RunLog},
};
use tracing::{info, instrument};

use crate::{Decode, Error, Fetcher, Pipeline, RegistrySink, Result, RunResult, RunTarget};

fn require_complete(input: NewProvider) -> Result<NewProvider> {
  let input = NewProvider::new(input.name.trim(), input.url.trim());
  if input.is_complete() {
    Ok(input)
  } else {
    Err(Error::Invalid("both `name` and `url` are required".into()))
  }
}

impl<L: RunLog, F: Fetcher> Pipeline<L, F> {
  /// Run a one-off extraction for a source that is not registered. The run
  /// is still recorded, with no provider id.
  #[instrument(skip(self, input, sink), fields(provider = %input.name))]
  pub async fn extract_without_registering<K: RegistrySink>(
    &self,
    input: NewProvider,
    sink: &K,
  ) -> Result<RunResult> {
    let input = require_complete(input)?;
    self.run(RunTarget::adhoc(input.name, input.url), Decode::Provider, sink).await
  }

  /// Re-run extraction for a registered provider.
  pub async fn extract_provider<K: RegistrySink>(
    &self,
    provider: &Provider,
    sink: &K,
  ) -> Result<RunResult> {
    self.run(RunTarget::provider(provider), Decode::Provider, sink).await
  }

  /// Persist `input` as a provider, then extract from it immediately.
  ///
  /// A name that is already registered, including one taken by a concurrent
  /// registration, fails with [`Error::ProviderExists`] and nothing is
  /// fetched.
  #[instrument(skip(self, providers, input, sink), fields(provider = %input.name))]
  pub async fn register_and_extract<P, K>(
    &self,
    providers: &P,
    input: NewProvider,
    sink: &K,
  ) -> Result<(Provider, RunResult)>
  where
    P: ProviderRegistry,
    K: RegistrySink,
  {
    let input = require_complete(input)?;
    let provider = match providers.add_provider(input).await.map_err(Error::store)? {
      Registration::Added(provider) => provider,
      Registration::NameTaken(name) => return Err(Error::ProviderExists(name)),
    };
    info!(provider_id = %provider.id, "provider registered");
    let result = self.extract_provider(&provider, sink).await?;
    Ok((provider, result))
  }
}
