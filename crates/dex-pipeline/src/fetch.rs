//! Fetching source payloads.

use std::{future::Future, time::Duration};

use bytes::Bytes;
use reqwest::Client;

use crate::{Error, Result};

/// Retrieves the body at a URL.
///
/// Any transport error, timeout or non-2xx status is a fetch failure; the
/// body of an error response is never treated as data.
pub trait Fetcher: Send + Sync {
  fn fetch<'a>(&'a self, url: &'a str) -> impl Future<Output = Result<Bytes>> + Send + 'a;
}

/// [`Fetcher`] backed by a shared [`reqwest::Client`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
  client: Client,
}

impl HttpFetcher {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
    Ok(Self { client })
  }
}

impl Fetcher for HttpFetcher {
  async fn fetch<'a>(&'a self, url: &'a str) -> Result<Bytes> {
    let failed = |e: reqwest::Error| Error::Fetch { url: url.to_owned(), message: e.to_string() };
    let resp = self
      .client
      .get(url)
      .send()
      .await
      .map_err(failed)?
      .error_for_status()
      .map_err(failed)?;
    resp.bytes().await.map_err(failed)
  }
}
