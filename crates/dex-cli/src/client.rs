//! Async HTTP client for the dex JSON APIs.

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Client for one service. Cheap to clone; the inner [`reqwest::Client`] is
/// `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(120))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, base_url: base_url.into() })
  }

  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.base_url.trim_end_matches('/'), path)
  }

  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self.client.request(method, self.url(path))
  }

  /// Send `req` and decode the JSON body. Non-2xx answers become errors
  /// carrying the server's `error` message.
  async fn send(&self, label: &str, req: RequestBuilder) -> Result<Value> {
    let resp = req.send().await.with_context(|| format!("{label} failed"))?;
    decode(label, resp).await
  }

  pub async fn get(&self, path: &str) -> Result<Value> {
    self.send(&format!("GET {path}"), self.request(Method::GET, path)).await
  }

  pub async fn get_query(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
    self.send(&format!("GET {path}"), self.request(Method::GET, path).query(query)).await
  }

  pub async fn post(&self, path: &str, body: Option<&Value>) -> Result<Value> {
    let req = self.request(Method::POST, path);
    let req = match body {
      Some(body) => req.json(body),
      None => req,
    };
    self.send(&format!("POST {path}"), req).await
  }

  pub async fn delete(&self, path: &str) -> Result<Value> {
    self.send(&format!("DELETE {path}"), self.request(Method::DELETE, path)).await
  }
}

async fn decode(label: &str, resp: Response) -> Result<Value> {
  let status = resp.status();
  let bytes = resp.bytes().await.with_context(|| format!("reading {label} response"))?;

  if !status.is_success() {
    return Err(anyhow!("{label} → {status}: {}", error_message(status, &bytes)));
  }
  if bytes.is_empty() {
    return Ok(Value::Null);
  }
  serde_json::from_slice(&bytes).with_context(|| format!("deserialising {label} response"))
}

/// The server's `error` field when the body is JSON, otherwise the body as
/// text, otherwise the status itself.
fn error_message(status: StatusCode, bytes: &[u8]) -> String {
  if let Ok(body) = serde_json::from_slice::<Value>(bytes)
    && let Some(message) = body.get("error").and_then(Value::as_str)
  {
    return message.to_owned();
  }
  let text = String::from_utf8_lossy(bytes);
  let text = text.trim();
  if text.is_empty() || text.starts_with('{') {
    status.to_string()
  } else {
    text.to_owned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_joins_without_double_slash() {
    let client = ApiClient::new("http://localhost:8000/").unwrap();
    assert_eq!(client.url("/providers"), "http://localhost:8000/providers");
  }

  #[test]
  fn error_message_prefers_json_then_text_then_status() {
    assert_eq!(
      error_message(StatusCode::CONFLICT, br#"{"error":"provider \"rc\" is already registered"}"#),
      r#"provider "rc" is already registered"#
    );
    assert_eq!(
      error_message(
        StatusCode::UNPROCESSABLE_ENTITY,
        b"Failed to deserialize the JSON body into the target type: missing field `url`",
      ),
      "Failed to deserialize the JSON body into the target type: missing field `url`"
    );
    assert_eq!(error_message(StatusCode::BAD_GATEWAY, b""), "502 Bad Gateway");
    assert_eq!(error_message(StatusCode::NOT_FOUND, br#"{"detail":"x"}"#), "404 Not Found");
  }
}
