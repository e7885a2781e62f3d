//! Provider: a registered external source of country data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A named source URL subject to recurring extraction. Names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
  pub id:         Uuid,
  pub name:       String,
  pub url:        String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::ProviderRegistry::add_provider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProvider {
  pub name: String,
  pub url:  String,
}

impl NewProvider {
  pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
    Self { name: name.into(), url: url.into() }
  }

  /// Both fields must be non-blank.
  pub fn is_complete(&self) -> bool {
    !self.name.trim().is_empty() && !self.url.trim().is_empty()
  }
}

/// What [`crate::store::ProviderRegistry::add_provider`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
  Added(Provider),
  /// Another provider already holds this name. Nothing was written.
  NameTaken(String),
}
