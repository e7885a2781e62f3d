//! The canonical country record held by the registry.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, normalize::is_blank};

// ─── CanonicalCountry ────────────────────────────────────────────────────────

/// A country in the registry's canonical schema. `cca3` is the key: unique
/// within a normalized batch and within the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCountry {
  /// ISO 3166-1 alpha-3 code.
  pub cca3:       String,
  pub name:       String,
  pub region:     Option<String>,
  pub subregion:  Option<String>,
  #[serde(default)]
  pub population: i64,
  #[serde(default)]
  pub area:       f64,
  #[serde(default)]
  pub capital:    Vec<String>,
}

impl CanonicalCountry {
  /// Check the invariants the registry relies on.
  pub fn validate(&self) -> Result<()> {
    if is_blank(&self.cca3) {
      return Err(Error::InvalidCountry("cca3 must not be empty".into()));
    }
    if is_blank(&self.name) {
      return Err(Error::InvalidCountry(format!(
        "{}: name must not be empty",
        self.cca3
      )));
    }
    Ok(())
  }
}

// ─── Upsert result ───────────────────────────────────────────────────────────

/// What an upsert did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Upsert {
  /// No row with this key existed; one was created.
  Inserted(CanonicalCountry),
  /// An existing row was fully replaced.
  Replaced(CanonicalCountry),
}

impl Upsert {
  pub fn is_insert(&self) -> bool { matches!(self, Self::Inserted(_)) }

  pub fn into_country(self) -> CanonicalCountry {
    match self {
      Self::Inserted(c) | Self::Replaced(c) => c,
    }
  }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::CountryRegistry::list_countries`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountryQuery {
  /// Exact match on `region`.
  pub region: Option<String>,
  /// Case-insensitive substring match on `name`.
  pub name:   Option<String>,
  pub skip:   Option<usize>,
  pub limit:  Option<usize>,
}

impl CountryQuery {
  pub const DEFAULT_LIMIT: usize = 100;
}
