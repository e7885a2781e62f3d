//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings so that they sort
//! lexically. Lists (capitals, rejected samples) are stored as compact JSON.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use dex_core::{
  country::CanonicalCountry,
  provenance::{ProvenanceEntry, RunStatus},
  provider::Provider,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── String lists ────────────────────────────────────────────────────────────

pub fn encode_list(items: &[String]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Counts ──────────────────────────────────────────────────────────────────

// SQLite integers are signed; counts never approach the limit.
pub fn encode_count(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

pub fn decode_count(n: i64) -> u64 { u64::try_from(n).unwrap_or(0) }

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// Build a `%needle%` pattern for `LIKE ... ESCAPE '\'`.
pub fn contains_pattern(needle: &str) -> String {
  let mut pattern = String::with_capacity(needle.len() + 2);
  pattern.push('%');
  for ch in needle.chars() {
    if matches!(ch, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(ch);
  }
  pattern.push('%');
  pattern
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const COUNTRY_COLUMNS: &str =
  "cca3, name, region, subregion, population, area, capital";

/// Raw values read directly from a `countries` row.
pub struct RawCountry {
  pub cca3:       String,
  pub name:       String,
  pub region:     Option<String>,
  pub subregion:  Option<String>,
  pub population: i64,
  pub area:       f64,
  pub capital:    String,
}

impl RawCountry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      cca3:       row.get(0)?,
      name:       row.get(1)?,
      region:     row.get(2)?,
      subregion:  row.get(3)?,
      population: row.get(4)?,
      area:       row.get(5)?,
      capital:    row.get(6)?,
    })
  }

  pub fn into_country(self) -> Result<CanonicalCountry> {
    Ok(CanonicalCountry {
      cca3:       self.cca3,
      name:       self.name,
      region:     self.region,
      subregion:  self.subregion,
      population: self.population,
      area:       self.area,
      capital:    decode_list(&self.capital)?,
    })
  }
}

pub const PROVIDER_COLUMNS: &str = "provider_id, name, url, created_at";

/// Raw strings read directly from a `providers` row.
pub struct RawProvider {
  pub provider_id: String,
  pub name:        String,
  pub url:         String,
  pub created_at:  String,
}

impl RawProvider {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      provider_id: row.get(0)?,
      name:        row.get(1)?,
      url:         row.get(2)?,
      created_at:  row.get(3)?,
    })
  }

  pub fn into_provider(self) -> Result<Provider> {
    Ok(Provider {
      id:         decode_uuid(&self.provider_id)?,
      name:       self.name,
      url:        self.url,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

pub const RUN_COLUMNS: &str = "run_id, provider_id, provider_name, status, log,
  raw_artifact_ref, processed_artifact_ref, processed_count, rejected_count,
  rejected_samples, created_at, updated_at";

/// Raw values read directly from a `runs` row.
pub struct RawRun {
  pub run_id:                 String,
  pub provider_id:            Option<String>,
  pub provider_name:          String,
  pub status:                 String,
  pub log:                    Option<String>,
  pub raw_artifact_ref:       Option<String>,
  pub processed_artifact_ref: Option<String>,
  pub processed_count:        i64,
  pub rejected_count:         i64,
  pub rejected_samples:       String,
  pub created_at:             String,
  pub updated_at:             String,
}

impl RawRun {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      run_id:                 row.get(0)?,
      provider_id:            row.get(1)?,
      provider_name:          row.get(2)?,
      status:                 row.get(3)?,
      log:                    row.get(4)?,
      raw_artifact_ref:       row.get(5)?,
      processed_artifact_ref: row.get(6)?,
      processed_count:        row.get(7)?,
      rejected_count:         row.get(8)?,
      rejected_samples:       row.get(9)?,
      created_at:             row.get(10)?,
      updated_at:             row.get(11)?,
    })
  }

  pub fn into_entry(self) -> Result<ProvenanceEntry> {
    Ok(ProvenanceEntry {
      id:                     decode_uuid(&self.run_id)?,
      provider_id:            self.provider_id.as_deref().map(decode_uuid).transpose()?,
      provider_name:          self.provider_name,
      status:                 self.status.parse::<RunStatus>()?,
      log:                    self.log,
      raw_artifact_ref:       self.raw_artifact_ref,
      processed_artifact_ref: self.processed_artifact_ref,
      processed_count:        decode_count(self.processed_count),
      rejected_count:         decode_count(self.rejected_count),
      rejected_samples:       decode_list(&self.rejected_samples)?,
      created_at:             decode_dt(&self.created_at)?,
      updated_at:             decode_dt(&self.updated_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn like_pattern_escapes_wildcards() {
    assert_eq!(contains_pattern("bra"), "%bra%");
    assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
  }

  #[test]
  fn timestamps_are_fixed_width() {
    let a = encode_dt(DateTime::parse_from_rfc3339("2024-01-01T00:00:05Z").unwrap().into());
    let b = encode_dt(
      DateTime::parse_from_rfc3339("2024-01-01T00:00:05.120Z").unwrap().into(),
    );
    assert_eq!(a.len(), b.len());
    assert!(a < b);
    assert_eq!(decode_dt(&b).unwrap().timestamp_subsec_micros(), 120_000);
  }
}
