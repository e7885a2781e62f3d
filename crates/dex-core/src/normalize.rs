//! The normalizer: raw provider records in, canonical countries and rejected
//! records out.
//!
//! Each record is decoded in isolation into an [`Outcome`]. A malformed record
//! never aborts the batch; it becomes a [`RejectedRecord`] carrying the reason
//! and the original payload. Both output lists preserve input order.
//!
//! Nothing in this module performs I/O.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::country::CanonicalCountry;

// ─── Reject taxonomy ─────────────────────────────────────────────────────────

/// Why a record was dropped from the clean batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
  MissingCca3,
  DuplicateCca3,
  MissingName,
  ProcessingError,
}

impl RejectReason {
  /// The tag used in logs and provenance samples.
  /// Must match the `rename_all = "snake_case"` serde tags above.
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::MissingCca3 => "missing_cca3",
      Self::DuplicateCca3 => "duplicate_cca3",
      Self::MissingName => "missing_name",
      Self::ProcessingError => "processing_error",
    }
  }
}

/// A record that did not make it into the clean batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
  pub reason:       RejectReason,
  /// The record exactly as received.
  pub raw:          Value,
  pub error_detail: Option<String>,
}

impl RejectedRecord {
  /// Short label recorded in provenance samples: the record's `cca3` when it
  /// has a usable one, otherwise the reason tag.
  pub fn sample(&self) -> String {
    match self.raw.get("cca3").and_then(Value::as_str) {
      Some(code) if !code.is_empty() => code.to_owned(),
      _ => self.reason.as_str().to_owned(),
    }
  }
}

// ─── Per-record outcome ──────────────────────────────────────────────────────

/// The result of decoding one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Clean(CanonicalCountry),
  Rejected(RejectedRecord),
}

/// A normalized batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Normalized {
  pub clean:    Vec<CanonicalCountry>,
  pub rejected: Vec<RejectedRecord>,
}

impl Normalized {
  /// Number of records that went in.
  pub fn total(&self) -> usize { self.clean.len() + self.rejected.len() }

  /// At most `n` sample labels of rejected records, in input order.
  pub fn rejected_samples(&self, n: usize) -> Vec<String> {
    self.rejected.iter().take(n).map(RejectedRecord::sample).collect()
  }

  fn push(&mut self, seen: &mut HashSet<String>, outcome: Outcome) {
    match outcome {
      Outcome::Clean(country) => {
        seen.insert(country.cca3.clone());
        self.clean.push(country);
      }
      Outcome::Rejected(rejected) => self.rejected.push(rejected),
    }
  }
}

/// Internal rejection before the raw payload is attached.
struct Reject {
  reason: RejectReason,
  detail: Option<String>,
}

impl Reject {
  fn new(reason: RejectReason) -> Self { Self { reason, detail: None } }

  fn processing(detail: impl Into<String>) -> Self {
    Self {
      reason: RejectReason::ProcessingError,
      detail: Some(detail.into()),
    }
  }

  fn into_record(self, raw: &Value) -> RejectedRecord {
    RejectedRecord {
      reason:       self.reason,
      raw:          raw.clone(),
      error_detail: self.detail,
    }
  }
}

fn finish(raw: &Value, result: Result<CanonicalCountry, Reject>) -> Outcome {
  match result {
    Ok(country) => Outcome::Clean(country),
    Err(reject) => Outcome::Rejected(reject.into_record(raw)),
  }
}

// ─── Provider records ────────────────────────────────────────────────────────

/// Normalize a batch of third-party country records.
///
/// Rules, per record in input order: missing `cca3` rejects; a `cca3` already
/// accepted earlier in the batch rejects (first occurrence wins); missing
/// `name.common` rejects; `capital` is coerced to a list; `population` and
/// `area` default to zero. Anything else that cannot be decoded rejects the
/// record as [`RejectReason::ProcessingError`].
pub fn normalize(batch: &[Value]) -> Normalized {
  let mut seen = HashSet::new();
  let mut out = Normalized::default();
  for raw in batch {
    let outcome = normalize_record(raw, &seen);
    out.push(&mut seen, outcome);
  }
  out
}

/// Decode a single provider record against the codes already accepted.
pub fn normalize_record(raw: &Value, seen: &HashSet<String>) -> Outcome {
  finish(raw, decode_provider_record(raw, seen))
}

fn decode_provider_record(
  raw: &Value,
  seen: &HashSet<String>,
) -> Result<CanonicalCountry, Reject> {
  let obj = raw.as_object().ok_or_else(|| {
    Reject::processing(format!("record is {}, not an object", json_kind(raw)))
  })?;

  let cca3 = match obj.get("cca3") {
    None | Some(Value::Null) => return Err(Reject::new(RejectReason::MissingCca3)),
    Some(Value::String(s)) if is_blank(s) => {
      return Err(Reject::new(RejectReason::MissingCca3));
    }
    Some(Value::String(s)) => s.clone(),
    Some(other) => {
      return Err(Reject::processing(format!(
        "cca3 must be a string, got {}",
        json_kind(other)
      )));
    }
  };

  if seen.contains(&cca3) {
    return Err(Reject::new(RejectReason::DuplicateCca3));
  }

  let name = match obj.get("name") {
    None | Some(Value::Null) => return Err(Reject::new(RejectReason::MissingName)),
    Some(Value::Object(name)) => match name.get("common") {
      None | Some(Value::Null) => return Err(Reject::new(RejectReason::MissingName)),
      Some(Value::String(s)) if is_blank(s) => {
        return Err(Reject::new(RejectReason::MissingName));
      }
      Some(Value::String(s)) => s.clone(),
      Some(other) => {
        return Err(Reject::processing(format!(
          "name.common must be a string, got {}",
          json_kind(other)
        )));
      }
    },
    Some(other) => {
      return Err(Reject::processing(format!(
        "name must be an object, got {}",
        json_kind(other)
      )));
    }
  };

  Ok(CanonicalCountry {
    cca3,
    name,
    region: optional_string(obj, "region")?,
    subregion: optional_string(obj, "subregion")?,
    population: population(obj.get("population"))?,
    area: area(obj.get("area"))?,
    capital: capital(obj.get("capital")),
  })
}

fn optional_string(
  obj: &Map<String, Value>,
  field: &str,
) -> Result<Option<String>, Reject> {
  match obj.get(field) {
    None | Some(Value::Null) => Ok(None),
    Some(Value::String(s)) => Ok(Some(s.clone())),
    Some(other) => Err(Reject::processing(format!(
      "{field} must be a string, got {}",
      json_kind(other)
    ))),
  }
}

fn population(value: Option<&Value>) -> Result<i64, Reject> {
  match value {
    None | Some(Value::Null) => Ok(0),
    Some(Value::Number(n)) => n
      .as_i64()
      .or_else(|| {
        n.as_f64()
          .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
          .map(|f| f as i64)
      })
      .ok_or_else(|| Reject::processing(format!("population {n} is not an integer"))),
    Some(other) => Err(Reject::processing(format!(
      "population must be a number, got {}",
      json_kind(other)
    ))),
  }
}

fn area(value: Option<&Value>) -> Result<f64, Reject> {
  match value {
    None | Some(Value::Null) => Ok(0.0),
    Some(Value::Number(n)) => n
      .as_f64()
      .ok_or_else(|| Reject::processing(format!("area {n} is not representable"))),
    Some(other) => Err(Reject::processing(format!(
      "area must be a number, got {}",
      json_kind(other)
    ))),
  }
}

/// `"Paris"` becomes `["Paris"]`, null or absent becomes `[]`. Any other
/// value is kept: list entries one for one, anything else as a one-entry list.
/// Entries that are not strings keep their compact JSON text.
fn capital(value: Option<&Value>) -> Vec<String> {
  match value {
    None | Some(Value::Null) => Vec::new(),
    Some(Value::Array(items)) => items.iter().map(capital_text).collect(),
    Some(other) => vec![capital_text(other)],
  }
}

fn capital_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

/// Whether a required text field counts as missing.
/// [`CanonicalCountry::validate`] applies the same rule.
pub fn is_blank(s: &str) -> bool { s.trim().is_empty() }

/// Article-qualified name of a JSON value's type, for error details.
pub fn json_kind(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

// ─── Canonical records ───────────────────────────────────────────────────────

/// Validate a batch that is already in canonical shape (e.g. pulled from a
/// sibling service's processed artifact), using the same reject taxonomy as
/// [`normalize`].
pub fn validate_canonical(batch: &[Value]) -> Normalized {
  let mut seen = HashSet::new();
  let mut out = Normalized::default();
  for raw in batch {
    let outcome = finish(raw, decode_canonical_record(raw, &seen));
    out.push(&mut seen, outcome);
  }
  out
}

fn decode_canonical_record(
  raw: &Value,
  seen: &HashSet<String>,
) -> Result<CanonicalCountry, Reject> {
  let blank = |field: &str| match raw.get(field) {
    None | Some(Value::Null) => true,
    Some(Value::String(s)) => is_blank(s),
    Some(_) => false,
  };

  if blank("cca3") {
    return Err(Reject::new(RejectReason::MissingCca3));
  }
  if let Some(code) = raw.get("cca3").and_then(Value::as_str)
    && seen.contains(code)
  {
    return Err(Reject::new(RejectReason::DuplicateCca3));
  }
  if blank("name") {
    return Err(Reject::new(RejectReason::MissingName));
  }

  serde_json::from_value::<CanonicalCountry>(raw.clone())
    .map_err(|e| Reject::processing(e.to_string()))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn reasons(n: &Normalized) -> Vec<RejectReason> {
    n.rejected.iter().map(|r| r.reason).collect()
  }

  #[test]
  fn brazil_batch_keeps_first_and_rejects_duplicate_and_missing_code() {
    let batch = vec![
      json!({
        "cca3": "BRA",
        "name": { "common": "Brazil" },
        "region": "Americas",
        "population": 210000000,
        "area": 8515770.0,
        "capital": "Brasília"
      }),
      json!({ "cca3": "BRA", "name": { "common": "Brazil-dup" } }),
      json!({ "name": { "common": "NoCode" } }),
    ];

    let out = normalize(&batch);

    assert_eq!(out.clean, vec![CanonicalCountry {
      cca3:       "BRA".into(),
      name:       "Brazil".into(),
      region:     Some("Americas".into()),
      subregion:  None,
      population: 210_000_000,
      area:       8_515_770.0,
      capital:    vec!["Brasília".into()],
    }]);
    assert_eq!(reasons(&out), vec![
      RejectReason::DuplicateCca3,
      RejectReason::MissingCca3,
    ]);
    assert_eq!(out.rejected[0].raw, batch[1]);
  }

  #[test]
  fn capital_coercion() {
    let batch = vec![
      json!({ "cca3": "FRA", "name": { "common": "France" }, "capital": "Paris" }),
      json!({ "cca3": "DEU", "name": { "common": "Germany" }, "capital": null }),
      json!({ "cca3": "ESP", "name": { "common": "Spain" } }),
      json!({ "cca3": "ZAF", "name": { "common": "South Africa" },
              "capital": ["Pretoria", "Bloemfontein", "Cape Town"] }),
      json!({ "cca3": "XNU", "name": { "common": "Numeric" }, "capital": 42 }),
      json!({ "cca3": "XBO", "name": { "common": "Boolean" }, "capital": true }),
      json!({ "cca3": "BEL", "name": { "common": "Belgium" },
              "capital": { "city": "Brussels" } }),
      json!({ "cca3": "XNL", "name": { "common": "Gaps" }, "capital": ["Paris", null] }),
      json!({ "cca3": "XMX", "name": { "common": "Mixed" },
              "capital": [1, ["a"], { "b": 2 }] }),
      json!({ "cca3": "XEM", "name": { "common": "Empty" }, "capital": [] }),
    ];

    let out = normalize(&batch);
    assert!(out.rejected.is_empty());
    let capitals: Vec<_> = out.clean.iter().map(|c| c.capital.clone()).collect();

    assert_eq!(capitals, vec![
      vec!["Paris".to_string()],
      vec![],
      vec![],
      vec!["Pretoria".into(), "Bloemfontein".into(), "Cape Town".into()],
      vec!["42".into()],
      vec!["true".into()],
      vec![r#"{"city":"Brussels"}"#.into()],
      vec!["Paris".into(), "null".into()],
      vec!["1".into(), r#"["a"]"#.into(), r#"{"b":2}"#.into()],
      vec![],
    ]);
  }

  #[test]
  fn defaults_for_absent_numeric_fields() {
    let out = normalize(&[json!({ "cca3": "ATA", "name": { "common": "Antarctica" } })]);
    let c = &out.clean[0];
    assert_eq!(c.population, 0);
    assert_eq!(c.area, 0.0);
    assert_eq!(c.region, None);
    assert_eq!(c.subregion, None);
  }

  #[test]
  fn missing_or_empty_name_rejects() {
    let out = normalize(&[
      json!({ "cca3": "AAA" }),
      json!({ "cca3": "BBB", "name": {} }),
      json!({ "cca3": "CCC", "name": { "common": "" } }),
      json!({ "cca3": "DDD", "name": null }),
      json!({ "cca3": "BLK", "name": { "common": "   " } }),
    ]);
    assert!(out.clean.is_empty());
    assert!(reasons(&out).iter().all(|r| *r == RejectReason::MissingName));
    assert_eq!(out.rejected.len(), 5);
  }

  #[test]
  fn empty_code_counts_as_missing() {
    let out = normalize(&[
      json!({ "cca3": "", "name": { "common": "Blank" } }),
      json!({ "cca3": " \t", "name": { "common": "Whitespace" } }),
    ]);
    assert_eq!(reasons(&out), vec![
      RejectReason::MissingCca3,
      RejectReason::MissingCca3,
    ]);
  }

  #[test]
  fn clean_records_pass_registry_validation() {
    let out = normalize(&[
      json!({ "cca3": "FRA", "name": { "common": "France" } }),
      json!({ "cca3": "BLK", "name": { "common": "   " } }),
      json!({ "cca3": "  ", "name": { "common": "Spaces" } }),
      json!({ "cca3": "NOR", "name": { "common": " Norway " } }),
    ]);
    assert_eq!(out.clean.len(), 2);
    for country in &out.clean {
      assert!(country.validate().is_ok(), "{country:?}");
    }
  }

  #[test]
  fn rejected_name_does_not_reserve_its_code() {
    let out = normalize(&[
      json!({ "cca3": "ITA" }),
      json!({ "cca3": "ITA", "name": { "common": "Italy" } }),
    ]);
    assert_eq!(out.clean.len(), 1);
    assert_eq!(out.clean[0].name, "Italy");
    assert_eq!(reasons(&out), vec![RejectReason::MissingName]);
  }

  #[test]
  fn malformed_records_are_isolated() {
    let batch = vec![
      json!("not a record"),
      json!({ "cca3": "PRT", "name": "Portugal" }),
      json!({ "cca3": "NLD", "name": { "common": "Netherlands" }, "population": "lots" }),
      json!({ "cca3": 7, "name": { "common": "Seven" } }),
      json!({ "cca3": "BEL", "name": { "common": "Belgium" }, "area": [30689] }),
      json!({ "cca3": "LUX", "name": { "common": "Luxembourg" }, "population": 660000 }),
    ];

    let out = normalize(&batch);

    assert_eq!(out.clean.len(), 1);
    assert_eq!(out.clean[0].cca3, "LUX");
    assert_eq!(out.rejected.len(), 5);
    for rejected in &out.rejected {
      assert_eq!(rejected.reason, RejectReason::ProcessingError);
      assert!(rejected.error_detail.as_deref().is_some_and(|d| !d.is_empty()));
    }
  }

  #[test]
  fn integral_float_population_is_accepted() {
    let out = normalize(&[
      json!({ "cca3": "ISL", "name": { "common": "Iceland" }, "population": 372520.0 }),
      json!({ "cca3": "MLT", "name": { "common": "Malta" }, "population": 1.5 }),
    ]);
    assert_eq!(out.clean[0].population, 372_520);
    assert_eq!(reasons(&out), vec![RejectReason::ProcessingError]);
  }

  #[test]
  fn every_record_is_accounted_for_and_codes_are_unique() {
    let batch = vec![
      json!({ "cca3": "ARG", "name": { "common": "Argentina" } }),
      json!({ "cca3": "ARG", "name": { "common": "Argentina" } }),
      json!({ "cca3": "CHL", "name": { "common": "Chile" } }),
      json!(null),
      json!({ "name": { "common": "Nowhere" } }),
      json!({ "cca3": "CHL" }),
      json!({ "cca3": "PER", "name": { "common": "Peru" } }),
      json!([1, 2, 3]),
    ];

    let out = normalize(&batch);

    assert_eq!(out.total(), batch.len());
    let codes: HashSet<_> = out.clean.iter().map(|c| c.cca3.as_str()).collect();
    assert_eq!(codes.len(), out.clean.len());
    let order: Vec<_> = out.clean.iter().map(|c| c.cca3.as_str()).collect();
    assert_eq!(order, vec!["ARG", "CHL", "PER"]);
  }

  #[test]
  fn normalize_is_deterministic() {
    let batch = vec![
      json!({ "cca3": "JPN", "name": { "common": "Japan" }, "capital": "Tokyo" }),
      json!({ "cca3": "JPN", "name": { "common": "Japan" } }),
    ];
    assert_eq!(normalize(&batch), normalize(&batch));
  }

  #[test]
  fn samples_prefer_codes_and_are_capped() {
    let batch: Vec<_> = (0..8)
      .map(|i| {
        if i % 2 == 0 {
          json!({ "name": { "common": "x" } })
        } else {
          json!({ "cca3": format!("X{i:02}") })
        }
      })
      .collect();

    let out = normalize(&batch);
    assert_eq!(out.rejected_samples(5), vec![
      "missing_cca3", "X01", "missing_cca3", "X03", "missing_cca3",
    ]);
  }

  #[test]
  fn canonical_validation_uses_the_same_taxonomy() {
    let batch = vec![
      json!({ "cca3": "BRA", "name": "Brazil", "region": "Americas", "subregion": null,
              "population": 1, "area": 2.0, "capital": ["Brasília"] }),
      json!({ "cca3": "BRA", "name": "Brazil again" }),
      json!({ "name": "No code" }),
      json!({ "cca3": "XYZ", "name": "" }),
      json!({ "cca3": "BAD", "name": "Bad", "population": "many" }),
    ];

    let out = validate_canonical(&batch);

    assert_eq!(out.clean.len(), 1);
    assert_eq!(out.clean[0].capital, vec!["Brasília".to_string()]);
    assert_eq!(reasons(&out), vec![
      RejectReason::DuplicateCca3,
      RejectReason::MissingCca3,
      RejectReason::MissingName,
      RejectReason::ProcessingError,
    ]);
  }
}
