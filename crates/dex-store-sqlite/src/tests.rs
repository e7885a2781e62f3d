//! Integration tests for `SqliteStore` against an in-memory database.

use dex_core::{
  country::{CanonicalCountry, CountryQuery, Upsert},
  provenance::{NewRun, RunOutcome, RunStatus},
  provider::{NewProvider, Provider, Registration},
  store::{CountryRegistry, ProviderRegistry, RunLog},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn register(s: &SqliteStore, name: &str, url: &str) -> Provider {
  match s.add_provider(NewProvider::new(name, url)).await.unwrap() {
    Registration::Added(p) => p,
    Registration::NameTaken(n) => panic!("name {n:?} unexpectedly taken"),
  }
}

fn country(cca3: &str, name: &str, region: Option<&str>) -> CanonicalCountry {
  CanonicalCountry {
    cca3:       cca3.into(),
    name:       name.into(),
    region:     region.map(Into::into),
    subregion:  None,
    population: 0,
    area:       0.0,
    capital:    vec![],
  }
}

fn brazil() -> CanonicalCountry {
  CanonicalCountry {
    cca3:       "BRA".into(),
    name:       "Brazil".into(),
    region:     Some("Americas".into()),
    subregion:  Some("South America".into()),
    population: 210_000_000,
    area:       8_515_770.0,
    capital:    vec!["Brasília".into()],
  }
}

// ─── Countries ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_inserts_then_replaces() {
  let s = store().await;

  let first = s.upsert(brazil()).await.unwrap();
  assert!(first.is_insert());

  let second = s.upsert(brazil()).await.unwrap();
  assert_eq!(second, Upsert::Replaced(brazil()));
}

#[tokio::test]
async fn upsert_is_idempotent() {
  let s = store().await;

  s.upsert(brazil()).await.unwrap();
  s.upsert(brazil()).await.unwrap();

  let all = s.list_countries(&CountryQuery::default()).await.unwrap();
  assert_eq!(all, vec![brazil()]);
}

#[tokio::test]
async fn upsert_fully_replaces_optional_fields() {
  let s = store().await;
  s.upsert(brazil()).await.unwrap();

  let replacement = country("BRA", "Brasil", None);
  s.upsert(replacement.clone()).await.unwrap();

  let stored = s.get_country("BRA").await.unwrap().unwrap();
  assert_eq!(stored, replacement);
  assert_eq!(stored.region, None);
  assert_eq!(stored.subregion, None);
  assert!(stored.capital.is_empty());
  assert_eq!(stored.population, 0);
}

#[tokio::test]
async fn non_ascii_survives_storage() {
  let s = store().await;
  let mut c = country("ALA", "Åland Islands", Some("Europe"));
  c.capital = vec!["Mariehamn".into(), "Ålandsö".into()];
  s.upsert(c.clone()).await.unwrap();
  assert_eq!(s.get_country("ALA").await.unwrap(), Some(c));
}

#[tokio::test]
async fn get_country_missing_returns_none() {
  let s = store().await;
  assert!(s.get_country("XXX").await.unwrap().is_none());
}

#[tokio::test]
async fn list_filters_by_region_and_name() {
  let s = store().await;
  s.upsert(country("BRA", "Brazil", Some("Americas"))).await.unwrap();
  s.upsert(country("ARG", "Argentina", Some("Americas"))).await.unwrap();
  s.upsert(country("FRA", "France", Some("Europe"))).await.unwrap();
  s.upsert(country("GIB", "Gibraltar", Some("Europe"))).await.unwrap();

  let americas = s
    .list_countries(&CountryQuery { region: Some("Americas".into()), ..Default::default() })
    .await
    .unwrap();
  let codes: Vec<_> = americas.iter().map(|c| c.cca3.as_str()).collect();
  assert_eq!(codes, vec!["ARG", "BRA"]);

  // Region is an exact match.
  let partial = s
    .list_countries(&CountryQuery { region: Some("America".into()), ..Default::default() })
    .await
    .unwrap();
  assert!(partial.is_empty());

  // Name is a case-insensitive substring.
  let named = s
    .list_countries(&CountryQuery { name: Some("RA".into()), ..Default::default() })
    .await
    .unwrap();
  let codes: Vec<_> = named.iter().map(|c| c.cca3.as_str()).collect();
  assert_eq!(codes, vec!["BRA", "FRA", "GIB"]);

  let both = s
    .list_countries(&CountryQuery {
      region: Some("Europe".into()),
      name:   Some("fr".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(both.len(), 1);
  assert_eq!(both[0].cca3, "FRA");
}

#[tokio::test]
async fn name_filter_treats_wildcards_literally() {
  let s = store().await;
  s.upsert(country("AAA", "Plain", None)).await.unwrap();
  s.upsert(country("BBB", "Fifty_Fifty", None)).await.unwrap();

  let hits = s
    .list_countries(&CountryQuery { name: Some("_".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].cca3, "BBB");
}

#[tokio::test]
async fn list_paginates_with_skip_and_limit() {
  let s = store().await;
  for code in ["AAA", "BBB", "CCC", "DDD", "EEE"] {
    s.upsert(country(code, code, None)).await.unwrap();
  }

  let page = s
    .list_countries(&CountryQuery { skip: Some(1), limit: Some(2), ..Default::default() })
    .await
    .unwrap();
  let codes: Vec<_> = page.iter().map(|c| c.cca3.as_str()).collect();
  assert_eq!(codes, vec!["BBB", "CCC"]);
}

#[tokio::test]
async fn delete_and_reset() {
  let s = store().await;
  s.upsert(country("AAA", "A", None)).await.unwrap();
  s.upsert(country("BBB", "B", None)).await.unwrap();
  s.upsert(country("CCC", "C", None)).await.unwrap();

  assert!(s.delete_country("AAA").await.unwrap());
  assert!(!s.delete_country("AAA").await.unwrap());

  assert_eq!(s.reset_countries().await.unwrap(), 2);
  assert!(s.list_countries(&CountryQuery::default()).await.unwrap().is_empty());
}

// ─── Providers ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_list_providers() {
  let s = store().await;
  let a = register(&s, "restcountries", "https://restcountries.com/v3.1/all").await;
  let b = register(&s, "mirror", "http://mirror.local/all").await;

  let all = s.list_providers().await.unwrap();
  assert_eq!(all, vec![a.clone(), b]);

  assert_eq!(s.get_provider(a.id).await.unwrap(), Some(a));
  assert_eq!(s.get_provider(Uuid::new_v4()).await.unwrap(), None);
}

#[tokio::test]
async fn provider_names_are_unique() {
  let s = store().await;
  register(&s, "dup", "http://a").await;
  let again = s.add_provider(NewProvider::new("dup", "http://b")).await.unwrap();
  assert_eq!(again, Registration::NameTaken("dup".into()));
  assert_eq!(s.list_providers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_provider_keeps_run_history() {
  let s = store().await;
  let p = register(&s, "gone", "http://gone").await;
  let run = s
    .begin_run(NewRun { provider_id: Some(p.id), provider_name: p.name.clone() })
    .await
    .unwrap();

  assert!(s.delete_provider(p.id).await.unwrap());
  assert!(!s.delete_provider(p.id).await.unwrap());
  assert!(s.get_provider(p.id).await.unwrap().is_none());

  let kept = s.get_run(run.id).await.unwrap().unwrap();
  assert_eq!(kept.provider_id, Some(p.id));
  assert_eq!(kept.provider_name, "gone");
}

// ─── Runs ────────────────────────────────────────────────────────────────────

fn success(processed: u64, samples: Vec<String>) -> RunOutcome {
  RunOutcome {
    status:                 RunStatus::Success,
    log:                    Some("ok".into()),
    raw_artifact_ref:       Some("raw/x_raw.json".into()),
    processed_artifact_ref: Some("processed/x_processed.json".into()),
    processed_count:        processed,
    rejected_count:         samples.len() as u64,
    rejected_samples:       samples,
  }
}

#[tokio::test]
async fn run_lifecycle() {
  let s = store().await;
  let run = s
    .begin_run(NewRun { provider_id: None, provider_name: "adhoc".into() })
    .await
    .unwrap();
  assert_eq!(run.status, RunStatus::Running);

  let samples: Vec<String> = (0..7).map(|i| format!("X{i}")).collect();
  let done = s.finish_run(run.id, success(10, samples)).await.unwrap();

  assert_eq!(done.status, RunStatus::Success);
  assert_eq!(done.processed_count, 10);
  assert_eq!(done.rejected_count, 7);
  assert_eq!(done.rejected_samples.len(), 5);
  assert_eq!(done.created_at, run.created_at);
  assert!(done.updated_at >= done.created_at);
  assert_eq!(s.get_run(run.id).await.unwrap(), Some(done));
}

#[tokio::test]
async fn finished_run_cannot_be_finalized_again() {
  let s = store().await;
  let run = s
    .begin_run(NewRun { provider_id: None, provider_name: "once".into() })
    .await
    .unwrap();
  s.finish_run(run.id, RunOutcome::failure("unreachable", None)).await.unwrap();

  let err = s.finish_run(run.id, success(1, vec![])).await.unwrap_err();
  assert!(matches!(err, Error::RunAlreadyFinalized(id) if id == run.id));

  let stored = s.get_run(run.id).await.unwrap().unwrap();
  assert_eq!(stored.status, RunStatus::Failure);
  assert_eq!(stored.log.as_deref(), Some("unreachable"));
}

#[tokio::test]
async fn finish_unknown_run_is_not_found() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.finish_run(id, success(0, vec![])).await.unwrap_err();
  assert!(matches!(err, Error::RunNotFound(missing) if missing == id));
}

#[tokio::test]
async fn finish_with_running_status_is_rejected() {
  let s = store().await;
  let run = s
    .begin_run(NewRun { provider_id: None, provider_name: "p".into() })
    .await
    .unwrap();
  let mut outcome = success(0, vec![]);
  outcome.status = RunStatus::Running;
  assert!(matches!(
    s.finish_run(run.id, outcome).await.unwrap_err(),
    Error::Core(dex_core::Error::NonTerminalStatus(_))
  ));
}

#[tokio::test]
async fn runs_list_newest_first_and_latest_success() {
  let s = store().await;
  let mut ids = Vec::new();
  for name in ["first", "second", "third"] {
    let run = s
      .begin_run(NewRun { provider_id: None, provider_name: name.into() })
      .await
      .unwrap();
    ids.push(run.id);
  }
  s.finish_run(ids[0], success(1, vec![])).await.unwrap();
  s.finish_run(ids[1], success(2, vec![])).await.unwrap();
  s.finish_run(ids[2], RunOutcome::failure("boom", None)).await.unwrap();

  let names: Vec<_> = s
    .list_runs()
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.provider_name)
    .collect();
  assert_eq!(names, vec!["third", "second", "first"]);

  let latest = s.latest_successful_run().await.unwrap().unwrap();
  assert_eq!(latest.id, ids[1]);
}

#[tokio::test]
async fn no_successful_run_yields_none() {
  let s = store().await;
  assert!(s.latest_successful_run().await.unwrap().is_none());
}
