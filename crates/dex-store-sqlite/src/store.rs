//! [`SqliteStore`]: the SQLite implementation of the `dex-core` storage
//! traits.

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use dex_core::{
  country::{CanonicalCountry, CountryQuery, Upsert},
  provenance::{NewRun, ProvenanceEntry, RunOutcome, RunStatus},
  provider::{NewProvider, Provider, Registration},
  store::{CountryRegistry, ProviderRegistry, RunLog},
};

use crate::{
  encode::{
    COUNTRY_COLUMNS, PROVIDER_COLUMNS, RUN_COLUMNS, RawCountry, RawProvider, RawRun,
    contains_pattern, encode_count, encode_dt, encode_list, encode_uuid, now,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A dex store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn fetch_run(&self, id: Uuid) -> Result<Option<ProvenanceEntry>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawRun> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {RUN_COLUMNS} FROM runs WHERE run_id = ?1"),
            rusqlite::params![id_str],
            RawRun::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRun::into_entry).transpose()
  }
}

// ─── CountryRegistry impl ────────────────────────────────────────────────────

impl CountryRegistry for SqliteStore {
  type Error = Error;

  async fn upsert(&self, country: CanonicalCountry) -> Result<Upsert> {
    let capital_str = encode_list(&country.capital)?;
    let row = country.clone();

    let existed: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existed = tx
          .query_row(
            "SELECT 1 FROM countries WHERE cca3 = ?1",
            rusqlite::params![row.cca3],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        // Every column is overwritten: absent optionals clear old values.
        tx.execute(
          "INSERT INTO countries (cca3, name, region, subregion, population, area, capital)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT (cca3) DO UPDATE SET
             name       = excluded.name,
             region     = excluded.region,
             subregion  = excluded.subregion,
             population = excluded.population,
             area       = excluded.area,
             capital    = excluded.capital",
          rusqlite::params![
            row.cca3,
            row.name,
            row.region,
            row.subregion,
            row.population,
            row.area,
            capital_str,
          ],
        )?;
        tx.commit()?;
        Ok(existed)
      })
      .await?;

    Ok(if existed {
      Upsert::Replaced(country)
    } else {
      Upsert::Inserted(country)
    })
  }

  async fn get_country(&self, cca3: &str) -> Result<Option<CanonicalCountry>> {
    let code = cca3.to_owned();

    let raw: Option<RawCountry> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {COUNTRY_COLUMNS} FROM countries WHERE cca3 = ?1"),
            rusqlite::params![code],
            RawCountry::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawCountry::into_country).transpose()
  }

  async fn list_countries(&self, query: &CountryQuery) -> Result<Vec<CanonicalCountry>> {
    let region       = query.region.clone();
    let name_pattern = query.name.as_deref().map(contains_pattern);
    let limit_val    = query.limit.unwrap_or(CountryQuery::DEFAULT_LIMIT) as i64;
    let offset_val   = query.skip.unwrap_or(0) as i64;

    let raws: Vec<RawCountry> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically.
        let mut conds: Vec<&'static str> = vec![];
        if region.is_some() {
          conds.push("region = ?1");
        }
        if name_pattern.is_some() {
          conds.push("name LIKE ?2 ESCAPE '\\'");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT {COUNTRY_COLUMNS}
           FROM countries
           {where_clause}
           ORDER BY cca3
           LIMIT ?3 OFFSET ?4"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              region.as_deref(),
              name_pattern.as_deref(),
              limit_val,
              offset_val,
            ],
            RawCountry::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCountry::into_country).collect()
  }

  async fn delete_country(&self, cca3: &str) -> Result<bool> {
    let code = cca3.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM countries WHERE cca3 = ?1", rusqlite::params![code])?)
      })
      .await?;

    Ok(removed > 0)
  }

  async fn reset_countries(&self) -> Result<u64> {
    let removed = self
      .conn
      .call(|conn| Ok(conn.execute("DELETE FROM countries", [])?))
      .await?;

    Ok(removed as u64)
  }
}

// ─── ProviderRegistry impl ───────────────────────────────────────────────────

impl ProviderRegistry for SqliteStore {
  type Error = Error;

  async fn add_provider(&self, input: NewProvider) -> Result<Registration> {
    let provider = Provider {
      id:         Uuid::new_v4(),
      name:       input.name,
      url:        input.url,
      created_at: now(),
    };

    let id_str = encode_uuid(provider.id);
    let name   = provider.name.clone();
    let url    = provider.url.clone();
    let at_str = encode_dt(provider.created_at);

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken = tx
          .query_row(
            "SELECT 1 FROM providers WHERE name = ?1",
            rusqlite::params![name],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO providers (provider_id, name, url, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, url, at_str],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    Ok(if inserted {
      Registration::Added(provider)
    } else {
      Registration::NameTaken(provider.name)
    })
  }

  async fn get_provider(&self, id: Uuid) -> Result<Option<Provider>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawProvider> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROVIDER_COLUMNS} FROM providers WHERE provider_id = ?1"),
            rusqlite::params![id_str],
            RawProvider::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProvider::into_provider).transpose()
  }

  async fn list_providers(&self) -> Result<Vec<Provider>> {
    let raws: Vec<RawProvider> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PROVIDER_COLUMNS} FROM providers ORDER BY created_at, rowid"
        ))?;
        let rows = stmt
          .query_map([], RawProvider::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProvider::into_provider).collect()
  }

  async fn delete_provider(&self, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM providers WHERE provider_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(removed > 0)
  }
}

// ─── RunLog impl ─────────────────────────────────────────────────────────────

impl RunLog for SqliteStore {
  type Error = Error;

  async fn begin_run(&self, input: NewRun) -> Result<ProvenanceEntry> {
    let started = now();
    let entry = ProvenanceEntry {
      id:                     Uuid::new_v4(),
      provider_id:            input.provider_id,
      provider_name:          input.provider_name,
      status:                 RunStatus::Running,
      log:                    None,
      raw_artifact_ref:       None,
      processed_artifact_ref: None,
      processed_count:        0,
      rejected_count:         0,
      rejected_samples:       Vec::new(),
      created_at:             started,
      updated_at:             started,
    };

    let id_str          = encode_uuid(entry.id);
    let provider_id_str = entry.provider_id.map(encode_uuid);
    let provider_name   = entry.provider_name.clone();
    let status_str      = entry.status.as_str();
    let at_str          = encode_dt(started);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO runs (run_id, provider_id, provider_name, status, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, provider_id_str, provider_name, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(entry)
  }

  async fn finish_run(&self, id: Uuid, outcome: RunOutcome) -> Result<ProvenanceEntry> {
    let outcome = outcome.checked()?;

    let id_str        = encode_uuid(id);
    let status_str    = outcome.status.as_str();
    let samples_str   = encode_list(&outcome.rejected_samples)?;
    let processed     = encode_count(outcome.processed_count);
    let rejected      = encode_count(outcome.rejected_count);
    let at_str        = encode_dt(now());
    let log           = outcome.log;
    let raw_ref       = outcome.raw_artifact_ref;
    let processed_ref = outcome.processed_artifact_ref;

    // Only a non-terminal row is updated; zero changed rows means the run is
    // missing or already final.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE runs SET
             status                 = ?2,
             log                    = ?3,
             raw_artifact_ref       = ?4,
             processed_artifact_ref = ?5,
             processed_count        = ?6,
             rejected_count         = ?7,
             rejected_samples       = ?8,
             updated_at             = ?9
           WHERE run_id = ?1 AND status IN ('pending', 'running')",
          rusqlite::params![
            id_str,
            status_str,
            log,
            raw_ref,
            processed_ref,
            processed,
            rejected,
            samples_str,
            at_str,
          ],
        )?)
      })
      .await?;

    let entry = self.fetch_run(id).await?.ok_or(Error::RunNotFound(id))?;
    if changed == 0 {
      return Err(Error::RunAlreadyFinalized(id));
    }
    Ok(entry)
  }

  async fn get_run(&self, id: Uuid) -> Result<Option<ProvenanceEntry>> {
    self.fetch_run(id).await
  }

  async fn list_runs(&self) -> Result<Vec<ProvenanceEntry>> {
    let raws: Vec<RawRun> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {RUN_COLUMNS} FROM runs ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map([], RawRun::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRun::into_entry).collect()
  }

  async fn latest_successful_run(&self) -> Result<Option<ProvenanceEntry>> {
    let raw: Option<RawRun> = self
      .conn
      .call(|conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {RUN_COLUMNS} FROM runs
               WHERE status = 'success' AND processed_artifact_ref IS NOT NULL
               ORDER BY created_at DESC, rowid DESC
               LIMIT 1"
            ),
            [],
            RawRun::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRun::into_entry).transpose()
  }
}
