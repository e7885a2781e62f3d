//! SQL schema for the dex SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Canonical registry. Rows are fully replaced on upsert.
CREATE TABLE IF NOT EXISTS countries (
    cca3        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    region      TEXT,
    subregion   TEXT,
    population  INTEGER NOT NULL DEFAULT 0,
    area        REAL    NOT NULL DEFAULT 0,
    capital     TEXT    NOT NULL DEFAULT '[]'   -- JSON array of strings
);

CREATE TABLE IF NOT EXISTS providers (
    provider_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    url         TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

-- One row per run. No foreign key to providers: deleting a provider keeps
-- its history. Rows are updated once, from 'running' to a terminal status.
CREATE TABLE IF NOT EXISTS runs (
    run_id                 TEXT PRIMARY KEY,
    provider_id            TEXT,
    provider_name          TEXT NOT NULL,
    status                 TEXT NOT NULL,   -- 'pending' | 'running' | 'success' | 'failure'
    log                    TEXT,
    raw_artifact_ref       TEXT,
    processed_artifact_ref TEXT,
    processed_count        INTEGER NOT NULL DEFAULT 0,
    rejected_count         INTEGER NOT NULL DEFAULT 0,
    rejected_samples       TEXT    NOT NULL DEFAULT '[]',
    created_at             TEXT NOT NULL,
    updated_at             TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS countries_region_idx ON countries(region);
CREATE INDEX IF NOT EXISTS runs_created_idx     ON runs(created_at);

PRAGMA user_version = 1;
";
