//! Provenance entries, one per extraction or sync run.
//!
//! An entry is created when a run begins and finalized exactly once when it
//! ends. After a terminal status is recorded nothing about the entry changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// At most this many rejected samples are kept per run.
pub const MAX_REJECTED_SAMPLES: usize = 5;

// ─── Status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
  Pending,
  Running,
  Success,
  Failure,
}

impl RunStatus {
  pub fn is_terminal(&self) -> bool {
    matches!(self, Self::Success | Self::Failure)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Running => "running",
      Self::Success => "success",
      Self::Failure => "failure",
    }
  }
}

impl std::str::FromStr for RunStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "pending" => Ok(Self::Pending),
      "running" => Ok(Self::Running),
      "success" => Ok(Self::Success),
      "failure" => Ok(Self::Failure),
      other => Err(Error::UnknownStatus(other.to_owned())),
    }
  }
}

// ─── Entry ───────────────────────────────────────────────────────────────────

/// The recorded outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
  pub id:                     Uuid,
  /// `None` for ad hoc extractions and pull-mode syncs.
  pub provider_id:            Option<Uuid>,
  pub provider_name:          String,
  pub status:                 RunStatus,
  /// Human-readable summary, or the error text of a failed run.
  pub log:                    Option<String>,
  pub raw_artifact_ref:       Option<String>,
  pub processed_artifact_ref: Option<String>,
  pub processed_count:        u64,
  pub rejected_count:         u64,
  pub rejected_samples:       Vec<String>,
  pub created_at:             DateTime<Utc>,
  pub updated_at:             DateTime<Utc>,
}

/// Input to [`crate::store::RunLog::begin_run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRun {
  pub provider_id:   Option<Uuid>,
  pub provider_name: String,
}

/// Terminal fields written by [`crate::store::RunLog::finish_run`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
  pub status:                 RunStatus,
  pub log:                    Option<String>,
  pub raw_artifact_ref:       Option<String>,
  pub processed_artifact_ref: Option<String>,
  pub processed_count:        u64,
  pub rejected_count:         u64,
  pub rejected_samples:       Vec<String>,
}

impl RunOutcome {
  /// A failed run: no counts, the error text as log, and whatever raw
  /// artifact had already been written.
  pub fn failure(error: impl Into<String>, raw_artifact_ref: Option<String>) -> Self {
    Self {
      status: RunStatus::Failure,
      log: Some(error.into()),
      raw_artifact_ref,
      processed_artifact_ref: None,
      processed_count: 0,
      rejected_count: 0,
      rejected_samples: Vec::new(),
    }
  }

  /// Reject non-terminal statuses and cap the sample list.
  pub fn checked(mut self) -> Result<Self> {
    if !self.status.is_terminal() {
      return Err(Error::NonTerminalStatus(self.status));
    }
    self.rejected_samples.truncate(MAX_REJECTED_SAMPLES);
    Ok(self)
  }
}
