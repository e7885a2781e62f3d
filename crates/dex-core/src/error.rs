//! Error types for `dex-core`.

use thiserror::Error;

use crate::provenance::RunStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("run cannot be finished with non-terminal status {0:?}")]
  NonTerminalStatus(RunStatus),

  #[error("unknown run status: {0:?}")]
  UnknownStatus(String),

  #[error("invalid country: {0}")]
  InvalidCountry(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
