//! Error type for `mapa-engine`.

use std::time::Duration;

use mapa_core::fact::SourceId;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] mapa_core::Error),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// An edit would give a fact the fingerprint another fact already holds.
  #[error("fact {fact_id} would duplicate fact {existing}")]
  FingerprintTaken { fact_id: Uuid, existing: Uuid },

  #[error("source {source_id} unavailable: {reason}")]
  SourceUnavailable { source_id: SourceId, reason: String },

  #[error("source {source_id} timed out after {after:?}")]
  SourceTimedOut { source_id: SourceId, after: Duration },

  #[error("failed to build HTTP client: {0}")]
  HttpClient(#[source] reqwest::Error),

  #[error("a run is already in progress")]
  AlreadyRunning,

  #[error("run cancelled by shutdown")]
  Cancelled,
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
