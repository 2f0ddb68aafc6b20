//! Error types for `mapa-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::fact::SourceId;

#[derive(Debug, Error)]
pub enum Error {
  #[error("fact not found: {0}")]
  FactNotFound(Uuid),

  #[error("collection not found: {0}")]
  CollectionNotFound(Uuid),

  #[error("deletion request not found: {0}")]
  DeletionRequestNotFound(Uuid),

  #[error("unknown consensus algorithm: {0:?}")]
  UnknownConsensusAlgorithm(String),

  #[error("invalid criterion: {0}")]
  InvalidCriterion(String),

  #[error("source {0} is registered more than once")]
  DuplicateSource(SourceId),

  #[error("deletion request {0} is already resolved")]
  AlreadyResolved(Uuid),

  #[error("fact {0} is deleted")]
  FactDeleted(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
