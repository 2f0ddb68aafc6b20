//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<mapa_engine::Error> for ApiError {
  fn from(e: mapa_engine::Error) -> Self {
    use mapa_core::Error as Core;
    use mapa_engine::Error as Engine;

    match e {
      Engine::Core(core) => match core {
        Core::FactNotFound(_)
        | Core::CollectionNotFound(_)
        | Core::DeletionRequestNotFound(_) => ApiError::NotFound(core.to_string()),
        Core::UnknownConsensusAlgorithm(_)
        | Core::InvalidCriterion(_)
        | Core::DuplicateSource(_) => ApiError::BadRequest(core.to_string()),
        Core::AlreadyResolved(_) | Core::FactDeleted(_) => {
          ApiError::Conflict(core.to_string())
        }
        Core::Serialization(_) => ApiError::Internal(Box::new(core)),
      },
      e @ (Engine::FingerprintTaken { .. } | Engine::AlreadyRunning) => {
        ApiError::Conflict(e.to_string())
      }
      Engine::Store(inner) => ApiError::Store(inner),
      other => ApiError::Internal(Box::new(other)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) | ApiError::Internal(e) => {
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
