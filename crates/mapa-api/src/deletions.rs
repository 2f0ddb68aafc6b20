//! Handlers for `/deletion-requests` endpoints.
//!
//! Requests that fail screening (spam, reason too short) are still stored and
//! returned with `201`; the `rejection` field says why.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use mapa_core::{
  deletion::{DeletionRequest, NewDeletionRequest, RequestState},
  store::MapaStore,
};
use mapa_engine::Services;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub state: Option<RequestState>,
}

/// `GET /deletion-requests[?state=pending|approved|rejected]`
pub async fn list<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<DeletionRequest>>, ApiError> {
  Ok(Json(services.moderation.list(params.state).await?))
}

/// `POST /deletion-requests`: body `{"fact_id":"...","reason":"..."}`.
pub async fn create<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Json(body): Json<NewDeletionRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let request = services.moderation.submit(body).await?;
  Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /deletion-requests/:id`
pub async fn get_one<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DeletionRequest>, ApiError> {
  Ok(Json(services.moderation.get(id).await?))
}

/// `POST /deletion-requests/:id/approve`: the fact is soft-deleted.
pub async fn approve<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DeletionRequest>, ApiError> {
  Ok(Json(services.moderation.approve(id).await?))
}

/// `POST /deletion-requests/:id/reject`
pub async fn reject<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DeletionRequest>, ApiError> {
  Ok(Json(services.moderation.reject(id).await?))
}

/// `POST /deletion-requests/:id/spam`
pub async fn mark_spam<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DeletionRequest>, ApiError> {
  Ok(Json(services.moderation.mark_spam(id).await?))
}
