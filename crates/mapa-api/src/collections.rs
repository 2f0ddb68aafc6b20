//! Handlers for `/collections` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/collections` | |
//! | `POST` | `/collections` | Body: [`NewCollection`]; 400 on unknown algorithm or bad criteria |
//! | `GET`  | `/collections/:id` | 404 if not found |
//! | `PUT`  | `/collections/:id/criteria` | Body: `{"criteria":[...]}`; full re-evaluation |
//! | `GET`  | `/collections/:id/facts` | Optional `?accepted_only=true` |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use mapa_core::{
  collection::{Collection, NewCollection},
  criteria::Criterion,
  store::MapaStore,
};
use mapa_engine::{Services, membership::Member};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /collections`
pub async fn list<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
) -> Result<Json<Vec<Collection>>, ApiError> {
  Ok(Json(services.membership.list_collections().await?))
}

/// `POST /collections`: returns 201 + the collection, already populated.
pub async fn create<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Json(body): Json<NewCollection>,
) -> Result<impl IntoResponse, ApiError> {
  let collection = services.membership.create_collection(body).await?;
  Ok((StatusCode::CREATED, Json(collection)))
}

/// `GET /collections/:id`
pub async fn get_one<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Collection>, ApiError> {
  Ok(Json(services.membership.get_collection(id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CriteriaBody {
  pub criteria: Vec<Criterion>,
}

/// `PUT /collections/:id/criteria`
pub async fn replace_criteria<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<CriteriaBody>,
) -> Result<Json<Collection>, ApiError> {
  Ok(Json(services.membership.replace_criteria(id, body.criteria).await?))
}

#[derive(Debug, Deserialize)]
pub struct MembersParams {
  #[serde(default)]
  pub accepted_only: bool,
}

/// `GET /collections/:id/facts[?accepted_only=true]`
pub async fn members<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<MembersParams>,
) -> Result<Json<Vec<Member>>, ApiError> {
  Ok(Json(services.membership.members(id, params.accepted_only).await?))
}
