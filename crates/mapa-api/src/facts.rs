//! Handlers for `/facts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/facts` | Optional `category`, `include_deleted`, `since` |
//! | `GET`  | `/facts/:id` | 404 if not found |
//! | `POST` | `/facts` | Body: [`NewFact`]; returns 201 + `Admission` |
//! | `PUT`  | `/facts/:id` | Body: [`NewFact`]; replaces the content |
//! | `POST` | `/facts/:id/review` | Body: [`ReviewDecision`] |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::{DateTime, Utc};
use mapa_core::{
  fact::{Fact, NewFact, ReviewDecision},
  store::{FactQuery, MapaStore},
};
use mapa_engine::Services;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

/// Reject content that could never be admitted.
fn validate(input: &NewFact) -> Result<(), ApiError> {
  if input.title.trim().is_empty() {
    return Err(ApiError::BadRequest("title must not be empty".into()));
  }
  if input.category.trim().is_empty() {
    return Err(ApiError::BadRequest("category must not be empty".into()));
  }
  if input.location.as_ref().is_some_and(|l| !l.is_valid()) {
    return Err(ApiError::BadRequest("coordinates out of range".into()));
  }
  Ok(())
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub category:        Option<String>,
  /// If `true`, soft-deleted facts are returned as well. Default `false`.
  #[serde(default)]
  pub include_deleted: bool,
  /// Only facts created or modified after this instant.
  pub since:           Option<DateTime<Utc>>,
}

/// `GET /facts[?category=...][&include_deleted=true][&since=...]`
pub async fn list<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Fact>>, ApiError> {
  let mut facts = services
    .facts
    .list(FactQuery { category: params.category, include_deleted: params.include_deleted })
    .await?;

  if let Some(since) = params.since {
    facts.retain(|f| f.updated_at > since);
  }

  Ok(Json(facts))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /facts/:id`
pub async fn get_one<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Fact>, ApiError> {
  Ok(Json(services.facts.get(id).await?))
}

// ─── Contribute ───────────────────────────────────────────────────────────────

/// `POST /facts`: returns 201 + the [`mapa_engine::dedup::Admission`]. Its
/// `outcome` says whether the event was new, merged or already known.
pub async fn create<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Json(body): Json<NewFact>,
) -> Result<impl IntoResponse, ApiError> {
  validate(&body)?;
  let admission = services.facts.contribute(body).await?;
  Ok((StatusCode::CREATED, Json(admission)))
}

// ─── Edit ─────────────────────────────────────────────────────────────────────

/// `PUT /facts/:id`: 409 if the new content duplicates another fact.
pub async fn update<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<NewFact>,
) -> Result<Json<Fact>, ApiError> {
  validate(&body)?;
  Ok(Json(services.facts.edit(id, body).await?))
}

// ─── Review ───────────────────────────────────────────────────────────────────

/// `POST /facts/:id/review`: body `{"decision":"accepted"}`.
pub async fn review<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ReviewDecision>,
) -> Result<Json<Fact>, ApiError> {
  Ok(Json(services.facts.review(id, body).await?))
}
