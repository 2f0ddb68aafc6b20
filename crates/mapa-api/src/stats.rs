//! Handler for `GET /stats`.
//!
//! Optional `?collection=<id>` restricts the counts to that collection's
//! members (404 if it does not exist); `?category=` to one category.

use axum::{
  Json,
  extract::{Query, State},
};
use mapa_core::{
  stats::{Stats, StatsQuery},
  store::MapaStore,
};
use mapa_engine::Services;

use crate::error::ApiError;

/// `GET /stats[?collection=<id>][&category=<name>]`
pub async fn get<S: MapaStore + 'static>(
  State(services): State<Services<S>>,
  Query(query): Query<StatsQuery>,
) -> Result<Json<Stats>, ApiError> {
  Ok(Json(services.stats.compute(query).await?))
}
