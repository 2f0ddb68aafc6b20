//! JSON REST API for MetaMapa.
//!
//! Exposes an axum [`Router`] over the [`mapa_engine::Services`] of any
//! [`MapaStore`]. Auth, TLS, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", mapa_api::api_router(services.clone()))
//! ```

pub mod collections;
pub mod deletions;
pub mod error;
pub mod facts;
pub mod stats;

use axum::{
  Router,
  routing::{get, post, put},
};
use mapa_core::store::MapaStore;
use mapa_engine::Services;

pub use error::ApiError;

/// Build a fully-materialised API router over `services`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(services: Services<S>) -> Router<()>
where
  S: MapaStore + 'static,
{
  Router::new()
    // Facts
    .route("/facts", get(facts::list::<S>).post(facts::create::<S>))
    .route("/facts/{id}", get(facts::get_one::<S>).put(facts::update::<S>))
    .route("/facts/{id}/review", post(facts::review::<S>))
    // Collections
    .route(
      "/collections",
      get(collections::list::<S>).post(collections::create::<S>),
    )
    .route("/collections/{id}", get(collections::get_one::<S>))
    .route("/collections/{id}/criteria", put(collections::replace_criteria::<S>))
    .route("/collections/{id}/facts", get(collections::members::<S>))
    // Deletion requests
    .route(
      "/deletion-requests",
      get(deletions::list::<S>).post(deletions::create::<S>),
    )
    .route("/deletion-requests/{id}", get(deletions::get_one::<S>))
    .route("/deletion-requests/{id}/approve", post(deletions::approve::<S>))
    .route("/deletion-requests/{id}/reject", post(deletions::reject::<S>))
    .route("/deletion-requests/{id}/spam", post(deletions::mark_spam::<S>))
    // Statistics
    .route("/stats", get(stats::get::<S>))
    .with_state(services)
}
