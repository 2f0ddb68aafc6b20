//! The `MapaStore` trait and supporting query types.
//!
//! Implemented by storage backends (e.g. `mapa-store-sqlite`). The engine and
//! the API depend on this abstraction only. Every read returns fully
//! materialised values.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  collection::{Collection, Member, Membership},
  deletion::{DeletionRequest, RequestState},
  fact::{Fact, SourceId},
  fingerprint::Fingerprint,
};

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`MapaStore::list_facts`].
#[derive(Debug, Clone, Default)]
pub struct FactQuery {
  /// Exact category, ignoring case.
  pub category:        Option<String>,
  /// Include soft-deleted facts.
  pub include_deleted: bool,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a MetaMapa store backend.
///
/// Writes are upserts keyed by the record's id. Facts are never hard-deleted;
/// deletion is a review-state transition saved through [`save_fact`].
///
/// [`save_fact`]: MapaStore::save_fact
pub trait MapaStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Facts ─────────────────────────────────────────────────────────────

  /// The fact holding `fingerprint`, if any. Fingerprints are unique.
  fn find_by_fingerprint(
    &self,
    fingerprint: Fingerprint,
  ) -> impl Future<Output = Result<Option<Fact>, Self::Error>> + Send + '_;

  /// Insert or replace a fact. Fails if another fact already holds the same
  /// fingerprint.
  fn save_fact(
    &self,
    fact: Fact,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_fact(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Fact>, Self::Error>> + Send + '_;

  /// Facts ordered by ingestion time.
  fn list_facts(
    &self,
    query: FactQuery,
  ) -> impl Future<Output = Result<Vec<Fact>, Self::Error>> + Send + '_;

  // ── Collections ───────────────────────────────────────────────────────

  fn save_collection(
    &self,
    collection: Collection,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_collection(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Collection>, Self::Error>> + Send + '_;

  /// All collections with their criteria, ordered by creation time.
  fn list_collections(
    &self,
  ) -> impl Future<Output = Result<Vec<Collection>, Self::Error>> + Send + '_;

  // ── Memberships ───────────────────────────────────────────────────────

  /// Insert or replace the row for `(collection_id, fact_id)`.
  fn save_membership(
    &self,
    membership: Membership,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Every recorded row for a collection, excluded ones included.
  fn list_memberships(
    &self,
    collection_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Membership>, Self::Error>> + Send + '_;

  /// Non-excluded rows of a collection joined with their facts, ordered by
  /// ingestion time.
  fn list_members(
    &self,
    collection_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Member>, Self::Error>> + Send + '_;

  // ── Deletion requests ─────────────────────────────────────────────────

  fn save_deletion_request(
    &self,
    request: DeletionRequest,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_deletion_request(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<DeletionRequest>, Self::Error>> + Send + '_;

  /// Persist an approved request together with its soft-deleted fact, both
  /// or neither.
  fn resolve_deletion(
    &self,
    request: DeletionRequest,
    fact: Fact,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Requests ordered by submission time, optionally filtered by state.
  fn list_deletion_requests(
    &self,
    state: Option<RequestState>,
  ) -> impl Future<Output = Result<Vec<DeletionRequest>, Self::Error>> + Send + '_;

  // ── Source checkpoints ────────────────────────────────────────────────

  /// When `source` was last pulled successfully.
  fn source_checkpoint(
    &self,
    source: SourceId,
  ) -> impl Future<Output = Result<Option<DateTime<Utc>>, Self::Error>> + Send + '_;

  fn save_source_checkpoint(
    &self,
    source: SourceId,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
