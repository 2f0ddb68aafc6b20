//! Collection lifecycle and membership maintenance.
//!
//! Membership rows are a derived view. Every path that can change them
//! (ingestion, fact edits, deletions, criteria changes, the recompute pass)
//! goes through this service and holds the collection's lock while it
//! evaluates and writes, so two updates to one collection never interleave.
//! The collection itself is re-read after the lock is taken; a copy read
//! before may carry criteria that have since been replaced.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use chrono::Utc;
use mapa_core::{
  collection::{Collection, Membership, NewCollection},
  consensus::{self, Verdict},
  criteria::Criterion,
  fact::Fact,
  store::{FactQuery, MapaStore},
};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Error, Result};

pub use mapa_core::collection::Member;

pub struct MembershipService<S> {
  store: Arc<S>,
  locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl<S: MapaStore> MembershipService<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store, locks: Mutex::new(HashMap::new()) } }

  async fn lock_for(&self, collection_id: Uuid) -> Arc<Mutex<()>> {
    self.locks.lock().await.entry(collection_id).or_default().clone()
  }

  // ─── Collections ───────────────────────────────────────────────────────────

  /// Create a collection and populate it from every known fact.
  pub async fn create_collection(&self, input: NewCollection) -> Result<Collection> {
    let collection = input.build(Utc::now())?;
    self
      .store
      .save_collection(collection.clone())
      .await
      .map_err(Error::store)?;
    let changed = self.reevaluate(collection.collection_id).await?;
    info!(
      collection = %collection.collection_id,
      algorithm = %collection.algorithm,
      changed,
      "created collection"
    );
    Ok(collection)
  }

  pub async fn get_collection(&self, id: Uuid) -> Result<Collection> {
    self
      .store
      .get_collection(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| mapa_core::Error::CollectionNotFound(id).into())
  }

  pub async fn list_collections(&self) -> Result<Vec<Collection>> {
    self.store.list_collections().await.map_err(Error::store)
  }

  /// Replace a collection's criteria and rescan it against every fact.
  pub async fn replace_criteria(
    &self,
    id: Uuid,
    criteria: Vec<Criterion>,
  ) -> Result<Collection> {
    let lock = self.lock_for(id).await;
    let _guard = lock.lock().await;

    let mut collection = self.get_collection(id).await?;
    collection.replace_criteria(criteria, Utc::now())?;
    self
      .store
      .save_collection(collection.clone())
      .await
      .map_err(Error::store)?;
    let changed = self.rescan(&collection).await?;
    info!(collection = %id, changed, "replaced criteria");
    Ok(collection)
  }

  /// Members of a collection, optionally only the accepted ones.
  pub async fn members(&self, id: Uuid, accepted_only: bool) -> Result<Vec<Member>> {
    self.get_collection(id).await?;
    let mut members = self.store.list_members(id).await.map_err(Error::store)?;
    if accepted_only {
      members.retain(|m| m.verdict == Verdict::Accepted);
    }
    Ok(members)
  }

  // ─── Evaluation ────────────────────────────────────────────────────────────

  /// Full rescan of one collection against every fact.
  pub async fn reevaluate(&self, id: Uuid) -> Result<usize> {
    let lock = self.lock_for(id).await;
    let _guard = lock.lock().await;
    let collection = self.get_collection(id).await?;
    self.rescan(&collection).await
  }

  /// Full rescan of every collection. Returns the number of rows changed.
  pub async fn recompute_all(&self) -> Result<usize> {
    let mut changed = 0;
    for collection in self.list_collections().await? {
      changed += self.reevaluate(collection.collection_id).await?;
    }
    Ok(changed)
  }

  /// Incremental pass after `touched` facts were added or modified: each
  /// collection re-evaluates its current members plus the touched facts.
  pub async fn apply_facts(&self, touched: &[Fact]) -> Result<usize> {
    if touched.is_empty() {
      return Ok(0);
    }
    let touched_ids: HashSet<Uuid> = touched.iter().map(|f| f.fact_id).collect();
    let mut changed = 0;
    for listed in self.list_collections().await? {
      let id = listed.collection_id;
      let lock = self.lock_for(id).await;
      let _guard = lock.lock().await;
      let collection = self.get_collection(id).await?;

      let previous = self.previous(id).await?;
      let mut candidates = touched.to_vec();
      for (fact_id, verdict) in &previous {
        if verdict.is_member() && !touched_ids.contains(fact_id) {
          if let Some(fact) = self.store.get_fact(*fact_id).await.map_err(Error::store)? {
            candidates.push(fact);
          }
        }
      }

      changed += self.write(&collection, &candidates, &previous).await?;
    }
    Ok(changed)
  }

  async fn rescan(&self, collection: &Collection) -> Result<usize> {
    let facts = self
      .store
      .list_facts(FactQuery { category: None, include_deleted: true })
      .await
      .map_err(Error::store)?;
    let previous = self.previous(collection.collection_id).await?;
    self.write(collection, &facts, &previous).await
  }

  async fn previous(&self, collection_id: Uuid) -> Result<HashMap<Uuid, Verdict>> {
    Ok(
      self
        .store
        .list_memberships(collection_id)
        .await
        .map_err(Error::store)?
        .into_iter()
        .map(|m| (m.fact_id, m.verdict))
        .collect(),
    )
  }

  /// Evaluate and persist the changed rows. Caller holds the collection lock.
  async fn write(
    &self,
    collection: &Collection,
    candidates: &[Fact],
    previous: &HashMap<Uuid, Verdict>,
  ) -> Result<usize> {
    let changes = consensus::evaluate(collection, candidates, previous);
    let now = Utc::now();
    for change in &changes {
      debug!(
        collection = %collection.collection_id,
        fact = %change.fact_id,
        from = ?change.previous,
        to = ?change.verdict,
        "verdict changed"
      );
      self
        .store
        .save_membership(Membership {
          collection_id: collection.collection_id,
          fact_id:       change.fact_id,
          verdict:       change.verdict,
          evaluated_at:  now,
        })
        .await
        .map_err(Error::store)?;
    }
    Ok(changes.len())
  }
}
