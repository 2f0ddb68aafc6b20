//! Fingerprint-based admission of incoming facts.
//!
//! Every fact entering the store, from a source or a contributor, passes
//! through [`FingerprintDeduplicator::admit`]. Content is normalised and its
//! place resolved before fingerprinting, so cosmetic differences between
//! sources do not split one event into several records.
//!
//! The deduplicator also owns the only lock under which stored facts are
//! read, changed and written back. Reviews and deletions go through
//! [`FingerprintDeduplicator::update`] and
//! [`FingerprintDeduplicator::soft_delete`] so a merge in flight can neither
//! lose their change nor be lost by it.

use std::sync::Arc;

use chrono::Utc;
use mapa_core::{
  deletion::DeletionRequest,
  fact::{Fact, NewFact, SourceId},
  fingerprint::Fingerprint,
  place::PlaceResolver,
  store::MapaStore,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionOutcome {
  /// First report of this event; a new record was stored.
  New,
  /// Known event, new source; provenance grew.
  Merged,
  /// This source already reported this event; nothing was written.
  Known,
}

#[derive(Debug, Clone, Serialize)]
pub struct Admission {
  pub outcome: AdmissionOutcome,
  pub fact:    Fact,
}

pub struct FingerprintDeduplicator<S> {
  store:    Arc<S>,
  resolver: PlaceResolver,
  /// Serialises every read-modify-write of a stored fact.
  lock:     Mutex<()>,
}

impl<S: MapaStore> FingerprintDeduplicator<S> {
  pub fn new(store: Arc<S>, resolver: PlaceResolver) -> Self {
    Self { store, resolver, lock: Mutex::new(()) }
  }

  /// Canonical content: normalised, with the place filled in when the
  /// source only sent coordinates.
  pub fn prepare(&self, input: NewFact) -> NewFact {
    let mut input = input.normalized();
    if let Some(loc) = input.location.as_mut() {
      self.resolver.fill(loc);
    }
    input
  }

  pub fn fingerprint_of(&self, input: &NewFact) -> Fingerprint {
    Fingerprint::of(&self.prepare(input.clone()).content_key())
  }

  pub async fn is_duplicate(&self, fingerprint: &Fingerprint) -> Result<bool> {
    Ok(
      self
        .store
        .find_by_fingerprint(fingerprint.clone())
        .await
        .map_err(Error::store)?
        .is_some(),
    )
  }

  /// Store `input` as reported by `source`, or merge `source` into the
  /// provenance of the fact already holding the same fingerprint. Existing
  /// content is never overwritten by a duplicate.
  pub async fn admit(&self, input: NewFact, source: SourceId) -> Result<Admission> {
    let input = self.prepare(input);
    let fingerprint = Fingerprint::of(&input.content_key());
    let now = Utc::now();

    let _guard = self.lock.lock().await;

    let existing = self
      .store
      .find_by_fingerprint(fingerprint.clone())
      .await
      .map_err(Error::store)?;

    let admission = match existing {
      None => {
        let fact = Fact::from_new(input, source, now);
        self.store.save_fact(fact.clone()).await.map_err(Error::store)?;
        Admission { outcome: AdmissionOutcome::New, fact }
      }
      Some(mut fact) => {
        if fact.merge_provenance(source, now) {
          self.store.save_fact(fact.clone()).await.map_err(Error::store)?;
          Admission { outcome: AdmissionOutcome::Merged, fact }
        } else {
          Admission { outcome: AdmissionOutcome::Known, fact }
        }
      }
    };

    debug!(
      fact = %admission.fact.fact_id,
      fingerprint = %fingerprint,
      outcome = ?admission.outcome,
      "admitted fact"
    );
    Ok(admission)
  }

  /// Replace the content of fact `id`, recomputing its fingerprint under the
  /// same lock as admission.
  pub async fn replace_content(&self, id: Uuid, content: NewFact) -> Result<Fact> {
    let content = self.prepare(content);
    let fingerprint = Fingerprint::of(&content.content_key());

    let _guard = self.lock.lock().await;

    let mut fact = self.load(id).await?;

    let holder = self
      .store
      .find_by_fingerprint(fingerprint)
      .await
      .map_err(Error::store)?;
    if let Some(other) = holder.filter(|other| other.fact_id != id) {
      return Err(Error::FingerprintTaken { fact_id: id, existing: other.fact_id });
    }

    fact.apply_edit(content, Utc::now())?;
    self.store.save_fact(fact.clone()).await.map_err(Error::store)?;
    Ok(fact)
  }

  /// Apply `change` to the stored copy of fact `id` and save it.
  pub async fn update<F>(&self, id: Uuid, change: F) -> Result<Fact>
  where
    F: FnOnce(&mut Fact) -> mapa_core::Result<()> + Send,
  {
    let _guard = self.lock.lock().await;
    let mut fact = self.load(id).await?;
    change(&mut fact)?;
    self.store.save_fact(fact.clone()).await.map_err(Error::store)?;
    Ok(fact)
  }

  /// Soft-delete the target of an approved `request`, persisting the fact
  /// and the request in one write.
  pub async fn soft_delete(&self, request: DeletionRequest) -> Result<Fact> {
    let _guard = self.lock.lock().await;
    let mut fact = self.load(request.fact_id).await?;
    fact.mark_deleted(request.resolved_at.unwrap_or_else(Utc::now));
    self
      .store
      .resolve_deletion(request, fact.clone())
      .await
      .map_err(Error::store)?;
    Ok(fact)
  }

  async fn load(&self, id: Uuid) -> Result<Fact> {
    self
      .store
      .get_fact(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| mapa_core::Error::FactNotFound(id).into())
  }
}
