//! Direct contribution, editing and review of facts.

use std::sync::Arc;

use chrono::Utc;
use mapa_core::{
  fact::{Fact, NewFact, ReviewDecision, SourceId},
  store::{FactQuery, MapaStore},
};
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  dedup::{Admission, AdmissionOutcome, FingerprintDeduplicator},
  membership::MembershipService,
};

pub struct FactService<S> {
  store:      Arc<S>,
  dedup:      Arc<FingerprintDeduplicator<S>>,
  membership: Arc<MembershipService<S>>,
}

impl<S: MapaStore> FactService<S> {
  pub fn new(
    store: Arc<S>,
    dedup: Arc<FingerprintDeduplicator<S>>,
    membership: Arc<MembershipService<S>>,
  ) -> Self {
    Self { store, dedup, membership }
  }

  pub async fn get(&self, id: Uuid) -> Result<Fact> {
    self
      .store
      .get_fact(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| mapa_core::Error::FactNotFound(id).into())
  }

  pub async fn list(&self, query: FactQuery) -> Result<Vec<Fact>> {
    self.store.list_facts(query).await.map_err(Error::store)
  }

  /// Admit a fact submitted through the API. Its provenance is the reserved
  /// contributor source.
  pub async fn contribute(&self, input: NewFact) -> Result<Admission> {
    let admission = self.dedup.admit(input, SourceId::contributor()).await?;
    if admission.outcome != AdmissionOutcome::Known {
      self
        .membership
        .apply_facts(std::slice::from_ref(&admission.fact))
        .await?;
    }
    info!(
      fact = %admission.fact.fact_id,
      outcome = ?admission.outcome,
      "contributed fact"
    );
    Ok(admission)
  }

  /// Replace a fact's content. The fingerprint is recomputed and every
  /// collection re-evaluates the fact, which may evict it.
  pub async fn edit(&self, id: Uuid, content: NewFact) -> Result<Fact> {
    let fact = self.dedup.replace_content(id, content).await?;
    self.membership.apply_facts(std::slice::from_ref(&fact)).await?;
    info!(fact = %id, "edited fact");
    Ok(fact)
  }

  pub async fn review(&self, id: Uuid, decision: ReviewDecision) -> Result<Fact> {
    let now = Utc::now();
    let fact = self.dedup.update(id, |fact| fact.review(decision, now)).await?;
    info!(fact = %id, state = fact.review_state.as_ref(), "reviewed fact");
    Ok(fact)
  }
}
