//! Deletion-request submission and resolution.
//!
//! Submissions are screened by the [`SpamClassifier`]; the verdict is stored
//! on the request. Approval soft-deletes the target fact and evicts it from
//! every collection. Resolutions are serialised so a request is decided once.

use std::sync::Arc;

use chrono::Utc;
use mapa_core::{
  deletion::{DeletionPolicy, DeletionRequest, NewDeletionRequest, RequestState},
  spam::SpamClassifier,
  store::MapaStore,
};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result, dedup::FingerprintDeduplicator, membership::MembershipService,
};

pub struct ModerationService<S> {
  store:      Arc<S>,
  dedup:      Arc<FingerprintDeduplicator<S>>,
  membership: Arc<MembershipService<S>>,
  classifier: Arc<SpamClassifier>,
  policy:     DeletionPolicy,
  resolving:  Mutex<()>,
}

impl<S: MapaStore> ModerationService<S> {
  pub fn new(
    store: Arc<S>,
    dedup: Arc<FingerprintDeduplicator<S>>,
    membership: Arc<MembershipService<S>>,
    classifier: Arc<SpamClassifier>,
    policy: DeletionPolicy,
  ) -> Self {
    Self { store, dedup, membership, classifier, policy, resolving: Mutex::new(()) }
  }

  pub fn policy(&self) -> DeletionPolicy { self.policy }

  /// Screen and persist a request. Spam and too-short reasons are stored
  /// already rejected rather than returned as errors.
  pub async fn submit(&self, input: NewDeletionRequest) -> Result<DeletionRequest> {
    self
      .store
      .get_fact(input.fact_id)
      .await
      .map_err(Error::store)?
      .ok_or(mapa_core::Error::FactNotFound(input.fact_id))?;

    let request = self.policy.screen(input, &self.classifier, Utc::now());
    self
      .store
      .save_deletion_request(request.clone())
      .await
      .map_err(Error::store)?;

    match &request.rejection {
      Some(reason) => warn!(
        request = %request.request_id,
        fact = %request.fact_id,
        reason = ?reason,
        "deletion request rejected on submission"
      ),
      None => info!(
        request = %request.request_id,
        fact = %request.fact_id,
        "deletion request pending review"
      ),
    }
    Ok(request)
  }

  pub async fn get(&self, id: Uuid) -> Result<DeletionRequest> {
    self
      .store
      .get_deletion_request(id)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| mapa_core::Error::DeletionRequestNotFound(id).into())
  }

  pub async fn list(&self, state: Option<RequestState>) -> Result<Vec<DeletionRequest>> {
    self.store.list_deletion_requests(state).await.map_err(Error::store)
  }

  /// Approve the request and soft-delete its fact. The request and the
  /// fact are written together.
  pub async fn approve(&self, id: Uuid) -> Result<DeletionRequest> {
    let _resolving = self.resolving.lock().await;
    let mut request = self.get(id).await?;
    request.approve(Utc::now())?;

    let fact = self.dedup.soft_delete(request.clone()).await?;

    let evicted = self.membership.apply_facts(std::slice::from_ref(&fact)).await?;
    info!(request = %id, fact = %fact.fact_id, evicted, "deletion approved");
    Ok(request)
  }

  pub async fn reject(&self, id: Uuid) -> Result<DeletionRequest> {
    let _resolving = self.resolving.lock().await;
    let mut request = self.get(id).await?;
    request.reject(Utc::now())?;
    self
      .store
      .save_deletion_request(request.clone())
      .await
      .map_err(Error::store)?;
    info!(request = %id, "deletion rejected");
    Ok(request)
  }

  pub async fn mark_spam(&self, id: Uuid) -> Result<DeletionRequest> {
    let _resolving = self.resolving.lock().await;
    let mut request = self.get(id).await?;
    request.mark_spam(Utc::now())?;
    self
      .store
      .save_deletion_request(request.clone())
      .await
      .map_err(Error::store)?;
    info!(request = %id, "deletion marked as spam");
    Ok(request)
  }
}
