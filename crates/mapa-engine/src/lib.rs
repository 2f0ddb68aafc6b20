//! Ingestion pipeline and application services for MetaMapa.
//!
//! [`Services`] wires the deduplicator, membership, fact and moderation
//! services over one store; [`Services::orchestrator`] adds a registry of
//! sources on top for batch ingestion. Everything is generic over
//! [`MapaStore`] and, for sources, over [`SourceAdapter`].

pub mod dedup;
pub mod error;
pub mod facts;
pub mod membership;
pub mod moderation;
pub mod orchestrator;
pub mod shutdown;
pub mod sources;
pub mod stats;

use std::sync::Arc;

use mapa_core::{
  deletion::DeletionPolicy, place::PlaceResolver, source::SourceAdapter, spam::SpamClassifier,
  store::MapaStore,
};

pub use error::{Error, Result};

use crate::{
  dedup::FingerprintDeduplicator,
  facts::FactService,
  membership::MembershipService,
  moderation::ModerationService,
  orchestrator::{IngestSettings, Orchestrator},
  shutdown::Shutdown,
  stats::StatsService,
};

/// The application services sharing one store, one deduplication lock and
/// one set of per-collection locks.
pub struct Services<S> {
  pub facts:      Arc<FactService<S>>,
  pub membership: Arc<MembershipService<S>>,
  pub moderation: Arc<ModerationService<S>>,
  pub stats:      Arc<StatsService<S>>,
  store:          Arc<S>,
  dedup:          Arc<FingerprintDeduplicator<S>>,
}

impl<S> Clone for Services<S> {
  fn clone(&self) -> Self {
    Self {
      facts:      self.facts.clone(),
      membership: self.membership.clone(),
      moderation: self.moderation.clone(),
      stats:      self.stats.clone(),
      store:      self.store.clone(),
      dedup:      self.dedup.clone(),
    }
  }
}

impl<S: MapaStore> Services<S> {
  pub fn new(store: Arc<S>, places: PlaceResolver, policy: DeletionPolicy) -> Self {
    let dedup = Arc::new(FingerprintDeduplicator::new(store.clone(), places));
    let membership = Arc::new(MembershipService::new(store.clone()));
    let facts = Arc::new(FactService::new(store.clone(), dedup.clone(), membership.clone()));
    let moderation = Arc::new(ModerationService::new(
      store.clone(),
      dedup.clone(),
      membership.clone(),
      Arc::new(SpamClassifier::default()),
      policy,
    ));
    let stats = Arc::new(StatsService::new(store.clone(), membership.clone()));
    Self { facts, membership, moderation, stats, store, dedup }
  }

  /// An orchestrator over `sources` that shares this instance's locks.
  pub fn orchestrator<A: SourceAdapter>(
    &self,
    sources: Vec<A>,
    settings: IngestSettings,
    shutdown: Shutdown,
  ) -> Result<Orchestrator<S, A>> {
    Orchestrator::new(
      self.store.clone(),
      self.dedup.clone(),
      self.membership.clone(),
      sources,
      settings,
      shutdown,
    )
  }
}
