//! Read-only statistics over the store.

use std::sync::Arc;

use chrono::Utc;
use mapa_core::{
  fact::Fact,
  stats::{Stats, StatsQuery},
  store::{FactQuery, MapaStore},
};
use tracing::debug;

use crate::{Error, Result, membership::MembershipService};

pub struct StatsService<S> {
  store:      Arc<S>,
  membership: Arc<MembershipService<S>>,
}

impl<S: MapaStore> StatsService<S> {
  pub fn new(store: Arc<S>, membership: Arc<MembershipService<S>>) -> Self {
    Self { store, membership }
  }

  /// Counts over live facts, or over one collection's members when the
  /// query names a collection. Spam figures always cover every request.
  pub async fn compute(&self, query: StatsQuery) -> Result<Stats> {
    let facts: Vec<Fact> = match query.collection {
      Some(id) => self
        .membership
        .members(id, false)
        .await?
        .into_iter()
        .map(|m| m.fact)
        .collect(),
      None => self.store.list_facts(FactQuery::default()).await.map_err(Error::store)?,
    };
    let facts: Vec<Fact> = facts.into_iter().filter(|f| query.admits(f)).collect();
    let requests = self
      .store
      .list_deletion_requests(None)
      .await
      .map_err(Error::store)?;

    let stats = Stats::compute(&facts, &requests, Utc::now());
    debug!(facts = stats.total_facts, requests = stats.spam.total_requests, "computed stats");
    Ok(stats)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use mapa_core::{
    collection::NewCollection,
    criteria::Criterion,
    deletion::DeletionPolicy,
    fact::NewFact,
    place::PlaceResolver,
  };
  use mapa_store_sqlite::SqliteStore;

  use super::*;
  use crate::Services;

  fn report(title: &str, category: &str) -> NewFact {
    NewFact::new(title, "detalle", category, Utc.with_ymd_and_hms(2024, 9, 3, 18, 30, 0).unwrap())
  }

  #[tokio::test]
  async fn scoped_to_collection_and_category() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let services = Services::new(store, PlaceResolver::default(), DeletionPolicy::default());
    services.facts.contribute(report("Granizo", "tormenta")).await.unwrap();
    services.facts.contribute(report("Ráfagas", "Tormenta")).await.unwrap();
    services.facts.contribute(report("Pastizal", "incendio")).await.unwrap();

    let all = services.stats.compute(Default::default()).await.unwrap();
    assert_eq!(all.total_facts, 3);
    assert_eq!(all.top_category().unwrap().count, 2);
    assert_eq!(all.peak_hour(), Some(18));

    let fires = services
      .stats
      .compute(StatsQuery { collection: None, category: Some("Incendio".into()) })
      .await
      .unwrap();
    assert_eq!(fires.total_facts, 1);

    let c = services
      .membership
      .create_collection(NewCollection {
        title:         "Granizo".into(),
        description:   String::new(),
        algorithm:     "absolute".into(),
        criteria:      vec![Criterion::TitleContains { text: "granizo".into() }],
        administrator: None,
      })
      .await
      .unwrap();
    let scoped = services
      .stats
      .compute(StatsQuery { collection: Some(c.collection_id), category: None })
      .await
      .unwrap();
    assert_eq!(scoped.total_facts, 1);
    assert_eq!(scoped.by_category[0].key, "tormenta");
  }
}
