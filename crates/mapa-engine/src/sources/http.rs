//! HTTP-backed sources: contributor feeds and other aggregator instances.

use chrono::{DateTime, Utc};
use mapa_core::{
  fact::{Fact, NewFact, ReviewState, SourceId},
  source::{SourceAdapter, SourceKind},
};
use reqwest::Client;

use super::SourceError;

/// A source reached over HTTP.
///
/// * [`SourceKind::DynamicFeed`]: `GET {url}?since=…` returns new facts.
/// * [`SourceKind::Proxy`]: `GET {url}/facts?since=…` on another aggregator
///   returns stored facts; deleted and rejected ones are dropped.
pub struct HttpSource {
  id:       SourceId,
  kind:     SourceKind,
  base_url: String,
  client:   Client,
}

impl HttpSource {
  pub fn new(id: SourceId, kind: SourceKind, base_url: String, client: Client) -> Self {
    Self { id, kind, base_url, client }
  }

  fn url(&self) -> String {
    match self.kind {
      SourceKind::Proxy => format!("{}/facts", self.base_url.trim_end_matches('/')),
      _ => self.base_url.clone(),
    }
  }
}

/// Content of the upstream facts worth re-publishing.
fn republishable(facts: Vec<Fact>) -> Vec<NewFact> {
  facts
    .into_iter()
    .filter(|f| !matches!(f.review_state, ReviewState::Deleted | ReviewState::Rejected))
    .map(|f| f.content())
    .collect()
}

impl SourceAdapter for HttpSource {
  type Error = SourceError;

  fn id(&self) -> &SourceId { &self.id }

  fn kind(&self) -> SourceKind { self.kind }

  async fn fetch_since(
    &self,
    since: Option<DateTime<Utc>>,
  ) -> Result<Vec<NewFact>, SourceError> {
    let mut req = self.client.get(self.url());
    if let Some(t) = since {
      req = req.query(&[("since", t.to_rfc3339())]);
    }
    let resp = req.send().await?.error_for_status()?;

    Ok(match self.kind {
      SourceKind::Proxy => republishable(resp.json::<Vec<Fact>>().await?),
      _ => resp.json::<Vec<NewFact>>().await?,
    })
  }
}
