//! The `SourceAdapter` pull contract.
//!
//! Every provider, whatever its backing store, is reduced to one call:
//! "give me what is new since this instant". Concrete adapters live in
//! `mapa-engine`.

use std::{collections::HashSet, future::Future};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  fact::{NewFact, SourceId},
};

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::Display,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceKind {
  /// Curated dataset files on local disk.
  StaticFile,
  /// Contributor-driven feed served over HTTP.
  DynamicFeed,
  /// Another aggregator instance.
  Proxy,
}

/// A provider of facts.
///
/// `fetch_since` returns one finite page. An empty vector means "nothing
/// new"; errors are reserved for I/O, network or parse failures and must
/// leave no side effects behind.
pub trait SourceAdapter: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn id(&self) -> &SourceId;

  fn kind(&self) -> SourceKind;

  /// Facts not seen before `since`; everything available when `None`.
  fn fetch_since(
    &self,
    since: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<Vec<NewFact>, Self::Error>> + Send + '_;
}

/// Reject a registry in which two adapters share an identifier.
pub fn ensure_unique_ids<'a>(ids: impl IntoIterator<Item = &'a SourceId>) -> Result<()> {
  let mut seen = HashSet::new();
  for id in ids {
    if !seen.insert(id) {
      return Err(Error::DuplicateSource(id.clone()));
    }
  }
  Ok(())
}
