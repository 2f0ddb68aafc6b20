//! Concrete source adapters and the registry built from configuration.
//!
//! The set of adapter kinds is closed: [`Source`] dispatches by `match`.
//! Tests substitute their own [`SourceAdapter`] implementations.

mod http;
mod static_file;

use std::{io, path::PathBuf, time::Duration};

use chrono::{DateTime, Utc};
use mapa_core::{
  fact::{NewFact, SourceId},
  source::{SourceAdapter, SourceKind, ensure_unique_ids},
};
use serde::Deserialize;
use thiserror::Error;

pub use self::{http::HttpSource, static_file::StaticFileSource};

#[derive(Debug, Error)]
pub enum SourceError {
  #[error("reading {}: {source}", path.display())]
  Io { path: PathBuf, source: io::Error },

  #[error("parsing {}: {source}", path.display())]
  Parse { path: PathBuf, source: serde_json::Error },

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),
}

/// One `[[sources]]` entry of the server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
  StaticFile { id: String, path: PathBuf },
  DynamicFeed { id: String, url: String },
  Proxy { id: String, url: String },
}

impl SourceConfig {
  pub fn id(&self) -> &str {
    match self {
      Self::StaticFile { id, .. } | Self::DynamicFeed { id, .. } | Self::Proxy { id, .. } => id,
    }
  }
}

pub enum Source {
  StaticFile(StaticFileSource),
  Http(HttpSource),
}

impl SourceAdapter for Source {
  type Error = SourceError;

  fn id(&self) -> &SourceId {
    match self {
      Self::StaticFile(s) => s.id(),
      Self::Http(s) => s.id(),
    }
  }

  fn kind(&self) -> SourceKind {
    match self {
      Self::StaticFile(s) => s.kind(),
      Self::Http(s) => s.kind(),
    }
  }

  async fn fetch_since(
    &self,
    since: Option<DateTime<Utc>>,
  ) -> Result<Vec<NewFact>, SourceError> {
    match self {
      Self::StaticFile(s) => s.fetch_since(since).await,
      Self::Http(s) => s.fetch_since(since).await,
    }
  }
}

/// Build one adapter per configured source. Duplicate identifiers are
/// rejected. All HTTP adapters share one client with `http_timeout`.
pub fn build_registry(
  configs: &[SourceConfig],
  http_timeout: Duration,
) -> crate::Result<Vec<Source>> {
  ensure_unique_ids(&configs.iter().map(|c| SourceId::new(c.id())).collect::<Vec<_>>())?;

  let client = reqwest::Client::builder()
    .timeout(http_timeout)
    .build()
    .map_err(crate::Error::HttpClient)?;

  Ok(
    configs
      .iter()
      .map(|c| match c {
        SourceConfig::StaticFile { id, path } => {
          Source::StaticFile(StaticFileSource::new(SourceId::new(id), path.clone()))
        }
        SourceConfig::DynamicFeed { id, url } => Source::Http(HttpSource::new(
          SourceId::new(id),
          SourceKind::DynamicFeed,
          url.clone(),
          client.clone(),
        )),
        SourceConfig::Proxy { id, url } => Source::Http(HttpSource::new(
          SourceId::new(id),
          SourceKind::Proxy,
          url.clone(),
          client.clone(),
        )),
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn config_entries_deserialize_by_kind() {
    let configs: Vec<SourceConfig> = serde_json::from_str(
      r#"[
        {"kind": "static_file", "id": "estatica", "path": "./datasets"},
        {"kind": "dynamic_feed", "id": "dinamica", "url": "http://localhost:8082/hechos"},
        {"kind": "proxy", "id": "otra", "url": "http://otra:8080/api"}
      ]"#,
    )
    .unwrap();

    let registry = build_registry(&configs, Duration::from_secs(5)).unwrap();
    let kinds: Vec<_> = registry.iter().map(|s| s.kind()).collect();
    assert_eq!(kinds, vec![SourceKind::StaticFile, SourceKind::DynamicFeed, SourceKind::Proxy]);
    assert_eq!(registry[2].id().as_str(), "otra");
  }

  #[test]
  fn duplicate_ids_fail_registry() {
    let configs = vec![
      SourceConfig::StaticFile { id: "a".into(), path: "x".into() },
      SourceConfig::Proxy { id: "a".into(), url: "http://y".into() },
    ];
    assert!(matches!(
      build_registry(&configs, Duration::from_secs(5)),
      Err(crate::Error::Core(mapa_core::Error::DuplicateSource(_)))
    ));
  }
}
