//! Server assembly for MetaMapa: configuration, the HTTP application and
//! the interval triggers that drive ingestion.

pub mod schedule;

use std::path::{Path, PathBuf};

use axum::Router;
use mapa_core::{
  deletion::DeletionPolicy,
  place::{PlaceBox, PlaceResolver},
  store::MapaStore,
};
use mapa_engine::{Services, orchestrator::IngestSettings, sources::SourceConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered
/// with `MAPA_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  pub store_path: PathBuf,
  #[serde(default)]
  pub ingest:     IngestConfig,
  #[serde(default)]
  pub moderation: DeletionPolicy,
  #[serde(default)]
  pub sources:    Vec<SourceConfig>,
  /// Bounding boxes for place resolution; empty means the built-in table.
  #[serde(default)]
  pub places:     Vec<PlaceBox>,
}

/// The `[ingest]` table: run tunables plus the trigger periods.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct IngestConfig {
  #[serde(flatten)]
  pub settings:                IngestSettings,
  /// Seconds between ingestion runs. Unset disables the trigger.
  pub interval_secs:           Option<u64>,
  /// Seconds between full consensus recomputes. Unset disables the trigger.
  pub recompute_interval_secs: Option<u64>,
}

fn default_host() -> String { "127.0.0.1".into() }

fn default_port() -> u16 { 8080 }

impl ServerConfig {
  /// Layer the file at `path` (optional) with `MAPA_*` variables, where `__`
  /// separates nested keys (`MAPA_INGEST__INTERVAL_SECS`).
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("MAPA")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn place_resolver(&self) -> PlaceResolver {
    if self.places.is_empty() {
      PlaceResolver::default()
    } else {
      PlaceResolver::new(self.places.clone())
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Application ──────────────────────────────────────────────────────────────

/// The HTTP application: the JSON API under `/api`, with request tracing.
pub fn app<S>(services: Services<S>) -> Router
where
  S: MapaStore + 'static,
{
  Router::new()
    .nest("/api", mapa_api::api_router(services))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{Config, File, FileFormat};
  use mapa_store_sqlite::SqliteStore;
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn minimal_config_takes_defaults() {
    let cfg = parse(r#"store_path = "/tmp/mapa.sqlite""#);
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.moderation.min_reason_chars, 500);
    assert_eq!(cfg.ingest.settings.fetch_timeout_secs, 30);
    assert!(cfg.ingest.interval_secs.is_none());
    assert!(cfg.sources.is_empty());
  }

  #[test]
  fn full_config_parses_sources_and_places() {
    let cfg = parse(
      r#"
      host       = "0.0.0.0"
      port       = 9000
      store_path = "~/mapa.sqlite"

      [ingest]
      interval_secs          = 3600
      fetch_timeout_secs     = 10
      max_concurrent_fetches = 2

      [moderation]
      min_reason_chars = 50

      [[sources]]
      id   = "estatica"
      kind = "static_file"
      path = "./datasets"

      [[sources]]
      id   = "otra-instancia"
      kind = "proxy"
      url  = "http://localhost:8081/api"

      [[places]]
      country      = "Argentina"
      province     = "Río Negro"
      municipality = "General Roca"
      lat          = [-39.2, -38.9]
      lon          = [-67.8, -67.4]
      "#,
    );
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.ingest.interval_secs, Some(3600));
    assert_eq!(cfg.ingest.settings.fetch_timeout_secs, 10);
    assert_eq!(cfg.ingest.settings.max_concurrent_fetches, 2);
    assert!(cfg.ingest.settings.recompute_after_run);
    assert_eq!(cfg.moderation.min_reason_chars, 50);
    assert_eq!(
      cfg.sources.iter().map(SourceConfig::id).collect::<Vec<_>>(),
      vec!["estatica", "otra-instancia"]
    );
    assert!(matches!(cfg.sources[1], SourceConfig::Proxy { .. }));
    assert_eq!(cfg.places.len(), 1);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(expand_tilde(Path::new("~/x.sqlite")), PathBuf::from(home).join("x.sqlite"));
    assert_eq!(expand_tilde(Path::new("/abs/x")), PathBuf::from("/abs/x"));
  }

  #[tokio::test]
  async fn api_is_mounted_under_prefix() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let services = Services::new(store, PlaceResolver::default(), DeletionPolicy::default());
    let app = app(services);

    let req = Request::builder().uri("/api/collections").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder().uri("/collections").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }
}
