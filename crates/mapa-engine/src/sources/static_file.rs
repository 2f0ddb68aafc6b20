//! Curated datasets on local disk: a directory of JSON arrays of facts.

use std::{
  io,
  path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use mapa_core::{
  fact::{NewFact, SourceId},
  source::{SourceAdapter, SourceKind},
};
use tracing::debug;

use super::SourceError;

pub struct StaticFileSource {
  id:  SourceId,
  dir: PathBuf,
}

impl StaticFileSource {
  pub fn new(id: SourceId, dir: PathBuf) -> Self { Self { id, dir } }

  /// `*.json` files modified strictly after `since`, in name order.
  async fn changed_files(
    &self,
    since: Option<DateTime<Utc>>,
  ) -> Result<Vec<PathBuf>, SourceError> {
    let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err(&self.dir))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err(&self.dir))? {
      let path = entry.path();
      if path.extension().is_none_or(|ext| ext != "json") {
        continue;
      }
      let meta = entry.metadata().await.map_err(io_err(&path))?;
      if !meta.is_file() {
        continue;
      }
      let modified: DateTime<Utc> = meta.modified().map_err(io_err(&path))?.into();
      if since.is_none_or(|t| modified > t) {
        files.push(path);
      }
    }
    files.sort();
    Ok(files)
  }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> SourceError {
  let path = path.to_path_buf();
  move |source| SourceError::Io { path, source }
}

impl SourceAdapter for StaticFileSource {
  type Error = SourceError;

  fn id(&self) -> &SourceId { &self.id }

  fn kind(&self) -> SourceKind { SourceKind::StaticFile }

  async fn fetch_since(
    &self,
    since: Option<DateTime<Utc>>,
  ) -> Result<Vec<NewFact>, SourceError> {
    let mut facts = Vec::new();
    for path in self.changed_files(since).await? {
      let text = tokio::fs::read_to_string(&path).await.map_err(io_err(&path))?;
      let batch: Vec<NewFact> = serde_json::from_str(&text)
        .map_err(|source| SourceError::Parse { path: path.clone(), source })?;
      debug!(source = %self.id, file = %path.display(), count = batch.len(), "read dataset");
      facts.extend(batch);
    }
    Ok(facts)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  const DATASET: &str = r#"[
    {
      "title": "Incendio en pastizal",
      "description": "Foco cerca de la ruta",
      "category": "incendio",
      "occurred_at": "2024-02-10T15:30:00Z",
      "location": {"latitude": -39.03, "longitude": -63.1}
    },
    {
      "title": "Anegamiento",
      "description": "Calles cortadas",
      "category": "inundación",
      "occurred_at": "2024-02-11T09:00:00Z",
      "tags": ["lluvia"]
    }
  ]"#;

  fn source(dir: &Path) -> StaticFileSource {
    StaticFileSource::new(SourceId::new("estatica"), dir.to_path_buf())
  }

  #[tokio::test]
  async fn reads_every_json_file_without_checkpoint() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.json"), DATASET).unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a dataset").unwrap();

    let facts = source(dir.path()).fetch_since(None).await.unwrap();
    assert_eq!(facts.len(), 2);
    assert_eq!(facts[1].tags.len(), 1);
  }

  #[tokio::test]
  async fn files_older_than_checkpoint_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.json"), DATASET).unwrap();

    let later = Utc::now() + Duration::hours(1);
    assert!(source(dir.path()).fetch_since(Some(later)).await.unwrap().is_empty());

    let earlier = Utc::now() - Duration::hours(1);
    assert_eq!(source(dir.path()).fetch_since(Some(earlier)).await.unwrap().len(), 2);
  }

  #[tokio::test]
  async fn malformed_file_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
    assert!(matches!(
      source(dir.path()).fetch_since(None).await,
      Err(SourceError::Parse { .. })
    ));
  }

  #[tokio::test]
  async fn missing_directory_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let gone = dir.path().join("missing");
    assert!(matches!(source(&gone).fetch_since(None).await, Err(SourceError::Io { .. })));
  }
}
