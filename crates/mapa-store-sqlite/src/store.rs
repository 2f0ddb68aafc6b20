//! [`SqliteStore`], the SQLite implementation of [`MapaStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use mapa_core::{
  collection::{Collection, Member, Membership},
  consensus::Verdict,
  deletion::{DeletionRequest, RequestState},
  fact::{Fact, ReviewState, SourceId},
  fingerprint::Fingerprint,
  store::{FactQuery, MapaStore},
};

use crate::{
  Result,
  encode::{
    COLLECTION_COLUMNS, FACT_COLUMNS, FactRow, REQUEST_COLUMNS, RawCollection,
    RawDeletionRequest, RawFact, RawMembership, RequestRow, decode_dt, decode_variant,
    encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A MetaMapa store backed by a single SQLite file.
///
/// Clones share the inner connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_one_fact(&self, sql: String, key: String) -> Result<Option<Fact>> {
    let raw: Option<RawFact> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![key], RawFact::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawFact::into_fact).transpose()
  }
}

// ─── MapaStore impl ──────────────────────────────────────────────────────────

impl MapaStore for SqliteStore {
  type Error = crate::Error;

  // ── Facts ─────────────────────────────────────────────────────────────────

  async fn find_by_fingerprint(&self, fingerprint: Fingerprint) -> Result<Option<Fact>> {
    self
      .query_one_fact(
        format!("SELECT {FACT_COLUMNS} FROM facts WHERE fingerprint = ?1"),
        fingerprint.as_str().to_owned(),
      )
      .await
  }

  async fn save_fact(&self, fact: Fact) -> Result<()> {
    let row = FactRow::encode(fact)?;
    self
      .conn
      .call(move |conn| {
        upsert_fact(conn, &row)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_fact(&self, id: Uuid) -> Result<Option<Fact>> {
    self
      .query_one_fact(
        format!("SELECT {FACT_COLUMNS} FROM facts WHERE fact_id = ?1"),
        encode_uuid(id),
      )
      .await
  }

  async fn list_facts(&self, query: FactQuery) -> Result<Vec<Fact>> {
    let deleted = ReviewState::Deleted.as_ref().to_owned();
    let include_deleted = query.include_deleted;

    let raws: Vec<RawFact> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACT_COLUMNS} FROM facts
           WHERE ?1 OR review_state != ?2
           ORDER BY ingested_at, fact_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![include_deleted, deleted], RawFact::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut facts: Vec<Fact> = raws
      .into_iter()
      .map(RawFact::into_fact)
      .collect::<Result<_>>()?;

    // SQLite's lower() only folds ASCII; compare in Rust instead.
    if let Some(category) = &query.category {
      let wanted = category.trim().to_lowercase();
      facts.retain(|f| f.category.to_lowercase() == wanted);
    }

    Ok(facts)
  }

  // ── Collections ───────────────────────────────────────────────────────────

  async fn save_collection(&self, collection: Collection) -> Result<()> {
    let id_str        = encode_uuid(collection.collection_id);
    let algorithm     = collection.algorithm.as_ref().to_owned();
    let criteria_json = serde_json::to_string(&collection.criteria)?;
    let created_str   = encode_dt(collection.created_at);
    let updated_str   = encode_dt(collection.updated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO collections (
             collection_id, title, description, algorithm, criteria,
             administrator, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT (collection_id) DO UPDATE SET
             title         = excluded.title,
             description   = excluded.description,
             algorithm     = excluded.algorithm,
             criteria      = excluded.criteria,
             administrator = excluded.administrator,
             updated_at    = excluded.updated_at",
          rusqlite::params![
            id_str,
            collection.title,
            collection.description,
            algorithm,
            criteria_json,
            collection.administrator,
            created_str,
            updated_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_collection(&self, id: Uuid) -> Result<Option<Collection>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCollection> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {COLLECTION_COLUMNS} FROM collections WHERE collection_id = ?1"
              ),
              rusqlite::params![id_str],
              RawCollection::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCollection::into_collection).transpose()
  }

  async fn list_collections(&self) -> Result<Vec<Collection>> {
    let raws: Vec<RawCollection> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {COLLECTION_COLUMNS} FROM collections
           ORDER BY created_at, collection_id"
        ))?;
        let rows = stmt
          .query_map([], RawCollection::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCollection::into_collection).collect()
  }

  // ── Memberships ───────────────────────────────────────────────────────────

  async fn save_membership(&self, membership: Membership) -> Result<()> {
    let collection_str = encode_uuid(membership.collection_id);
    let fact_str       = encode_uuid(membership.fact_id);
    let verdict        = membership.verdict.as_ref().to_owned();
    let at_str         = encode_dt(membership.evaluated_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO memberships (collection_id, fact_id, verdict, evaluated_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (collection_id, fact_id) DO UPDATE SET
             verdict      = excluded.verdict,
             evaluated_at = excluded.evaluated_at",
          rusqlite::params![collection_str, fact_str, verdict, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn list_memberships(&self, collection_id: Uuid) -> Result<Vec<Membership>> {
    let id_str = encode_uuid(collection_id);

    let raws: Vec<RawMembership> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT m.collection_id, m.fact_id, m.verdict, m.evaluated_at
           FROM memberships m
           JOIN facts f ON f.fact_id = m.fact_id
           WHERE m.collection_id = ?1
           ORDER BY f.ingested_at, m.fact_id",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawMembership {
              collection_id: row.get(0)?,
              fact_id:       row.get(1)?,
              verdict:       row.get(2)?,
              evaluated_at:  row.get(3)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMembership::into_membership).collect()
  }

  async fn list_members(&self, collection_id: Uuid) -> Result<Vec<Member>> {
    let id_str = encode_uuid(collection_id);
    let excluded = Verdict::Excluded.as_ref().to_owned();

    let raws: Vec<(RawFact, String)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {FACT_COLUMNS}, verdict
           FROM facts JOIN memberships USING (fact_id)
           WHERE collection_id = ?1 AND verdict != ?2
           ORDER BY ingested_at, fact_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str, excluded], |row| {
            Ok((RawFact::from_row(row)?, row.get(14)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, verdict)| {
        Ok(Member {
          verdict: decode_variant("verdict", &verdict)?,
          fact:    raw.into_fact()?,
        })
      })
      .collect()
  }

  // ── Deletion requests ─────────────────────────────────────────────────────

  async fn save_deletion_request(&self, request: DeletionRequest) -> Result<()> {
    let row = RequestRow::encode(request)?;
    self
      .conn
      .call(move |conn| {
        upsert_request(conn, &row)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn resolve_deletion(&self, request: DeletionRequest, fact: Fact) -> Result<()> {
    let request_row = RequestRow::encode(request)?;
    let fact_row = FactRow::encode(fact)?;
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        upsert_fact(&tx, &fact_row)?;
        upsert_request(&tx, &request_row)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_deletion_request(&self, id: Uuid) -> Result<Option<DeletionRequest>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawDeletionRequest> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REQUEST_COLUMNS} FROM deletion_requests WHERE request_id = ?1"
              ),
              rusqlite::params![id_str],
              RawDeletionRequest::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDeletionRequest::into_request).transpose()
  }

  async fn list_deletion_requests(
    &self,
    state: Option<RequestState>,
  ) -> Result<Vec<DeletionRequest>> {
    let state_str = state.map(|s| s.as_ref().to_owned());

    let raws: Vec<RawDeletionRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQUEST_COLUMNS} FROM deletion_requests
           WHERE ?1 IS NULL OR state = ?1
           ORDER BY submitted_at, request_id"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![state_str], RawDeletionRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDeletionRequest::into_request).collect()
  }

  // ── Source checkpoints ────────────────────────────────────────────────────

  async fn source_checkpoint(&self, source: SourceId) -> Result<Option<DateTime<Utc>>> {
    let id_str = source.as_str().to_owned();

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT checkpoint FROM sources WHERE source_id = ?1",
              rusqlite::params![id_str],
              |r| r.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_dt).transpose()
  }

  async fn save_source_checkpoint(&self, source: SourceId, at: DateTime<Utc>) -> Result<()> {
    let id_str = source.as_str().to_owned();
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sources (source_id, checkpoint) VALUES (?1, ?2)
           ON CONFLICT (source_id) DO UPDATE SET checkpoint = excluded.checkpoint",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Shared statements ───────────────────────────────────────────────────────

fn upsert_fact(conn: &rusqlite::Connection, row: &FactRow) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO facts (
       fact_id, fingerprint, title, description, category,
       occurred_at, ingested_at, updated_at, tags, location,
       contributor, review_state, suggestion, provenance
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
     ON CONFLICT (fact_id) DO UPDATE SET
       fingerprint  = excluded.fingerprint,
       title        = excluded.title,
       description  = excluded.description,
       category     = excluded.category,
       occurred_at  = excluded.occurred_at,
       updated_at   = excluded.updated_at,
       tags         = excluded.tags,
       location     = excluded.location,
       contributor  = excluded.contributor,
       review_state = excluded.review_state,
       suggestion   = excluded.suggestion,
       provenance   = excluded.provenance",
    rusqlite::params![
      row.fact_id,
      row.fingerprint,
      row.title,
      row.description,
      row.category,
      row.occurred_at,
      row.ingested_at,
      row.updated_at,
      row.tags,
      row.location,
      row.contributor,
      row.review_state,
      row.suggestion,
      row.provenance,
    ],
  )?;
  Ok(())
}

fn upsert_request(conn: &rusqlite::Connection, row: &RequestRow) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO deletion_requests (
       request_id, fact_id, reason, requester, state, spam,
       rejection, submitted_at, resolved_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
     ON CONFLICT (request_id) DO UPDATE SET
       state       = excluded.state,
       spam        = excluded.spam,
       rejection   = excluded.rejection,
       resolved_at = excluded.resolved_at",
    rusqlite::params![
      row.request_id,
      row.fact_id,
      row.reason,
      row.requester,
      row.state,
      row.spam,
      row.rejection,
      row.submitted_at,
      row.resolved_at,
    ],
  )?;
  Ok(())
}
