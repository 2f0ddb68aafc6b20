//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase, enums their
//! snake_case names. Structured fields (tags, location, provenance, criteria,
//! rejection reasons) are compact JSON.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use mapa_core::{
  collection::{Collection, Membership},
  deletion::DeletionRequest,
  fact::Fact,
  fingerprint::Fingerprint,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

/// Parse a snake_case enum column.
pub fn decode_variant<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownVariant { column, value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `facts` SELECT, in [`RawFact`] field order.
pub const FACT_COLUMNS: &str = "fact_id, fingerprint, title, description, \
  category, occurred_at, ingested_at, updated_at, tags, location, \
  contributor, review_state, suggestion, provenance";

/// Raw strings read directly from a `facts` row.
pub struct RawFact {
  pub fact_id:      String,
  pub fingerprint:  String,
  pub title:        String,
  pub description:  String,
  pub category:     String,
  pub occurred_at:  String,
  pub ingested_at:  String,
  pub updated_at:   String,
  pub tags:         String,
  pub location:     Option<String>,
  pub contributor:  Option<String>,
  pub review_state: String,
  pub suggestion:   Option<String>,
  pub provenance:   String,
}

impl RawFact {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      fact_id:      row.get(0)?,
      fingerprint:  row.get(1)?,
      title:        row.get(2)?,
      description:  row.get(3)?,
      category:     row.get(4)?,
      occurred_at:  row.get(5)?,
      ingested_at:  row.get(6)?,
      updated_at:   row.get(7)?,
      tags:         row.get(8)?,
      location:     row.get(9)?,
      contributor:  row.get(10)?,
      review_state: row.get(11)?,
      suggestion:   row.get(12)?,
      provenance:   row.get(13)?,
    })
  }

  pub fn into_fact(self) -> Result<Fact> {
    Ok(Fact {
      fact_id:      decode_uuid(&self.fact_id)?,
      title:        self.title,
      description:  self.description,
      category:     self.category,
      occurred_at:  decode_dt(&self.occurred_at)?,
      ingested_at:  decode_dt(&self.ingested_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
      tags:         serde_json::from_str(&self.tags)?,
      location:     self
        .location
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      contributor:  self.contributor,
      fingerprint:  Fingerprint::from_hex(self.fingerprint),
      review_state: decode_variant("review_state", &self.review_state)?,
      suggestion:   self.suggestion,
      provenance:   serde_json::from_str(&self.provenance)?,
    })
  }
}

/// Column values for a `facts` upsert, encoded ahead of the blocking call.
pub struct FactRow {
  pub fact_id:      String,
  pub fingerprint:  String,
  pub title:        String,
  pub description:  String,
  pub category:     String,
  pub occurred_at:  String,
  pub ingested_at:  String,
  pub updated_at:   String,
  pub tags:         String,
  pub location:     Option<String>,
  pub contributor:  Option<String>,
  pub review_state: String,
  pub suggestion:   Option<String>,
  pub provenance:   String,
}

impl FactRow {
  pub fn encode(fact: Fact) -> Result<Self> {
    Ok(Self {
      fact_id:      encode_uuid(fact.fact_id),
      fingerprint:  fact.fingerprint.as_str().to_owned(),
      occurred_at:  encode_dt(fact.occurred_at),
      ingested_at:  encode_dt(fact.ingested_at),
      updated_at:   encode_dt(fact.updated_at),
      tags:         serde_json::to_string(&fact.tags)?,
      location:     fact
        .location
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?,
      review_state: fact.review_state.as_ref().to_owned(),
      provenance:   serde_json::to_string(&fact.provenance)?,
      title:        fact.title,
      description:  fact.description,
      category:     fact.category,
      contributor:  fact.contributor,
      suggestion:   fact.suggestion,
    })
  }
}

pub const COLLECTION_COLUMNS: &str = "collection_id, title, description, \
  algorithm, criteria, administrator, created_at, updated_at";

/// Raw strings read directly from a `collections` row.
pub struct RawCollection {
  pub collection_id: String,
  pub title:         String,
  pub description:   String,
  pub algorithm:     String,
  pub criteria:      String,
  pub administrator: Option<String>,
  pub created_at:    String,
  pub updated_at:    String,
}

impl RawCollection {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      collection_id: row.get(0)?,
      title:         row.get(1)?,
      description:   row.get(2)?,
      algorithm:     row.get(3)?,
      criteria:      row.get(4)?,
      administrator: row.get(5)?,
      created_at:    row.get(6)?,
      updated_at:    row.get(7)?,
    })
  }

  pub fn into_collection(self) -> Result<Collection> {
    Ok(Collection {
      collection_id: decode_uuid(&self.collection_id)?,
      title:         self.title,
      description:   self.description,
      algorithm:     decode_variant("algorithm", &self.algorithm)?,
      criteria:      serde_json::from_str(&self.criteria)?,
      administrator: self.administrator,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `memberships` row.
pub struct RawMembership {
  pub collection_id: String,
  pub fact_id:       String,
  pub verdict:       String,
  pub evaluated_at:  String,
}

impl RawMembership {
  pub fn into_membership(self) -> Result<Membership> {
    Ok(Membership {
      collection_id: decode_uuid(&self.collection_id)?,
      fact_id:       decode_uuid(&self.fact_id)?,
      verdict:       decode_variant("verdict", &self.verdict)?,
      evaluated_at:  decode_dt(&self.evaluated_at)?,
    })
  }
}

pub const REQUEST_COLUMNS: &str = "request_id, fact_id, reason, requester, \
  state, spam, rejection, submitted_at, resolved_at";

/// Column values for a `deletion_requests` upsert.
pub struct RequestRow {
  pub request_id:   String,
  pub fact_id:      String,
  pub reason:       String,
  pub requester:    Option<String>,
  pub state:        String,
  pub spam:         bool,
  pub rejection:    Option<String>,
  pub submitted_at: String,
  pub resolved_at:  Option<String>,
}

impl RequestRow {
  pub fn encode(request: DeletionRequest) -> Result<Self> {
    Ok(Self {
      request_id:   encode_uuid(request.request_id),
      fact_id:      encode_uuid(request.fact_id),
      state:        request.state.as_ref().to_owned(),
      rejection:    request
        .rejection
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?,
      submitted_at: encode_dt(request.submitted_at),
      resolved_at:  request.resolved_at.map(encode_dt),
      reason:       request.reason,
      requester:    request.requester,
      spam:         request.spam,
    })
  }
}

/// Raw values read directly from a `deletion_requests` row.
pub struct RawDeletionRequest {
  pub request_id:   String,
  pub fact_id:      String,
  pub reason:       String,
  pub requester:    Option<String>,
  pub state:        String,
  pub spam:         bool,
  pub rejection:    Option<String>,
  pub submitted_at: String,
  pub resolved_at:  Option<String>,
}

impl RawDeletionRequest {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:   row.get(0)?,
      fact_id:      row.get(1)?,
      reason:       row.get(2)?,
      requester:    row.get(3)?,
      state:        row.get(4)?,
      spam:         row.get(5)?,
      rejection:    row.get(6)?,
      submitted_at: row.get(7)?,
      resolved_at:  row.get(8)?,
    })
  }

  pub fn into_request(self) -> Result<DeletionRequest> {
    Ok(DeletionRequest {
      request_id:   decode_uuid(&self.request_id)?,
      fact_id:      decode_uuid(&self.fact_id)?,
      reason:       self.reason,
      requester:    self.requester,
      state:        decode_variant("state", &self.state)?,
      spam:         self.spam,
      rejection:    self
        .rejection
        .as_deref()
        .map(serde_json::from_str)
        .transpose()?,
      submitted_at: decode_dt(&self.submitted_at)?,
      resolved_at:  decode_opt_dt(self.resolved_at.as_deref())?,
    })
  }
}
