//! Fact types: the fundamental unit of the aggregator.
//!
//! A fact is a single reported real-world event. Its content (title,
//! description, occurrence time, location) determines its [`Fingerprint`];
//! two reports with the same fingerprint are the same event and collapse into
//! one record whose provenance lists every source that reported it.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  fingerprint::{ContentKey, Fingerprint},
};

// ─── Provenance ──────────────────────────────────────────────────────────────

/// Stable identifier of a source; recorded in a fact's provenance set.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
  /// Provenance recorded for facts submitted directly through the API.
  pub const CONTRIBUTOR: &'static str = "contributor";

  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn contributor() -> Self { Self(Self::CONTRIBUTOR.to_owned()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for SourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// Resolved administrative hierarchy for a coordinate pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Place {
  pub country:      Option<String>,
  pub province:     Option<String>,
  pub municipality: Option<String>,
}

/// Where an event happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
  pub latitude:  f64,
  pub longitude: f64,
  /// Filled by the source or by [`crate::place::PlaceResolver`] on admission.
  #[serde(default)]
  pub place:     Option<Place>,
}

impl Location {
  pub fn is_valid(&self) -> bool {
    (-90.0..=90.0).contains(&self.latitude)
      && (-180.0..=180.0).contains(&self.longitude)
  }
}

// ─── Review ──────────────────────────────────────────────────────────────────

/// Moderation state of a fact. `Deleted` is a soft mark; facts are never
/// removed from the store.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReviewState {
  #[default]
  Pending,
  Accepted,
  AcceptedWithSuggestions,
  Rejected,
  Deleted,
}

/// A moderator's decision on a pending fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReviewDecision {
  Accepted,
  AcceptedWithSuggestions { suggestion: String },
  Rejected,
}

// ─── NewFact ─────────────────────────────────────────────────────────────────

/// Fact content as emitted by a source or submitted by a contributor.
/// Identity, timestamps, fingerprint and provenance are assigned on admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFact {
  pub title:       String,
  pub description: String,
  pub category:    String,
  pub occurred_at: DateTime<Utc>,
  #[serde(default)]
  pub tags:        BTreeSet<String>,
  #[serde(default)]
  pub location:    Option<Location>,
  #[serde(default)]
  pub contributor: Option<String>,
}

impl NewFact {
  /// Convenience constructor with all optional fields empty.
  pub fn new(
    title: impl Into<String>,
    description: impl Into<String>,
    category: impl Into<String>,
    occurred_at: DateTime<Utc>,
  ) -> Self {
    Self {
      title: title.into(),
      description: description.into(),
      category: category.into(),
      occurred_at,
      tags: BTreeSet::new(),
      location: None,
      contributor: None,
    }
  }

  /// Canonical form applied before fingerprinting: whitespace in title and
  /// category collapsed, blank tags dropped, coordinates rounded to five
  /// decimals.
  pub fn normalized(mut self) -> Self {
    self.title = collapse_whitespace(&self.title);
    self.category = collapse_whitespace(&self.category);
    self.description = self.description.trim().to_owned();
    self.tags = self
      .tags
      .into_iter()
      .map(|t| collapse_whitespace(&t))
      .filter(|t| !t.is_empty())
      .collect();
    if let Some(loc) = self.location.as_mut() {
      loc.latitude = round_to(loc.latitude, 5);
      loc.longitude = round_to(loc.longitude, 5);
    }
    self
  }

  pub fn content_key(&self) -> ContentKey<'_> {
    ContentKey {
      title:       &self.title,
      description: &self.description,
      occurred_at: self.occurred_at,
      location:    self.location.as_ref(),
    }
  }
}

fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn round_to(value: f64, decimals: i32) -> f64 {
  let factor = 10f64.powi(decimals);
  (value * factor).round() / factor
}

// ─── Fact ────────────────────────────────────────────────────────────────────

/// A stored fact. Content fields change only through [`Fact::apply_edit`],
/// which recomputes the fingerprint in the same step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
  pub fact_id:      Uuid,
  pub title:        String,
  pub description:  String,
  pub category:     String,
  pub occurred_at:  DateTime<Utc>,
  /// Server-assigned on first admission; never changes afterwards.
  pub ingested_at:  DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
  pub tags:         BTreeSet<String>,
  pub location:     Option<Location>,
  pub contributor:  Option<String>,
  pub fingerprint:  Fingerprint,
  pub review_state: ReviewState,
  pub suggestion:   Option<String>,
  pub provenance:   BTreeSet<SourceId>,
}

impl Fact {
  /// Build a fresh record from admitted content reported by `source`.
  pub fn from_new(input: NewFact, source: SourceId, now: DateTime<Utc>) -> Self {
    let fingerprint = Fingerprint::of(&input.content_key());
    Self {
      fact_id: Uuid::new_v4(),
      title: input.title,
      description: input.description,
      category: input.category,
      occurred_at: input.occurred_at,
      ingested_at: now,
      updated_at: now,
      tags: input.tags,
      location: input.location,
      contributor: input.contributor,
      fingerprint,
      review_state: ReviewState::default(),
      suggestion: None,
      provenance: BTreeSet::from([source]),
    }
  }

  pub fn content_key(&self) -> ContentKey<'_> {
    ContentKey {
      title:       &self.title,
      description: &self.description,
      occurred_at: self.occurred_at,
      location:    self.location.as_ref(),
    }
  }

  /// The content fields only, e.g. for re-publishing through a proxy.
  pub fn content(&self) -> NewFact {
    NewFact {
      title:       self.title.clone(),
      description: self.description.clone(),
      category:    self.category.clone(),
      occurred_at: self.occurred_at,
      tags:        self.tags.clone(),
      location:    self.location.clone(),
      contributor: self.contributor.clone(),
    }
  }

  pub fn is_deleted(&self) -> bool { self.review_state == ReviewState::Deleted }

  /// Add `source` to the provenance set. Returns `false` if it was already
  /// present, in which case nothing changes.
  pub fn merge_provenance(&mut self, source: SourceId, now: DateTime<Utc>) -> bool {
    let added = self.provenance.insert(source);
    if added {
      self.updated_at = now;
    }
    added
  }

  /// Replace the content fields and recompute the fingerprint.
  pub fn apply_edit(&mut self, content: NewFact, now: DateTime<Utc>) -> Result<()> {
    if self.is_deleted() {
      return Err(Error::FactDeleted(self.fact_id));
    }
    self.fingerprint = Fingerprint::of(&content.content_key());
    self.title = content.title;
    self.description = content.description;
    self.category = content.category;
    self.occurred_at = content.occurred_at;
    self.tags = content.tags;
    self.location = content.location;
    self.contributor = content.contributor;
    self.updated_at = now;
    Ok(())
  }

  pub fn review(&mut self, decision: ReviewDecision, now: DateTime<Utc>) -> Result<()> {
    if self.is_deleted() {
      return Err(Error::FactDeleted(self.fact_id));
    }
    let (state, suggestion) = match decision {
      ReviewDecision::Accepted => (ReviewState::Accepted, None),
      ReviewDecision::AcceptedWithSuggestions { suggestion } => {
        (ReviewState::AcceptedWithSuggestions, Some(suggestion))
      }
      ReviewDecision::Rejected => (ReviewState::Rejected, None),
    };
    self.review_state = state;
    self.suggestion = suggestion;
    self.updated_at = now;
    Ok(())
  }

  pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
    self.review_state = ReviewState::Deleted;
    self.updated_at = now;
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn sample() -> NewFact {
    NewFact::new(
      "  Incendio   forestal ",
      "Fuego en la ladera norte ",
      " incendio ",
      Utc.with_ymd_and_hms(2024, 1, 10, 14, 30, 0).unwrap(),
    )
  }

  #[test]
  fn normalized_collapses_whitespace_and_rounds_coordinates() {
    let mut input = sample();
    input.tags = BTreeSet::from(["  ".to_owned(), " humo ".to_owned()]);
    input.location = Some(Location {
      latitude:  -34.6037123456,
      longitude: -58.3815987654,
      place:     None,
    });

    let n = input.normalized();
    assert_eq!(n.title, "Incendio forestal");
    assert_eq!(n.category, "incendio");
    assert_eq!(n.description, "Fuego en la ladera norte");
    assert_eq!(n.tags, BTreeSet::from(["humo".to_owned()]));
    let loc = n.location.unwrap();
    assert_eq!(loc.latitude, -34.60371);
    assert_eq!(loc.longitude, -58.3816);
  }

  #[test]
  fn merge_provenance_reports_growth_only_once() {
    let now = Utc::now();
    let mut fact = Fact::from_new(sample(), SourceId::new("a"), now);
    assert!(fact.merge_provenance(SourceId::new("b"), now));
    assert!(!fact.merge_provenance(SourceId::new("b"), now));
    assert_eq!(fact.provenance.len(), 2);
  }

  #[test]
  fn edit_recomputes_fingerprint() {
    let now = Utc::now();
    let mut fact = Fact::from_new(sample(), SourceId::new("a"), now);
    let before = fact.fingerprint.clone();

    let mut content = fact.content();
    content.title = "Inundación".into();
    fact.apply_edit(content, now).unwrap();

    assert_ne!(fact.fingerprint, before);
    assert_eq!(fact.fingerprint, Fingerprint::of(&fact.content_key()));
  }

  #[test]
  fn deleted_fact_rejects_review_and_edit() {
    let now = Utc::now();
    let mut fact = Fact::from_new(sample(), SourceId::new("a"), now);
    fact.mark_deleted(now);

    assert!(matches!(
      fact.review(ReviewDecision::Accepted, now),
      Err(Error::FactDeleted(_))
    ));
    assert!(matches!(
      fact.apply_edit(sample(), now),
      Err(Error::FactDeleted(_))
    ));
  }

  #[test]
  fn review_with_suggestion_records_it() {
    let now = Utc::now();
    let mut fact = Fact::from_new(sample(), SourceId::new("a"), now);
    fact
      .review(
        ReviewDecision::AcceptedWithSuggestions { suggestion: "add photo".into() },
        now,
      )
      .unwrap();
    assert_eq!(fact.review_state, ReviewState::AcceptedWithSuggestions);
    assert_eq!(fact.suggestion.as_deref(), Some("add photo"));
  }
}
