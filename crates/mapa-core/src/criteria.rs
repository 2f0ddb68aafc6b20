//! Collection membership criteria.
//!
//! A [`Criterion`] is a pure predicate over a [`Fact`]. A collection's
//! criteria are combined with logical AND by [`matches`]; soft-deleted facts
//! never match anything.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, fact::Fact};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Criterion {
  /// Exact category, ignoring case.
  Category { category: String },
  /// Case-insensitive substring of the description.
  DescriptionContains { text: String },
  /// Case-insensitive substring of the title.
  TitleContains { text: String },
  /// Occurrence time within `[from, to]`.
  OccurredBetween { from: DateTime<Utc>, to: DateTime<Utc> },
  /// Ingestion time within `[from, to]`.
  IngestedBetween { from: DateTime<Utc>, to: DateTime<Utc> },
  /// Each level is optional; `None` leaves that level unconstrained.
  Place {
    #[serde(default)]
    country:      Option<String>,
    #[serde(default)]
    province:     Option<String>,
    #[serde(default)]
    municipality: Option<String>,
  },
}

impl Criterion {
  pub fn satisfies(&self, fact: &Fact) -> bool {
    match self {
      Self::Category { category } => {
        fact.category.to_lowercase() == category.trim().to_lowercase()
      }
      Self::DescriptionContains { text } => contains_folded(&fact.description, text),
      Self::TitleContains { text } => contains_folded(&fact.title, text),
      Self::OccurredBetween { from, to } => {
        *from <= fact.occurred_at && fact.occurred_at <= *to
      }
      Self::IngestedBetween { from, to } => {
        *from <= fact.ingested_at && fact.ingested_at <= *to
      }
      Self::Place { country, province, municipality } => {
        let place = fact.location.as_ref().and_then(|l| l.place.as_ref());
        level_matches(country, place.and_then(|p| p.country.as_deref()))
          && level_matches(province, place.and_then(|p| p.province.as_deref()))
          && level_matches(
            municipality,
            place.and_then(|p| p.municipality.as_deref()),
          )
      }
    }
  }

  /// Reject criteria that can never be meaningful.
  pub fn validate(&self) -> Result<()> {
    match self {
      Self::Category { category } if category.trim().is_empty() => {
        Err(Error::InvalidCriterion("category must not be blank".into()))
      }
      Self::DescriptionContains { text } | Self::TitleContains { text }
        if text.trim().is_empty() =>
      {
        Err(Error::InvalidCriterion("substring must not be blank".into()))
      }
      Self::OccurredBetween { from, to } | Self::IngestedBetween { from, to }
        if from > to =>
      {
        Err(Error::InvalidCriterion(format!(
          "date range starts at {from} but ends at {to}"
        )))
      }
      _ => Ok(()),
    }
  }
}

fn contains_folded(haystack: &str, needle: &str) -> bool {
  haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// `None` on the criterion side is a wildcard; `None` on the fact side fails
/// any constrained level.
fn level_matches(wanted: &Option<String>, actual: Option<&str>) -> bool {
  match (wanted, actual) {
    (None, _) => true,
    (Some(_), None) => false,
    (Some(w), Some(a)) => w.to_lowercase() == a.to_lowercase(),
  }
}

/// AND over every criterion. An empty set matches every live fact.
pub fn matches(fact: &Fact, criteria: &[Criterion]) -> bool {
  !fact.is_deleted() && criteria.iter().all(|c| c.satisfies(fact))
}

pub fn validate_all(criteria: &[Criterion]) -> Result<()> {
  criteria.iter().try_for_each(Criterion::validate)
}
