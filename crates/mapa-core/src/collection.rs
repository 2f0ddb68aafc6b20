//! Collections and their memberships.
//!
//! A collection is a named view over facts: its criteria decide which facts
//! belong, its consensus algorithm decides whether each member is accepted.
//! Membership rows are derived state and are recomputed, never edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Result,
  consensus::{ConsensusAlgorithm, Verdict},
  criteria::{self, Criterion},
  fact::Fact,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
  pub collection_id: Uuid,
  pub title:         String,
  pub description:   String,
  pub algorithm:     ConsensusAlgorithm,
  /// Evaluated in order; all must hold.
  pub criteria:      Vec<Criterion>,
  pub administrator: Option<String>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Collection {
  pub fn matches(&self, fact: &Fact) -> bool { criteria::matches(fact, &self.criteria) }

  /// Swap the criteria set after validating it.
  pub fn replace_criteria(
    &mut self,
    criteria: Vec<Criterion>,
    now: DateTime<Utc>,
  ) -> Result<()> {
    criteria::validate_all(&criteria)?;
    self.criteria = criteria;
    self.updated_at = now;
    Ok(())
  }
}

/// Input to collection creation. The algorithm is given by name and resolved
/// here so that a typo fails creation instead of silently defaulting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCollection {
  pub title:         String,
  #[serde(default)]
  pub description:   String,
  pub algorithm:     String,
  #[serde(default)]
  pub criteria:      Vec<Criterion>,
  #[serde(default)]
  pub administrator: Option<String>,
}

impl NewCollection {
  pub fn build(self, now: DateTime<Utc>) -> Result<Collection> {
    let algorithm = ConsensusAlgorithm::from_name(&self.algorithm)?;
    criteria::validate_all(&self.criteria)?;
    Ok(Collection {
      collection_id: Uuid::new_v4(),
      title: self.title,
      description: self.description,
      algorithm,
      criteria: self.criteria,
      administrator: self.administrator,
      created_at: now,
      updated_at: now,
    })
  }
}

/// The recorded verdict for one (collection, fact) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
  pub collection_id: Uuid,
  pub fact_id:       Uuid,
  pub verdict:       Verdict,
  pub evaluated_at:  DateTime<Utc>,
}

/// A member fact together with its verdict in one collection.
#[derive(Debug, Clone, Serialize)]
pub struct Member {
  pub verdict: Verdict,
  pub fact:    Fact,
}
