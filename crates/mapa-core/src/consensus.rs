//! Consensus algorithms and the per-collection verdict engine.
//!
//! Verdicts are a pure function of the current facts: nothing is counted
//! incrementally, so evaluating the same inputs twice yields no changes the
//! second time.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  collection::Collection,
  fact::{Fact, SourceId},
};

// ─── Algorithms ──────────────────────────────────────────────────────────────

/// The named consensus strategies a collection can select.
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
  strum::VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ConsensusAlgorithm {
  /// Accepted as soon as the fact matches the collection's criteria.
  Absolute,
  /// Accepted when reported by more than half of the sources that
  /// contribute matching facts to the collection.
  SimpleMajority,
  /// Accepted when reported by at least two distinct sources.
  MultipleMentions,
}

impl ConsensusAlgorithm {
  /// Resolve an algorithm by name. Unknown names are a configuration error.
  pub fn from_name(name: &str) -> Result<Self> {
    name
      .trim()
      .parse()
      .map_err(|_| Error::UnknownConsensusAlgorithm(name.to_owned()))
  }

  /// Verdict for a fact already known to match the collection.
  ///
  /// `contributing` holds every source appearing in the provenance of any
  /// matching fact of the collection.
  pub fn verdict(self, fact: &Fact, contributing: &BTreeSet<&SourceId>) -> Verdict {
    let accepted = match self {
      Self::Absolute => true,
      Self::SimpleMajority => {
        let reporting = fact
          .provenance
          .iter()
          .filter(|s| contributing.contains(s))
          .count();
        2 * reporting > contributing.len()
      }
      Self::MultipleMentions => fact.provenance.len() >= 2,
    };
    if accepted { Verdict::Accepted } else { Verdict::Pending }
  }
}

// ─── Verdicts ────────────────────────────────────────────────────────────────

/// Status of a fact within one collection.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::AsRefStr,
  strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Verdict {
  Pending,
  Accepted,
  /// Was a member, no longer satisfies the criteria.
  Excluded,
}

impl Verdict {
  pub fn is_member(self) -> bool { !matches!(self, Self::Excluded) }
}

/// A verdict that differs from what was previously recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictChange {
  pub fact_id:  Uuid,
  pub previous: Option<Verdict>,
  pub verdict:  Verdict,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Evaluate `candidates` against `collection` and return only the changed
/// rows.
///
/// `candidates` must include every fact that currently matches the collection
/// for the simple-majority count to be exact (the current members plus any
/// newly touched facts is enough). Facts that do not match and were never
/// members produce no row.
pub fn evaluate(
  collection: &Collection,
  candidates: &[Fact],
  previous: &HashMap<Uuid, Verdict>,
) -> Vec<VerdictChange> {
  let mut seen = HashSet::new();
  let unique: Vec<&Fact> = candidates
    .iter()
    .filter(|f| seen.insert(f.fact_id))
    .collect();

  let matched: HashSet<Uuid> = unique
    .iter()
    .filter(|f| collection.matches(f))
    .map(|f| f.fact_id)
    .collect();

  let contributing: BTreeSet<&SourceId> = unique
    .iter()
    .filter(|f| matched.contains(&f.fact_id))
    .flat_map(|f| f.provenance.iter())
    .collect();

  unique
    .into_iter()
    .filter_map(|fact| {
      let verdict = if matched.contains(&fact.fact_id) {
        collection.algorithm.verdict(fact, &contributing)
      } else {
        Verdict::Excluded
      };
      let prev = previous.get(&fact.fact_id).copied();
      match prev {
        None if verdict == Verdict::Excluded => None,
        Some(p) if p == verdict => None,
        _ => Some(VerdictChange { fact_id: fact.fact_id, previous: prev, verdict }),
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};

  use super::*;
  use crate::{
    collection::NewCollection,
    criteria::Criterion,
    fact::NewFact,
  };

  fn collection(algorithm: &str, criteria: Vec<Criterion>) -> Collection {
    NewCollection {
      title: "Incendios".into(),
      description: String::new(),
      algorithm: algorithm.into(),
      criteria,
      administrator: None,
    }
    .build(Utc::now())
    .unwrap()
  }

  fn fact(title: &str, sources: &[&str]) -> Fact {
    let input = NewFact::new(
      title,
      "descripción",
      "incendio",
      Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    );
    let mut f = Fact::from_new(input, SourceId::new(sources[0]), Utc::now());
    for s in &sources[1..] {
      f.merge_provenance(SourceId::new(*s), Utc::now());
    }
    f
  }

  #[test]
  fn unknown_algorithm_name_is_rejected() {
    assert!(matches!(
      ConsensusAlgorithm::from_name("por_defecto"),
      Err(Error::UnknownConsensusAlgorithm(_))
    ));
    assert_eq!(
      ConsensusAlgorithm::from_name(" Simple_Majority ").unwrap(),
      ConsensusAlgorithm::SimpleMajority
    );
  }

  #[test]
  fn absolute_accepts_in_the_same_pass() {
    let c = collection("absolute", vec![]);
    let f = fact("a", &["s1"]);
    let changes = evaluate(&c, std::slice::from_ref(&f), &HashMap::new());
    assert_eq!(changes, vec![VerdictChange {
      fact_id:  f.fact_id,
      previous: None,
      verdict:  Verdict::Accepted,
    }]);
  }

  #[test]
  fn simple_majority_counts_distinct_contributing_sources() {
    let c = collection("simple_majority", vec![]);
    let shared = fact("shared", &["s1", "s2"]);
    let lonely = fact("lonely", &["s3"]);
    let changes = evaluate(&c, &[shared.clone(), lonely.clone()], &HashMap::new());

    let by_id: HashMap<_, _> = changes.iter().map(|c| (c.fact_id, c.verdict)).collect();
    // Contributing = {s1, s2, s3}: 2 of 3 is a majority, 1 of 3 is not.
    assert_eq!(by_id[&shared.fact_id], Verdict::Accepted);
    assert_eq!(by_id[&lonely.fact_id], Verdict::Pending);
  }

  #[test]
  fn multiple_mentions_needs_two_sources() {
    let c = collection("multiple_mentions", vec![]);
    let one = fact("one", &["s1"]);
    let two = fact("two", &["s1", "s2"]);
    let changes = evaluate(&c, &[one.clone(), two.clone()], &HashMap::new());
    let by_id: HashMap<_, _> = changes.iter().map(|c| (c.fact_id, c.verdict)).collect();
    assert_eq!(by_id[&one.fact_id], Verdict::Pending);
    assert_eq!(by_id[&two.fact_id], Verdict::Accepted);
  }

  #[test]
  fn re_evaluation_is_idempotent() {
    let c = collection("simple_majority", vec![]);
    let facts = vec![fact("a", &["s1", "s2"]), fact("b", &["s1"])];
    let first = evaluate(&c, &facts, &HashMap::new());
    let recorded: HashMap<_, _> = first.iter().map(|c| (c.fact_id, c.verdict)).collect();
    assert!(evaluate(&c, &facts, &recorded).is_empty());
  }

  #[test]
  fn failing_criteria_evicts_members_only() {
    let c = collection("absolute", vec![Criterion::TitleContains { text: "fuego".into() }]);
    let member = fact("agua", &["s1"]);
    let stranger = fact("niebla", &["s1"]);
    let previous = HashMap::from([(member.fact_id, Verdict::Accepted)]);

    let changes = evaluate(&c, &[member.clone(), stranger], &previous);
    assert_eq!(changes, vec![VerdictChange {
      fact_id:  member.fact_id,
      previous: Some(Verdict::Accepted),
      verdict:  Verdict::Excluded,
    }]);
  }

  #[test]
  fn duplicate_candidates_are_evaluated_once() {
    let c = collection("absolute", vec![]);
    let f = fact("a", &["s1"]);
    let changes = evaluate(&c, &[f.clone(), f], &HashMap::new());
    assert_eq!(changes.len(), 1);
  }
}
