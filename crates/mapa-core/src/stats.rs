//! Aggregate statistics over facts and deletion requests.
//!
//! Pure and read-only: callers pick the facts (all live facts, one
//! collection's members, one category) and [`Stats::compute`] counts them.

use std::collections::BTreeMap;

use chrono::{DateTime, Timelike as _, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{deletion::DeletionRequest, fact::Fact, fingerprint::fold};

/// Narrows the facts a [`Stats`] is computed over.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsQuery {
  /// Only the current members of this collection.
  #[serde(default)]
  pub collection: Option<Uuid>,
  /// Only facts of this category, ignoring case and accents.
  #[serde(default)]
  pub category:   Option<String>,
}

impl StatsQuery {
  pub fn admits(&self, fact: &Fact) -> bool {
    self
      .category
      .as_deref()
      .is_none_or(|wanted| fold(wanted) == fold(&fact.category))
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Count {
  pub key:   String,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourCount {
  /// Hour of occurrence, 0-23 UTC.
  pub hour:  u32,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpamStats {
  pub total_requests: usize,
  pub spam:           usize,
  pub not_spam:       usize,
  /// 0.0 when there are no requests.
  pub spam_percent:   f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
  pub computed_at: DateTime<Utc>,
  pub total_facts: usize,
  /// Most frequent first; ties by key.
  pub by_category: Vec<Count>,
  /// Facts without a resolved province are not counted here.
  pub by_province: Vec<Count>,
  pub by_hour:     Vec<HourCount>,
  pub spam:        SpamStats,
}

impl Stats {
  pub fn compute(facts: &[Fact], requests: &[DeletionRequest], now: DateTime<Utc>) -> Self {
    let by_category = tally(facts.iter().map(|f| f.category.as_str()));
    let by_province = tally(facts.iter().filter_map(|f| {
      f.location.as_ref()?.place.as_ref()?.province.as_deref()
    }));

    let mut hours: BTreeMap<u32, usize> = BTreeMap::new();
    for fact in facts {
      *hours.entry(fact.occurred_at.hour()).or_default() += 1;
    }
    let mut by_hour: Vec<HourCount> =
      hours.into_iter().map(|(hour, count)| HourCount { hour, count }).collect();
    by_hour.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));

    Self {
      computed_at: now,
      total_facts: facts.len(),
      by_category,
      by_province,
      by_hour,
      spam: SpamStats::of(requests),
    }
  }

  pub fn top_category(&self) -> Option<&Count> { self.by_category.first() }

  pub fn top_province(&self) -> Option<&Count> { self.by_province.first() }

  pub fn peak_hour(&self) -> Option<u32> { self.by_hour.first().map(|h| h.hour) }
}

impl SpamStats {
  fn of(requests: &[DeletionRequest]) -> Self {
    let total_requests = requests.len();
    let spam = requests.iter().filter(|r| r.spam).count();
    let spam_percent = if total_requests == 0 {
      0.0
    } else {
      spam as f64 * 100.0 / total_requests as f64
    };
    Self { total_requests, spam, not_spam: total_requests - spam, spam_percent }
  }
}

/// Group by folded key, reporting the first spelling seen.
fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<Count> {
  let mut groups: BTreeMap<String, Count> = BTreeMap::new();
  for key in keys {
    groups
      .entry(fold(key))
      .or_insert_with(|| Count { key: key.trim().to_owned(), count: 0 })
      .count += 1;
  }
  let mut counts: Vec<Count> = groups.into_values().collect();
  counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
  counts
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::{
    deletion::{DeletionPolicy, NewDeletionRequest},
    fact::{Location, NewFact, Place, SourceId},
    spam::SpamClassifier,
  };

  fn fact(category: &str, hour: u32, province: Option<&str>) -> Fact {
    let mut input = NewFact::new(
      "Hecho",
      "descripción",
      category,
      Utc.with_ymd_and_hms(2024, 2, 1, hour, 0, 0).unwrap(),
    );
    input.location = province.map(|p| Location {
      latitude:  -34.6,
      longitude: -58.4,
      place:     Some(Place {
        country:      Some("Argentina".into()),
        province:     Some(p.into()),
        municipality: None,
      }),
    });
    Fact::from_new(input, SourceId::new("a"), Utc::now())
  }

  #[test]
  fn counts_group_by_folded_key() {
    let facts = [
      fact("Inundación", 6, Some("Buenos Aires")),
      fact("inundacion", 6, Some("buenos aires")),
      fact("Incendio", 14, Some("Córdoba")),
      fact("Incendio", 6, None),
      fact("inundación", 22, None),
    ];
    let stats = Stats::compute(&facts, &[], Utc::now());

    assert_eq!(stats.total_facts, 5);
    assert_eq!(stats.top_category(), Some(&Count { key: "Inundación".into(), count: 3 }));
    assert_eq!(stats.by_category[1], Count { key: "Incendio".into(), count: 2 });
    assert_eq!(stats.top_province(), Some(&Count { key: "Buenos Aires".into(), count: 2 }));
    assert_eq!(stats.by_province.iter().map(|c| c.count).sum::<usize>(), 3);
    assert_eq!(stats.peak_hour(), Some(6));
    assert_eq!(stats.by_hour.len(), 3);
  }

  #[test]
  fn empty_inputs_have_no_tops() {
    let stats = Stats::compute(&[], &[], Utc::now());
    assert_eq!(stats.total_facts, 0);
    assert!(stats.top_category().is_none());
    assert!(stats.peak_hour().is_none());
    assert_eq!(stats.spam.spam_percent, 0.0);
  }

  #[test]
  fn spam_share_of_requests() {
    let policy = DeletionPolicy { min_reason_chars: 5 };
    let classifier = SpamClassifier::default();
    let screen = |reason: &str| {
      policy.screen(
        NewDeletionRequest { fact_id: Uuid::new_v4(), reason: reason.into(), requester: None },
        &classifier,
        Utc::now(),
      )
    };
    let requests = [
      screen("ganar dinero gratis"),
      screen("El hecho está repetido"),
      screen("La fecha informada es incorrecta"),
      screen("Ubicación equivocada"),
    ];
    let spam = Stats::compute(&[], &requests, Utc::now()).spam;
    assert_eq!(spam, SpamStats {
      total_requests: 4,
      spam:           1,
      not_spam:       3,
      spam_percent:   25.0,
    });
  }

  #[test]
  fn query_filters_category_loosely() {
    let q = StatsQuery { collection: None, category: Some("INUNDACION".into()) };
    assert!(q.admits(&fact("Inundación", 0, None)));
    assert!(!q.admits(&fact("Incendio", 0, None)));
    assert!(StatsQuery::default().admits(&fact("Incendio", 0, None)));
  }
}
