//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, TimeZone, Utc};
use mapa_core::{
  collection::{Membership, NewCollection},
  consensus::{ConsensusAlgorithm, Verdict},
  criteria::Criterion,
  deletion::{DeletionPolicy, DeletionRequest, NewDeletionRequest, RejectionReason, RequestState},
  fact::{Fact, Location, NewFact, Place, ReviewState, SourceId},
  spam::SpamClassifier,
  store::{FactQuery, MapaStore},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn fact(title: &str, category: &str) -> Fact {
  let mut input = NewFact::new(
    title,
    "Descripción del hecho",
    category,
    Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
  );
  input.tags.insert("vecinos".into());
  input.location = Some(Location {
    latitude:  -34.6,
    longitude: -58.4,
    place:     Some(Place {
      country:      Some("Argentina".into()),
      province:     Some("Buenos Aires".into()),
      municipality: Some("CABA".into()),
    }),
  });
  Fact::from_new(input, SourceId::new("estatica"), Utc::now())
}

// ─── Facts ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_get_fact_round_trips_all_fields() {
  let s = store().await;
  let mut f = fact("Granizo", "Tormenta");
  f.merge_provenance(SourceId::new("dinamica"), Utc::now());
  s.save_fact(f.clone()).await.unwrap();

  let fetched = s.get_fact(f.fact_id).await.unwrap().unwrap();
  assert_eq!(fetched.fact_id, f.fact_id);
  assert_eq!(fetched.fingerprint, f.fingerprint);
  assert_eq!(fetched.tags, f.tags);
  assert_eq!(fetched.location, f.location);
  assert_eq!(fetched.provenance, f.provenance);
  assert_eq!(fetched.review_state, ReviewState::Pending);
}

#[tokio::test]
async fn get_fact_missing_returns_none() {
  let s = store().await;
  assert!(s.get_fact(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn find_by_fingerprint_hits_saved_fact() {
  let s = store().await;
  let f = fact("Granizo", "Tormenta");
  s.save_fact(f.clone()).await.unwrap();

  let found = s.find_by_fingerprint(f.fingerprint.clone()).await.unwrap();
  assert_eq!(found.map(|x| x.fact_id), Some(f.fact_id));

  let other = fact("Otro", "Tormenta");
  assert!(s.find_by_fingerprint(other.fingerprint).await.unwrap().is_none());
}

#[tokio::test]
async fn save_fact_updates_in_place() {
  let s = store().await;
  let mut f = fact("Granizo", "Tormenta");
  s.save_fact(f.clone()).await.unwrap();

  f.merge_provenance(SourceId::contributor(), Utc::now());
  f.mark_deleted(Utc::now());
  s.save_fact(f.clone()).await.unwrap();

  let fetched = s.get_fact(f.fact_id).await.unwrap().unwrap();
  assert_eq!(fetched.provenance.len(), 2);
  assert_eq!(fetched.review_state, ReviewState::Deleted);
  assert_eq!(fetched.ingested_at, f.ingested_at);
}

#[tokio::test]
async fn fingerprint_is_unique_across_facts() {
  let s = store().await;
  let a = fact("Granizo", "Tormenta");
  let mut b = fact("Granizo", "Tormenta");
  b.fact_id = Uuid::new_v4();
  assert_eq!(a.fingerprint, b.fingerprint);

  s.save_fact(a).await.unwrap();
  assert!(s.save_fact(b).await.is_err());
}

#[tokio::test]
async fn list_facts_filters_category_and_deleted() {
  let s = store().await;
  let a = fact("Uno", "Inundación");
  let b = fact("Dos", "incendio");
  let mut c = fact("Tres", "INUNDACIÓN");
  c.mark_deleted(Utc::now());
  for f in [a.clone(), b, c] {
    s.save_fact(f).await.unwrap();
  }

  let live = s.list_facts(FactQuery::default()).await.unwrap();
  assert_eq!(live.len(), 2);

  let flooding = s
    .list_facts(FactQuery { category: Some("inundación".into()), include_deleted: true })
    .await
    .unwrap();
  assert_eq!(flooding.len(), 2);

  let flooding_live = s
    .list_facts(FactQuery { category: Some("inundación".into()), include_deleted: false })
    .await
    .unwrap();
  assert_eq!(flooding_live.iter().map(|f| f.fact_id).collect::<Vec<_>>(), vec![a.fact_id]);
}

// ─── Collections & memberships ───────────────────────────────────────────────

#[tokio::test]
async fn collections_round_trip_with_criteria() {
  let s = store().await;
  let now = Utc::now();
  let c = NewCollection {
    title:         "Incendios".into(),
    description:   "Focos activos".into(),
    algorithm:     "multiple_mentions".into(),
    criteria:      vec![
      Criterion::Category { category: "incendio".into() },
      Criterion::OccurredBetween { from: now - Duration::days(30), to: now },
    ],
    administrator: Some("admin".into()),
  }
  .build(now)
  .unwrap();
  s.save_collection(c.clone()).await.unwrap();

  let fetched = s.get_collection(c.collection_id).await.unwrap().unwrap();
  assert_eq!(fetched.algorithm, ConsensusAlgorithm::MultipleMentions);
  assert_eq!(fetched.criteria, c.criteria);

  assert_eq!(s.list_collections().await.unwrap().len(), 1);
  assert!(s.get_collection(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn membership_rows_upsert_per_pair() {
  let s = store().await;
  let now = Utc::now();
  let c = NewCollection {
    title:         "Todo".into(),
    description:   String::new(),
    algorithm:     "absolute".into(),
    criteria:      vec![],
    administrator: None,
  }
  .build(now)
  .unwrap();
  let f = fact("Granizo", "Tormenta");
  s.save_collection(c.clone()).await.unwrap();
  s.save_fact(f.clone()).await.unwrap();

  let row = |verdict| Membership {
    collection_id: c.collection_id,
    fact_id: f.fact_id,
    verdict,
    evaluated_at: now,
  };
  s.save_membership(row(Verdict::Pending)).await.unwrap();
  s.save_membership(row(Verdict::Accepted)).await.unwrap();

  let rows = s.list_memberships(c.collection_id).await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].verdict, Verdict::Accepted);
}

#[tokio::test]
async fn list_members_joins_facts_and_skips_excluded() {
  let s = store().await;
  let now = Utc::now();
  let c = NewCollection {
    title:         "Todo".into(),
    description:   String::new(),
    algorithm:     "absolute".into(),
    criteria:      vec![],
    administrator: None,
  }
  .build(now)
  .unwrap();
  s.save_collection(c.clone()).await.unwrap();

  let kept = fact("Granizo", "Tormenta");
  let gone = fact("Viento", "Tormenta");
  for (f, verdict) in [(&kept, Verdict::Accepted), (&gone, Verdict::Excluded)] {
    s.save_fact(f.clone()).await.unwrap();
    s.save_membership(Membership {
      collection_id: c.collection_id,
      fact_id: f.fact_id,
      verdict,
      evaluated_at: now,
    })
    .await
    .unwrap();
  }

  let members = s.list_members(c.collection_id).await.unwrap();
  assert_eq!(members.len(), 1);
  assert_eq!(members[0].verdict, Verdict::Accepted);
  assert_eq!(members[0].fact.fact_id, kept.fact_id);
  assert_eq!(members[0].fact.title, "Granizo");
  assert!(s.list_members(Uuid::new_v4()).await.unwrap().is_empty());
}

// ─── Deletion requests ───────────────────────────────────────────────────────

fn pending_request(fact_id: Uuid) -> DeletionRequest {
  DeletionPolicy { min_reason_chars: 10 }.screen(
    NewDeletionRequest {
      fact_id,
      reason: "El hecho está duplicado en otra fuente".into(),
      requester: None,
    },
    &SpamClassifier::default(),
    Utc::now(),
  )
}

#[tokio::test]
async fn resolve_deletion_writes_request_and_fact_together() {
  let s = store().await;
  let mut f = fact("Granizo", "Tormenta");
  s.save_fact(f.clone()).await.unwrap();
  let mut request = pending_request(f.fact_id);
  s.save_deletion_request(request.clone()).await.unwrap();

  request.approve(Utc::now()).unwrap();
  f.mark_deleted(Utc::now());
  s.resolve_deletion(request.clone(), f.clone()).await.unwrap();

  let stored = s.get_deletion_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(stored.state, RequestState::Approved);
  let stored = s.get_fact(f.fact_id).await.unwrap().unwrap();
  assert_eq!(stored.review_state, ReviewState::Deleted);
}

#[tokio::test]
async fn failed_resolution_leaves_request_pending() {
  let s = store().await;
  let holder = fact("Granizo", "Tormenta");
  let mut target = fact("Viento", "Tormenta");
  s.save_fact(holder.clone()).await.unwrap();
  s.save_fact(target.clone()).await.unwrap();
  let mut request = pending_request(target.fact_id);
  s.save_deletion_request(request.clone()).await.unwrap();

  // Colliding fingerprint makes the fact write fail inside the transaction.
  request.approve(Utc::now()).unwrap();
  target.fingerprint = holder.fingerprint.clone();
  target.mark_deleted(Utc::now());
  assert!(s.resolve_deletion(request.clone(), target.clone()).await.is_err());

  let stored = s.get_deletion_request(request.request_id).await.unwrap().unwrap();
  assert_eq!(stored.state, RequestState::Pending);
  let stored = s.get_fact(target.fact_id).await.unwrap().unwrap();
  assert_eq!(stored.review_state, ReviewState::Pending);
}

#[tokio::test]
async fn deletion_requests_round_trip_and_filter() {
  let s = store().await;
  let f = fact("Granizo", "Tormenta");
  s.save_fact(f.clone()).await.unwrap();

  let classifier = SpamClassifier::default();
  let policy = DeletionPolicy { min_reason_chars: 10 };
  let now = Utc::now();
  let pending = policy.screen(
    NewDeletionRequest {
      fact_id:   f.fact_id,
      reason:    "El hecho está duplicado en otra fuente".into(),
      requester: Some("vecina".into()),
    },
    &classifier,
    now,
  );
  let spam = policy.screen(
    NewDeletionRequest { fact_id: f.fact_id, reason: "gratis oferta".into(), requester: None },
    &classifier,
    now,
  );
  s.save_deletion_request(pending.clone()).await.unwrap();
  s.save_deletion_request(spam.clone()).await.unwrap();

  let fetched = s.get_deletion_request(spam.request_id).await.unwrap().unwrap();
  assert!(fetched.spam);
  assert_eq!(fetched.rejection, Some(RejectionReason::Spam));
  assert!(fetched.resolved_at.is_some());

  let open = s.list_deletion_requests(Some(RequestState::Pending)).await.unwrap();
  assert_eq!(open.iter().map(|r| r.request_id).collect::<Vec<_>>(), vec![pending.request_id]);
  assert_eq!(s.list_deletion_requests(None).await.unwrap().len(), 2);

  let mut resolved = pending;
  resolved.approve(now).unwrap();
  s.save_deletion_request(resolved.clone()).await.unwrap();
  let fetched = s.get_deletion_request(resolved.request_id).await.unwrap().unwrap();
  assert_eq!(fetched.state, RequestState::Approved);
}

// ─── Source checkpoints ──────────────────────────────────────────────────────

#[tokio::test]
async fn checkpoints_start_empty_and_overwrite() {
  let s = store().await;
  let id = SourceId::new("estatica");
  assert!(s.source_checkpoint(id.clone()).await.unwrap().is_none());

  let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
  let second = first + Duration::hours(1);
  s.save_source_checkpoint(id.clone(), first).await.unwrap();
  s.save_source_checkpoint(id.clone(), second).await.unwrap();
  assert_eq!(s.source_checkpoint(id).await.unwrap(), Some(second));
}
