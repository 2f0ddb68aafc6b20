//! The ingestion orchestrator.
//!
//! A run pulls every registered source (a bounded number at a time), admits
//! what they return through the deduplicator, then lets each collection
//! re-evaluate the touched facts. Runs never overlap: a second call while one
//! is in progress fails with [`Error::AlreadyRunning`].

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use futures::{StreamExt as _, stream};
use mapa_core::{
  fact::{Fact, SourceId},
  source::{SourceAdapter, ensure_unique_ids},
  store::MapaStore,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  dedup::{AdmissionOutcome, FingerprintDeduplicator},
  membership::MembershipService,
  shutdown::Shutdown,
};

/// Tunables for a run, read from the `[ingest]` configuration table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
  pub fetch_timeout_secs:     u64,
  pub max_concurrent_fetches: usize,
  /// Follow every ingestion run with a full consensus recompute.
  pub recompute_after_run:    bool,
}

impl Default for IngestSettings {
  fn default() -> Self {
    Self {
      fetch_timeout_secs:     30,
      max_concurrent_fetches: 4,
      recompute_after_run:    true,
    }
  }
}

impl IngestSettings {
  pub fn fetch_timeout(&self) -> Duration { Duration::from_secs(self.fetch_timeout_secs) }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
  Ingest,
  Recompute,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
  Ok,
  Failed { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
  pub source_id: SourceId,
  pub fetched:   usize,
  pub status:    SourceStatus,
}

/// Summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
  pub kind:                RunKind,
  pub started_at:          DateTime<Utc>,
  pub finished_at:         DateTime<Utc>,
  pub sources:             Vec<SourceReport>,
  pub facts_new:           usize,
  pub facts_merged:        usize,
  pub facts_known:         usize,
  pub memberships_changed: usize,
}

impl RunReport {
  fn new(kind: RunKind, started_at: DateTime<Utc>) -> Self {
    Self {
      kind,
      started_at,
      finished_at: started_at,
      sources: Vec::new(),
      facts_new: 0,
      facts_merged: 0,
      facts_known: 0,
      memberships_changed: 0,
    }
  }

  pub fn failed_sources(&self) -> usize {
    self
      .sources
      .iter()
      .filter(|s| matches!(s.status, SourceStatus::Failed { .. }))
      .count()
  }
}

/// What one source contributed to a run.
struct Pull {
  report:    SourceReport,
  new:       usize,
  merged:    usize,
  known:     usize,
  touched:   Vec<Fact>,
  cancelled: bool,
}

impl Pull {
  fn new(source_id: SourceId) -> Self {
    Self {
      report:    SourceReport { source_id, fetched: 0, status: SourceStatus::Ok },
      new:       0,
      merged:    0,
      known:     0,
      touched:   Vec::new(),
      cancelled: false,
    }
  }

  fn failed(mut self, error: &Error) -> Self {
    warn!(source = %self.report.source_id, error = %error, "source failed, skipping");
    self.report.status = SourceStatus::Failed { reason: error.to_string() };
    self
  }

  fn cancelled(mut self) -> Self {
    self.cancelled = true;
    self.report.status = SourceStatus::Failed { reason: Error::Cancelled.to_string() };
    self
  }
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Orchestrator<S, A> {
  store:      Arc<S>,
  dedup:      Arc<FingerprintDeduplicator<S>>,
  membership: Arc<MembershipService<S>>,
  sources:    Vec<A>,
  settings:   IngestSettings,
  shutdown:   Shutdown,
  running:    Mutex<()>,
}

impl<S, A> Orchestrator<S, A>
where
  S: MapaStore,
  A: SourceAdapter,
{
  /// Fails if two sources share an identifier.
  pub fn new(
    store: Arc<S>,
    dedup: Arc<FingerprintDeduplicator<S>>,
    membership: Arc<MembershipService<S>>,
    sources: Vec<A>,
    settings: IngestSettings,
    shutdown: Shutdown,
  ) -> Result<Self> {
    ensure_unique_ids(sources.iter().map(A::id))?;
    Ok(Self {
      store,
      dedup,
      membership,
      sources,
      settings,
      shutdown,
      running: Mutex::new(()),
    })
  }

  pub fn sources(&self) -> &[A] { &self.sources }

  /// Pull every source once and fold the results into the collections.
  ///
  /// A failing or timed-out source is recorded in the report and does not
  /// stop the others; its checkpoint stays where it was.
  pub async fn run(&self) -> Result<RunReport> {
    let _running = self.running.try_lock().map_err(|_| Error::AlreadyRunning)?;
    let mut report = RunReport::new(RunKind::Ingest, Utc::now());
    info!(sources = self.sources.len(), "ingestion run started");

    let fetches: Vec<_> = self.sources.iter().map(|s| self.pull(s)).collect();
    let pulls: Vec<Pull> = stream::iter(fetches)
      .buffer_unordered(self.settings.max_concurrent_fetches.max(1))
      .collect()
      .await;

    let mut touched: HashMap<Uuid, Fact> = HashMap::new();
    let mut cancelled = false;
    for pull in pulls {
      report.facts_new += pull.new;
      report.facts_merged += pull.merged;
      report.facts_known += pull.known;
      cancelled |= pull.cancelled;
      // Provenance only grows, so the largest copy is the latest.
      for fact in pull.touched {
        let newer = touched
          .get(&fact.fact_id)
          .is_none_or(|seen| seen.provenance.len() < fact.provenance.len());
        if newer {
          touched.insert(fact.fact_id, fact);
        }
      }
      report.sources.push(pull.report);
    }
    report.sources.sort_by(|a, b| a.source_id.cmp(&b.source_id));

    // Admitted facts are folded in even when the run was cancelled.
    let touched: Vec<Fact> = touched.into_values().collect();
    report.memberships_changed = self.membership.apply_facts(&touched).await?;

    if cancelled {
      warn!(admitted = touched.len(), "ingestion run cancelled");
      return Err(Error::Cancelled);
    }

    if self.settings.recompute_after_run {
      report.memberships_changed += self.membership.recompute_all().await?;
    }

    report.finished_at = Utc::now();
    info!(
      new = report.facts_new,
      merged = report.facts_merged,
      known = report.facts_known,
      failed_sources = report.failed_sources(),
      memberships_changed = report.memberships_changed,
      "ingestion run finished"
    );
    Ok(report)
  }

  /// The low-load full pass: every collection against every fact.
  pub async fn recompute(&self) -> Result<RunReport> {
    let _running = self.running.try_lock().map_err(|_| Error::AlreadyRunning)?;
    let mut report = RunReport::new(RunKind::Recompute, Utc::now());

    report.memberships_changed = self.membership.recompute_all().await?;
    report.finished_at = Utc::now();
    info!(memberships_changed = report.memberships_changed, "consensus recompute finished");
    Ok(report)
  }

  /// Fetch one source and admit what it returned.
  async fn pull(&self, source: &A) -> Pull {
    let id = source.id().clone();
    let pull = Pull::new(id.clone());
    let started = Utc::now();

    let since = match self.store.source_checkpoint(id.clone()).await {
      Ok(since) => since,
      Err(e) => return pull.failed(&Error::store(e)),
    };

    let timeout = self.settings.fetch_timeout();
    let mut shutdown = self.shutdown.clone();
    let fetched = tokio::select! {
      _ = shutdown.cancelled() => return pull.cancelled(),
      fetched = tokio::time::timeout(timeout, source.fetch_since(since)) => fetched,
    };

    let facts = match fetched {
      Ok(Ok(facts)) => facts,
      Ok(Err(e)) => {
        return pull.failed(&Error::SourceUnavailable { source_id: id, reason: e.to_string() });
      }
      Err(_) => return pull.failed(&Error::SourceTimedOut { source_id: id, after: timeout }),
    };

    let mut pull = pull;
    pull.report.fetched = facts.len();
    for input in facts {
      if self.shutdown.is_triggered() {
        return pull.cancelled();
      }
      match self.dedup.admit(input, id.clone()).await {
        Ok(admission) => match admission.outcome {
          AdmissionOutcome::New => {
            pull.new += 1;
            pull.touched.push(admission.fact);
          }
          AdmissionOutcome::Merged => {
            pull.merged += 1;
            pull.touched.push(admission.fact);
          }
          AdmissionOutcome::Known => pull.known += 1,
        },
        Err(e) => return pull.failed(&e),
      }
    }

    if let Err(e) = self.store.save_source_checkpoint(id.clone(), started).await {
      return pull.failed(&Error::store(e));
    }
    info!(source = %id, fetched = pull.report.fetched, new = pull.new, "source pulled");
    pull
  }
}
