//! Interval triggers for ingestion and consensus recompute.
//!
//! A trigger only calls into the orchestrator; overlap protection lives
//! there. Failed runs are logged and the next tick proceeds normally.

use std::{sync::Arc, time::Duration};

use mapa_core::{source::SourceAdapter, store::MapaStore};
use mapa_engine::{
  Error,
  orchestrator::{Orchestrator, RunKind},
  shutdown::Shutdown,
};
use tokio::{
  task::JoinHandle,
  time::{Instant, MissedTickBehavior},
};
use tracing::{error, info, warn};

/// Spawn a task invoking `kind` on `orchestrator` every `every` until
/// `shutdown` fires. Ingestion fires immediately; recompute waits one period.
pub fn spawn<S, A>(
  orchestrator: Arc<Orchestrator<S, A>>,
  kind: RunKind,
  every: Duration,
  mut shutdown: Shutdown,
) -> JoinHandle<()>
where
  S: MapaStore + 'static,
  A: SourceAdapter + 'static,
{
  tokio::spawn(async move {
    let start = match kind {
      RunKind::Ingest => Instant::now(),
      RunKind::Recompute => Instant::now() + every,
    };
    let mut ticker = tokio::time::interval_at(start, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(kind = ?kind, every_secs = every.as_secs(), "trigger armed");

    loop {
      tokio::select! {
        _ = shutdown.cancelled() => break,
        _ = ticker.tick() => {}
      }

      let result = match kind {
        RunKind::Ingest => orchestrator.run().await,
        RunKind::Recompute => orchestrator.recompute().await,
      };
      match result {
        Ok(_) => {}
        Err(Error::AlreadyRunning) => {
          warn!(kind = ?kind, "previous run still in progress, skipping tick");
        }
        Err(Error::Cancelled) => break,
        Err(e) => error!(kind = ?kind, error = %e, "scheduled run failed"),
      }
    }
    info!(kind = ?kind, "trigger stopped");
  })
}
