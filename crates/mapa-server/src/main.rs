//! `mapa` server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and either serves the API with scheduled ingestion or performs a
//! single run and exits.
//!
//! ```
//! mapa --config config.toml serve
//! mapa ingest
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use mapa_engine::{
  Services,
  orchestrator::{Orchestrator, RunKind},
  shutdown::{self, Shutdown, ShutdownTrigger},
  sources::{Source, build_registry},
};
use mapa_server::{ServerConfig, expand_tilde, schedule};
use mapa_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "MetaMapa fact aggregator")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
  /// Serve the API and run the configured triggers (default).
  Serve,
  /// Pull every source once, print the report and exit.
  Ingest,
  /// Recompute every collection once, print the report and exit.
  Recompute,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&cfg.store_path);
  if let Some(parent) = store_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent)
      .await
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let services = Services::new(Arc::new(store), cfg.place_resolver(), cfg.moderation);
  let sources = build_registry(&cfg.sources, cfg.ingest.settings.fetch_timeout())
    .context("invalid source configuration")?;

  let (trigger, shutdown) = shutdown::channel();
  let orchestrator = Arc::new(
    services
      .orchestrator(sources, cfg.ingest.settings.clone(), shutdown.clone())
      .context("invalid source configuration")?,
  );

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(cfg, services, orchestrator, trigger, shutdown).await,
    Command::Ingest => once(&orchestrator, RunKind::Ingest, trigger).await,
    Command::Recompute => once(&orchestrator, RunKind::Recompute, trigger).await,
  }
}

async fn serve(
  cfg: ServerConfig,
  services: Services<SqliteStore>,
  orchestrator: Arc<Orchestrator<SqliteStore, Source>>,
  trigger: ShutdownTrigger,
  shutdown: Shutdown,
) -> anyhow::Result<()> {
  let mut triggers = Vec::new();
  if let Some(secs) = cfg.ingest.interval_secs {
    let every = Duration::from_secs(secs.max(1));
    triggers.push(schedule::spawn(orchestrator.clone(), RunKind::Ingest, every, shutdown.clone()));
  }
  if let Some(secs) = cfg.ingest.recompute_interval_secs {
    let every = Duration::from_secs(secs.max(1));
    triggers.push(schedule::spawn(
      orchestrator.clone(),
      RunKind::Recompute,
      every,
      shutdown.clone(),
    ));
  }
  tokio::spawn(trigger_on_ctrl_c(trigger));

  let app = mapa_server::app(services);
  let address = cfg.address();

  tracing::info!(sources = orchestrator.sources().len(), "Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let mut on_shutdown = shutdown;
  axum::serve(listener, app)
    .with_graceful_shutdown(async move { on_shutdown.cancelled().await })
    .await
    .context("server error")?;

  for handle in triggers {
    handle.await.context("trigger task panicked")?;
  }
  Ok(())
}

async fn once(
  orchestrator: &Orchestrator<SqliteStore, Source>,
  kind: RunKind,
  trigger: ShutdownTrigger,
) -> anyhow::Result<()> {
  tokio::spawn(trigger_on_ctrl_c(trigger));
  let report = match kind {
    RunKind::Ingest => orchestrator.run().await.context("ingestion run failed")?,
    RunKind::Recompute => orchestrator.recompute().await.context("recompute failed")?,
  };
  println!("{}", serde_json::to_string_pretty(&report)?);
  Ok(())
}

async fn trigger_on_ctrl_c(trigger: ShutdownTrigger) {
  match tokio::signal::ctrl_c().await {
    Ok(()) => {
      tracing::info!("shutdown requested");
      trigger.trigger();
    }
    Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
  }
}
