//! Cooperative shutdown signal shared by the orchestrator and the server.

use tokio::sync::watch;

/// Sending half; flips every [`Shutdown`] it was created with.
#[derive(Debug)]
pub struct ShutdownTrigger {
  tx: watch::Sender<bool>,
}

/// Receiving half. Cheap to clone; each clone observes the same trigger.
#[derive(Debug, Clone)]
pub struct Shutdown {
  rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
  let (tx, rx) = watch::channel(false);
  (ShutdownTrigger { tx }, Shutdown { rx })
}

impl ShutdownTrigger {
  pub fn trigger(&self) { self.tx.send_replace(true); }
}

impl Shutdown {
  /// A signal that never fires.
  pub fn never() -> Self { channel().1 }

  pub fn is_triggered(&self) -> bool { *self.rx.borrow() }

  /// Resolves once the trigger fires. Pends forever if the trigger was
  /// dropped without firing.
  pub async fn cancelled(&mut self) {
    if self.rx.wait_for(|fired| *fired).await.is_err() {
      std::future::pending::<()>().await;
    }
  }
}
