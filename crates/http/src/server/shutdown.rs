//! Shutdown coordination for the server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

/// Coordinator for stopping the server.
///
/// Provides a broadcast channel that the accept loop and every connection
/// subscribe to, plus a flag that is checked at the head of each request
/// cycle so a stopping server does not take on work that is still in the
/// prolog stage. In-flight requests past that point are allowed to finish.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx, triggered: Arc::new(AtomicBool::new(false)) }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_reaches_all_subscribers() {
        let shutdown = Shutdown::new();
        let mut first = shutdown.subscribe();
        let mut second = shutdown.subscribe();

        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        first.recv().await.unwrap();
        second.recv().await.unwrap();
    }

    #[tokio::test]
    async fn clones_share_the_triggered_flag() {
        let shutdown = Shutdown::new();
        let clone = shutdown.clone();
        shutdown.trigger();
        assert!(clone.is_triggered());
    }
}
