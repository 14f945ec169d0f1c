//! Bookkeeping for live connections.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

/// The set of currently open connections.
///
/// Registration happens on accept and removal on disposal, from whichever
/// task the connection finished on, so the map sits behind a mutex. The
/// live count is mirrored into a watch channel so graceful shutdown can
/// wait for the set to drain without polling.
#[derive(Debug)]
pub(crate) struct ConnectionRegistry {
    connections: Mutex<HashMap<u64, SocketAddr>>,
    next_id: AtomicU64,
    count: watch::Sender<usize>,
}

impl ConnectionRegistry {
    pub(crate) fn new() -> Self {
        let (count, _) = watch::channel(0);
        Self { connections: Mutex::new(HashMap::new()), next_id: AtomicU64::new(0), count }
    }

    /// Adds a connection to the live set, returning its registry id.
    pub(crate) fn register(&self, peer_addr: SocketAddr) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut connections = self.connections.lock().expect("connection registry poisoned");
        connections.insert(id, peer_addr);
        self.count.send_replace(connections.len());
        id
    }

    /// Removes a disposed connection. Safe to call from any completion
    /// task concurrently with accept; removing an unknown id is a no-op,
    /// which makes disposal idempotent.
    pub(crate) fn unregister(&self, id: u64) {
        let mut connections = self.connections.lock().expect("connection registry poisoned");
        connections.remove(&id);
        self.count.send_replace(connections.len());
    }

    pub(crate) fn len(&self) -> usize {
        self.connections.lock().expect("connection registry poisoned").len()
    }

    /// Resolves once no live connections remain.
    pub(crate) async fn wait_idle(&self) {
        let mut count = self.count.subscribe();
        // wait_for inspects the current value first, so an already idle
        // registry resolves immediately
        let _ = count.wait_for(|count| *count == 0).await;
    }
}
