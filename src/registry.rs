//! Presence registry: the binding table from phone number to live connection.
//!
//! All mutable state lives behind a single mutex so that bind, lookup, and
//! disconnect cleanup observe one consistent snapshot. A reverse index
//! (connection -> identity) makes cleanup O(1) while keeping the
//! last-writer-wins overwrite semantics: rebinding an identity drops the
//! superseded connection's reverse entry, so that connection's later
//! disconnect cannot evict the current binding.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

/// Opaque identifier for one live connection. Unique per session for the
/// lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(u64);

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sender half of a connection's outbound queue. Any part of the system can
/// clone this to push messages to that client; the connection's writer task
/// owns the receiving end and the socket sink.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

#[derive(Default)]
struct Inner {
    /// identity -> connection currently serving it
    bindings: HashMap<String, ConnId>,
    /// connection -> identity it is currently bound to
    reverse: HashMap<ConnId, String>,
    /// connection -> outbound queue handle
    senders: HashMap<ConnId, ConnectionSender>,
}

/// The authoritative table of current bindings plus the per-connection
/// outbound handles. Shared across all connection actors via `AppState`.
pub struct Registry {
    next_id: AtomicU64,
    inner: Mutex<Inner>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Admit a new connection: issue its ConnId and store its outbound
    /// handle. The connection is not addressable by identity until it binds.
    pub fn subscribe(&self, tx: ConnectionSender) -> ConnId {
        let id = ConnId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.senders.insert(id, tx);
        id
    }

    /// Insert or overwrite the binding for `identity`. Always succeeds.
    /// A previously bound connection becomes unreachable by lookup; its
    /// reverse entry is dropped so its eventual disconnect is a no-op here.
    pub fn bind(&self, identity: &str, conn: ConnId) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");

        // If this connection was bound under another identity, release it.
        if let Some(prev_identity) = inner.reverse.get(&conn).cloned() {
            if prev_identity != identity {
                inner.bindings.remove(&prev_identity);
            }
        }

        if let Some(superseded) = inner.bindings.insert(identity.to_string(), conn) {
            if superseded != conn {
                inner.reverse.remove(&superseded);
            }
        }
        inner.reverse.insert(conn, identity.to_string());
    }

    /// Current connection bound to `identity`, if any. Pure read.
    pub fn lookup(&self, identity: &str) -> Option<ConnId> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.bindings.get(identity).copied()
    }

    /// Resolve `identity` straight to its outbound handle in one snapshot.
    /// Used by the relay so binding and handle cannot be observed torn.
    pub fn lookup_sender(&self, identity: &str) -> Option<ConnectionSender> {
        let inner = self.inner.lock().expect("registry lock poisoned");
        let conn = inner.bindings.get(identity)?;
        inner.senders.get(conn).cloned()
    }

    /// Remove a connection on disconnect: drop its outbound handle, and
    /// remove its binding only if it is still the one serving that identity.
    /// Idempotent; a no-op for never-registered or already-superseded
    /// connections.
    pub fn unbind_conn(&self, conn: ConnId) {
        let mut inner = self.inner.lock().expect("registry lock poisoned");
        inner.senders.remove(&conn);
        if let Some(identity) = inner.reverse.remove(&conn) {
            if inner.bindings.get(&identity) == Some(&conn) {
                inner.bindings.remove(&identity);
            }
        }
    }

    /// Number of live bindings. Diagnostic only.
    pub fn bound_count(&self) -> usize {
        let inner = self.inner.lock().expect("registry lock poisoned");
        inner.bindings.len()
    }
}
