use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedSender;

/// Process-unique id for one live socket. `leave` matches on it, so a
/// replaced connection's late disconnect cannot evict the newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnId(u64);

impl ConnId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

struct Entry {
    conn: ConnId,
    tx: UnboundedSender<String>,
}

/// Who is online right now. One delivery handle per username: a second
/// join for the same name replaces the first (last join wins), which
/// also means a user's older tab stops receiving targeted events.
/// Nothing here is persisted.
#[derive(Clone, Default)]
pub struct Presence {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
}

impl Presence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, username: &str, conn: ConnId, tx: UnboundedSender<String>) {
        self.inner.lock().insert(username.to_owned(), Entry { conn, tx });
    }

    /// Removes the entry held by `conn` and returns its username. An
    /// unknown or already-replaced handle is a no-op, not an error.
    pub fn leave(&self, conn: ConnId) -> Option<String> {
        let mut map = self.inner.lock();
        let username = map
            .iter()
            .find(|(_, entry)| entry.conn == conn)
            .map(|(username, _)| username.clone())?;
        map.remove(&username);
        Some(username)
    }

    pub fn is_online(&self, username: &str) -> bool {
        self.inner.lock().contains_key(username)
    }

    pub fn handle_for(&self, username: &str) -> Option<UnboundedSender<String>> {
        self.inner.lock().get(username).map(|entry| entry.tx.clone())
    }

    /// Pushes `payload` to whoever is joined under `username`. Nobody
    /// there, or a socket mid-teardown, is silently fine: history is the
    /// recovery path, not this queue.
    pub fn deliver(&self, username: &str, payload: &str) {
        if let Some(tx) = self.handle_for(username) {
            let _ = tx.send(payload.to_owned());
        }
    }
}
