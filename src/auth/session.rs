use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

struct Session {
    username: String,
    issued_at: Instant,
}

/// Process-local map of open sessions to the username they belong to.
/// Nothing here is ever written to disk. Sessions older than `ttl` are
/// treated as closed and dropped on the next `open` or `resolve`.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
        }
    }

    pub fn open(&self, username: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = Instant::now();
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|_, s| now.duration_since(s.issued_at) < self.ttl);
        let swept = before - sessions.len();
        sessions.insert(
            id,
            Session {
                username: username.to_string(),
                issued_at: now,
            },
        );
        debug!(session = %id, username, swept, "session opened");
        id
    }

    pub fn resolve(&self, id: Uuid) -> Option<String> {
        let mut sessions = self.write();
        let session = sessions.get(&id)?;
        if session.issued_at.elapsed() < self.ttl {
            return Some(session.username.clone());
        }
        sessions.remove(&id);
        debug!(session = %id, "session expired");
        None
    }

    pub fn close(&self, id: Uuid) -> bool {
        let removed = self.write().remove(&id).is_some();
        debug!(session = %id, removed, "session closed");
        removed
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Session>> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}
