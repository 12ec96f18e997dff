// Per-conversation document sessions.
//
// A conversation keeps appending to the document it created last instead of
// opening a new one on every call. That "last document" used to be a single
// process-wide variable; here every conversation owns its own session behind
// an async mutex, and the mutex is held for the whole create-or-append step so
// two concurrent requests in one conversation cannot both create a document.
//
// Conversation ids come from clients, so sessions idle for longer than
// `idle_ttl` are swept once the map grows past `sweep_threshold`.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default idle time after which a session may be dropped.
pub const SESSION_IDLE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default map size at which idle sessions are swept on insert.
pub const SESSION_SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Default)]
pub struct DocumentSession {
    pub last_document_id: Option<String>,
}

pub type SessionHandle = Arc<Mutex<DocumentSession>>;

struct SessionEntry {
    handle: SessionHandle,
    last_used: Instant,
}

/// Registry of sessions keyed by the client's conversation id.
pub struct DocumentSessions {
    sessions: DashMap<String, SessionEntry>,
    idle_ttl: Duration,
    sweep_threshold: usize,
}

impl Default for DocumentSessions {
    fn default() -> Self {
        Self::with_limits(SESSION_IDLE_TTL, SESSION_SWEEP_THRESHOLD)
    }
}

impl DocumentSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(idle_ttl: Duration, sweep_threshold: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
            sweep_threshold,
        }
    }

    /// Returns the session for a conversation, creating it on first use.
    ///
    /// Requests that do not name a conversation get a private session that
    /// is dropped with the request.
    pub fn session(&self, conversation_id: Option<&str>) -> SessionHandle {
        self.session_at(conversation_id, Instant::now())
    }

    fn session_at(&self, conversation_id: Option<&str>, now: Instant) -> SessionHandle {
        let Some(id) = conversation_id.map(str::trim).filter(|id| !id.is_empty()) else {
            return Arc::new(Mutex::new(DocumentSession::default()));
        };

        if !self.sessions.contains_key(id) && self.sessions.len() >= self.sweep_threshold {
            self.sweep(now);
        }

        let mut entry = self
            .sessions
            .entry(id.to_string())
            .or_insert_with(|| SessionEntry {
                handle: Arc::new(Mutex::new(DocumentSession::default())),
                last_used: now,
            });
        entry.last_used = now;
        entry.handle.clone()
    }

    /// Drops sessions idle for at least `idle_ttl`. A session still held by
    /// an in-flight request is kept regardless.
    fn sweep(&self, now: Instant) {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            now.saturating_duration_since(entry.last_used) < self.idle_ttl
                || Arc::strong_count(&entry.handle) > 1
        });
        let dropped = before.saturating_sub(self.sessions.len());
        if dropped > 0 {
            tracing::debug!(
                dropped,
                remaining = self.sessions.len(),
                "Swept idle document sessions"
            );
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    fn contains(&self, conversation_id: &str) -> bool {
        self.sessions.contains_key(conversation_id)
    }
}
