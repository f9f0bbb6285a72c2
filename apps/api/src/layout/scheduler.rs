//! Latest-request-wins coalescing for preview composition.
//!
//! Every trigger takes a ticket from a generation counter. After the debounce
//! window a ticket is only honoured if no newer ticket was issued meanwhile.
//! A composition that has already started always runs to completion, but its
//! text is only recorded if no newer ticket exists by then.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct LatestWins {
    generation: AtomicU64,
}

impl LatestWins {
    /// Issues a ticket that supersedes every earlier one.
    pub fn schedule(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.0
    }
}

/// Per-client preview state.
#[derive(Debug, Default)]
pub struct PreviewSession {
    gate: LatestWins,
    last_composed: Mutex<Option<String>>,
}

impl PreviewSession {
    pub fn schedule(&self) -> Ticket {
        self.gate.schedule()
    }

    /// Waits out the debounce window; true if `ticket` is still the latest.
    pub async fn wait_turn(&self, ticket: Ticket, debounce: Duration) -> bool {
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
        }
        self.gate.is_current(ticket)
    }

    /// True when `text` is what this session composed last.
    pub async fn is_unchanged(&self, text: &str) -> bool {
        self.last_composed.lock().await.as_deref() == Some(text)
    }

    /// Records `text` as the last composed text, unless a ticket newer than
    /// `ticket` was issued meanwhile. Returns whether it was recorded.
    pub async fn record(&self, ticket: Ticket, text: String) -> bool {
        let mut last = self.last_composed.lock().await;
        if !self.gate.is_current(ticket) {
            return false;
        }
        *last = Some(text);
        true
    }
}

#[derive(Debug)]
struct SessionEntry {
    session: Arc<PreviewSession>,
    last_used: Instant,
}

/// Sessions keyed by client-chosen id. A session idle for longer than
/// `idle_ttl` is dropped on the next lookup unless a request still holds it.
#[derive(Debug)]
pub struct PreviewSessions {
    idle_ttl: Duration,
    sessions: Mutex<HashMap<String, SessionEntry>>,
}

impl PreviewSessions {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            idle_ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the session for `id`, creating it on first use.
    pub async fn session(&self, id: &str) -> Arc<PreviewSession> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let before = sessions.len();
        sessions.retain(|key, entry| {
            key == id
                || Arc::strong_count(&entry.session) > 1
                || now.duration_since(entry.last_used) < self.idle_ttl
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!(evicted, remaining = sessions.len(), "Idle preview sessions dropped");
        }

        let entry = sessions.entry(id.to_string()).or_insert_with(|| SessionEntry {
            session: Arc::default(),
            last_used: now,
        });
        entry.last_used = now;
        Arc::clone(&entry.session)
    }

    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.lock().await.remove(id).is_some()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
