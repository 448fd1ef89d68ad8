//! In-memory session store with per-session locking and bounded growth.
//!
//! The map lock is short-lived and never held across an await. Each session
//! carries its own async lock so a request can hold it for the whole
//! append-call-append sequence while other sessions proceed.

use crate::session::{Transcript, Turn};
use chrono::{DateTime, Utc};
use coach_core::config::SessionConfig;
use coach_core::types::Role;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::MutexGuard;
use tracing::{debug, warn};

/// Bounds applied by the store. `None` disables a bound.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionLimits {
    pub max_sessions: Option<usize>,
    pub idle_ttl: Option<Duration>,
}

impl SessionLimits {
    pub fn unbounded() -> Self {
        Self::default()
    }
}

impl From<&SessionConfig> for SessionLimits {
    fn from(cfg: &SessionConfig) -> Self {
        Self {
            max_sessions: cfg.max_sessions,
            idle_ttl: cfg.idle_ttl(),
        }
    }
}

/// One session's transcript behind its exclusive lock.
#[derive(Debug)]
pub struct SessionSlot {
    id: String,
    transcript: tokio::sync::Mutex<Transcript>,
    turn_count: AtomicUsize,
    created_at: DateTime<Utc>,
}

impl SessionSlot {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            transcript: tokio::sync::Mutex::new(Transcript::new()),
            turn_count: AtomicUsize::new(0),
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Turn count as of the last completed append. Does not wait for the lock.
    pub fn turn_count(&self) -> usize {
        self.turn_count.load(Ordering::Acquire)
    }

    /// Acquire exclusive access. Released when the guard drops.
    pub async fn lock(&self) -> SessionGuard<'_> {
        SessionGuard {
            slot: self,
            transcript: self.transcript.lock().await,
        }
    }
}

/// Exclusive access to a session's transcript.
pub struct SessionGuard<'a> {
    slot: &'a SessionSlot,
    transcript: MutexGuard<'a, Transcript>,
}

impl SessionGuard<'_> {
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> &Turn {
        self.transcript.push(role, content);
        self.slot
            .turn_count
            .store(self.transcript.len(), Ordering::Release);
        &self.transcript.turns()[self.transcript.len() - 1]
    }
}

impl Deref for SessionGuard<'_> {
    type Target = Transcript;

    fn deref(&self) -> &Transcript {
        &self.transcript
    }
}

/// Listing entry for a stored session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub turns: usize,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    slot: Arc<SessionSlot>,
    last_active: Instant,
    last_active_at: DateTime<Utc>,
}

impl Entry {
    fn new(slot: Arc<SessionSlot>, now: Instant) -> Self {
        Self {
            slot,
            last_active: now,
            last_active_at: Utc::now(),
        }
    }

    fn touch(&mut self, now: Instant) {
        self.last_active = now;
        self.last_active_at = Utc::now();
    }

    /// Only the map references the slot: no request is using it.
    fn is_idle(&self) -> bool {
        Arc::strong_count(&self.slot) == 1
    }
}

/// Sessions in recency order: most recently used at the front.
type SessionMap = LruCache<String, Entry>;

/// Shared, cloneable handle to the session map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<SessionMap>>,
    limits: SessionLimits,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionLimits::default())
    }
}

impl SessionStore {
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(LruCache::unbounded())),
            limits,
        }
    }

    pub fn limits(&self) -> SessionLimits {
        self.limits
    }

    /// Look up or lazily create the session, marking it as recently used.
    /// Creating a session at capacity evicts the least recently used idle one.
    pub fn session(&self, session_id: &str) -> Arc<SessionSlot> {
        self.session_at(session_id, Instant::now())
    }

    fn session_at(&self, session_id: &str, now: Instant) -> Arc<SessionSlot> {
        let mut map = self.sessions.lock();
        if let Some(entry) = map.get_mut(session_id) {
            entry.touch(now);
            return entry.slot.clone();
        }

        if let Some(max) = self.limits.max_sessions {
            evict_lru(&mut map, max.max(1) - 1);
        }

        let slot = Arc::new(SessionSlot::new(session_id));
        map.put(session_id.to_string(), Entry::new(slot.clone(), now));
        debug!(session_id, sessions = map.len(), "session created");
        slot
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().contains(session_id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Copy of a session's turns. Waits for any in-flight request on that session.
    /// Does not count as activity for eviction purposes.
    pub async fn snapshot(&self, session_id: &str) -> Option<Vec<Turn>> {
        let slot = self.sessions.lock().peek(session_id).map(|e| e.slot.clone())?;
        let guard = slot.lock().await;
        Some(guard.turns().to_vec())
    }

    /// Summaries ordered by most recent activity first.
    pub fn list(&self) -> Vec<SessionSummary> {
        self.sessions
            .lock()
            .iter()
            .map(|(_, e)| SessionSummary {
                session_id: e.slot.id().to_string(),
                turns: e.slot.turn_count(),
                created_at: e.slot.created_at(),
                last_active: e.last_active_at,
            })
            .collect()
    }

    /// Drop idle sessions not used within the idle TTL. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let Some(ttl) = self.limits.idle_ttl else {
            return 0;
        };
        let mut map = self.sessions.lock();
        // Oldest first; everything past the first fresh entry is fresher still.
        let expired: Vec<String> = map
            .iter()
            .rev()
            .take_while(|(_, e)| now.saturating_duration_since(e.last_active) > ttl)
            .filter(|(_, e)| e.is_idle())
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            map.pop(id.as_str());
            debug!(session_id = %id, "session expired");
        }
        expired.len()
    }
}

/// Evict least recently used idle sessions until at most `target_len` remain.
/// Busy sessions near the old end are skipped, not evicted.
fn evict_lru(map: &mut SessionMap, target_len: usize) -> usize {
    let mut evicted = 0;
    while map.len() > target_len {
        let victim = map
            .iter()
            .rev()
            .find(|(_, e)| e.is_idle())
            .map(|(id, _)| id.clone());
        match victim {
            Some(id) => {
                map.pop(id.as_str());
                evicted += 1;
                debug!(session_id = %id, "session evicted (lru)");
            }
            None => {
                warn!(sessions = map.len(), "all sessions busy, store over capacity");
                break;
            }
        }
    }
    evicted
}
