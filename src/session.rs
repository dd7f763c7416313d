//! Per-tab sessions: conversation history and the lazily built agent
//! pipeline, kept in a bounded LRU with an idle timeout.

use std::num::NonZeroUsize;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::pipeline::AgentPipeline;
use crate::types::{HistoryEntry, TaskResult};

/// Task/result pairs kept per session; the oldest go first.
pub const HISTORY_LIMIT: usize = 100;

pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    agents: OnceLock<Arc<AgentPipeline>>,
    history: Mutex<Vec<HistoryEntry>>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            agents: OnceLock::new(),
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The session's pipeline; `init` runs only on first use, so the model
    /// settings of the first request stick for the session's lifetime.
    pub fn agents(&self, init: impl FnOnce() -> AgentPipeline) -> Arc<AgentPipeline> {
        self.agents.get_or_init(|| Arc::new(init())).clone()
    }

    pub fn has_agents(&self) -> bool {
        self.agents.get().is_some()
    }

    pub fn record(&self, task: &str, result: &TaskResult) {
        let mut history = self.history.lock();
        history.push(HistoryEntry {
            task: task.to_string(),
            result: result.clone(),
            timestamp: Utc::now(),
        });
        let overflow = history.len().saturating_sub(HISTORY_LIMIT);
        history.drain(..overflow);
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().clone()
    }

    /// Drop history and agent transcripts; the session itself stays.
    pub fn clear_history(&self) {
        self.history.lock().clear();
        if let Some(agents) = self.agents.get() {
            agents.clear_memory();
        }
    }
}

struct Slot {
    session: Arc<Session>,
    touched: Instant,
}

pub struct SessionStore {
    inner: Mutex<LruCache<String, Slot>>,
    ttl: Option<Duration>,
}

impl SessionStore {
    /// `ttl` is an idle timeout; `None` keeps sessions until evicted by capacity.
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
            ttl,
        }
    }

    fn is_expired(&self, slot: &Slot, now: Instant) -> bool {
        self.ttl
            .is_some_and(|ttl| now.duration_since(slot.touched) >= ttl)
    }

    fn lookup(&self, cache: &mut LruCache<String, Slot>, id: &str, now: Instant) -> Option<Arc<Session>> {
        let found = match cache.get_mut(id) {
            Some(slot) if !self.is_expired(slot, now) => {
                slot.touched = now;
                Some(slot.session.clone())
            }
            Some(_) => None,
            None => return None,
        };
        if found.is_none() {
            cache.pop(id);
            debug!(session_id = id, "session expired");
        }
        found
    }

    fn purge_expired(&self, cache: &mut LruCache<String, Slot>, now: Instant) {
        let stale: Vec<String> = cache
            .iter()
            .filter(|(_, slot)| self.is_expired(slot, now))
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            cache.pop(&id);
            debug!(session_id = %id, "session expired");
        }
    }

    pub fn get_or_create(&self, id: &str) -> Arc<Session> {
        let now = Instant::now();
        let mut cache = self.inner.lock();
        if let Some(session) = self.lookup(&mut cache, id, now) {
            return session;
        }

        let session = Arc::new(Session::new(id));
        let slot = Slot {
            session: session.clone(),
            touched: now,
        };
        if let Some((evicted, _)) = cache.push(id.to_string(), slot) {
            if evicted != id {
                info!(session_id = %evicted, "evicted least recently used session");
            }
        }
        info!(session_id = id, "session created");
        session
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        let mut cache = self.inner.lock();
        self.lookup(&mut cache, id, Instant::now())
    }

    /// Returns whether a session was removed. Unknown ids are not an error.
    pub fn remove(&self, id: &str) -> bool {
        self.inner.lock().pop(id).is_some()
    }

    /// Live session ids, most recently used first.
    pub fn ids(&self) -> Vec<String> {
        let mut cache = self.inner.lock();
        self.purge_expired(&mut cache, Instant::now());
        cache.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        let mut cache = self.inner.lock();
        self.purge_expired(&mut cache, Instant::now());
        cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
