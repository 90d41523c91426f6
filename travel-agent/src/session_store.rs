/// Session context storage
/// Keeps one `UserContext` per user id in memory, behind a per-user lock so
/// that turns from the same user never interleave

use async_trait::async_trait;
use dialogue_core::{ExtractedFacts, UserContext};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

/// Exclusive access to one user's context for the length of a turn
pub type SessionHandle = Arc<Mutex<UserContext>>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Existing context for `user_id`, or a fresh `Idle` one
    async fn get(&self, user_id: &str) -> SessionHandle;

    /// Apply extracted facts under the truthy-only merge rule
    async fn merge(&self, user_id: &str, facts: &ExtractedFacts);

    /// Back to `Idle` with empty slots and no offers
    async fn reset(&self, user_id: &str);

    /// Replace a context wholesale
    async fn insert(&self, user_id: &str, context: UserContext);

    /// Copy of the stored context, without creating one
    async fn snapshot(&self, user_id: &str) -> Option<UserContext>;

    /// Drop sessions untouched for longer than the TTL; returns how many went
    async fn evict_idle(&self) -> usize;

    async fn len(&self) -> usize;
}

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

impl SessionEntry {
    fn new(context: UserContext) -> Self {
        Self {
            handle: Arc::new(Mutex::new(context)),
            last_seen: Instant::now(),
        }
    }

    /// Nobody outside the store holds the handle
    fn is_unused(&self) -> bool {
        Arc::strong_count(&self.handle) == 1
    }
}

/// In-memory session store with TTL and capacity bounds
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionEntry>>>,
    ttl: Duration,
    capacity: usize,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            capacity: capacity.max(1),
        }
    }

    /// Make room for one more session by dropping the least recently seen
    /// unused one.
    fn make_room(&self, sessions: &mut HashMap<String, SessionEntry>) {
        if sessions.len() < self.capacity {
            return;
        }
        let oldest = sessions
            .iter()
            .filter(|(_, entry)| entry.is_unused())
            .min_by_key(|(_, entry)| entry.last_seen)
            .map(|(user_id, _)| user_id.clone());

        match oldest {
            Some(user_id) => {
                sessions.remove(&user_id);
                tracing::info!("🧹 Session store full, evicted least recent session {}", user_id);
            }
            None => tracing::warn!(
                "⚠ Session store over capacity ({} sessions), all of them busy",
                sessions.len()
            ),
        }
    }
}

impl Clone for InMemorySessionStore {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            ttl: self.ttl,
            capacity: self.capacity,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, user_id: &str) -> SessionHandle {
        let mut sessions = self.sessions.write().await;

        if let Some(entry) = sessions.get_mut(user_id) {
            entry.last_seen = Instant::now();
            return entry.handle.clone();
        }

        self.make_room(&mut sessions);
        let entry = SessionEntry::new(UserContext::new());
        let handle = entry.handle.clone();
        sessions.insert(user_id.to_string(), entry);
        tracing::debug!("New session for {} ({} active)", user_id, sessions.len());
        handle
    }

    async fn merge(&self, user_id: &str, facts: &ExtractedFacts) {
        let handle = self.get(user_id).await;
        handle.lock().await.merge(facts);
    }

    async fn reset(&self, user_id: &str) {
        let handle = self.get(user_id).await;
        handle.lock().await.reset();
    }

    async fn insert(&self, user_id: &str, context: UserContext) {
        let mut sessions = self.sessions.write().await;
        if let Some(entry) = sessions.get_mut(user_id) {
            entry.last_seen = Instant::now();
            let handle = entry.handle.clone();
            drop(sessions);
            *handle.lock().await = context;
            return;
        }
        self.make_room(&mut sessions);
        sessions.insert(user_id.to_string(), SessionEntry::new(context));
    }

    async fn snapshot(&self, user_id: &str) -> Option<UserContext> {
        let handle = {
            let sessions = self.sessions.read().await;
            sessions.get(user_id)?.handle.clone()
        };
        let context = handle.lock().await.clone();
        Some(context)
    }

    async fn evict_idle(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, entry| !(entry.is_unused() && entry.last_seen.elapsed() >= ttl));
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::info!("🧹 Evicted {} idle session(s), {} remaining", evicted, sessions.len());
        }
        evicted
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
