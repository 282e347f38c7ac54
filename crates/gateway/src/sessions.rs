//! In-memory session table for the HTTP surface.
//!
//! Each session owns one [`ConversationContext`] behind an async mutex, so
//! turns for the same session run one at a time while different sessions
//! proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mindmate_agent::ConversationContext;
use mindmate_core::message::Turn;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// A session's context, locked for the duration of a turn.
pub type SessionHandle = Arc<Mutex<ConversationContext>>;

struct SessionEntry {
    context: SessionHandle,
    created_at: DateTime<Utc>,
    /// Creation order; breaks ties between equal timestamps.
    seq: u64,
}

/// Bounded map of session id → conversation context.
///
/// When full, creating a session evicts the oldest-created one.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    next_seq: std::sync::atomic::AtomicU64,
    max_sessions: usize,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(max_sessions: usize, max_turns: usize) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_seq: std::sync::atomic::AtomicU64::new(0),
            max_sessions: max_sessions.max(1),
            max_turns,
        }
    }

    /// Fetch a session, creating it if needed.
    ///
    /// `seed` only applies to a newly created session. Returns the handle
    /// and whether the session was created by this call.
    pub async fn get_or_create(
        &self,
        id: &str,
        seed: impl FnOnce() -> Vec<Turn>,
    ) -> (SessionHandle, bool) {
        if let Some(entry) = self.sessions.read().await.get(id) {
            return (entry.context.clone(), false);
        }

        let mut sessions = self.sessions.write().await;
        // Another request may have created it between the two locks.
        if let Some(entry) = sessions.get(id) {
            return (entry.context.clone(), false);
        }

        if sessions.len() >= self.max_sessions {
            if let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, e)| (e.created_at, e.seq))
                .map(|(k, _)| k.clone())
            {
                debug!(session = %oldest, "Evicting oldest session");
                sessions.remove(&oldest);
            }
        }

        let context = Arc::new(Mutex::new(ConversationContext::from_turns(
            seed(),
            self.max_turns,
        )));
        let seq = self
            .next_seq
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        sessions.insert(
            id.to_string(),
            SessionEntry {
                context: context.clone(),
                created_at: Utc::now(),
                seq,
            },
        );
        (context, true)
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: &str) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.sessions.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
