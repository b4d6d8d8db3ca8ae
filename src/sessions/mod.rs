//! Explicit per-user session contexts.
//!
//! A [`Session`] is created on successful sign-in and torn down on sign-out,
//! on expiry, or when an admin revokes the user. Each session owns its own
//! query caches; nothing cached is ever visible to another session.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::cache::{CacheKey, TtlCache};
use crate::domain::{ContentRecord, Role, UserProgress};

/// Read caches private to one session.
#[derive(Debug)]
pub struct SessionCache {
    pub content: TtlCache<CacheKey, Vec<ContentRecord>>,
    pub progress: TtlCache<Uuid, UserProgress>,
}

impl SessionCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            content: TtlCache::new(ttl),
            progress: TtlCache::new(ttl),
        }
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.progress.clear();
    }
}

/// An authenticated session.
#[derive(Debug)]
pub struct Session {
    pub token: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_super_admin: bool,
    pub created_at: DateTime<Utc>,
    expires_at: Instant,
    /// Held for the duration of an operation, which serializes work within the session.
    pub cache: Mutex<SessionCache>,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Identity details a new session is opened for.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
    pub is_super_admin: bool,
}

/// Registry of live sessions, addressed by bearer token.
#[derive(Debug, Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<Uuid, Arc<Session>>>,
    timeout: Duration,
    cache_ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(timeout: Duration, cache_ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            timeout,
            cache_ttl,
        }
    }

    /// Open a session and return it. The token is random and unguessable.
    pub fn create(&self, user: SessionUser) -> Arc<Session> {
        let token = Uuid::new_v4();
        let session = Arc::new(Session {
            token,
            user_id: user.user_id,
            email: user.email,
            role: user.role,
            is_super_admin: user.is_super_admin,
            created_at: Utc::now(),
            expires_at: Instant::now() + self.timeout,
            cache: Mutex::new(SessionCache::new(self.cache_ttl)),
        });
        self.sessions.insert(token, Arc::clone(&session));
        tracing::debug!(user_id = %user.user_id, "session opened");
        session
    }

    /// Resolve a token. Expired sessions are removed and never returned.
    #[must_use]
    pub fn get(&self, token: Uuid) -> Option<Arc<Session>> {
        let session = self.sessions.get(&token).map(|s| Arc::clone(s.value()))?;
        if session.is_expired() {
            self.sessions.remove(&token);
            tracing::debug!(user_id = %session.user_id, "session expired");
            return None;
        }
        Some(session)
    }

    pub fn remove(&self, token: Uuid) -> Option<Arc<Session>> {
        self.sessions.remove(&token).map(|(_, session)| session)
    }

    /// Tear down every session of `user_id`. Returns how many were closed.
    pub fn revoke_user(&self, user_id: Uuid) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.user_id != user_id);
        let revoked = before.saturating_sub(self.sessions.len());
        if revoked > 0 {
            tracing::info!(%user_id, revoked, "sessions revoked");
        }
        revoked
    }

    /// Empty the caches of every live session.
    pub async fn clear_caches(&self) -> usize {
        let live: Vec<Arc<Session>> = self
            .sessions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for session in &live {
            session.cache.lock().await.clear();
        }
        live.len()
    }

    /// Drop sessions past their expiry.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired());
        before.saturating_sub(self.sessions.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
