//! In-memory sessions. Each session owns its transcript and the model
//! conversation that carries the context for the next exchange.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::exchange::ExchangeError;
use super::models::{Role, Transcript, Turn};
use crate::llm::{BoxedConversation, SharedModelClient};

/// Ids taken from a cookie or request body longer than this are
/// replaced with a fresh one
pub const MAX_SESSION_ID_LEN: usize = 64;

pub struct Session {
    id: String,
    last_active: DateTime<Utc>,
    transcript: Transcript,
    pub(crate) conversation: BoxedConversation,
    // Shown once by the next render, then dropped
    notice: Option<String>,
}

impl Session {
    pub fn new(id: &str, conversation: BoxedConversation) -> Self {
        Self {
            id: id.to_string(),
            last_active: Utc::now(),
            transcript: Transcript::new(),
            conversation,
            notice: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    pub fn append_turn(&mut self, role: Role, content: &str) {
        self.transcript.push(Turn::new(role, content));
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn set_notice(&mut self, notice: &str) {
        self.notice = Some(notice.to_string());
    }

    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }
}

/// Cheap to clone reference to one live session. Holding the lock is
/// what makes an exchange exclusive within its session.
#[derive(Clone)]
pub struct SessionHandle {
    id: Arc<str>,
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    fn new(session: Session) -> Self {
        Self {
            id: Arc::from(session.id()),
            inner: Arc::new(Mutex::new(session)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the session, e.g. to render it. Counts as activity.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        let mut session = self.inner.lock().await;
        session.touch();
        session
    }

    /// Take the session for an exchange, refusing if one is already
    /// in flight. Counts as activity.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, Session>, ExchangeError> {
        let mut session = self.inner.try_lock().map_err(|_| ExchangeError::Busy)?;
        session.touch();
        Ok(session)
    }

    /// Whether the session has been left alone for longer than
    /// `idle_ttl` as of `now`. A session that is locked is in use and
    /// never idle.
    fn is_idle(&self, now: DateTime<Utc>, idle_ttl: TimeDelta) -> bool {
        match self.inner.try_lock() {
            Ok(session) => now - session.last_active() > idle_ttl,
            Err(_) => false,
        }
    }

    /// Whether both handles point at the same session.
    pub fn same_session(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Creates sessions lazily and hands out the existing one on every
/// later lookup. Sessions left idle for longer than the TTL are
/// dropped along with their model conversation.
pub struct SessionStore {
    model: SharedModelClient,
    idle_ttl: TimeDelta,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionStore {
    pub fn new(model: SharedModelClient, idle_ttl: Duration) -> Self {
        Self {
            model,
            idle_ttl: TimeDelta::from_std(idle_ttl).unwrap_or(TimeDelta::MAX),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn model(&self) -> &SharedModelClient {
        &self.model
    }

    /// Return the session for `id`, creating it when it doesn't exist.
    /// A missing, blank, or oversized `id` creates a session with a
    /// fresh id. Never resets a session that already exists.
    pub fn get_or_create_session(&self, id: Option<&str>) -> SessionHandle {
        let id = id
            .map(str::trim)
            .filter(|id| !id.is_empty() && id.len() <= MAX_SESSION_ID_LEN);

        if let Some(handle) = id.and_then(|id| self.get(id)) {
            return handle;
        }

        let id = id
            .map(String::from)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        // Creating is the only way the store grows, so reclaim first
        self.evict_idle(Utc::now());

        let mut sessions = self
            .sessions
            .write()
            .expect("Unable to write session store");

        // Another request may have created it between the two locks
        sessions
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::debug!(session_id = %id, "Creating chat session");
                SessionHandle::new(Session::new(&id, self.model.open_conversation(&[])))
            })
            .clone()
    }

    /// Drop every session that has been idle for longer than the TTL
    /// as of `now`. Returns how many were dropped.
    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self
            .sessions
            .write()
            .expect("Unable to write session store");

        let before = sessions.len();
        sessions.retain(|_, handle| !handle.is_idle(now, self.idle_ttl));
        let evicted = before - sessions.len();

        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "Evicted idle chat sessions");
        }
        evicted
    }

    pub fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions
            .read()
            .expect("Unable to read session store")
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .expect("Unable to read session store")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
