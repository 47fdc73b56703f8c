//! Per-session state shared across request handlers.
//!
//! Each browser session owns its message list, archive, credential and
//! lazily built knowledge base. Sessions never share data with each other;
//! the map itself is the only structure touched by concurrent requests.
//! Session locks are short-lived and never held across an `.await`.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    config::Config,
    knowledge_base::KnowledgeBase,
    llm_worker::ApiKey,
    memory::{ArchivedChat, Message},
    metrics,
};

/// Session-level data structure
pub struct SessionData {
    pub session_id: String,
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub chat_history: Vec<ArchivedChat>,
    pub api_key: Option<ApiKey>,
    pub knowledge_base: Option<Arc<KnowledgeBase>>,
    pub last_accessed: Instant,
}

impl SessionData {
    fn new(session_id: String) -> Self {
        Self {
            session_id,
            thread_id: new_thread_id(),
            messages: Vec::new(),
            chat_history: Vec::new(),
            api_key: None,
            knowledge_base: None,
            last_accessed: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    /// Replace the credential. A different key invalidates the index built
    /// with the old one.
    pub fn set_api_key(&mut self, api_key: Option<ApiKey>) {
        if self.api_key != api_key {
            self.knowledge_base = None;
        }
        self.api_key = api_key;
    }

    /// Archive the current messages (if any) and begin a fresh thread.
    pub fn start_new_chat(&mut self) {
        if !self.messages.is_empty() {
            self.chat_history.push(ArchivedChat {
                thread_id: self.thread_id.clone(),
                archived_at: Utc::now(),
                messages: std::mem::take(&mut self.messages),
            });
        }
        self.messages.clear();
        self.thread_id = new_thread_id();
    }
}

fn new_thread_id() -> String {
    Uuid::new_v4().to_string()
}

/// All live sessions, keyed by session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<String, Arc<RwLock<SessionData>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Arc<RwLock<SessionData>> {
        let session_id = Uuid::new_v4().to_string();
        let session = Arc::new(RwLock::new(SessionData::new(session_id.clone())));
        self.sessions.insert(session_id.clone(), session.clone());
        metrics::inc_sessions();
        debug!("Created session {}", session_id);
        session
    }

    /// Look up a session. Any lookup counts as access for idle eviction.
    pub fn get(&self, session_id: &str) -> Option<Arc<RwLock<SessionData>>> {
        let session = self.sessions.get(session_id).map(|entry| entry.value().clone())?;
        if let Ok(mut data) = session.write() {
            data.touch();
        }
        Some(session)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop sessions idle for longer than `ttl`. Returns how many went.
    pub fn evict_idle(&self, ttl: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| match session.read() {
            Ok(data) => data.last_accessed.elapsed() < ttl,
            Err(_) => false,
        });
        let evicted = before.saturating_sub(self.sessions.len());
        for _ in 0..evicted {
            metrics::dec_sessions();
        }
        if evicted > 0 {
            info!("Evicted {} idle session(s)", evicted);
        }
        evicted
    }
}

/// Run `f` with a write lock on the session, mapping poisoning to an error.
pub fn with_session_mut<T>(
    session: &RwLock<SessionData>,
    f: impl FnOnce(&mut SessionData) -> T,
) -> anyhow::Result<T> {
    let mut guard = session
        .write()
        .map_err(|_| anyhow::anyhow!("Failed to acquire session write lock"))?;
    guard.touch();
    Ok(f(&mut guard))
}

/// Run `f` with a read lock on the session.
pub fn with_session<T>(
    session: &RwLock<SessionData>,
    f: impl FnOnce(&SessionData) -> T,
) -> anyhow::Result<T> {
    let guard = session
        .read()
        .map_err(|_| anyhow::anyhow!("Failed to acquire session read lock"))?;
    Ok(f(&guard))
}

/// Application state for all API handlers.
#[derive(Clone)]
pub struct UnifiedAppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
}

impl UnifiedAppState {
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionStore::new()),
        }
    }
}
