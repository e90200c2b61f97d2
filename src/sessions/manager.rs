use super::types::{ChatSession, Message};
use crate::error::{SessionError, StorageError};
use crate::storage::StoreAdapter;

/// Storage key holding the serialized session collection.
const SESSIONS_KEY: &str = "sessions";

/// Owns the ordered session collection (most recent first) and the active
/// session pointer.
///
/// Invariants, upheld by every operation once construction completes:
/// - the collection is never empty;
/// - `active_id` always names a session in the collection;
/// - all mutation of session contents goes through these methods.
pub struct SessionManager {
    store: Box<dyn StoreAdapter>,
    sessions: Vec<ChatSession>,
    active_id: String,
    max_history: usize,
}

impl SessionManager {
    /// Load persisted sessions, falling back to one fresh empty session when
    /// the stored collection is absent, malformed, or empty. Storage failures
    /// are logged and recovered, never fatal.
    pub fn new(store: Box<dyn StoreAdapter>, max_history: usize) -> Self {
        let sessions = Self::load(store.as_ref());
        let mut manager = Self {
            store,
            sessions,
            active_id: String::new(),
            max_history,
        };
        match manager.sessions.first() {
            Some(front) => manager.active_id = front.id.clone(),
            None => {
                manager.create_session();
            }
        }
        manager
    }

    fn load(store: &dyn StoreAdapter) -> Vec<ChatSession> {
        let raw = match store.get(SESSIONS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(error) => {
                tracing::warn!("session load failed, starting fresh: {error}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(sessions) => sessions,
            Err(error) => {
                tracing::warn!("stored sessions malformed, starting fresh: {error}");
                Vec::new()
            }
        }
    }

    /// Synthesize a new empty session at the front of the collection and make
    /// it active.
    pub fn create_session(&mut self) -> &ChatSession {
        let session = ChatSession::new();
        self.active_id = session.id.clone();
        self.sessions.insert(0, session);
        &self.sessions[0]
    }

    pub fn switch_active(&mut self, id: &str) -> Result<(), SessionError> {
        if !self.sessions.iter().any(|session| session.id == id) {
            return Err(SessionError::NotFound(id.to_string()));
        }
        self.active_id = id.to_string();
        Ok(())
    }

    /// Remove a session. When the active session is deleted, the most recent
    /// remaining session becomes active; deleting the last session
    /// synthesizes a fresh empty active one.
    pub fn delete_session(&mut self, id: &str) -> Result<(), SessionError> {
        let index = self
            .sessions
            .iter()
            .position(|session| session.id == id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        self.sessions.remove(index);

        if self.active_id == id {
            match self.sessions.first() {
                Some(front) => self.active_id = front.id.clone(),
                None => {
                    self.create_session();
                }
            }
        }
        Ok(())
    }

    /// Append messages in order. Silent no-op for an unknown session id: the
    /// caller may race with a deletion and the append simply loses.
    pub fn append_messages(&mut self, id: &str, messages: Vec<Message>) {
        if let Some(session) = self.sessions.iter_mut().find(|session| session.id == id) {
            session.messages.extend(messages);
        }
    }

    /// Replace the final message of a session with `transform` applied to it.
    /// Silent no-op when the session is unknown or has no messages.
    pub fn update_last_message(&mut self, id: &str, transform: impl FnOnce(Message) -> Message) {
        if let Some(session) = self.sessions.iter_mut().find(|session| session.id == id)
            && let Some(last) = session.messages.pop()
        {
            session.messages.push(transform(last));
        }
    }

    /// Write the collection through the store adapter, truncated to the
    /// `max_history` most recent sessions.
    pub fn persist(&self) -> Result<(), StorageError> {
        let retained = &self.sessions[..self.sessions.len().min(self.max_history)];
        let raw = serde_json::to_string(retained).map_err(|error| StorageError::Write {
            key: SESSIONS_KEY.to_string(),
            message: error.to_string(),
        })?;
        self.store.set(SESSIONS_KEY, &raw)
    }

    #[must_use]
    pub fn session(&self, id: &str) -> Option<&ChatSession> {
        self.sessions.iter().find(|session| session.id == id)
    }

    #[must_use]
    pub fn active_session(&self) -> &ChatSession {
        self.sessions
            .iter()
            .find(|session| session.id == self.active_id)
            .unwrap_or(&self.sessions[0])
    }

    #[must_use]
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    #[must_use]
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }
}
