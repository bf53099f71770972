//! Session registry
//!
//! Tracks all connected sessions keyed by their stable identity. The
//! registry is owned exclusively by the `ChatServer` actor, which
//! serializes every read and mutation, so enumeration can never observe
//! a partially inserted or removed entry.

use std::collections::HashMap;

use crate::session::Session;
use crate::types::{ChannelName, SessionId};

/// All connected sessions, keyed by identity
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to the active set
    ///
    /// No nickname uniqueness check happens here: the nickname is still
    /// empty at registration time.
    pub fn register(&mut self, session: Session) {
        self.sessions.insert(session.id, session);
    }

    /// Remove a session by identity, returning it if present
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    /// Whether some open session already holds this exact nickname
    ///
    /// Case-sensitive. The caller (the actor) performs the check and the
    /// subsequent assignment in the same command, which makes the
    /// check-then-set atomic with respect to concurrent naming attempts.
    pub fn is_nickname_taken(&self, name: &str) -> bool {
        self.sessions
            .values()
            .any(|s| s.is_open && s.nickname.as_deref() == Some(name))
    }

    /// Whether any open session is currently in the given channel
    pub fn any_in_channel(&self, channel: &ChannelName) -> bool {
        self.sessions
            .values()
            .any(|s| s.is_open && s.is_in_channel(channel))
    }

    /// Point-in-time copy of all assigned nicknames
    pub fn nicknames(&self) -> Vec<String> {
        self.sessions
            .values()
            .filter(|s| s.is_open)
            .filter_map(|s| s.nickname.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
