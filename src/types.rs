//! Basic type definitions for the chat server
//!
//! Provides newtype wrappers for type safety:
//! - `SessionId`: UUID-based unique session identifier
//! - `ChannelName`: lower-case-normalized channel name

use uuid::Uuid;

/// The reserved default channel every session starts in.
///
/// It is registered at startup and can never be removed.
pub const GENERAL: &str = "general";

/// Unique session identifier (newtype pattern)
///
/// Wraps a UUID v4 assigned when the connection is accepted. Sessions are
/// always looked up and removed by this identity, never by their mutable
/// nickname, so unnamed sessions and transient nickname races stay
/// unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Create a new random session ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalized channel name
///
/// Channel names are compared and stored lower-cased; construction trims
/// surrounding whitespace and lower-cases the input so `Music` and `music`
/// always name the same channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName(String);

impl ChannelName {
    /// Create a normalized channel name from user input
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    /// The reserved "general" channel
    pub fn general() -> Self {
        Self(GENERAL.to_string())
    }

    /// Whether this is the reserved default channel
    pub fn is_general(&self) -> bool {
        self.0 == GENERAL
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_unique() {
        let id1 = SessionId::new();
        let id2 = SessionId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn test_channel_name_normalized() {
        let name = ChannelName::new("  MuSiC ");
        assert_eq!(name.as_str(), "music");
        assert_eq!(name, ChannelName::new("music"));
    }

    #[test]
    fn test_general_is_reserved() {
        assert!(ChannelName::general().is_general());
        assert!(ChannelName::new("GENERAL").is_general());
        assert!(!ChannelName::new("lobby").is_general());
    }
}
