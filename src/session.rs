//! Session struct definition
//!
//! Server-side state for one connected client: identity, nickname,
//! current channel, message counter, and the outbound line channel.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::SendError;
use crate::types::{ChannelName, SessionId};

/// State for one connected client
///
/// A session starts unnamed in the "general" channel. The per-session
/// `mpsc` sender feeds a dedicated writer task, so concurrent broadcasts
/// to the same session never interleave partial writes on the socket.
#[derive(Debug)]
pub struct Session {
    /// Stable identity assigned at connection time
    pub id: SessionId,
    /// Nickname (None until the naming loop accepts one)
    pub nickname: Option<String>,
    /// The one channel this session is currently in
    pub channel: ChannelName,
    /// Broadcast calls attributed to this session
    pub message_count: u64,
    /// Cleared once when the server shuts the session down
    pub is_open: bool,
    /// Cancelled to force this session's read loop to exit
    pub cancel: CancellationToken,
    /// Server -> client line channel, drained by the writer task
    sender: mpsc::Sender<String>,
}

impl Session {
    /// Create a new open session assigned to "general"
    pub fn new(id: SessionId, sender: mpsc::Sender<String>, cancel: CancellationToken) -> Self {
        Self {
            id,
            nickname: None,
            channel: ChannelName::general(),
            message_count: 0,
            is_open: true,
            cancel,
            sender,
        }
    }

    /// Queue one line for delivery to this client
    ///
    /// Non-blocking: a full or closed channel is reported to the caller,
    /// never awaited, so one stuck client cannot stall a broadcast.
    pub fn try_send(&self, line: impl Into<String>) -> Result<(), SendError> {
        self.sender.try_send(line.into()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Whether this session has completed the naming loop
    pub fn has_nickname(&self) -> bool {
        self.nickname.is_some()
    }

    /// Set the session's nickname
    pub fn set_nickname(&mut self, nickname: String) {
        self.nickname = Some(nickname);
    }

    /// Nickname for display in notices, or a placeholder before naming
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or("(unnamed)")
    }

    /// Whether this session is currently in the given channel
    pub fn is_in_channel(&self, channel: &ChannelName) -> bool {
        self.channel == *channel
    }

    /// Attribute one broadcast call to this session
    pub fn record_message(&mut self) {
        self.message_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> (Session, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(4);
        let session = Session::new(SessionId::new(), tx, CancellationToken::new());
        (session, rx)
    }

    #[tokio::test]
    async fn test_session_starts_unnamed_in_general() {
        let (session, _rx) = test_session();
        assert!(!session.has_nickname());
        assert!(session.channel.is_general());
        assert!(session.is_open);
        assert_eq!(session.message_count, 0);
    }

    #[tokio::test]
    async fn test_session_nickname() {
        let (mut session, _rx) = test_session();
        session.set_nickname("alice".to_string());
        assert!(session.has_nickname());
        assert_eq!(session.display_name(), "alice");
    }

    #[tokio::test]
    async fn test_try_send_delivers_line() {
        let (session, mut rx) = test_session();
        session.try_send("hello").unwrap();
        assert_eq!(rx.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_try_send_full_buffer() {
        let (session, _rx) = test_session();
        for _ in 0..4 {
            session.try_send("x").unwrap();
        }
        assert!(matches!(session.try_send("y"), Err(SendError::ChannelFull)));
    }

    #[tokio::test]
    async fn test_try_send_closed_channel() {
        let (session, rx) = test_session();
        drop(rx);
        assert!(matches!(
            session.try_send("x"),
            Err(SendError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_channel_membership() {
        let (mut session, _rx) = test_session();
        assert!(session.is_in_channel(&ChannelName::general()));
        session.channel = ChannelName::new("Music");
        assert!(session.is_in_channel(&ChannelName::new("music")));
        assert!(!session.is_in_channel(&ChannelName::general()));
    }
}
