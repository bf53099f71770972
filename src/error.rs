//! Error types for the chat server
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Covers fatal startup and connection errors. Protocol misuse (bad
/// command arguments, duplicate nicknames, leaving "general") is never
/// represented here: it is reported to the offending session as plain
/// text and mutates no state.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (bind failure, broken connection)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The server command channel is closed (server shut down)
    #[error("server command channel closed")]
    ChannelSend,
}

/// Per-session delivery errors
///
/// Occurs when a broadcast cannot hand a line to a session's writer task.
/// These are logged by the broadcaster and never propagated to its caller;
/// the affected session's own worker cleans up on its next read failure.
#[derive(Debug, Error)]
pub enum SendError {
    /// The session's writer task is gone (client disconnected)
    #[error("session channel closed")]
    ChannelClosed,

    /// The session's outbound buffer is full (client not draining)
    #[error("session channel full")]
    ChannelFull,
}
