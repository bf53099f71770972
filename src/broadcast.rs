//! Message broadcasting
//!
//! Routes one line to every open session in a target channel and keeps
//! the server-wide message counter and last-activity timestamp.

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::registry::SessionRegistry;
use crate::types::ChannelName;

/// Broadcast router and server-wide activity bookkeeping
///
/// Owned by the `ChatServer` actor, so enumeration of recipients is
/// serialized with registry mutation: a session leaving mid-broadcast
/// either receives the line or cleanly doesn't.
#[derive(Debug)]
pub struct Broadcaster {
    /// Successful broadcast calls since startup
    total_messages: u64,
    /// Refreshed on every broadcast, connect, and disconnect
    last_activity: Instant,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            total_messages: 0,
            last_activity: Instant::now(),
        }
    }

    /// Deliver `message` to every open session currently in `channel`
    ///
    /// Delivery to each recipient is independent: a failed hand-off is
    /// logged and skipped, never propagated. The recipient's own worker
    /// detects a dead connection on its next read and cleans up there.
    /// Returns the number of sessions the line was handed to.
    pub fn broadcast(
        &mut self,
        sessions: &SessionRegistry,
        message: &str,
        sender: &str,
        channel: &ChannelName,
    ) -> usize {
        let mut delivered = 0;
        for session in sessions
            .iter()
            .filter(|s| s.is_open && s.is_in_channel(channel))
        {
            match session.try_send(message) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!(session = %session.id, error = %e, "failed to deliver message");
                }
            }
        }
        self.total_messages += 1;
        self.touch();
        debug!(%channel, sender, delivered, "broadcast");
        delivered
    }

    /// Refresh the last-activity timestamp
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
        debug!("last activity time updated");
    }

    /// How long the server has been without activity
    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }

    pub fn total_messages(&self) -> u64 {
        self.total_messages
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
