//! Channel registry
//!
//! Tracks the set of live channel names. Channels have no owned object:
//! membership is derived by scanning sessions whose current channel
//! matches the name. That trades a per-broadcast scan for immunity to
//! roster drift, which is acceptable at the expected session counts.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::registry::SessionRegistry;
use crate::types::ChannelName;

/// The set of registered channel names
///
/// "general" is inserted at construction and refuses removal. Owned by
/// the `ChatServer` actor, so the emptiness check inside
/// [`ChannelRegistry::remove_if_empty`] cannot race a concurrent join.
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: HashSet<ChannelName>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        let mut channels = HashSet::new();
        channels.insert(ChannelName::general());
        Self { channels }
    }

    /// Idempotent insert of a normalized channel name
    pub fn add(&mut self, name: ChannelName) {
        self.channels.insert(name);
    }

    pub fn contains(&self, name: &ChannelName) -> bool {
        self.channels.contains(name)
    }

    /// Remove the channel if no open session is a member
    ///
    /// Refuses to remove "general". Returns true only when the channel
    /// was actually removed, so a repeat call on an already-gone channel
    /// is a no-op.
    pub fn remove_if_empty(&mut self, name: &ChannelName, sessions: &SessionRegistry) -> bool {
        if name.is_general() {
            debug!("attempted to remove the default 'general' channel; skipped");
            return false;
        }
        if sessions.any_in_channel(name) {
            debug!(channel = %name, "channel is not empty; removal skipped");
            return false;
        }
        let removed = self.channels.remove(name);
        if removed {
            info!(channel = %name, "channel removed (empty)");
        } else {
            debug!(channel = %name, "channel not found in registry; removal skipped");
        }
        removed
    }

    /// Point-in-time copy of the channel set
    pub fn list(&self) -> Vec<ChannelName> {
        self.channels.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
