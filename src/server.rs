//! ChatServer actor implementation
//!
//! The central actor that owns all mutable state: the session registry,
//! the channel registry, and the broadcast counters. Connection workers
//! talk to it over an mpsc command channel, so every registry read and
//! mutation is serialized through one task. That makes the nickname
//! check-and-set, the channel emptiness-check-and-remove, and broadcast
//! enumeration atomic without any locks.

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::channel::ChannelRegistry;
use crate::config::ServerConfig;
use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::types::{ChannelName, SessionId};

/// Notice sent to every open session when the server shuts down
pub const SHUTDOWN_NOTICE: &str = "Server is shutting down. Goodbye! Type /quit to exit.";

/// Commands sent from connection workers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        id: SessionId,
        sender: mpsc::Sender<String>,
        cancel: CancellationToken,
    },
    /// Client connection closed (worker loop exit)
    Disconnect { id: SessionId },
    /// Nickname attempt, from the naming loop or `/nick`
    ///
    /// Both call sites share this one validation path. The reply carries
    /// whether the nickname was accepted.
    SetNickname {
        id: SessionId,
        name: String,
        reply: oneshot::Sender<bool>,
    },
    /// `/join <channel>` (argument already checked non-empty)
    Join { id: SessionId, channel: String },
    /// `/leave [<channel>]`
    Leave {
        id: SessionId,
        channel: Option<String>,
    },
    /// Chat line, broadcast to the sender's current channel
    Chat { id: SessionId, line: String },
    /// `/list`: snapshot of nicknames and channels
    List { id: SessionId },
    /// Point-in-time counters, for logging and tests
    Stats { reply: oneshot::Sender<ServerStats> },
    /// External shutdown request (ctrl-c); idempotent
    Shutdown,
}

/// Point-in-time server counters
#[derive(Debug, Clone)]
pub struct ServerStats {
    /// Successful broadcast calls since startup
    pub total_messages: u64,
    /// Currently registered sessions
    pub sessions: usize,
    /// Currently registered channels
    pub channels: usize,
    /// Per-session broadcast counts, unordered
    pub per_session_messages: Vec<u64>,
}

/// The main ChatServer actor
pub struct ChatServer {
    sessions: SessionRegistry,
    channels: ChannelRegistry,
    broadcaster: Broadcaster,
    /// Flipped exactly once when shutdown begins
    active: bool,
    receiver: mpsc::Receiver<ServerCommand>,
    /// Cancelled on shutdown; stops the accept loop
    shutdown: CancellationToken,
    config: ServerConfig,
}

impl ChatServer {
    pub fn new(
        receiver: mpsc::Receiver<ServerCommand>,
        shutdown: CancellationToken,
        config: ServerConfig,
    ) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            channels: ChannelRegistry::new(),
            broadcaster: Broadcaster::new(),
            active: true,
            receiver,
            shutdown,
            config,
        }
    }

    /// Run the actor event loop
    ///
    /// Processes commands until every sender is dropped, which happens
    /// once the lifecycle and all connection workers have wound down.
    /// Commands arriving after shutdown (late connects, worker
    /// disconnects) are still answered. The idle watchdog ticks inside
    /// the same loop, so it stops with the actor as part of the single
    /// shutdown path.
    pub async fn run(mut self) {
        info!("chat server actor started");

        let period = self.config.idle_check_period;
        let mut watchdog = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => break,
                },
                _ = watchdog.tick() => self.check_idle(),
            }
        }

        info!("chat server actor stopped");
    }

    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { id, sender, cancel } => {
                self.handle_connect(id, sender, cancel);
            }
            ServerCommand::Disconnect { id } => self.handle_disconnect(id),
            ServerCommand::SetNickname { id, name, reply } => {
                let accepted = self.try_set_nickname(id, &name);
                let _ = reply.send(accepted);
            }
            ServerCommand::Join { id, channel } => self.handle_join(id, &channel),
            ServerCommand::Leave { id, channel } => self.handle_leave(id, channel),
            ServerCommand::Chat { id, line } => self.handle_chat(id, &line),
            ServerCommand::List { id } => self.handle_list(id),
            ServerCommand::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
            ServerCommand::Shutdown => self.shutdown(),
        }
    }

    fn handle_connect(
        &mut self,
        id: SessionId,
        sender: mpsc::Sender<String>,
        cancel: CancellationToken,
    ) {
        if !self.active {
            // Accept raced with shutdown; turn the connection away
            let _ = sender.try_send(SHUTDOWN_NOTICE.to_string());
            cancel.cancel();
            return;
        }

        self.sessions.register(Session::new(id, sender, cancel));
        self.channels.add(ChannelName::general());
        self.broadcaster.touch();
        info!(session = %id, total = self.sessions.len(), "client connected");
    }

    fn handle_disconnect(&mut self, id: SessionId) {
        let Some(session) = self.sessions.remove(id) else {
            return;
        };
        info!(session = %id, nickname = session.display_name(), "client disconnected");

        let channel = session.channel.clone();
        if let Some(nick) = &session.nickname {
            self.broadcaster.broadcast(
                &self.sessions,
                &format!("{nick} has left the server"),
                nick,
                &channel,
            );
        }
        self.cleanup_channel(&channel);
        self.broadcaster.touch();
        debug!(
            total_sessions = self.sessions.len(),
            total_channels = self.channels.len(),
            "registry sizes after disconnect"
        );
    }

    /// Validate and assign a nickname; one path for the naming loop and `/nick`
    ///
    /// A rejection mutates nothing. The taken-check and the assignment
    /// happen inside this single actor command, so two sessions racing
    /// for the same name can never both win.
    fn try_set_nickname(&mut self, id: SessionId, name: &str) -> bool {
        let name = name.trim();
        let Some(session) = self.sessions.get(id) else {
            return false;
        };

        if name.is_empty() {
            let _ = session.try_send("Invalid name. Choose another");
            return false;
        }
        if self.sessions.is_nickname_taken(name) {
            info!(nickname = name, "nickname is already taken");
            let _ = session.try_send("Nickname is already taken. Choose another");
            return false;
        }

        let name = name.to_string();
        if let Some(session) = self.sessions.get_mut(id) {
            let _ = session.try_send(format!("Nickname set to: {name}"));
            session.set_nickname(name.clone());
        }
        info!(session = %id, nickname = %name, "nickname set");
        true
    }

    fn handle_join(&mut self, id: SessionId, channel: &str) {
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        let nick = session.display_name().to_string();
        let old = session.channel.clone();
        let new = ChannelName::new(channel);

        // Leave notice on the old channel; the sender is still a member
        // and sees its own notice.
        self.broadcast_as(id, &format!("User {nick} has left the channel: {old}"), &old);

        // Register the new channel, move the session, then release the
        // old channel if that left it empty.
        self.channels.add(new.clone());
        if let Some(session) = self.sessions.get_mut(id) {
            session.channel = new.clone();
        }
        self.cleanup_channel(&old);

        if let Some(session) = self.sessions.get(id) {
            let _ = session.try_send(format!("You have joined channel: {new}"));
        }
        self.broadcast_as(
            id,
            &format!("User {nick} has joined the channel: {new}"),
            &new,
        );
        info!(session = %id, channel = %new, "joined channel");
    }

    fn handle_leave(&mut self, id: SessionId, channel: Option<String>) {
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        let nick = session.display_name().to_string();
        let current = session.channel.clone();
        let target = channel
            .map(|c| ChannelName::new(&c))
            .unwrap_or_else(|| current.clone());

        if target.is_general() {
            let _ = session.try_send("You cannot leave the default 'general' channel.");
            return;
        }
        if target != current {
            let _ = session.try_send(format!("You are not in channel '{target}'."));
            return;
        }

        self.broadcast_as(
            id,
            &format!("User {nick} has left the channel: {current}"),
            &current,
        );

        self.channels.add(ChannelName::general());
        if let Some(session) = self.sessions.get_mut(id) {
            session.channel = ChannelName::general();
        }
        self.cleanup_channel(&current);

        if let Some(session) = self.sessions.get(id) {
            let _ = session.try_send("You have joined channel: general");
        }
        self.broadcast_as(
            id,
            &format!("User {nick} has joined the channel: general"),
            &ChannelName::general(),
        );
        info!(session = %id, channel = %current, "left channel");
    }

    fn handle_chat(&mut self, id: SessionId, line: &str) {
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        let nick = session.display_name().to_string();
        let channel = session.channel.clone();
        self.broadcast_as(id, &format!("[{channel}] {nick}: {line}"), &channel);
    }

    fn handle_list(&self, id: SessionId) {
        let mut nicknames = self.sessions.nicknames();
        nicknames.sort();
        let mut channels = self.channels.list();
        channels.sort();

        let Some(session) = self.sessions.get(id) else {
            return;
        };
        let _ = session.try_send("List of connected clients:");
        for nickname in nicknames {
            let _ = session.try_send(nickname);
        }
        let _ = session.try_send("List of channels in the server:");
        for channel in channels {
            let _ = session.try_send(channel.as_str().to_string());
        }
    }

    fn stats(&self) -> ServerStats {
        ServerStats {
            total_messages: self.broadcaster.total_messages(),
            sessions: self.sessions.len(),
            channels: self.channels.len(),
            per_session_messages: self.sessions.iter().map(|s| s.message_count).collect(),
        }
    }

    /// Broadcast on behalf of a session, attributing the call to it
    fn broadcast_as(&mut self, id: SessionId, message: &str, channel: &ChannelName) {
        let sender = self
            .sessions
            .get(id)
            .map(|s| s.display_name().to_string())
            .unwrap_or_default();
        self.broadcaster
            .broadcast(&self.sessions, message, &sender, channel);
        if let Some(session) = self.sessions.get_mut(id) {
            session.record_message();
        }
    }

    /// Release a channel nobody occupies anymore
    ///
    /// The removal notice is broadcast to the removed channel, which is
    /// empty by definition and reaches no one. Preserved deliberately.
    fn cleanup_channel(&mut self, channel: &ChannelName) {
        if self.channels.remove_if_empty(channel, &self.sessions) {
            self.broadcaster.broadcast(
                &self.sessions,
                &format!("Channel '{channel}' has been removed as it is now empty."),
                "Server",
                channel,
            );
        }
    }

    fn check_idle(&mut self) {
        if !self.active {
            return;
        }
        let idle = self.broadcaster.idle_for();
        if idle > self.config.idle_timeout {
            info!(idle_secs = idle.as_secs(), "no activity past idle timeout, shutting down");
            self.shutdown();
        } else {
            debug!(idle_ms = idle.as_millis() as u64, "idle check");
        }
    }

    /// Enter the STOPPING state exactly once
    ///
    /// Re-entry is a no-op. Notifies every open session, cancels their
    /// read loops, and cancels the lifecycle token so the accept loop
    /// stops. The lifecycle drains workers under its grace period.
    fn shutdown(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        info!("closing down the server as requested");

        for session in self.sessions.iter_mut() {
            let _ = session.try_send(SHUTDOWN_NOTICE);
            session.is_open = false;
            session.cancel.cancel();
        }
        self.shutdown.cancel();
    }
}
