//! Server lifecycle
//!
//! Owns the listening socket, the bounded worker admission, and the
//! orchestrated shutdown: STARTING (bind, spawn the actor) -> RUNNING
//! (accept loop) -> STOPPING (drain workers under a grace period) ->
//! STOPPED.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::server::{ChatServer, ServerCommand};

/// Channel buffer size for server commands
const COMMAND_BUFFER: usize = 256;

/// A bound, running-ready chat server
///
/// Binding and running are split so callers (tests in particular) can
/// learn the listen address before the accept loop starts. A bind
/// failure is fatal and surfaces before any connection is accepted.
pub struct ServerLifecycle {
    listener: TcpListener,
    cmd_tx: mpsc::Sender<ServerCommand>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    config: ServerConfig,
}

impl ServerLifecycle {
    /// STARTING: bind the listener and spawn the ChatServer actor
    pub async fn bind(config: ServerConfig) -> Result<Self, AppError> {
        let listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        info!(port = config.port, "starting up the server");

        let shutdown = CancellationToken::new();
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(ChatServer::new(cmd_rx, shutdown.clone(), config.clone()).run());

        Ok(Self {
            listener,
            cmd_tx,
            shutdown,
            tracker: TaskTracker::new(),
            config,
        })
    }

    /// The address the server is actually listening on
    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle for injecting commands (external shutdown, stats queries)
    pub fn command_sender(&self) -> mpsc::Sender<ServerCommand> {
        self.cmd_tx.clone()
    }

    /// RUNNING: accept connections until shutdown, then drain workers
    ///
    /// Each connection takes a permit from a fixed-size pool before its
    /// worker is spawned; a full pool pauses accepting instead of
    /// spawning unbounded tasks. Ctrl-c routes through the actor's
    /// idempotent shutdown path, same as the idle watchdog.
    pub async fn run(self) -> Result<(), AppError> {
        let workers = Arc::new(Semaphore::new(self.config.pool_size));

        let ctrl_c_tx = self.cmd_tx.clone();
        let ctrl_c_shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = ctrl_c_shutdown.cancelled() => {}
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_ok() {
                        info!("received ctrl-c, requesting shutdown");
                        let _ = ctrl_c_tx.send(ServerCommand::Shutdown).await;
                    }
                }
            }
        });

        loop {
            let permit = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                permit = workers.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let (stream, addr) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        if !self.shutdown.is_cancelled() {
                            error!(error = %e, "failed to accept connection");
                        }
                        continue;
                    }
                },
            };

            debug!(peer = %addr, "accepted connection");
            let cmd_tx = self.cmd_tx.clone();
            let cancel = self.shutdown.child_token();
            self.tracker.spawn(async move {
                let _permit = permit;
                if let Err(e) = handle_connection(stream, cmd_tx, cancel).await {
                    error!(peer = %addr, error = %e, "connection handler error");
                }
            });
        }

        // STOPPING: stop accepting, drain workers under the grace period.
        // Workers were already told to cancel via the token; one that
        // still won't finish is abandoned rather than allowed to block
        // shutdown.
        info!("draining connection workers");
        self.tracker.close();
        if tokio::time::timeout(self.config.shutdown_grace, self.tracker.wait())
            .await
            .is_err()
        {
            warn!(
                remaining = self.tracker.len(),
                "workers did not drain within grace period, abandoning them"
            );
        }

        info!("chat server has been completely shut down");
        Ok(())
    }
}
