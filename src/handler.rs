//! Connection worker
//!
//! Drives one client connection through its lifecycle:
//! UNNAMED (naming loop) -> ACTIVE (command dispatch) -> CLOSED.
//! Reads newline-delimited UTF-8 lines from the socket and forwards
//! parsed commands to the ChatServer actor; a dedicated writer task
//! drains the session's outbound channel back to the socket.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::command::Command;
use crate::error::AppError;
use crate::server::ServerCommand;
use crate::types::SessionId;

/// Outbound line buffer per session
const OUTBOUND_BUFFER: usize = 32;

/// Handle one accepted TCP connection until it closes
///
/// Registers a session with the server actor, walks the naming loop, then
/// dispatches commands until quit, EOF, read error, or server shutdown.
/// Always reports the disconnect to the actor on the way out.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
    cancel: CancellationToken,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let id = SessionId::new();
    debug!(session = %id, peer = %peer_addr, "new connection");

    let (read_half, write_half) = stream.into_split();
    let (msg_tx, msg_rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    // Register with the server actor
    if cmd_tx
        .send(ServerCommand::Connect {
            id,
            sender: msg_tx.clone(),
            cancel: cancel.clone(),
        })
        .await
        .is_err()
    {
        error!(session = %id, "failed to register session, server closed");
        return Err(AppError::ChannelSend);
    }

    let write_task = tokio::spawn(write_loop(write_half, msg_rx));
    let mut lines = BufReader::new(read_half).lines();

    let _ = msg_tx
        .send("Welcome to the ChatServer, choose a name: ".to_string())
        .await;

    // UNNAMED: prompt until a non-empty, non-taken nickname is accepted.
    // Bounded only by client disconnect or server shutdown.
    let named = naming_loop(id, &cmd_tx, &mut lines, &cancel).await;

    if named {
        send_help(&msg_tx).await;
        command_loop(id, &cmd_tx, &msg_tx, &mut lines, &cancel).await;
    }

    // CLOSED: irreversible. Registry removal and the departure broadcast
    // happen inside the actor.
    let _ = cmd_tx.send(ServerCommand::Disconnect { id }).await;
    debug!(session = %id, peer = %peer_addr, "connection closed");

    // Dropping our sender lets the writer drain its backlog and exit
    drop(msg_tx);
    let _ = write_task.await;

    Ok(())
}

/// Read lines until the actor accepts a nickname
///
/// Returns false when the client disconnects or shutdown is requested
/// before a name is accepted.
async fn naming_loop(
    id: SessionId,
    cmd_tx: &mpsc::Sender<ServerCommand>,
    lines: &mut tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
    cancel: &CancellationToken,
) -> bool {
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return false,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => return false,
            },
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if cmd_tx
            .send(ServerCommand::SetNickname {
                id,
                name: line,
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            return false;
        }
        if reply_rx.await.unwrap_or(false) {
            return true;
        }
    }
}

/// Dispatch commands for an ACTIVE session until it closes
async fn command_loop(
    id: SessionId,
    cmd_tx: &mpsc::Sender<ServerCommand>,
    msg_tx: &mpsc::Sender<String>,
    lines: &mut tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
    cancel: &CancellationToken,
) {
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => return,
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => return,
                Err(e) => {
                    debug!(session = %id, error = %e, "read failed");
                    return;
                }
            },
        };

        let cmd = match Command::parse(&line) {
            Command::Nick(name) if name.is_empty() => {
                let _ = msg_tx.send("Usage: /nick <nickname>".to_string()).await;
                continue;
            }
            Command::Nick(name) => {
                // Reply is only needed by the naming loop; drop it here
                let (reply_tx, _reply_rx) = oneshot::channel();
                ServerCommand::SetNickname {
                    id,
                    name,
                    reply: reply_tx,
                }
            }
            Command::Join(channel) if channel.is_empty() => {
                let _ = msg_tx.send("Usage: /join <channel>".to_string()).await;
                continue;
            }
            Command::Join(channel) => ServerCommand::Join { id, channel },
            Command::Leave(channel) => ServerCommand::Leave { id, channel },
            Command::Quit => {
                let _ = msg_tx.send("Goodbye!".to_string()).await;
                return;
            }
            Command::Help => {
                send_help(msg_tx).await;
                continue;
            }
            Command::List => ServerCommand::List { id },
            Command::Chat(line) => ServerCommand::Chat { id, line },
        };

        if cmd_tx.send(cmd).await.is_err() {
            debug!(session = %id, "server closed, ending command loop");
            return;
        }
    }
}

/// Writer task: socket side of the per-session outbound channel
///
/// Serializes all writes for one session, so concurrent broadcasts can
/// never interleave partial lines.
async fn write_loop(mut writer: OwnedWriteHalf, mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        if writer.write_all(line.as_bytes()).await.is_err() {
            break;
        }
        if writer.write_all(b"\n").await.is_err() {
            break;
        }
    }
    let _ = writer.shutdown().await;
}

async fn send_help(msg_tx: &mpsc::Sender<String>) {
    for line in [
        "List of available commands:",
        "/nick <nickname> - sets your nickname",
        "/list - lists all connected clients and channels",
        "/join <channel> - joins a channel",
        "/leave [<channel>] - leaves the current channel",
        "/quit - quits the server",
        "/help - displays this message",
    ] {
        let _ = msg_tx.send(line.to_string()).await;
    }
}
