//! Multi-channel line-oriented chat server library
//!
//! A TCP chat server where clients pick a unique nickname, join and
//! leave named channels, and exchange newline-delimited messages
//! broadcast to every member of a channel. The server shuts itself down
//! after a configurable period of inactivity.
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning all registries; every
//!   registry read and mutation is serialized through it, so nickname
//!   assignment, channel cleanup, and broadcast enumeration are atomic
//!   without locks
//! - Each connection has a worker task communicating with the actor,
//!   admitted through a fixed-size semaphore pool
//! - Each session has a dedicated writer task so concurrent broadcasts
//!   never interleave partial writes
//! - `ServerLifecycle` owns the listener, the worker pool, and the
//!   graceful-shutdown drain
//!
//! # Example
//! ```ignore
//! use linechat::{ServerConfig, ServerLifecycle};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = ServerLifecycle::bind(ServerConfig::new(5156, 0)).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod channel;
pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use broadcast::Broadcaster;
pub use channel::ChannelRegistry;
pub use command::Command;
pub use config::ServerConfig;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use lifecycle::ServerLifecycle;
pub use registry::SessionRegistry;
pub use server::{ChatServer, ServerCommand, ServerStats, SHUTDOWN_NOTICE};
pub use session::Session;
pub use types::{ChannelName, SessionId, GENERAL};
