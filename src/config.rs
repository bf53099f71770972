//! Server configuration
//!
//! Runtime tunables for the server lifecycle. Only the port and debug
//! level are exposed on the command line; the remaining knobs keep their
//! defaults in production and are shortened by tests.

use std::time::Duration;

/// Number of connection workers admitted concurrently
pub const DEFAULT_POOL_SIZE: usize = 6;

/// Server-wide inactivity threshold before auto-shutdown
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(180);

/// Period of the idle watchdog
pub const DEFAULT_IDLE_CHECK_PERIOD: Duration = Duration::from_secs(60);

/// Grace period for draining connection workers during shutdown
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Runtime configuration for one server instance
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on (0 picks an ephemeral port)
    pub port: u16,
    /// Debug level: 0 = quiet, 1 = verbose connect/disconnect/idle logging
    pub debug: u8,
    /// Maximum number of concurrently served connections
    pub pool_size: usize,
    /// Inactivity duration after which the server shuts itself down
    pub idle_timeout: Duration,
    /// How often the idle watchdog checks the last-activity timestamp
    pub idle_check_period: Duration,
    /// How long shutdown waits for workers before giving up on them
    pub shutdown_grace: Duration,
}

impl ServerConfig {
    /// Configuration with the given port and debug level, defaults elsewhere
    pub fn new(port: u16, debug: u8) -> Self {
        Self {
            port,
            debug,
            ..Self::default()
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 0,
            debug: 0,
            pool_size: DEFAULT_POOL_SIZE,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            idle_check_period: DEFAULT_IDLE_CHECK_PERIOD,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}
