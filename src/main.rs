//! Chat server entry point
//!
//! Parses the required `-p <port>` and `-d <debug level>` flags, wires
//! up logging, and runs the server lifecycle to completion.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use linechat::{ServerConfig, ServerLifecycle};

/// Multi-channel line-oriented chat server
#[derive(Debug, Parser)]
#[command(name = "chat-server")]
struct Args {
    /// TCP port to listen on
    #[arg(short = 'p', long = "port")]
    port: u16,

    /// Debug level: 0 = quiet, 1 = verbose connect/disconnect/idle logging
    #[arg(short = 'd', long = "debug", value_parser = clap::value_parser!(u8).range(0..=1))]
    debug: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Malformed or missing flags exit non-zero with a usage message here
    let args = Args::parse();

    // The debug flag picks the default verbosity; RUST_LOG still wins
    let default_filter = if args.debug == 1 {
        "linechat=debug"
    } else {
        "linechat=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let config = ServerConfig::new(args.port, args.debug);
    let server = ServerLifecycle::bind(config).await?;
    server.run().await?;

    Ok(())
}
