//! Companion interactive chat client
//!
//! A thin I/O wrapper around the server's line protocol: connects,
//! prints every inbound line verbatim, and relays typed input. All
//! protocol behavior lives server-side; inbound lines are opaque
//! display text here.

use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Default server port when none is given
const DEFAULT_PORT: u16 = 5156;

/// Interactive client for the line chat server
#[derive(Debug, Parser)]
#[command(name = "chat-client")]
struct Args {
    /// Server host to connect to
    #[arg(default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let stream = TcpStream::connect((args.host.as_str(), args.port)).await?;
    println!("Connected to {} on port {}", args.host, args.port);
    let (read_half, mut write_half) = stream.into_split();

    // Print server lines until the connection closes
    let mut printer = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            println!("{line}");
        }
        println!("Disconnected from server.");
    });

    // Relay stdin to the server
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = &mut printer => break,
            line = stdin.next_line() => match line? {
                Some(line) => {
                    write_half.write_all(line.as_bytes()).await?;
                    write_half.write_all(b"\n").await?;
                    if line.trim().eq_ignore_ascii_case("/quit") {
                        break;
                    }
                }
                None => break,
            },
        }
    }

    Ok(())
}
