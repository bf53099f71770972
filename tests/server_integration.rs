//! End-to-end tests driving the server over real TCP connections.
//!
//! Covers the full client lifecycle: naming loop, chat broadcast
//! scoping, channel join/leave, /list snapshots, quit/departure
//! notices, and idle auto-shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use linechat::{ServerCommand, ServerConfig, ServerLifecycle, ServerStats, SHUTDOWN_NOTICE};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct TestServer {
    addr: SocketAddr,
    cmd_tx: mpsc::Sender<ServerCommand>,
    run_task: JoinHandle<()>,
}

async fn start_server(config: ServerConfig) -> TestServer {
    let server = ServerLifecycle::bind(config).await.expect("bind failed");
    let addr = server.local_addr().expect("no local addr");
    let cmd_tx = server.command_sender();
    let run_task = tokio::spawn(async move {
        server.run().await.expect("server run failed");
    });
    TestServer {
        addr,
        cmd_tx,
        run_task,
    }
}

async fn start_default_server() -> TestServer {
    // Idle timeout long enough to stay out of the way
    start_server(ServerConfig {
        idle_timeout: Duration::from_secs(60),
        idle_check_period: Duration::from_secs(30),
        shutdown_grace: Duration::from_secs(2),
        ..ServerConfig::default()
    })
    .await
}

async fn stats(cmd_tx: &mpsc::Sender<ServerCommand>) -> ServerStats {
    let (reply_tx, reply_rx) = oneshot::channel();
    cmd_tx
        .send(ServerCommand::Stats { reply: reply_tx })
        .await
        .expect("server command channel closed");
    reply_rx.await.expect("stats reply dropped")
}

struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(("127.0.0.1", addr.port()))
            .await
            .expect("connect failed");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write failed");
    }

    async fn recv(&mut self) -> String {
        tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for server line")
            .expect("read failed")
            .expect("connection closed unexpectedly")
    }

    async fn expect(&mut self, want: &str) {
        let got = self.recv().await;
        assert_eq!(got.trim_end(), want.trim_end());
    }

    /// Connection closed by the server
    async fn expect_eof(&mut self) {
        let line = tokio::time::timeout(RECV_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for EOF")
            .expect("read failed");
        assert_eq!(line, None);
    }

    /// Walk the naming loop and swallow the help text
    async fn login(addr: SocketAddr, nickname: &str) -> Self {
        let mut client = Self::connect(addr).await;
        client.expect("Welcome to the ChatServer, choose a name:").await;
        client.send(nickname).await;
        client.expect(&format!("Nickname set to: {nickname}")).await;
        client.skip_help().await;
        client
    }

    async fn skip_help(&mut self) {
        self.expect("List of available commands:").await;
        for _ in 0..6 {
            self.recv().await;
        }
    }
}

#[tokio::test]
async fn test_naming_loop_rejects_blank_and_duplicate() {
    let server = start_default_server().await;

    let mut alice = TestClient::login(server.addr, "alice").await;

    let mut bob = TestClient::connect(server.addr).await;
    bob.expect("Welcome to the ChatServer, choose a name:").await;

    bob.send("").await;
    bob.expect("Invalid name. Choose another").await;

    bob.send("alice").await;
    bob.expect("Nickname is already taken. Choose another").await;

    bob.send("bob").await;
    bob.expect("Nickname set to: bob").await;
    bob.skip_help().await;

    // Both are visible once named
    alice.send("/list").await;
    alice.expect("List of connected clients:").await;
    alice.expect("alice").await;
    alice.expect("bob").await;
}

#[tokio::test]
async fn test_chat_join_leave_scenario() {
    let server = start_default_server().await;

    let mut alice = TestClient::login(server.addr, "alice").await;
    let mut bob = TestClient::login(server.addr, "bob").await;

    // Chat in general reaches both members, sender included
    alice.send("hello").await;
    alice.expect("[general] alice: hello").await;
    bob.expect("[general] alice: hello").await;

    // Bob joins music; general members only see his leave notice
    bob.send("/join music").await;
    bob.expect("User bob has left the channel: general").await;
    bob.expect("You have joined channel: music").await;
    bob.expect("User bob has joined the channel: music").await;
    alice.expect("User bob has left the channel: general").await;

    // music is registered
    alice.send("/list").await;
    alice.expect("List of connected clients:").await;
    alice.expect("alice").await;
    alice.expect("bob").await;
    alice.expect("List of channels in the server:").await;
    alice.expect("general").await;
    alice.expect("music").await;

    // Chat no longer crosses channels
    alice.send("anyone?").await;
    alice.expect("[general] alice: anyone?").await;

    // Leaving the default channel is refused
    alice.send("/leave").await;
    alice.expect("You cannot leave the default 'general' channel.").await;

    // Leaving a channel you are not in is refused
    alice.send("/leave music").await;
    alice.expect("You are not in channel 'music'.").await;

    // Bob returns to general; music is removed (empty)
    bob.send("/leave").await;
    bob.expect("User bob has left the channel: music").await;
    bob.expect("You have joined channel: general").await;
    bob.expect("User bob has joined the channel: general").await;
    alice.expect("User bob has joined the channel: general").await;

    alice.send("/list").await;
    alice.expect("List of connected clients:").await;
    alice.expect("alice").await;
    alice.expect("bob").await;
    alice.expect("List of channels in the server:").await;
    alice.expect("general").await;
    let stats = stats(&server.cmd_tx).await;
    assert_eq!(stats.channels, 1);
}

#[tokio::test]
async fn test_unrecognized_slash_command_is_chat() {
    let server = start_default_server().await;
    let mut alice = TestClient::login(server.addr, "alice").await;

    alice.send("/stats").await;
    alice.expect("[general] alice: /stats").await;
}

#[tokio::test]
async fn test_rename_with_nick() {
    let server = start_default_server().await;
    let mut alice = TestClient::login(server.addr, "alice").await;
    let mut bob = TestClient::login(server.addr, "bob").await;

    // Rename to a taken name is rejected without state change
    bob.send("/nick alice").await;
    bob.expect("Nickname is already taken. Choose another").await;

    bob.send("/nick robert").await;
    bob.expect("Nickname set to: robert").await;

    bob.send("hi").await;
    alice.expect("[general] robert: hi").await;
    bob.expect("[general] robert: hi").await;

    // Missing argument reports usage
    bob.send("/nick").await;
    bob.expect("Usage: /nick <nickname>").await;
}

#[tokio::test]
async fn test_quit_and_departure_notice() {
    let server = start_default_server().await;
    let mut alice = TestClient::login(server.addr, "alice").await;
    let mut bob = TestClient::login(server.addr, "bob").await;

    bob.send("/quit").await;
    bob.expect("Goodbye!").await;
    bob.expect_eof().await;

    alice.expect("bob has left the server").await;

    // Bob's nickname becomes available again
    let mut carol = TestClient::connect(server.addr).await;
    carol.expect("Welcome to the ChatServer, choose a name:").await;
    carol.send("bob").await;
    carol.expect("Nickname set to: bob").await;
}

#[tokio::test]
async fn test_counters_match_broadcasts() {
    let server = start_default_server().await;
    let mut alice = TestClient::login(server.addr, "alice").await;
    let mut bob = TestClient::login(server.addr, "bob").await;

    for i in 0..3 {
        alice.send(&format!("msg {i}")).await;
        alice.expect(&format!("[general] alice: msg {i}")).await;
        bob.expect(&format!("[general] alice: msg {i}")).await;
    }
    bob.send("reply").await;
    bob.expect("[general] bob: reply").await;
    alice.expect("[general] bob: reply").await;

    let stats = stats(&server.cmd_tx).await;
    assert_eq!(stats.total_messages, 4);
    assert_eq!(stats.per_session_messages.iter().sum::<u64>(), 4);
    assert_eq!(stats.sessions, 2);
}

#[tokio::test]
async fn test_idle_timeout_shuts_server_down() {
    let server = start_server(ServerConfig {
        idle_timeout: Duration::from_millis(400),
        idle_check_period: Duration::from_millis(100),
        shutdown_grace: Duration::from_secs(2),
        ..ServerConfig::default()
    })
    .await;

    let mut alice = TestClient::login(server.addr, "alice").await;

    // Fall silent; the watchdog shuts the server down on its own
    alice.expect(SHUTDOWN_NOTICE).await;
    alice.expect_eof().await;

    // The lifecycle drains and run() returns
    tokio::time::timeout(Duration::from_secs(5), server.run_task)
        .await
        .expect("server did not stop after idle timeout")
        .expect("server task panicked");
}

#[tokio::test]
async fn test_external_shutdown_notifies_sessions() {
    let server = start_default_server().await;
    let mut alice = TestClient::login(server.addr, "alice").await;

    server
        .cmd_tx
        .send(ServerCommand::Shutdown)
        .await
        .expect("command channel closed");

    alice.expect(SHUTDOWN_NOTICE).await;
    alice.expect_eof().await;

    tokio::time::timeout(Duration::from_secs(5), server.run_task)
        .await
        .expect("server did not stop after shutdown command")
        .expect("server task panicked");
}
