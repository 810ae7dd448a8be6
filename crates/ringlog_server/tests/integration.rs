//! Integration tests for the record server over real TCP connections.

use ringlog_core::{Shutdown, StoreConfig};
use ringlog_server::{RecordServer, ReplyMode, ServerConfig, ServerResult, ServerSummary};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

struct Running {
    addr: SocketAddr,
    shutdown: Shutdown,
    task: JoinHandle<ServerResult<ServerSummary>>,
}

impl Running {
    async fn stop(self) -> ServerSummary {
        self.shutdown.trigger();
        self.task.await.unwrap().unwrap()
    }
}

fn config(capacity: usize) -> ServerConfig {
    ServerConfig::new("127.0.0.1:0".parse().unwrap())
        .with_store(StoreConfig::new().capacity(capacity))
        .with_timestamp_interval(None)
        .with_data_file(None)
        .with_reap_interval(Duration::from_millis(20))
}

async fn start(config: ServerConfig) -> Running {
    let shutdown = Shutdown::new();
    let server = RecordServer::open(config, shutdown.clone()).unwrap();
    let bound = server.bind().await.unwrap();
    let addr = bound.local_addr();
    let task = tokio::spawn(bound.run());
    Running {
        addr,
        shutdown,
        task,
    }
}

/// Sends `payload`, half-closes, and returns everything the server replies.
async fn exchange(addr: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(payload).await.unwrap();
    stream.shutdown().await.unwrap();
    let mut reply = Vec::new();
    stream.read_to_end(&mut reply).await.unwrap();
    reply
}

#[tokio::test]
async fn single_line_is_echoed() {
    let server = start(config(10)).await;
    assert_eq!(exchange(server.addr, b"x\n").await, b"x\n");

    let summary = server.stop().await;
    assert_eq!(summary.sessions_completed, 1);
    assert_eq!(summary.records_released, 1);
}

#[tokio::test]
async fn later_clients_see_earlier_records() {
    let server = start(config(10)).await;
    assert_eq!(exchange(server.addr, b"first\n").await, b"first\n");
    assert_eq!(exchange(server.addr, b"second\n").await, b"first\nsecond\n");
    assert_eq!(exchange(server.addr, b"").await, b"first\nsecond\n");
    server.stop().await;
}

#[tokio::test]
async fn oldest_records_are_evicted() {
    let server = start(config(2)).await;
    exchange(server.addr, b"a\n").await;
    exchange(server.addr, b"b\n").await;
    assert_eq!(exchange(server.addr, b"c\n").await, b"b\nc\n");

    let summary = server.stop().await;
    assert_eq!(summary.records_released, 2);
}

#[tokio::test]
async fn unterminated_tail_never_appears() {
    let server = start(config(10)).await;
    assert_eq!(exchange(server.addr, b"keep\npartial").await, b"keep\n");

    // A client that vanishes mid-record.
    let mut abrupt = TcpStream::connect(server.addr).await.unwrap();
    abrupt.write_all(b"abrupt").await.unwrap();
    drop(abrupt);

    assert_eq!(exchange(server.addr, b"").await, b"keep\n");
    assert_eq!(exchange(server.addr, b"next\n").await, b"keep\nnext\n");
    server.stop().await;
}

#[tokio::test]
async fn partial_records_do_not_interleave() {
    let server = start(config(10)).await;

    let mut slow = TcpStream::connect(server.addr).await.unwrap();
    slow.write_all(b"aa").await.unwrap();

    assert_eq!(exchange(server.addr, b"bb\n").await, b"bb\n");

    slow.write_all(b"aa\n").await.unwrap();
    slow.shutdown().await.unwrap();
    let mut reply = Vec::new();
    slow.read_to_end(&mut reply).await.unwrap();
    assert_eq!(reply, b"bb\naaaa\n");

    server.stop().await;
}

#[tokio::test]
async fn concurrent_clients_commit_whole_lines() {
    let server = start(config(100)).await;
    let addr = server.addr;

    let clients: Vec<_> = (0..10)
        .map(|i| {
            tokio::spawn(async move {
                let line = format!("client-{i}\n");
                let reply = exchange(addr, line.as_bytes()).await;
                (line, reply)
            })
        })
        .collect();

    for client in clients {
        let (line, reply) = client.await.unwrap();
        let reply = String::from_utf8(reply).unwrap();
        assert!(reply.lines().any(|l| format!("{l}\n") == line));
    }

    let all = String::from_utf8(exchange(addr, b"").await).unwrap();
    let mut lines: Vec<_> = all.lines().collect();
    lines.sort_unstable();
    let mut expected: Vec<_> = (0..10).map(|i| format!("client-{i}")).collect();
    expected.sort_unstable();
    assert_eq!(lines, expected);

    let summary = server.stop().await;
    assert_eq!(summary.sessions_completed, 11);
}

#[tokio::test]
async fn reply_on_commit_without_half_close() {
    let server = start(config(10).with_reply_mode(ReplyMode::OnCommit)).await;

    let mut stream = TcpStream::connect(server.addr).await.unwrap();
    stream.write_all(b"hello\n").await.unwrap();
    let mut buf = [0u8; 6];
    stream.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"hello\n");
    drop(stream);

    server.stop().await;
}

#[tokio::test]
async fn timestamps_are_appended() {
    let server = start(config(10).with_timestamp_interval(Some(Duration::from_millis(20)))).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let reply = String::from_utf8(exchange(server.addr, b"").await).unwrap();
    assert!(reply.lines().any(|l| l.starts_with("timestamp:")));
    assert!(reply.lines().all(|l| l.starts_with("timestamp:")));

    let summary = server.stop().await;
    assert!(summary.timestamps_appended >= 1);
}

#[tokio::test]
async fn shutdown_ends_idle_sessions() {
    let server = start(config(10)).await;

    let mut idle = TcpStream::connect(server.addr).await.unwrap();
    idle.write_all(b"never finished").await.unwrap();
    // Give the server time to accept and start the session.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let summary = tokio::time::timeout(Duration::from_secs(5), server.stop())
        .await
        .unwrap();
    assert_eq!(summary.records_released, 0);

    let mut rest = Vec::new();
    let _ = idle.read_to_end(&mut rest).await;
    assert!(rest.is_empty());
}
