//! Transport layer abstraction for sessions.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// A byte transport a session reads chunks from and writes replies to.
///
/// This trait abstracts the connection, allowing sessions to run over TCP
/// or over scripted transports in tests.
pub trait Transport: Send {
    /// Receives up to `max_len` bytes.
    ///
    /// Returns `Ok(None)` once the peer has finished sending.
    fn receive(
        &mut self,
        max_len: usize,
    ) -> impl Future<Output = io::Result<Option<Vec<u8>>>> + Send;

    /// Sends all of `bytes`, returning how many were sent.
    fn send(&mut self, bytes: &[u8]) -> impl Future<Output = io::Result<usize>> + Send;

    /// Closes the sending side.
    fn close(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Describes the peer for logs.
    fn peer(&self) -> String;
}

/// A [`Transport`] over a TCP connection.
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Wraps an accepted connection.
    pub fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self { stream, peer }
    }
}

impl Transport for TcpTransport {
    async fn receive(&mut self, max_len: usize) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; max_len];
        let n = self.stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(buf))
    }

    async fn send(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.stream.write_all(bytes).await?;
        Ok(bytes.len())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }

    fn peer(&self) -> String {
        self.peer.to_string()
    }
}
