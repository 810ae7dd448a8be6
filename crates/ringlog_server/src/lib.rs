//! # ringlog server
//!
//! TCP line service over a ringlog record store.
//!
//! Each accepted connection runs as one session:
//! 1. Bytes received from the client are accumulated per connection
//! 2. Every newline-terminated record is committed to the shared ring
//! 3. When the client half-closes, the whole resident stream is sent back
//! 4. The connection is closed; an unterminated tail is discarded
//!
//! A background task adds a timestamp record every ten seconds by default.
//!
//! # Shutdown
//!
//! Triggering the [`Shutdown`](ringlog_core::Shutdown) flag stops the
//! accept loop, lets running sessions finish, stops the timestamp task and
//! tears the store down (removing its data file unless configured not to).
//!
//! ```rust,no_run
//! use ringlog_core::Shutdown;
//! use ringlog_server::{RecordServer, ServerConfig};
//!
//! # async fn example() -> ringlog_server::ServerResult<()> {
//! let shutdown = Shutdown::new();
//! let server = RecordServer::open(ServerConfig::default(), shutdown.clone())?;
//! let bound = server.bind().await?;
//! let summary = bound.run().await?;
//! println!("served {} sessions", summary.sessions_completed);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod error;
mod registry;
mod server;
mod session;
mod transport;

pub use config::{ReplyMode, ServerConfig, DEFAULT_DATA_FILE};
pub use error::{ServerError, ServerResult};
pub use registry::SessionRegistry;
pub use server::{BoundServer, RecordServer, ServerSummary};
pub use session::{Session, SessionReport, SessionState};
pub use transport::{TcpTransport, Transport};
