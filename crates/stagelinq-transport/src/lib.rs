//! Transport abstraction layer for StageLinq.
//!
//! Provides the [`Connection`] trait, a byte-stream socket to one device
//! service, and [`TcpConnection`], its TCP implementation.
//!
//! Unlike a message transport, a [`Connection`] hands out raw chunks of a
//! stream: a chunk may hold part of a message or several messages. Turning
//! chunks back into messages is the protocol crate's job.

mod error;
mod tcp;

pub use error::TransportError;
pub use tcp::{DEFAULT_READ_BUFFER_SIZE, TcpConnection};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
///
/// Two connections to the same device get different ids, which is how the
/// StateMap registry tells a replaced connection from the live one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single established byte-stream connection to a device service.
///
/// The futures are `Send` so a session over any connection can run on its
/// own spawned task. Implementations can still write plain `async fn`s.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Writes all of `data` to the remote peer.
    ///
    /// May wait on socket backpressure.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receives the next chunk of bytes from the remote peer.
    ///
    /// Returns `Ok(None)` when the peer has closed the stream.
    fn recv(&self) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Address of the remote peer.
    fn peer_addr(&self) -> SocketAddr;
}
