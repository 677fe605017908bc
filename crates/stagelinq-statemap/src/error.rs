//! Error types for the StateMap layer.

use stagelinq_protocol::ProtocolError;
use stagelinq_transport::TransportError;

/// Errors that end (or prevent) a StateMap session.
///
/// A single malformed message is not one of these: the session logs it
/// and keeps reading. These are the errors a session returns when it
/// stops.
#[derive(Debug, thiserror::Error)]
pub enum StateMapError {
    /// A protocol error the stream can't recover from (see
    /// [`ProtocolError::is_fatal`]).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Sending to or receiving from the device failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Too many malformed messages arrived back to back; the stream is
    /// treated as corrupt.
    #[error("{0} consecutive undecodable messages")]
    TooManyDecodeErrors(u32),

    /// A device id string couldn't be parsed.
    #[error("invalid device id: {0}")]
    InvalidDeviceId(String),
}
