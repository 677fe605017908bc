//! Error types for the protocol layer.
//!
//! Each crate in the workspace defines its own error enum. When you see a
//! `ProtocolError`, the problem is in the bytes themselves (a short read,
//! a bad marker, malformed JSON), not in networking or player state.

/// Errors that can occur while reading, writing, or framing StageLinq
/// messages.
///
/// Most variants describe a single malformed message. The session layer
/// drops that message and keeps reading. [`is_fatal`](Self::is_fatal)
/// tells the two kinds apart.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// A read needed more bytes than the buffer had left.
    #[error("unexpected end of message: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// The inner message didn't start with the `smaa` marker.
    #[error("invalid message marker {0:?}")]
    InvalidMarker(String),

    /// The type tag after the marker isn't one we handle.
    #[error("unknown message type 0x{0:08x}")]
    UnknownMessageType(u32),

    /// A string field couldn't be decoded (bad UTF-16 or non-ASCII marker).
    #[error("invalid string: {0}")]
    InvalidString(String),

    /// The JSON payload of a value update didn't parse.
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON parsed, but didn't carry exactly one recognized value.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A cursor seek landed outside the buffer. This is a bug in the
    /// caller, not bad input from the device.
    #[error("seek out of bounds: offset {offset} from position {position} (len {len})")]
    OutOfBounds {
        offset: i64,
        position: usize,
        len: usize,
    },

    /// A frame length prefix exceeded the configured maximum. The stream
    /// can't be resynchronized after this.
    #[error("frame of {len} bytes exceeds maximum of {max}")]
    FrameTooLarge { len: usize, max: usize },
}

impl ProtocolError {
    /// Returns `true` if the error means the byte stream (or the code
    /// reading it) can't be trusted any more.
    ///
    /// Everything else is recoverable noise: skip the message, keep going.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. } | Self::FrameTooLarge { .. })
    }
}
