//! Length-prefixed framing for StageLinq service sockets.
//!
//! A TCP socket is a byte stream, not a message stream: one `read` can
//! return half a message, or three and a bit. Every message on a StateMap
//! socket is therefore wrapped in an envelope:
//!
//! ```text
//! [u32 big-endian length][length bytes of message]
//! ```
//!
//! The length counts only the message, not the 4-byte prefix.
//! [`FrameDecoder`] buffers incoming bytes and hands out complete messages
//! one at a time. A partial frame is never returned; whatever is left over
//! after a complete frame stays buffered for the next one.

use crate::ProtocolError;

/// Size of the length prefix in bytes.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Default cap on a single frame's length (1 MiB). StateMap messages are a
/// few hundred bytes at most, so anything near this is a corrupt prefix.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1024 * 1024;

/// Wraps an inner message in a length-prefixed frame.
pub fn encode_frame(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(LENGTH_PREFIX_LEN + message.len());
    out.extend_from_slice(&(message.len() as u32).to_be_bytes());
    out.extend_from_slice(message);
    out
}

/// Reassembles length-prefixed frames from an arbitrary byte stream.
///
/// ```rust
/// use stagelinq_protocol::{encode_frame, FrameDecoder};
///
/// let wire = encode_frame(b"hello");
/// let mut decoder = FrameDecoder::new();
///
/// decoder.extend(&wire[..3]);
/// assert_eq!(decoder.next_frame().unwrap(), None);
///
/// decoder.extend(&wire[3..]);
/// assert_eq!(decoder.next_frame().unwrap(), Some(b"hello".to_vec()));
/// ```
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    max_frame_len: usize,
}

impl FrameDecoder {
    /// Creates a decoder with [`DEFAULT_MAX_FRAME_LEN`].
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    /// Creates a decoder that rejects frames longer than `max_frame_len`.
    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_frame_len,
        }
    }

    /// Appends bytes received from the socket.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Number of bytes buffered but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Returns the next complete inner message, if one is buffered.
    ///
    /// Call this in a loop after every [`extend`](Self::extend) until it
    /// returns `Ok(None)`.
    ///
    /// # Errors
    /// [`ProtocolError::FrameTooLarge`] if the length prefix exceeds the
    /// configured maximum. The buffer is left untouched; the stream is
    /// unusable after this.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        if self.buf.len() < LENGTH_PREFIX_LEN {
            return Ok(None);
        }

        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        prefix.copy_from_slice(&self.buf[..LENGTH_PREFIX_LEN]);
        let len = u32::from_be_bytes(prefix) as usize;

        if len > self.max_frame_len {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let total = LENGTH_PREFIX_LEN + len;
        if self.buf.len() < total {
            return Ok(None);
        }

        let frame = self.buf[LENGTH_PREFIX_LEN..total].to_vec();
        self.buf.drain(..total);
        Ok(Some(frame))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
