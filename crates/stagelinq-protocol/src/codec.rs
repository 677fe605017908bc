//! Primitive wire types: fixed strings, integers, and UTF-16 network strings.
//!
//! Every StageLinq sub-protocol is built from the same handful of
//! primitives. [`ReadContext`] reads them from a byte slice with a cursor,
//! [`WriteContext`] appends them to a growable buffer.
//!
//! ## Byte order
//!
//! Everything is big-endian ("network order"): integers, length prefixes,
//! and the 16-bit code units of network strings. Reader and writer agree
//! on this, so anything written here reads back identically.
//!
//! ## Network strings
//!
//! A network string is a `u32` count of UTF-16 code units followed by the
//! code units themselves. The empty string is just a zero length.

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// ReadContext
// ---------------------------------------------------------------------------

/// A cursor over a borrowed byte slice.
///
/// All reads are bounds-checked. A read that needs more bytes than remain
/// fails with [`ProtocolError::UnexpectedEof`] and leaves the cursor where
/// it was, so the reader never walks off the end of the buffer.
#[derive(Debug, Clone)]
pub struct ReadContext<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ReadContext<'a> {
    /// Creates a reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current cursor position, in bytes from the start.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns `true` when every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Reads exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ProtocolError> {
        if n > self.remaining() {
            return Err(ProtocolError::UnexpectedEof {
                needed: n,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Reads an `n`-byte ASCII string, such as a message marker.
    pub fn read_fixed_string(&mut self, n: usize) -> Result<String, ProtocolError> {
        let bytes = self.read_bytes(n)?;
        if !bytes.is_ascii() {
            return Err(ProtocolError::InvalidString(format!(
                "non-ascii fixed string {bytes:02x?}"
            )));
        }
        Ok(bytes.iter().map(|&b| b as char).collect())
    }

    /// Reads a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, ProtocolError> {
        let bytes = self.read_array::<4>()?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// Reads a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, ProtocolError> {
        let bytes = self.read_array::<4>()?;
        Ok(i32::from_be_bytes(bytes))
    }

    /// Reads the next `i32` without consuming it.
    ///
    /// Implemented as a read followed by `seek(-4)`, the same way the
    /// interval field of a StateMap message is re-read for re-dispatch.
    pub fn peek_i32(&mut self) -> Result<i32, ProtocolError> {
        let value = self.read_i32()?;
        self.seek(-4)?;
        Ok(value)
    }

    /// Reads a length-prefixed UTF-16 network string.
    ///
    /// The whole string is checked for length before anything is consumed:
    /// a truncated string fails without moving the cursor past the prefix
    /// data it couldn't use.
    pub fn read_network_string_utf16(&mut self) -> Result<String, ProtocolError> {
        let start = self.pos;
        let units = self.read_u32()? as usize;
        let byte_len = match units.checked_mul(2) {
            Some(len) if len <= self.remaining() => len,
            _ => {
                let remaining = self.remaining();
                self.pos = start;
                return Err(ProtocolError::UnexpectedEof {
                    needed: units.saturating_mul(2),
                    remaining,
                });
            }
        };

        let bytes = self.read_bytes(byte_len)?;
        let code_units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();

        String::from_utf16(&code_units)
            .map_err(|e| ProtocolError::InvalidString(e.to_string()))
    }

    /// Moves the cursor by `offset` bytes (negative moves backwards).
    ///
    /// # Errors
    /// [`ProtocolError::OutOfBounds`] if the new position would be before
    /// the start or past the end of the buffer. The cursor doesn't move.
    pub fn seek(&mut self, offset: i64) -> Result<(), ProtocolError> {
        let target = self.pos as i64 + offset;
        if target < 0 || target > self.buf.len() as i64 {
            return Err(ProtocolError::OutOfBounds {
                offset,
                position: self.pos,
                len: self.buf.len(),
            });
        }
        self.pos = target as usize;
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

// ---------------------------------------------------------------------------
// WriteContext
// ---------------------------------------------------------------------------

/// An append-only writer producing an owned byte buffer.
///
/// Writes into a `Vec<u8>` can't fail; only
/// [`write_fixed_string`](Self::write_fixed_string) validates its input.
#[derive(Debug, Clone, Default)]
pub struct WriteContext {
    buf: Vec<u8>,
}

impl WriteContext {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Appends raw bytes.
    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Appends exactly `n` ASCII bytes, with no length prefix.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidString`] if `s` isn't ASCII or isn't `n`
    /// bytes long. Nothing is written in that case.
    pub fn write_fixed_string(&mut self, s: &str, n: usize) -> Result<(), ProtocolError> {
        if !s.is_ascii() {
            return Err(ProtocolError::InvalidString(format!(
                "fixed string {s:?} is not ascii"
            )));
        }
        if s.len() != n {
            return Err(ProtocolError::InvalidString(format!(
                "fixed string {s:?} is {} bytes, expected {n}",
                s.len()
            )));
        }
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Appends a big-endian `u32`.
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Appends a big-endian `i32`.
    pub fn write_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Appends a length-prefixed UTF-16 network string.
    pub fn write_network_string_utf16(&mut self, s: &str) {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_u32(units.len() as u32);
        for unit in units {
            self.buf.extend_from_slice(&unit.to_be_bytes());
        }
    }

    /// Consumes the writer and returns the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_string_length_enforced() {
        let mut w = WriteContext::new();
        w.write_fixed_string("smaa", 4).unwrap();
        assert!(matches!(
            w.write_fixed_string("smaa", 3),
            Err(ProtocolError::InvalidString(_))
        ));
        assert!(matches!(
            w.write_fixed_string("smä", 4),
            Err(ProtocolError::InvalidString(_))
        ));
        assert_eq!(w.into_bytes(), b"smaa");
    }

    #[test]
    fn test_u32_is_big_endian() {
        let mut w = WriteContext::new();
        w.write_u32(0x0000_07d2);
        assert_eq!(w.into_bytes(), vec![0x00, 0x00, 0x07, 0xd2]);
    }

    #[test]
    fn test_i32_negative_reads_back() {
        let mut w = WriteContext::new();
        w.write_i32(-250);
        let bytes = w.into_bytes();
        let mut r = ReadContext::new(&bytes);
        assert_eq!(r.read_i32().unwrap(), -250);
        assert!(r.is_empty());
    }

    #[test]
    fn test_network_string_length_counts_code_units() {
        let mut w = WriteContext::new();
        w.write_network_string_utf16("/Engine");
        let bytes = w.into_bytes();
        // 4-byte count of 7 code units, then 14 bytes of data.
        assert_eq!(&bytes[..4], &[0, 0, 0, 7]);
        assert_eq!(bytes.len(), 4 + 14);
        assert_eq!(&bytes[4..6], &[0x00, b'/']);
    }

    #[test]
    fn test_network_string_surrogate_pair() {
        let mut w = WriteContext::new();
        w.write_network_string_utf16("🎧");
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 2]);
        let mut r = ReadContext::new(&bytes);
        assert_eq!(r.read_network_string_utf16().unwrap(), "🎧");
    }

    #[test]
    fn test_empty_network_string() {
        let mut w = WriteContext::new();
        w.write_network_string_utf16("");
        let bytes = w.into_bytes();
        assert_eq!(bytes, vec![0, 0, 0, 0]);
        let mut r = ReadContext::new(&bytes);
        assert_eq!(r.read_network_string_utf16().unwrap(), "");
    }

    #[test]
    fn test_truncated_network_string_fails_without_overrun() {
        // Claims 10 code units but carries only one.
        let bytes = [0, 0, 0, 10, 0x00, b'A'];
        let mut r = ReadContext::new(&bytes);
        let err = r.read_network_string_utf16().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedEof {
                needed: 20,
                remaining: 2
            }
        ));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_unpaired_surrogate_is_invalid() {
        let bytes = [0, 0, 0, 1, 0xd8, 0x00];
        let mut r = ReadContext::new(&bytes);
        assert!(matches!(
            r.read_network_string_utf16(),
            Err(ProtocolError::InvalidString(_))
        ));
    }

    #[test]
    fn test_short_read_reports_needed_and_remaining() {
        let bytes = [1, 2];
        let mut r = ReadContext::new(&bytes);
        let err = r.read_u32().unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::UnexpectedEof {
                needed: 4,
                remaining: 2
            }
        ));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn test_fixed_string() {
        let mut r = ReadContext::new(b"smaaXYZ");
        assert_eq!(r.read_fixed_string(4).unwrap(), "smaa");
        assert_eq!(r.remaining(), 3);
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut w = WriteContext::new();
        w.write_i32(42);
        let bytes = w.into_bytes();
        let mut r = ReadContext::new(&bytes);
        assert_eq!(r.peek_i32().unwrap(), 42);
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_i32().unwrap(), 42);
    }

    #[test]
    fn test_seek_bounds() {
        let bytes = [0u8; 8];
        let mut r = ReadContext::new(&bytes);
        assert!(r.seek(8).is_ok());
        assert_eq!(r.position(), 8);
        assert!(matches!(
            r.seek(1),
            Err(ProtocolError::OutOfBounds { .. })
        ));
        assert!(r.seek(-8).is_ok());
        assert!(matches!(
            r.seek(-1),
            Err(ProtocolError::OutOfBounds { .. })
        ));
        assert_eq!(r.position(), 0);
    }
}
