//! Message definitions
//!
//! Represents framed messages received from clients.

use bytes::{Buf, Bytes};

use crate::error::{DiskQueryError, Result};

/// Message kinds, identified by the tag byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTag {
    /// Simple query (`'Q'`) - payload is the query text
    Query,

    /// Parse (`'P'`) - extended protocol, not interpreted yet
    Parse,

    /// Bind (`'B'`) - extended protocol, not interpreted yet
    Bind,

    /// Execute (`'E'`) - extended protocol, not interpreted yet
    Execute,

    /// Any other tag byte
    Unknown(u8),
}

impl MessageTag {
    /// Wire value of the tag
    pub fn as_byte(self) -> u8 {
        match self {
            MessageTag::Query => b'Q',
            MessageTag::Parse => b'P',
            MessageTag::Bind => b'B',
            MessageTag::Execute => b'E',
            MessageTag::Unknown(byte) => byte,
        }
    }
}

impl From<u8> for MessageTag {
    fn from(byte: u8) -> Self {
        match byte {
            b'Q' => MessageTag::Query,
            b'P' => MessageTag::Parse,
            b'B' => MessageTag::Bind,
            b'E' => MessageTag::Execute,
            other => MessageTag::Unknown(other),
        }
    }
}

/// A framed message read from a connection
///
/// The payload is immutable once read. `cursor` tracks how far the field
/// readers have consumed it.
#[derive(Debug, Clone)]
pub struct InputMessage {
    tag: MessageTag,
    payload: Bytes,
    cursor: usize,
}

impl InputMessage {
    pub fn new(tag: MessageTag, payload: impl Into<Bytes>) -> Self {
        Self {
            tag,
            payload: payload.into(),
            cursor: 0,
        }
    }

    pub fn tag(&self) -> MessageTag {
        self.tag
    }

    /// The full payload, independent of the cursor
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.payload.len() - self.cursor
    }

    /// Move the cursor back to the start of the payload
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Query text of a simple query message
    ///
    /// The sender conventionally NUL-terminates the text; everything from the
    /// first NUL on is ignored.
    pub fn query_text(&self) -> Result<&str> {
        let text = match self.payload.iter().position(|b| *b == 0) {
            Some(end) => &self.payload[..end],
            None => &self.payload[..],
        };

        std::str::from_utf8(text)
            .map_err(|e| DiskQueryError::Protocol(format!("query text is not valid UTF-8: {}", e)))
    }

    // =========================================================================
    // Field readers
    // =========================================================================

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1, "byte")?.get_u8())
    }

    /// Read a big-endian 16-bit integer
    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.take(2, "int16")?.get_i16())
    }

    /// Read a big-endian 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.take(4, "int32")?.get_i32())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&[u8]> {
        self.take(len, "bytes")
    }

    /// Read a NUL-terminated string; the terminator is consumed
    pub fn read_cstr(&mut self) -> Result<&str> {
        let rest = &self.payload[self.cursor..];
        let end = rest.iter().position(|b| *b == 0).ok_or_else(|| {
            DiskQueryError::Protocol("unterminated string in message payload".to_string())
        })?;

        let start = self.cursor;
        self.cursor += end + 1;

        std::str::from_utf8(&self.payload[start..start + end])
            .map_err(|e| DiskQueryError::Protocol(format!("string field is not valid UTF-8: {}", e)))
    }

    /// Advance the cursor by `len` bytes and return them
    fn take(&mut self, len: usize, what: &str) -> Result<&[u8]> {
        if self.remaining() < len {
            return Err(DiskQueryError::Protocol(format!(
                "message too short reading {}: need {} bytes at offset {}, have {}",
                what,
                len,
                self.cursor,
                self.remaining()
            )));
        }

        let start = self.cursor;
        self.cursor += len;
        Ok(&self.payload[start..start + len])
    }
}
