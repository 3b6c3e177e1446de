//! Protocol codec
//!
//! Framing functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ```text
//! ┌──────────┬──────────────────┬─────────────────────────────┐
//! │ Tag (1)  │ Len (4, BE)      │     Payload (Len - 4)       │
//! └──────────┴──────────────────┴─────────────────────────────┘
//! ```
//!
//! The length field counts itself but not the tag byte, so an empty payload is
//! sent as length 4.

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::{InputMessage, MessageTag};
use crate::error::{DiskQueryError, Result};

/// Header size: 1 byte tag + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Size of the length field, which the declared length includes
pub const LENGTH_FIELD_SIZE: u32 = 4;

/// Default maximum payload size (16 MB)
pub const DEFAULT_MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Value of the length field for a payload of `payload_len` bytes
///
/// Fails when the payload plus the length field does not fit in a `u32`.
pub fn frame_length(payload_len: usize) -> Result<u32> {
    u32::try_from(payload_len)
        .ok()
        .and_then(|len| len.checked_add(LENGTH_FIELD_SIZE))
        .ok_or_else(|| {
            DiskQueryError::Protocol(format!("payload too large to frame: {} bytes", payload_len))
        })
}

/// Encode a message to bytes
///
/// Format: tag (1) + length (4, including itself) + payload
pub fn encode_message(tag: MessageTag, payload: &[u8]) -> Result<Bytes> {
    let length = frame_length(payload.len())?;

    let mut message = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(tag.as_byte());
    message.put_u32(length);
    message.put_slice(payload);
    Ok(message.freeze())
}

/// Encode a simple query, NUL-terminating the text the way clients do
pub fn encode_query(sql: &str) -> Result<Bytes> {
    let mut payload = Vec::with_capacity(sql.len() + 1);
    payload.extend_from_slice(sql.as_bytes());
    payload.push(0);
    encode_message(MessageTag::Query, &payload)
}

/// Write a message to a stream
pub fn write_message<W: Write>(writer: &mut W, tag: MessageTag, payload: &[u8]) -> Result<()> {
    let bytes = encode_message(tag, payload)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Stream-based decoding
// =============================================================================

/// Read one complete message from a stream
///
/// Blocks until the tag, the length and the whole payload are available.
///
/// - `Ok(None)`: the stream ended cleanly before a new message started
/// - `Err(TruncatedMessage)`: the stream ended or failed after the tag byte
/// - `Err(MalformedMessage)`: the declared length is below 4 or the payload
///   would exceed `max_message_size`
pub fn read_message<R: Read>(reader: &mut R, max_message_size: u32) -> Result<Option<InputMessage>> {
    // Tag byte: EOF here is a clean close
    let mut tag = [0u8; 1];
    match reader.read_exact(&mut tag) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let tag = tag[0];

    // Length field
    let mut length = [0u8; 4];
    reader
        .read_exact(&mut length)
        .map_err(|source| DiskQueryError::TruncatedMessage { tag, source })?;
    let declared_len = u32::from_be_bytes(length);

    // Validate length before allocating
    let payload_len = declared_len.checked_sub(LENGTH_FIELD_SIZE).ok_or_else(|| {
        DiskQueryError::MalformedMessage(format!(
            "declared length {} is smaller than the length field",
            declared_len
        ))
    })?;

    if payload_len > max_message_size {
        return Err(DiskQueryError::MalformedMessage(format!(
            "payload too large: {} bytes (max {})",
            payload_len, max_message_size
        )));
    }

    // Payload
    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader
            .read_exact(&mut payload)
            .map_err(|source| DiskQueryError::TruncatedMessage { tag, source })?;
    }

    Ok(Some(InputMessage::new(MessageTag::from(tag), payload)))
}
