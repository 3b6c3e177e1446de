//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Message Format
//! ```text
//! ┌──────────┬──────────────────┬─────────────────────────────┐
//! │ Tag (1)  │ Len (4, BE)      │     Payload (Len - 4)       │
//! └──────────┴──────────────────┴─────────────────────────────┘
//! ```
//!
//! ### Tags
//! - `'Q'`: simple query - Payload: query text (NUL-terminated)
//! - `'P'`: parse        - not interpreted yet
//! - `'B'`: bind         - not interpreted yet
//! - `'E'`: execute      - not interpreted yet
//!
//! The server does not send responses.

mod codec;
mod message;

pub use codec::{
    encode_message, encode_query, frame_length, read_message, write_message, DEFAULT_MAX_MESSAGE_SIZE,
    HEADER_SIZE, LENGTH_FIELD_SIZE,
};
pub use message::{InputMessage, MessageTag};
