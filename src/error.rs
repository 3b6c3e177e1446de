//! Error types for diskquery
//!
//! Provides a unified error type for the framer, the connection handler and
//! the acceptor. Lexical errors are not represented here: the scanner reports
//! them as error tokens.

use thiserror::Error;

/// Result type alias using DiskQueryError
pub type Result<T> = std::result::Result<T, DiskQueryError>;

/// Unified error type for diskquery operations
#[derive(Debug, Error)]
pub enum DiskQueryError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Framing Errors
    // -------------------------------------------------------------------------
    /// The frame header is well-formed on the wire but semantically invalid
    /// (declared length below the length field, or above the configured cap).
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    /// The stream ended or failed after the tag byte was consumed.
    #[error("Connection terminated mid-message (tag 0x{tag:02x}): {source}")]
    TruncatedMessage {
        tag: u8,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
