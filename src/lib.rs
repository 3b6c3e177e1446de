//! # diskquery
//!
//! Front-end of a database server:
//! - TCP acceptor with one handler thread per client
//! - Tagged, length-prefixed message framing
//! - SQL lexical scanner feeding a future parser
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ one thread per connection
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Connection Handler                           │
//! │          (read message → dispatch on tag)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │   Framer    │          │   Scanner   │
//!   │ (protocol)  │          │  (parser)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │  Keywords   │
//!                           │   (phf)     │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod parser;
pub mod protocol;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{DiskQueryError, Result};
pub use config::Config;
pub use network::Server;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of diskquery
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
