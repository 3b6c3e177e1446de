//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor loop
//! - One handler thread per connection, owning all of its state
//! - Query messages routed to the scanner

mod connection;
mod server;

pub use connection::{dispatch, Connection, Dispatch, TransportOptions};
pub use server::{Server, ServerHandle, ACCEPT_POLL_INTERVAL};
