//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufReader};
use std::net::{SocketAddr, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};

use crate::config::Config;
use crate::error::{DiskQueryError, Result};
use crate::parser::{ScanMode, Scanner, Token, TokenKind};
use crate::protocol::{read_message, InputMessage, MessageTag};

/// Transport options that were successfully applied to the socket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportOptions {
    pub no_delay: bool,
    pub keep_alive: bool,
}

/// What the handler did with one message
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Simple query, tokenized
    Query { tokens: Vec<Token> },

    /// Known extended-protocol message whose payload is not interpreted yet
    Deferred(MessageTag),

    /// Unrecognized tag byte, skipped
    Ignored(u8),
}

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// Peer address for logging
    peer_addr: SocketAddr,

    /// Local endpoint of the socket
    local_addr: SocketAddr,

    /// Options applied by `configure_transport`
    transport: TransportOptions,

    /// Identifier of the serving backend (process id)
    backend_id: u32,

    /// Largest payload accepted from this client
    max_message_size: u32,

    /// Server-wide shutdown flag, checked between messages
    shutdown: Arc<AtomicBool>,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Configures the transport and sets up buffered input. `peer_addr` is the
    /// address reported by `accept`. The handler stops reading once
    /// `shutdown` is set.
    pub fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        config: &Config,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let local_addr = stream.local_addr()?;
        let transport = configure_transport(&stream, config);

        tracing::debug!(
            "Connection initialized: {} -> {} (nodelay={}, keepalive={})",
            peer_addr,
            local_addr,
            transport.no_delay,
            transport.keep_alive
        );

        Ok(Self {
            reader: BufReader::with_capacity(config.recv_buffer_size, stream),
            peer_addr,
            local_addr,
            transport,
            backend_id: std::process::id(),
            max_message_size: config.max_message_size,
            shutdown,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads messages in a loop and dispatches them in arrival order.
    /// Returns when the client disconnects, the server shuts down, or an
    /// error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                tracing::debug!("Server shutting down, closing connection from {}", self.peer_addr);
                return Ok(());
            }

            let message = match read_message(&mut self.reader, self.max_message_size) {
                Ok(Some(message)) => message,
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(DiskQueryError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!("Connection from {} closed: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!(
                "Received message from {}: tag={:?} len={}",
                self.peer_addr,
                message.tag(),
                message.payload().len()
            );

            if let Err(e) = self.process(&message) {
                tracing::warn!("Error handling message from {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Dispatch a message and log the outcome
    fn process(&self, message: &InputMessage) -> Result<Dispatch> {
        let outcome = dispatch(message)?;

        match &outcome {
            Dispatch::Query { tokens } => {
                tracing::debug!("Query from {}: {} tokens", self.peer_addr, tokens.len());
                if let Some(last) = tokens.last().filter(|t| t.kind == TokenKind::Error) {
                    tracing::debug!(
                        "Lexical error in query from {} at {}: {}",
                        self.peer_addr,
                        last.location,
                        last.text
                    );
                }
            }
            Dispatch::Deferred(tag) => {
                tracing::debug!("{:?} message from {} is not interpreted yet", tag, self.peer_addr);
            }
            Dispatch::Ignored(byte) => {
                tracing::warn!("Unknown message tag 0x{:02x} from {}", byte, self.peer_addr);
            }
        }

        Ok(outcome)
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get the local endpoint of the socket
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn backend_id(&self) -> u32 {
        self.backend_id
    }

    pub fn transport(&self) -> TransportOptions {
        self.transport
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        // The socket itself closes when `reader` is dropped
        tracing::debug!("Cleaning up connection from {}", self.peer_addr);
    }
}

/// Dispatch one message on its tag
///
/// A simple query is tokenized with a fresh scanner; the tokens are logged
/// and returned. Other tags are not interpreted.
pub fn dispatch(message: &InputMessage) -> Result<Dispatch> {
    match message.tag() {
        MessageTag::Query => {
            let text = message.query_text()?;
            let tokens = Scanner::new(text, ScanMode::Normal).tokenize();

            for token in &tokens {
                tracing::trace!("token: {}", token);
            }
            Ok(Dispatch::Query { tokens })
        }
        tag @ (MessageTag::Parse | MessageTag::Bind | MessageTag::Execute) => {
            Ok(Dispatch::Deferred(tag))
        }
        MessageTag::Unknown(byte) => Ok(Dispatch::Ignored(byte)),
    }
}

/// Apply socket options from the config
///
/// Failures are logged and leave the corresponding flag unset; they do not
/// close the connection.
fn configure_transport(stream: &TcpStream, config: &Config) -> TransportOptions {
    let mut options = TransportOptions::default();

    if config.tcp_nodelay {
        match stream.set_nodelay(true) {
            Ok(()) => options.no_delay = true,
            Err(e) => tracing::warn!("Failed to set TCP_NODELAY: {}", e),
        }
    }

    if config.keepalive_secs > 0 {
        let keepalive = TcpKeepalive::new().with_time(Duration::from_secs(config.keepalive_secs));
        match SockRef::from(stream).set_tcp_keepalive(&keepalive) {
            Ok(()) => options.keep_alive = true,
            Err(e) => tracing::warn!("Failed to enable TCP keep-alive: {}", e),
        }
    }

    if config.read_timeout_ms > 0 {
        if let Err(e) = stream.set_read_timeout(Some(Duration::from_millis(config.read_timeout_ms))) {
            tracing::warn!("Failed to set read timeout: {}", e);
        }
    }
    if config.write_timeout_ms > 0 {
        if let Err(e) = stream.set_write_timeout(Some(Duration::from_millis(config.write_timeout_ms))) {
            tracing::warn!("Failed to set write timeout: {}", e);
        }
    }

    options
}

/// I/O errors that end a connection without being the server's problem
fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            // Read timeout (Windows uses TimedOut instead of WouldBlock)
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::TimedOut
    )
}
