//! TCP Server
//!
//! Accepts connections and hands each one to its own handler thread.

use std::collections::HashMap;
use std::io;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;

use super::Connection;
use crate::config::Config;
use crate::error::{DiskQueryError, Result};

/// How long the accept loop sleeps when no connection is pending
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for diskquery
pub struct Server {
    config: Config,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
    open: Arc<OpenConnections>,
}

/// Cloneable handle for observing and stopping a running server
#[derive(Debug, Clone)]
pub struct ServerHandle {
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

impl ServerHandle {
    /// Signal the server to stop accepting and return from `run`
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Number of connection handlers currently running
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// Second handles to the sockets of running handlers
///
/// Shutting these down wakes handlers blocked in a read so `run` can return.
#[derive(Default)]
struct OpenConnections {
    next_id: AtomicU64,
    streams: Mutex<HashMap<u64, TcpStream>>,
}

impl OpenConnections {
    fn register(&self, stream: TcpStream) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.streams.lock().insert(id, stream);
        id
    }

    fn remove(&self, id: u64) {
        self.streams.lock().remove(&id);
    }

    fn close_all(&self) {
        for stream in self.streams.lock().values() {
            // The handler may already be closing this socket
            if let Err(e) = stream.shutdown(Shutdown::Both) {
                tracing::debug!("Failed to shut down socket: {}", e);
            }
        }
    }
}

/// Releases a handler's slot when its thread ends, including by panic
struct ActiveGuard {
    active: Arc<AtomicUsize>,
    open: Arc<OpenConnections>,
    id: u64,
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.open.remove(self.id);
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listening socket
    ///
    /// Fails if the config is invalid or the address cannot be bound.
    pub fn bind(config: Config) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            DiskQueryError::Network(format!("failed to bind {}: {}", config.listen_addr, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
            open: Arc::new(OpenConnections::default()),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: Arc::clone(&self.shutdown),
            active: Arc::clone(&self.active),
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.handle().shutdown();
    }

    /// Run the accept loop (blocking)
    ///
    /// Returns after `shutdown` has been signalled and every in-flight
    /// connection handler has finished. Open connections are closed on
    /// shutdown rather than drained.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        let handlers = WaitGroup::new();

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer_addr)) => self.spawn_handler(stream, peer_addr, &handlers),
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    // Transient accept failures must not stop the server
                    tracing::warn!("Error accepting connection: {}", e);
                }
            }
        }

        tracing::info!(
            "Shutting down, waiting for {} connection(s)",
            self.active.load(Ordering::SeqCst)
        );
        self.open.close_all();
        handlers.wait();
        tracing::info!("Server stopped");

        Ok(())
    }

    /// Start a handler thread for an accepted connection
    fn spawn_handler(&self, stream: TcpStream, peer_addr: SocketAddr, handlers: &WaitGroup) {
        if self.active.load(Ordering::SeqCst) >= self.config.max_connections {
            tracing::warn!(
                "Rejecting connection from {}: {} connections already active",
                peer_addr,
                self.config.max_connections
            );
            return;
        }

        // Accepted sockets may inherit the listener's non-blocking mode
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Failed to configure socket from {}: {}", peer_addr, e);
            return;
        }

        let second = match stream.try_clone() {
            Ok(second) => second,
            Err(e) => {
                tracing::warn!("Failed to configure socket from {}: {}", peer_addr, e);
                return;
            }
        };

        self.active.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveGuard {
            active: Arc::clone(&self.active),
            open: Arc::clone(&self.open),
            id: self.open.register(second),
        };
        let handler_token = handlers.clone();
        let config = self.config.clone();
        let shutdown = Arc::clone(&self.shutdown);

        let spawned = thread::Builder::new()
            .name(format!("conn-{}", peer_addr))
            .spawn(move || {
                let _guard = guard;
                let _handler_token = handler_token;

                let mut connection = match Connection::new(stream, peer_addr, &config, shutdown) {
                    Ok(connection) => connection,
                    Err(e) => {
                        tracing::warn!("Failed to set up connection from {}: {}", peer_addr, e);
                        return;
                    }
                };

                if let Err(e) = connection.handle() {
                    tracing::debug!("Connection from {} ended with error: {}", peer_addr, e);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn handler for {}: {}", peer_addr, e);
        }
    }
}
