//! Configuration for diskquery
//!
//! Centralized configuration with sensible defaults.

use crate::error::{DiskQueryError, Result};
use crate::protocol::DEFAULT_MAX_MESSAGE_SIZE;

/// Main configuration for a diskquery server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    // -------------------------------------------------------------------------
    // Transport Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the per-connection receive buffer (bytes)
    pub recv_buffer_size: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Idle time before TCP keep-alive probes start (seconds, 0 = disabled)
    pub keepalive_secs: u64,

    /// Disable Nagle's algorithm on accepted sockets
    pub tcp_nodelay: bool,

    // -------------------------------------------------------------------------
    // Protocol Configuration
    // -------------------------------------------------------------------------
    /// Largest payload accepted in a single message (bytes)
    pub max_message_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3000".to_string(),
            max_connections: 1024,
            recv_buffer_size: 8192,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            keepalive_secs: 2 * 60 * 60, // 2 hours
            tcp_nodelay: true,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the configuration can be used to run a server
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(DiskQueryError::Config("listen address is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(DiskQueryError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.recv_buffer_size == 0 {
            return Err(DiskQueryError::Config(
                "recv_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(DiskQueryError::Config(
                "max_message_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the receive buffer capacity (in bytes)
    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the keep-alive idle time (in seconds)
    pub fn keepalive_secs(mut self, secs: u64) -> Self {
        self.config.keepalive_secs = secs;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.config.tcp_nodelay = enabled;
        self
    }

    /// Set the maximum accepted payload size (in bytes)
    pub fn max_message_size(mut self, size: u32) -> Self {
        self.config.max_message_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
