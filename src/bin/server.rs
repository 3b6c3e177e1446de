//! diskquery Server Binary
//!
//! Starts the TCP server for diskquery.

use clap::Parser;
use diskquery::{Config, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// diskquery Server
#[derive(Parser, Debug)]
#[command(name = "diskquery-server")]
#[command(about = "Database server front-end: message framing and SQL scanning")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, env = "DISKQUERY_LISTEN", default_value = "127.0.0.1:3000")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, env = "DISKQUERY_MAX_CONNECTIONS", default_value = "1024")]
    max_connections: usize,

    /// Largest accepted message payload in bytes
    #[arg(long, env = "DISKQUERY_MAX_MESSAGE_SIZE", default_value = "16777216")]
    max_message_size: u32,

    /// Read timeout in milliseconds (0 disables)
    #[arg(long, env = "DISKQUERY_READ_TIMEOUT_MS", default_value = "30000")]
    read_timeout_ms: u64,

    /// Write timeout in milliseconds (0 disables)
    #[arg(long, env = "DISKQUERY_WRITE_TIMEOUT_MS", default_value = "30000")]
    write_timeout_ms: u64,

    /// TCP keep-alive idle time in seconds (0 disables)
    #[arg(long, env = "DISKQUERY_KEEPALIVE_SECS", default_value = "7200")]
    keepalive_secs: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,diskquery=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("diskquery Server v{}", diskquery::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .max_message_size(args.max_message_size)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .keepalive_secs(args.keepalive_secs)
        .build();

    // Failing to bind is fatal
    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    // Set up Ctrl+C handler
    let handle = server.handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        handle.shutdown();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
