//! Server Tests
//!
//! Tests for the acceptor and connection handler over loopback TCP.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use diskquery::network::{dispatch, Connection, Dispatch, Server, ServerHandle};
use diskquery::parser::TokenKind;
use diskquery::protocol::{encode_message, encode_query, InputMessage, MessageTag};
use diskquery::{Config, DiskQueryError};

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> Config {
    Config::builder()
        .listen_addr("127.0.0.1:0")
        .read_timeout_ms(5_000)
        .write_timeout_ms(5_000)
        .max_message_size(1024)
        .build()
}

fn start_server(config: Config) -> (SocketAddr, ServerHandle, JoinHandle<diskquery::Result<()>>) {
    let server = Server::bind(config).expect("bind");
    let addr = server.local_addr();
    let handle = server.handle();
    let thread = thread::spawn(move || server.run());
    (addr, handle, thread)
}

fn stop_server(handle: ServerHandle, thread: JoinHandle<diskquery::Result<()>>) {
    handle.shutdown();
    thread.join().expect("server thread").expect("server run");
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(10));
    }
}

/// True once the server has closed its end of the socket
fn server_closed(stream: &mut TcpStream) -> bool {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut buf = [0u8; 16];
    match stream.read(&mut buf) {
        Ok(0) => true,
        Err(e) => matches!(e.kind(), ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted),
        Ok(_) => false,
    }
}

/// True if the server still holds the socket open after a short wait
fn server_still_open(stream: &mut TcpStream) -> bool {
    stream
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let mut buf = [0u8; 16];
    match stream.read(&mut buf) {
        Err(e) => matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut),
        Ok(_) => false,
    }
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_dispatch_query_tokenizes() {
    let message = InputMessage::new(MessageTag::Query, b"SELECT * FROM users\0".to_vec());

    match dispatch(&message).unwrap() {
        Dispatch::Query { tokens } => {
            let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
            assert_eq!(
                kinds,
                vec![
                    TokenKind::Select,
                    TokenKind::Multiply,
                    TokenKind::From,
                    TokenKind::Identifier,
                    TokenKind::Eof,
                ]
            );
        }
        other => panic!("expected query dispatch, got {:?}", other),
    }
}

#[test]
fn test_dispatch_lexical_error_is_not_fatal() {
    let message = InputMessage::new(MessageTag::Query, b"SELECT 'open\0".to_vec());

    match dispatch(&message).unwrap() {
        Dispatch::Query { tokens } => assert_eq!(tokens.last().unwrap().kind, TokenKind::Error),
        other => panic!("expected query dispatch, got {:?}", other),
    }
}

#[test]
fn test_dispatch_extended_and_unknown_tags() {
    for tag in [MessageTag::Parse, MessageTag::Bind, MessageTag::Execute] {
        let message = InputMessage::new(tag, b"opaque".to_vec());
        assert_eq!(dispatch(&message).unwrap(), Dispatch::Deferred(tag));
    }

    let message = InputMessage::new(MessageTag::from(b'Z'), Vec::new());
    assert_eq!(dispatch(&message).unwrap(), Dispatch::Ignored(b'Z'));
}

#[test]
fn test_dispatch_invalid_utf8_is_error() {
    let message = InputMessage::new(MessageTag::Query, vec![0xC3, 0x28]);
    assert!(matches!(dispatch(&message), Err(DiskQueryError::Protocol(_))));
}

// =============================================================================
// Server Lifecycle
// =============================================================================

#[test]
fn test_bind_failure_is_reported() {
    let first = Server::bind(test_config()).unwrap();
    let taken = first.local_addr().to_string();

    let result = Server::bind(Config::builder().listen_addr(taken).build());
    assert!(matches!(result, Err(DiskQueryError::Network(_))));
}

#[test]
fn test_invalid_config_rejected() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_message_size(0)
        .build();
    assert!(matches!(Server::bind(config), Err(DiskQueryError::Config(_))));
}

#[test]
fn test_shutdown_without_connections() {
    let (_addr, handle, thread) = start_server(test_config());

    assert!(!handle.is_shutdown());
    stop_server(handle, thread);
}

#[test]
fn test_queries_keep_connection_open() {
    let (addr, handle, thread) = start_server(test_config());

    let mut client = TcpStream::connect(addr).unwrap();
    client.write_all(&encode_query("SELECT * FROM users").unwrap()).unwrap();
    client.write_all(&encode_query("SELECT 'unterminated").unwrap()).unwrap();
    client.write_all(&encode_message(MessageTag::Parse, b"stmt\0").unwrap()).unwrap();
    client.write_all(&encode_message(MessageTag::from(b'?'), b"").unwrap()).unwrap();

    wait_until("connection to register", || handle.active_connections() == 1);
    assert!(server_still_open(&mut client));

    // Clean close from the client ends the handler
    drop(client);
    wait_until("handler to finish", || handle.active_connections() == 0);

    stop_server(handle, thread);
}

#[test]
fn test_malformed_frame_closes_connection() {
    let (addr, handle, thread) = start_server(test_config());

    let mut client = TcpStream::connect(addr).unwrap();
    // Declared length 2 is smaller than the length field itself
    client.write_all(&[b'Q', 0x00, 0x00, 0x00, 0x02]).unwrap();

    assert!(server_closed(&mut client));
    wait_until("handler to finish", || handle.active_connections() == 0);

    stop_server(handle, thread);
}

#[test]
fn test_oversized_frame_closes_connection() {
    let (addr, handle, thread) = start_server(test_config());

    let mut client = TcpStream::connect(addr).unwrap();
    let mut header = vec![b'Q'];
    header.extend_from_slice(&(4096u32).to_be_bytes());
    client.write_all(&header).unwrap();

    assert!(server_closed(&mut client));
    stop_server(handle, thread);
}

#[test]
fn test_truncated_frame_closes_connection() {
    let (addr, handle, thread) = start_server(test_config());

    let mut client = TcpStream::connect(addr).unwrap();
    // Declares 16 payload bytes, sends 3, then stops writing
    client.write_all(&[b'Q', 0x00, 0x00, 0x00, 0x14, b'a', b'b', b'c']).unwrap();
    client.shutdown(Shutdown::Write).unwrap();

    assert!(server_closed(&mut client));
    wait_until("handler to finish", || handle.active_connections() == 0);

    stop_server(handle, thread);
}

#[test]
fn test_failed_connection_does_not_affect_others() {
    let (addr, handle, thread) = start_server(test_config());

    let mut healthy = TcpStream::connect(addr).unwrap();
    healthy.write_all(&encode_query("SELECT 1").unwrap()).unwrap();

    let mut broken = TcpStream::connect(addr).unwrap();
    broken.write_all(&[b'Q', 0x00, 0x00, 0x00, 0x00]).unwrap();
    assert!(server_closed(&mut broken));

    // The healthy connection is still served
    healthy.write_all(&encode_query("SELECT 2").unwrap()).unwrap();
    assert!(server_still_open(&mut healthy));

    // And new connections are still accepted
    let mut late = TcpStream::connect(addr).unwrap();
    late.write_all(&encode_query("SELECT 3").unwrap()).unwrap();
    assert!(server_still_open(&mut late));

    drop(healthy);
    drop(late);
    wait_until("handlers to finish", || handle.active_connections() == 0);

    stop_server(handle, thread);
}

#[test]
fn test_connection_limit() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .max_connections(1)
        .read_timeout_ms(5_000)
        .build();
    let (addr, handle, thread) = start_server(config);

    let mut first = TcpStream::connect(addr).unwrap();
    wait_until("first connection", || handle.active_connections() == 1);

    let mut second = TcpStream::connect(addr).unwrap();
    assert!(server_closed(&mut second));
    assert!(server_still_open(&mut first));

    drop(first);
    wait_until("handler to finish", || handle.active_connections() == 0);

    stop_server(handle, thread);
}

#[test]
fn test_idle_connection_times_out() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .read_timeout_ms(100)
        .build();
    let (addr, handle, thread) = start_server(config);

    let mut client = TcpStream::connect(addr).unwrap();
    assert!(server_closed(&mut client));
    wait_until("handler to finish", || handle.active_connections() == 0);

    stop_server(handle, thread);
}

#[test]
fn test_shutdown_closes_busy_connection() {
    let (addr, handle, thread) = start_server(test_config());

    let mut client = TcpStream::connect(addr).unwrap();
    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let stop = Arc::clone(&stop);
        let mut stream = client.try_clone().unwrap();
        thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                if stream.write_all(&encode_query("SELECT 1").unwrap()).is_err() {
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
        })
    };

    wait_until("connection to register", || handle.active_connections() == 1);
    handle.shutdown();

    wait_until("server to stop", || thread.is_finished());
    thread.join().unwrap().unwrap();
    assert_eq!(handle.active_connections(), 0);
    assert!(server_closed(&mut client));

    stop.store(true, Ordering::SeqCst);
    writer.join().unwrap();
}

#[test]
fn test_shutdown_closes_idle_connection_without_timeout() {
    let config = Config::builder()
        .listen_addr("127.0.0.1:0")
        .read_timeout_ms(0)
        .build();
    let (addr, handle, thread) = start_server(config);

    let mut client = TcpStream::connect(addr).unwrap();
    wait_until("connection to register", || handle.active_connections() == 1);

    handle.shutdown();
    wait_until("server to stop", || thread.is_finished());
    thread.join().unwrap().unwrap();
    assert!(server_closed(&mut client));
}

// =============================================================================
// Connection
// =============================================================================

fn accepted_pair() -> (TcpStream, SocketAddr, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
    let (stream, peer_addr) = listener.accept().unwrap();
    (stream, peer_addr, client)
}

#[test]
fn test_connection_reports_endpoints_and_transport() {
    let (stream, peer_addr, client) = accepted_pair();
    let connection =
        Connection::new(stream, peer_addr, &test_config(), Arc::new(AtomicBool::new(false)))
            .unwrap();

    assert_eq!(connection.peer_addr(), client.local_addr().unwrap());
    assert_eq!(connection.local_addr(), client.peer_addr().unwrap());
    assert_eq!(connection.backend_id(), std::process::id());

    let transport = connection.transport();
    assert!(transport.no_delay);
    assert!(transport.keep_alive);
}

#[test]
fn test_connection_honors_shutdown_flag() {
    let (stream, peer_addr, mut client) = accepted_pair();
    let shutdown = Arc::new(AtomicBool::new(true));
    let mut connection = Connection::new(stream, peer_addr, &test_config(), shutdown).unwrap();

    // Queued input is left unread once shutdown is set
    client.write_all(&encode_query("SELECT 1").unwrap()).unwrap();
    connection.handle().unwrap();

    drop(connection);
    assert!(server_closed(&mut client));
}
