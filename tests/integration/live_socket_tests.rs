//! End-to-end tests over a real socket.
//!
//! Runs the production [`TlsTransport`] (plaintext TCP on the host) and
//! [`SystemClock`] against a tiny HTTP/1.0 server on a loopback thread.

use asyncbot::adapters::time::SystemClock;
use asyncbot::adapters::tls_transport::TlsTransport;
use asyncbot::app::message::MessageType;
use asyncbot::protocol::transport::Transport;
use asyncbot::{BotConfig, BotSession};
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

type LiveBot = BotSession<TlsTransport, SystemClock>;

/// Read one request (head plus `Content-Length` body) and return it.
fn read_request(stream: &mut TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 512];
    loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw);
        if let Some((head, body)) = text.split_once("\r\n\r\n") {
            let len: usize = head
                .lines()
                .find_map(|l| l.strip_prefix("Content-Length: "))
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            if body.len() >= len {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).into_owned()
}

/// Serve one connection per body in `bodies`, closing after each reply.
/// The join handle yields the requests seen.
fn serve(bodies: Vec<&'static str>) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for body in bodies {
            let (mut stream, _) = listener.accept().unwrap();
            seen.push(read_request(&mut stream));
            let reply = format!(
                "HTTP/1.0 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).unwrap();
        }
        seen
    });
    (port, handle)
}

fn live_bot(port: u16) -> LiveBot {
    let config = BotConfig {
        host: "127.0.0.1".into(),
        port,
        ..BotConfig::default()
    };
    BotSession::new(TlsTransport::new(), SystemClock::new(), "42:LIVE", config).unwrap()
}

#[test]
fn begin_fetches_username_over_socket() {
    let (port, server) = serve(vec![r#"{"ok":true,"result":{"id":42,"username":"live_bot"}}"#]);
    let mut bot = live_bot(port);
    bot.begin().unwrap();
    assert_eq!(bot.username(), "live_bot");
    // server announced close
    assert!(!bot.transport().connected());

    let requests = server.join().unwrap();
    assert!(requests[0].starts_with("POST /bot42:LIVE/getMe HTTP/1.0\r\n"));
    assert!(requests[0].contains("Host: 127.0.0.1\r\n"));
}

#[test]
fn closed_connection_is_reopened_for_next_call() {
    let (port, server) = serve(vec![
        r#"{"ok":true,"result":{"username":"first"}}"#,
        r#"{"ok":true,"result":{"username":"second"}}"#,
    ]);
    let mut bot = live_bot(port);
    assert_eq!(bot.get_me().unwrap(), "first");
    assert_eq!(bot.get_me().unwrap(), "second");
    assert_eq!(server.join().unwrap().len(), 2);
}

#[test]
fn polled_update_arrives_through_dispatcher() {
    let (port, server) = serve(vec![
        r#"{"ok":true,"result":[{"update_id":900,"message":{"message_id":1,"chat":{"id":3},"text":"live"}}]}"#,
    ]);
    let mut bot = live_bot(port);

    let mut received = None;
    for _ in 0..400 {
        if let Some(msg) = bot.next_message().unwrap() {
            received = Some(msg);
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    let msg = received.expect("update within two seconds");
    assert_eq!(msg.message_type(), MessageType::Text);
    assert_eq!(msg.text(), "live");
    assert_eq!(bot.update_offset(), 901);

    let requests = server.join().unwrap();
    assert!(requests[0].ends_with(r#"{"limit":1,"timeout":0,"offset":0}"#));
}

#[test]
fn unreachable_port_fails_fast() {
    // bind then drop to get a port nobody listens on
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut bot = live_bot(port);
    assert_eq!(bot.begin(), Err(asyncbot::BotError::TransportUnavailable));
}
