//! TLS client transport adapter.
//!
//! Implements [`Transport`](crate::protocol::transport::Transport): one
//! outbound connection to the bot API host, wrapped in TLS.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF `esp-tls` client (mbedtls) with the
//!   built-in certificate bundle for server verification.
//! - **all other targets**: simulation using `std::net::TcpStream` in
//!   plaintext (no TLS) for host-side testing against a local server.
//!
//! ## Connection model
//!
//! 1. `connect()` resolves the host and performs the TCP (and TLS)
//!    handshake, blocking for at most [`CONNECT_TIMEOUT_MS`].
//! 2. The socket is then switched to non-blocking mode: `read()` returns
//!    `Ok(0)` when nothing has arrived and `write()` returns `Ok(0)` when
//!    the send buffer is full.
//! 3. A peer close is noticed on the next read or `available()` and drops
//!    the transport back to `Idle`.
//! 4. `stop()` tears the session down; calling it again is a no-op.

use core::fmt;
use log::{info, warn};

use crate::protocol::transport::Transport;

#[cfg(not(target_os = "espidf"))]
use std::io::{Read, Write};

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

/// Upper bound on resolve + TCP connect + TLS handshake.
pub const CONNECT_TIMEOUT_MS: u32 = 5000;

// ───────────────────────────────────────────────────────────────
// Error type
// ───────────────────────────────────────────────────────────────

/// Errors originating from the TLS transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsTransportError {
    /// Host name did not resolve.
    Resolve,
    /// TCP or socket I/O failure.
    Io,
    /// TLS handshake or session error.
    Tls,
    /// Operation requires an open connection but none is present.
    NotConnected,
}

impl fmt::Display for TlsTransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolve => write!(f, "host name did not resolve"),
            Self::Io => write!(f, "TCP/socket I/O error"),
            Self::Tls => write!(f, "TLS handshake or session error"),
            Self::NotConnected => write!(f, "not connected"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

/// TLS connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsConnectionState {
    /// No connection; `connect()` may be called.
    Idle,
    /// The session is open.
    Connected,
    /// The last operation failed; the session has been dropped.
    Error,
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF platform helpers (esp-tls client)
// ───────────────────────────────────────────────────────────────
#[cfg(target_os = "espidf")]
mod esp_impl;

// ───────────────────────────────────────────────────────────────
// TlsTransport
// ───────────────────────────────────────────────────────────────

/// Client transport for the bot API.
///
/// On ESP-IDF the connection is TLS, verified against the certificate
/// bundle.  On host targets the connection is plaintext for ease of
/// testing.
pub struct TlsTransport {
    state: TlsConnectionState,

    // ── ESP-IDF fields ──────────────────────────────────────────
    #[cfg(target_os = "espidf")]
    session: Option<esp_impl::EspTlsSession>,

    // ── Simulation fields ───────────────────────────────────────
    #[cfg(not(target_os = "espidf"))]
    stream: Option<std::net::TcpStream>,
}

impl Default for TlsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TlsTransport {
    pub fn new() -> Self {
        Self {
            state: TlsConnectionState::Idle,
            #[cfg(target_os = "espidf")]
            session: None,
            #[cfg(not(target_os = "espidf"))]
            stream: None,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> TlsConnectionState {
        self.state
    }

    /// Drop the session after a failure.
    fn fail(&mut self, err: TlsTransportError) -> TlsTransportError {
        self.platform_close();
        self.state = if err == TlsTransportError::NotConnected {
            TlsConnectionState::Idle
        } else {
            TlsConnectionState::Error
        };
        err
    }

    // ── Platform helpers: connect / close ─────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, host: &str, port: u16) -> Result<(), TlsTransportError> {
        let session = esp_impl::esp_connect(host, port, CONNECT_TIMEOUT_MS)?;
        self.session = Some(session);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, host: &str, port: u16) -> Result<(), TlsTransportError> {
        use std::net::ToSocketAddrs;
        use std::time::Duration;

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| TlsTransportError::Resolve)?
            .next()
            .ok_or(TlsTransportError::Resolve)?;
        let timeout = Duration::from_millis(u64::from(CONNECT_TIMEOUT_MS));
        let stream =
            std::net::TcpStream::connect_timeout(&addr, timeout).map_err(|_| TlsTransportError::Io)?;
        stream
            .set_nonblocking(true)
            .map_err(|_| TlsTransportError::Io)?;
        // Requests go out in one write; don't let Nagle hold the tail back.
        let _ = stream.set_nodelay(true);

        info!("TLS(sim): connected to {} (plaintext)", addr);
        self.stream = Some(stream);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_close(&mut self) {
        // EspTlsSession::drop() calls esp_tls_conn_destroy.
        if self.session.take().is_some() {
            info!("TLS(espidf): connection closed");
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            info!("TLS(sim): connection closed");
        }
    }

    // ── Platform helpers: read ────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_read(&mut self, buf: &mut [u8]) -> Result<usize, TlsTransportError> {
        let session = self.session.as_mut().ok_or(TlsTransportError::NotConnected)?;
        esp_impl::esp_read(session, buf)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_read(&mut self, buf: &mut [u8]) -> Result<usize, TlsTransportError> {
        let stream = self.stream.as_mut().ok_or(TlsTransportError::NotConnected)?;
        match stream.read(buf) {
            Ok(0) => {
                info!("TLS(sim): peer closed the connection (EOF)");
                Err(TlsTransportError::NotConnected)
            }
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(TlsTransportError::Io),
        }
    }

    // ── Platform helpers: write ───────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_write(&mut self, data: &[u8]) -> Result<usize, TlsTransportError> {
        let session = self.session.as_mut().ok_or(TlsTransportError::NotConnected)?;
        esp_impl::esp_write(session, data)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_write(&mut self, data: &[u8]) -> Result<usize, TlsTransportError> {
        let stream = self.stream.as_mut().ok_or(TlsTransportError::NotConnected)?;
        match stream.write(data) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(TlsTransportError::Io),
        }
    }

    // ── Platform helpers: available ───────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_available(&mut self) -> Result<usize, TlsTransportError> {
        let session = self.session.as_mut().ok_or(TlsTransportError::NotConnected)?;
        esp_impl::esp_available(session)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_available(&mut self) -> Result<usize, TlsTransportError> {
        let stream = self.stream.as_mut().ok_or(TlsTransportError::NotConnected)?;
        let mut peeked = [0u8; 512];
        match stream.peek(&mut peeked) {
            Ok(0) => Err(TlsTransportError::NotConnected),
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
            Err(_) => Err(TlsTransportError::Io),
        }
    }

    // ── Platform helpers: flush ───────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_flush(&mut self) -> Result<(), TlsTransportError> {
        // mbedtls writes whole records; nothing is buffered above it.
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_flush(&mut self) -> Result<(), TlsTransportError> {
        let stream = self.stream.as_mut().ok_or(TlsTransportError::NotConnected)?;
        stream.flush().map_err(|_| TlsTransportError::Io)
    }
}

// ───────────────────────────────────────────────────────────────
// Transport implementation
// ───────────────────────────────────────────────────────────────

impl Transport for TlsTransport {
    type Error = TlsTransportError;

    fn connect(&mut self, host: &str, port: u16) -> Result<(), TlsTransportError> {
        self.platform_close();
        match self.platform_connect(host, port) {
            Ok(()) => {
                self.state = TlsConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                warn!("TLS: connect to {}:{} failed ({})", host, port, e);
                Err(self.fail(e))
            }
        }
    }

    fn connected(&self) -> bool {
        self.state == TlsConnectionState::Connected
    }

    fn stop(&mut self) {
        self.platform_close();
        self.state = TlsConnectionState::Idle;
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, TlsTransportError> {
        if self.state != TlsConnectionState::Connected {
            return Err(TlsTransportError::NotConnected);
        }
        self.platform_read(buf).map_err(|e| self.fail(e))
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TlsTransportError> {
        if self.state != TlsConnectionState::Connected {
            return Err(TlsTransportError::NotConnected);
        }
        self.platform_write(data).map_err(|e| self.fail(e))
    }

    fn flush(&mut self) -> Result<(), TlsTransportError> {
        if self.state != TlsConnectionState::Connected {
            return Err(TlsTransportError::NotConnected);
        }
        self.platform_flush()
    }

    fn available(&mut self) -> usize {
        if self.state != TlsConnectionState::Connected {
            return 0;
        }
        match self.platform_available() {
            Ok(n) => n,
            Err(e) => {
                self.fail(e);
                0
            }
        }
    }

    fn clear_write_error(&mut self) {
        if self.state == TlsConnectionState::Error {
            self.state = TlsConnectionState::Idle;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests (host / simulation path only)
// ───────────────────────────────────────────────────────────────
