//! Transport abstraction: a client stream socket.
//!
//! Concrete implementations:
//! - TLS client over WiFi (ESP-IDF mbedtls)
//! - Plain TCP client (host simulation)
//!
//! The session is generic over `Transport`, so adding a new transport
//! (e.g. a cellular modem socket) requires zero changes to the protocol
//! logic.  Line reading and "wait until this marker shows up" live in
//! [`reader`](super::reader) on top of the non-blocking primitives below.

/// Byte-oriented client stream.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug;

    /// Open a connection to `host:port`.  May block for the handshake.
    fn connect(&mut self, host: &str, port: u16) -> Result<(), Self::Error>;

    /// Whether the connection is currently open.
    fn connected(&self) -> bool;

    /// Close the connection and release its resources.  Idempotent.
    fn stop(&mut self);

    /// Read up to `buf.len()` bytes into `buf`.
    /// Returns 0 if no data is available (non-blocking).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write `data` to the transport.
    /// Returns the number of bytes actually written (0 = would block).
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Number of bytes that can be read without blocking.
    fn available(&mut self) -> usize;

    /// Clear a sticky write-error flag, if the implementation keeps one.
    fn clear_write_error(&mut self) {}
}
