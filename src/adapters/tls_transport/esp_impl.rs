//! ESP-IDF platform helpers for `TlsTransport`.
//!
//! Compiled only for `target_os = "espidf"`.  Wraps the `esp-tls` client:
//! blocking connect + handshake (bounded by a timeout), then the socket is
//! switched to non-blocking for the session's lifetime.
//!
//! All public items are `pub(super)` to keep them private to the adapters
//! module.

use log::{info, warn};

use esp_idf_svc::sys::{
    ESP_OK, F_GETFL, F_SETFL, MBEDTLS_ERR_SSL_WANT_READ, MBEDTLS_ERR_SSL_WANT_WRITE, O_NONBLOCK,
    esp_crt_bundle_attach, esp_tls_cfg_t, esp_tls_conn_destroy, esp_tls_conn_new_sync,
    esp_tls_conn_read, esp_tls_conn_write, esp_tls_get_bytes_avail, esp_tls_get_conn_sockfd,
    esp_tls_init, esp_tls_t, lwip_fcntl,
};

use super::TlsTransportError;

/// Read-ahead used by `available()` when mbedtls holds no decrypted bytes.
const READ_AHEAD: usize = 64;

// ── Session state ─────────────────────────────────────────────────────────────

/// One open `esp-tls` connection.
pub(super) struct EspTlsSession {
    tls: *mut esp_tls_t,
    ahead: heapless::Vec<u8, READ_AHEAD>,
}

unsafe impl Send for EspTlsSession {}

impl Drop for EspTlsSession {
    fn drop(&mut self) {
        // SAFETY: `tls` came from `esp_tls_init` and is destroyed exactly
        // once here; destroy also closes the socket.
        unsafe {
            esp_tls_conn_destroy(self.tls);
        }
    }
}

// ── Public helpers ────────────────────────────────────────────────────────────

/// Resolve, connect and complete the TLS handshake with `host:port`.
///
/// The server certificate is verified against the ESP-IDF certificate
/// bundle.
pub(super) fn esp_connect(
    host: &str,
    port: u16,
    timeout_ms: u32,
) -> Result<EspTlsSession, TlsTransportError> {
    // SAFETY: plain allocation; null is checked below.
    let tls = unsafe { esp_tls_init() };
    if tls.is_null() {
        warn!("TLS(espidf): esp_tls_init failed");
        return Err(TlsTransportError::Tls);
    }
    // From here on `session` owns `tls` and frees it on every early return.
    let mut session = EspTlsSession {
        tls,
        ahead: heapless::Vec::new(),
    };

    let cfg = esp_tls_cfg_t {
        crt_bundle_attach: Some(esp_crt_bundle_attach),
        timeout_ms: timeout_ms as _,
        ..Default::default()
    };

    // SAFETY: `host` is valid for `host.len()` bytes (no NUL needed with an
    // explicit length); `cfg` and `tls` are valid for the call.
    let rc = unsafe {
        esp_tls_conn_new_sync(
            host.as_ptr().cast(),
            host.len() as _,
            i32::from(port),
            &cfg,
            session.tls,
        )
    };
    if rc != 1 {
        warn!("TLS(espidf): connection to {}:{} failed (rc={})", host, port, rc);
        return Err(TlsTransportError::Tls);
    }

    let mut fd: core::ffi::c_int = -1;
    // SAFETY: `tls` is connected; `fd` is a valid out-pointer.
    let rc = unsafe { esp_tls_get_conn_sockfd(session.tls, &mut fd) };
    if rc != ESP_OK || fd < 0 {
        warn!("TLS(espidf): no socket behind session (rc={})", rc);
        return Err(TlsTransportError::Io);
    }

    // SAFETY: F_GETFL/F_SETFL are valid on a connected lwIP socket.
    let rc = unsafe {
        let flags = lwip_fcntl(fd, F_GETFL as _, 0);
        lwip_fcntl(fd, F_SETFL as _, flags | O_NONBLOCK as core::ffi::c_int)
    };
    if rc < 0 {
        warn!("TLS(espidf): O_NONBLOCK failed ({})", rc);
        return Err(TlsTransportError::Io);
    }

    session.ahead.clear();
    info!("TLS(espidf): connected to {}:{} (fd={})", host, port, fd);
    Ok(session)
}

/// One raw non-blocking read.  `Ok(0)` means "nothing yet".
fn raw_read(session: &mut EspTlsSession, buf: &mut [u8]) -> Result<usize, TlsTransportError> {
    // SAFETY: `tls` is connected; `buf` is a valid mutable slice.
    let rc = unsafe { esp_tls_conn_read(session.tls, buf.as_mut_ptr().cast(), buf.len()) };

    if rc > 0 {
        return Ok(rc as usize);
    }
    if rc == MBEDTLS_ERR_SSL_WANT_READ as isize || rc == MBEDTLS_ERR_SSL_WANT_WRITE as isize {
        return Ok(0);
    }
    if rc == 0 {
        info!("TLS(espidf): peer closed the connection");
        return Err(TlsTransportError::NotConnected);
    }
    warn!("TLS(espidf): read error (rc={})", rc);
    Err(TlsTransportError::Tls)
}

/// Non-blocking read; serves read-ahead bytes first.
pub(super) fn esp_read(
    session: &mut EspTlsSession,
    buf: &mut [u8],
) -> Result<usize, TlsTransportError> {
    if !session.ahead.is_empty() {
        let n = buf.len().min(session.ahead.len());
        buf[..n].copy_from_slice(&session.ahead[..n]);
        let rest = session.ahead.len() - n;
        session.ahead.copy_within(n.., 0);
        session.ahead.truncate(rest);
        return Ok(n);
    }
    raw_read(session, buf)
}

/// Non-blocking write.  `Ok(0)` when the send buffer is full.
pub(super) fn esp_write(
    session: &mut EspTlsSession,
    data: &[u8],
) -> Result<usize, TlsTransportError> {
    // SAFETY: `tls` is connected; `data` is a valid slice.
    let rc = unsafe { esp_tls_conn_write(session.tls, data.as_ptr().cast(), data.len()) };

    if rc > 0 {
        return Ok(rc as usize);
    }
    if rc == MBEDTLS_ERR_SSL_WANT_WRITE as isize || rc == MBEDTLS_ERR_SSL_WANT_READ as isize {
        return Ok(0);
    }
    warn!("TLS(espidf): write error (rc={})", rc);
    Err(TlsTransportError::Tls)
}

/// Bytes readable without blocking.
///
/// mbedtls only reports bytes it has already decrypted, so when it has
/// none a small read-ahead pulls the next record in.
pub(super) fn esp_available(session: &mut EspTlsSession) -> Result<usize, TlsTransportError> {
    // SAFETY: `tls` is connected.
    let decrypted = unsafe { esp_tls_get_bytes_avail(session.tls) };
    let decrypted = usize::try_from(decrypted).unwrap_or(0);
    if decrypted > 0 || !session.ahead.is_empty() {
        return Ok(decrypted + session.ahead.len());
    }

    let mut chunk = [0u8; READ_AHEAD];
    let n = raw_read(session, &mut chunk)?;
    // Capacity equals the chunk size, so this cannot overflow.
    let _ = session.ahead.extend_from_slice(&chunk[..n]);
    Ok(n)
}
