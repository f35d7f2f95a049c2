//! Bot session: connection state plus the request/response primitives.
//!
//! [`BotSession`] owns the transport, the clock and every piece of mutable
//! connection state.  The caller owns the session; there are no globals.
//!
//! ```text
//!          poll_once()                 blocking calls
//!   ┌───────────────────────┐     ┌──────────────────────────┐
//!   │ polling · dispatch    │     │ api · upload             │
//!   └──────────┬────────────┘     └────────────┬─────────────┘
//!              └──────────┐       ┌────────────┘
//!                         ▼       ▼
//!              issue_request · receive_response
//!                         │
//!                  ensure_connected / reset
//!                         │
//!                     Transport
//! ```
//!
//! Two kinds of request exist.  Non-blocking requests (polls, most sends)
//! return as soon as the bytes are written; the reply is drained on a later
//! tick.  Blocking requests wait, yielding through [`Clock::relax`], until
//! the reply is in or the reply timeout passes.

pub mod api;
pub mod dispatch;
pub mod polling;
pub mod upload;

use log::{debug, error, info, warn};

use crate::app::ports::{Clock, KeyboardHandler};
use crate::config::BotConfig;
use crate::error::{BotError, Result};
use crate::protocol::payload::MAX_USERNAME;
use crate::protocol::transport::Transport;
use crate::protocol::{http, reader};

/// Maximum number of registered keyboards.
pub const MAX_KEYBOARDS: usize = 8;

/// One bot connection: transport, clock, poll schedule and update offset.
///
/// Everything runs on the caller's thread.  Drive it with
/// [`next_message`](Self::next_message) (or [`poll_once`](Self::poll_once))
/// from the main loop; every other operation is a plain method call.
pub struct BotSession<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    config: BotConfig,
    token: String,
    /// Cached by [`begin`](Self::begin).
    username: heapless::String<MAX_USERNAME>,

    /// Last time a reply was drained or a connection was (re)opened.
    last_activity_ms: u64,
    /// Last time the poll schedule fired; `None` until the first poll.
    last_poll_ms: Option<u64>,
    /// Requests written whose replies have not been drained yet.  Replies
    /// come back in request order on the one connection.
    pending_replies: u8,
    /// Next update id to request.  Never decreases.
    update_offset: u64,

    /// Body of the most recently drained response.
    rx: Vec<u8>,
    keyboards: heapless::Vec<Box<dyn KeyboardHandler>, MAX_KEYBOARDS>,
}

impl<T: Transport, C: Clock> BotSession<T, C> {
    /// Create a session.  Does not touch the network; call
    /// [`begin`](Self::begin) next.
    pub fn new(transport: T, clock: C, token: &str, config: BotConfig) -> Result<Self> {
        config.validate()?;
        if token.is_empty() {
            return Err(BotError::InvalidArgument("empty token"));
        }
        let now = clock.now_ms();
        Ok(Self {
            transport,
            clock,
            rx: Vec::with_capacity(config.rx_buffer_size.min(1024)),
            config,
            token: token.into(),
            username: heapless::String::new(),
            last_activity_ms: now,
            last_poll_ms: None,
            pending_replies: 0,
            update_offset: 0,
            keyboards: heapless::Vec::new(),
        })
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Bot username, empty until [`begin`](Self::begin) succeeded.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn update_offset(&self) -> u64 {
        self.update_offset
    }

    /// At least one reply is still owed by the server.
    pub fn is_reply_pending(&self) -> bool {
        self.pending_replies > 0
    }

    /// Body of the most recent response.
    pub fn last_response(&self) -> &[u8] {
        &self.rx
    }

    /// Change the minimum poll interval (also rescales the staleness window).
    pub fn set_update_time(&mut self, interval_ms: u32) -> Result<()> {
        if interval_ms == 0 {
            return Err(BotError::InvalidArgument("update interval must be > 0"));
        }
        self.config.min_update_interval_ms = interval_ms;
        Ok(())
    }

    pub fn set_token(&mut self, token: &str) -> Result<()> {
        if token.is_empty() {
            return Err(BotError::InvalidArgument("empty token"));
        }
        self.token = token.into();
        Ok(())
    }

    /// Register a keyboard that will be offered every callback query.
    pub fn add_keyboard(&mut self, keyboard: Box<dyn KeyboardHandler>) -> Result<()> {
        self.keyboards
            .push(keyboard)
            .map_err(|_| BotError::BufferOverflow)
    }

    // ── Connection management ─────────────────────────────────

    /// Make sure the transport is connected, opening a fresh connection
    /// if it is not.  Returns the connected state after the attempt.
    pub fn ensure_connected(&mut self) -> bool {
        if !self.transport.connected() {
            // Replies owed on the old connection are gone with it.
            self.pending_replies = 0;
            let _ = self.transport.flush();
            self.transport.clear_write_error();
            // Some socket stacks only release everything on the second stop.
            self.transport.stop();
            self.transport.stop();
            self.last_activity_ms = self.clock.now_ms();

            debug!("Bot: connecting to {}:{}", self.config.host, self.config.port);
            match self.transport.connect(&self.config.host, self.config.port) {
                Ok(()) => info!("Bot: connected to {}", self.config.host),
                Err(e) => warn!(
                    "Bot: unable to connect to {}:{} ({:?})",
                    self.config.host, self.config.port, e
                ),
            }
        }
        self.transport.connected()
    }

    /// Drop the connection unconditionally and open a new one.
    pub fn reset(&mut self) -> bool {
        info!("Bot: restarting connection");
        self.transport.stop();
        self.pending_replies = 0;
        self.last_activity_ms = self.clock.now_ms();
        self.ensure_connected()
    }

    // ── Request / response ────────────────────────────────────

    /// Send one JSON request.
    ///
    /// Non-blocking: returns once the request is written; the reply is
    /// drained by a later [`poll_once`](Self::poll_once).  Blocking: waits
    /// for the reply, which is then available in
    /// [`last_response`](Self::last_response).
    pub fn issue_request(&mut self, endpoint: &str, body: &str, blocking: bool) -> Result<()> {
        if !self.ensure_connected() {
            return Err(BotError::TransportUnavailable);
        }
        if blocking {
            self.settle_pending(endpoint);
        }

        let request = http::json_request(&self.config.host, &self.token, endpoint, body);
        self.write_all(request.as_bytes())?;
        self.pending_replies = self.pending_replies.saturating_add(1);
        debug!("Bot: -> {} ({} bytes)", endpoint, body.len());

        if blocking {
            self.receive_response()?;
        }
        Ok(())
    }

    /// Consume the replies to every earlier non-blocking request.
    ///
    /// Replies arrive in order; an earlier reply would otherwise be read as
    /// the answer to `next`.  A skipped poll reply is harmless: the offset
    /// did not move, so the update is fetched again.
    fn settle_pending(&mut self, next: &str) {
        // Each receive_response consumes one owed reply or clears them all.
        while self.pending_replies > 0 {
            debug!(
                "Bot: draining {} owed reply(s) before '{}'",
                self.pending_replies, next
            );
            let _ = self.receive_response();
        }
    }

    /// Read one full response into `rx`: head, then body.
    ///
    /// Accounts for one owed reply.  When the connection is torn down
    /// (timeout or server close) no further replies can arrive, so every
    /// owed reply is dropped.
    fn receive_response(&mut self) -> Result<()> {
        let deadline = reader::Deadline::after(&self.clock, self.config.reply_timeout_ms);

        let head = match reader::read_head(&mut self.transport, &mut self.clock, &deadline) {
            Ok(head) => head,
            Err(e) => {
                warn!("Bot: invalid HTTP response ({})", e);
                self.transport.stop();
                self.pending_replies = 0;
                return Err(e);
            }
        };

        let drained = reader::drain_body(
            &mut self.transport,
            &mut self.clock,
            &mut self.rx,
            self.config.rx_buffer_size,
            head.content_length,
            &deadline,
        );
        self.pending_replies = self.pending_replies.saturating_sub(1);
        self.last_activity_ms = self.clock.now_ms();

        if head.close {
            self.transport.stop();
            self.pending_replies = 0;
            debug!("Bot: connection closed by server");
        }
        if let Err(e) = drained {
            warn!("Bot: response body unusable ({})", e);
            return Err(e);
        }
        if !http::is_success(&self.rx) {
            error!(
                "Bot: request failed (status {:?}): {}",
                head.status,
                String::from_utf8_lossy(&self.rx)
            );
            return Err(BotError::ApplicationError);
        }
        Ok(())
    }

    /// Write every byte, yielding while the socket is full.
    fn write_all(&mut self, mut data: &[u8]) -> Result<()> {
        let deadline = reader::Deadline::after(&self.clock, self.config.reply_timeout_ms);
        while !data.is_empty() {
            match self.transport.write(data) {
                Ok(0) => {
                    if deadline.expired(&self.clock) {
                        warn!("Bot: write stalled, dropping connection");
                        self.transport.stop();
                        self.pending_replies = 0;
                        return Err(BotError::TransportUnavailable);
                    }
                    self.clock.relax();
                }
                Ok(n) => data = &data[n..],
                Err(e) => {
                    warn!("Bot: write failed ({:?})", e);
                    self.transport.stop();
                    self.pending_replies = 0;
                    return Err(BotError::TransportUnavailable);
                }
            }
        }
        Ok(())
    }
}
