//! Polling state machine.
//!
//! One call to [`BotSession::poll_once`] runs three independent steps:
//!
//! ```text
//!   1. staleness    idle ≥ interval × stale_factor  ──▶ reset()
//!   2. issue        interval elapsed ∧ no reply owed  ──▶ getUpdates (non-blocking)
//!   3. drain        connected ∧ bytes available       ──▶ receive_response()
//! ```
//!
//! Step 3 may drain the reply to a request issued on an earlier tick; a
//! poll and its reply are never paired within one call.

use log::{debug, warn};

use super::BotSession;
use crate::app::ports::Clock;
use crate::error::{BotError, Result};
use crate::protocol::payload;
use crate::protocol::transport::Transport;

pub(crate) const GET_UPDATES: &str = "getUpdates";

impl<T: Transport, C: Clock> BotSession<T, C> {
    /// Advance the poll schedule by one tick.
    ///
    /// `Ok(true)` when a successful response was drained into
    /// [`last_response`](Self::last_response), `Ok(false)` when there was
    /// nothing to read yet.
    pub fn poll_once(&mut self) -> Result<bool> {
        let now = self.clock.now_ms();

        if now.saturating_sub(self.last_activity_ms) >= self.config.stale_after_ms() {
            warn!(
                "Bot: no activity for {} ms, connection presumed dead",
                now - self.last_activity_ms
            );
            if !self.reset() {
                return Err(BotError::StaleConnection);
            }
        }

        if self.poll_due(now) {
            self.last_poll_ms = Some(now);
            if !self.is_reply_pending() {
                // Offsets stay far below i64::MAX; saturate rather than wrap.
                let offset = i64::try_from(self.update_offset).unwrap_or(i64::MAX);
                self.issue_request(GET_UPDATES, &payload::poll_body(offset), false)?;
            } else {
                debug!("Bot: poll skipped, reply still pending");
            }
        }

        if self.transport.connected() && self.transport.available() > 0 {
            self.receive_response()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn poll_due(&self, now: u64) -> bool {
        match self.last_poll_ms {
            None => true,
            Some(last) => {
                now.saturating_sub(last) >= u64::from(self.config.min_update_interval_ms)
            }
        }
    }
}
