//! Bounded blocking reads on top of a non-blocking [`Transport`].
//!
//! Every loop here has an explicit [`Deadline`] and calls
//! [`Clock::relax`] while nothing is readable, so a silent server can
//! never spin the caller's loop forever.  Substring waits use an
//! incremental [`StreamMatcher`]; nothing is buffered to find a marker.

use log::debug;

use super::http::{MAX_HEADER_LINE, ResponseHead};
use super::transport::Transport;
use crate::app::ports::Clock;
use crate::error::{BotError, Result};

/// Size of the stack chunk used when draining a body.
const DRAIN_CHUNK: usize = 256;

// ───────────────────────────────────────────────────────────────
// Deadline
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    start_ms: u64,
    timeout_ms: u64,
}

impl Deadline {
    pub fn after(clock: &impl Clock, timeout_ms: u32) -> Self {
        Self {
            start_ms: clock.now_ms(),
            timeout_ms: u64::from(timeout_ms),
        }
    }

    pub fn expired(&self, clock: &impl Clock) -> bool {
        clock.now_ms().saturating_sub(self.start_ms) >= self.timeout_ms
    }
}

// ───────────────────────────────────────────────────────────────
// Incremental substring matcher
// ───────────────────────────────────────────────────────────────

/// Finds a fixed pattern in a byte stream fed one byte at a time.
///
/// Keeps only the length of the currently matched prefix; on a mismatch
/// it falls back to the longest border of that prefix (KMP without a
/// precomputed table, fine for marker-sized patterns).
pub struct StreamMatcher<'p> {
    pattern: &'p [u8],
    matched: usize,
}

impl<'p> StreamMatcher<'p> {
    pub fn new(pattern: &'p [u8]) -> Self {
        Self {
            pattern,
            matched: 0,
        }
    }

    /// Feed one byte.  Returns `true` when the pattern has just completed.
    pub fn feed(&mut self, byte: u8) -> bool {
        if self.pattern.is_empty() {
            return true;
        }
        loop {
            if self.pattern[self.matched] == byte {
                self.matched += 1;
                break;
            }
            if self.matched == 0 {
                break;
            }
            self.matched = self.border(self.matched);
        }
        if self.matched == self.pattern.len() {
            self.matched = self.border(self.matched);
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.matched = 0;
    }

    /// Longest proper prefix of `pattern[..n]` that is also its suffix.
    fn border(&self, n: usize) -> usize {
        (1..n)
            .rev()
            .find(|&k| self.pattern[..k] == self.pattern[n - k..n])
            .unwrap_or(0)
    }
}

// ───────────────────────────────────────────────────────────────
// Byte-level helpers
// ───────────────────────────────────────────────────────────────

/// Read one byte, waiting until the deadline.  `None` on timeout, on
/// error, or once the peer has closed and nothing is left to read.
fn next_byte<T: Transport, C: Clock>(t: &mut T, clock: &mut C, deadline: &Deadline) -> Option<u8> {
    let mut b = [0u8; 1];
    loop {
        match t.read(&mut b) {
            Ok(n) if n > 0 => return Some(b[0]),
            Ok(_) => {
                if !t.connected() || deadline.expired(clock) {
                    return None;
                }
                clock.relax();
            }
            Err(e) => {
                debug!("Reader: read error {:?}", e);
                return None;
            }
        }
    }
}

/// Wait until `pattern` shows up in the stream.
///
/// Returns `false` on timeout or disconnect.  Bytes up to and including
/// the match are consumed.
pub fn wait_for<T: Transport, C: Clock>(
    t: &mut T,
    clock: &mut C,
    pattern: &[u8],
    timeout_ms: u32,
) -> bool {
    let deadline = Deadline::after(clock, timeout_ms);
    let mut matcher = StreamMatcher::new(pattern);
    while let Some(b) = next_byte(t, clock, &deadline) {
        if matcher.feed(b) {
            return true;
        }
    }
    false
}

/// Read one `\n`-terminated line (terminator stripped).
///
/// Lines longer than [`MAX_HEADER_LINE`] are truncated; the remainder is
/// still consumed so the stream stays aligned.
pub fn read_line<T: Transport, C: Clock>(
    t: &mut T,
    clock: &mut C,
    deadline: &Deadline,
) -> Option<heapless::Vec<u8, MAX_HEADER_LINE>> {
    let mut line = heapless::Vec::new();
    loop {
        let b = next_byte(t, clock, deadline)?;
        if b == b'\n' {
            return Some(line);
        }
        // Overlong lines are only ever inspected for short tokens.
        let _ = line.push(b);
    }
}

/// Consume the response head up to and including the blank line.
pub fn read_head<T: Transport, C: Clock>(
    t: &mut T,
    clock: &mut C,
    deadline: &Deadline,
) -> Result<ResponseHead> {
    let mut head = ResponseHead::default();
    loop {
        let line = read_line(t, clock, deadline).ok_or(BotError::ProtocolTimeout)?;
        if head.feed_line(&line) {
            return Ok(head);
        }
    }
}

/// Drain a response body into `out` (cleared first).
///
/// With a declared length, reads exactly that many bytes or until the
/// deadline / disconnect; without one, reads whatever is available now.
/// Bodies over `limit` are consumed and discarded.
pub fn drain_body<T: Transport, C: Clock>(
    t: &mut T,
    clock: &mut C,
    out: &mut Vec<u8>,
    limit: usize,
    expected: Option<usize>,
    deadline: &Deadline,
) -> Result<()> {
    out.clear();
    let mut chunk = [0u8; DRAIN_CHUNK];
    let mut total = 0usize;
    let mut overflow = false;

    loop {
        let want = match expected {
            Some(n) if total >= n => break,
            Some(n) => (n - total).min(DRAIN_CHUNK),
            None if t.available() == 0 => break,
            None => DRAIN_CHUNK,
        };
        match t.read(&mut chunk[..want]) {
            Ok(0) => {
                if expected.is_none() || !t.connected() || deadline.expired(clock) {
                    break;
                }
                clock.relax();
            }
            Ok(n) => {
                total += n;
                if !overflow && out.len() + n <= limit {
                    out.extend_from_slice(&chunk[..n]);
                } else {
                    overflow = true;
                }
            }
            Err(e) => {
                debug!("Reader: body read error {:?}", e);
                break;
            }
        }
    }

    if overflow {
        out.clear();
        return Err(BotError::BufferOverflow);
    }
    match expected {
        Some(n) if total < n => Err(BotError::MalformedResponse),
        _ => Ok(()),
    }
}
