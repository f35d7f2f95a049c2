//! Port traits: the boundary between the bot session and the outside world.
//!
//! ```text
//!   Clock ───────▶ ┌────────────┐ ──▶ KeyboardHandler(s)
//!   Transport ◀──▶ │ BotSession │
//!                  └────────────┘
//! ```
//!
//! The session is generic over [`Clock`] and
//! [`Transport`](crate::protocol::transport::Transport), so the whole
//! polling state machine runs on the host against scripted adapters.

use super::message::CallbackQuery;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: system timer → session)
// ───────────────────────────────────────────────────────────────

/// Monotonic time source plus the cooperative yield point.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin (monotonic).
    fn now_ms(&self) -> u64;

    /// Give other work a chance to run while a blocking call waits.
    ///
    /// On a cooperative single-core loop this is the equivalent of a short
    /// delay; implementations must return promptly.
    fn relax(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Keyboard capability (driven adapter: session → user callbacks)
// ───────────────────────────────────────────────────────────────

/// A registered keyboard that may own the button behind a callback query.
///
/// The dispatcher offers every callback query to every registered handler.
/// Handlers decide on their own whether the query belongs to them and run
/// their side effects; the dispatcher does not interpret the result beyond
/// logging.
pub trait KeyboardHandler {
    /// Offer a callback query.  Returns `true` if this handler consumed it.
    fn offer(&mut self, query: &CallbackQuery) -> bool;
}

impl<F> KeyboardHandler for F
where
    F: FnMut(&CallbackQuery) -> bool,
{
    fn offer(&mut self, query: &CallbackQuery) -> bool {
        self(query)
    }
}
