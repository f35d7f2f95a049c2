//! Unified error type for the bot client.
//!
//! Every fallible operation funnels into [`BotError`], so the caller's loop
//! can log, ignore or retry uniformly.  All variants are `Copy` and carry no
//! heap data; the failing response body (if any) is logged where it is seen,
//! not transported through the error.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level bot error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotError {
    /// The transport is not connected and a connect attempt did not succeed.
    /// The operation was skipped.
    TransportUnavailable,
    /// The response head never completed within the reply timeout.
    /// The connection has been torn down.
    ProtocolTimeout,
    /// The response could not be parsed, or a required field was missing.
    MalformedResponse,
    /// The server answered, but without the success marker.
    ApplicationError,
    /// No activity for longer than the staleness window; a full reset ran.
    StaleConnection,
    /// A caller-supplied argument was rejected before anything was sent.
    InvalidArgument(&'static str),
    /// A fixed-capacity buffer or registry is full.
    BufferOverflow,
    /// Configuration failed validation.
    Config(&'static str),
}

impl fmt::Display for BotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TransportUnavailable => write!(f, "transport not connected"),
            Self::ProtocolTimeout => write!(f, "timed out waiting for response head"),
            Self::MalformedResponse => write!(f, "malformed response"),
            Self::ApplicationError => write!(f, "server reported failure"),
            Self::StaleConnection => write!(f, "connection stale, reset"),
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::BufferOverflow => write!(f, "buffer capacity exceeded"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for BotError {}

impl From<serde_json::Error> for BotError {
    fn from(_: serde_json::Error) -> Self {
        Self::MalformedResponse
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, BotError>;
