//! Application-facing types: the message model, keyboards, and the
//! port traits the session is generic over.

pub mod keyboard;
pub mod message;
pub mod ports;
