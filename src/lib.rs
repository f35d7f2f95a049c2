//! asyncbot: non-blocking Telegram bot client for ESP32 firmware.
//!
//! Exposes the pure-logic modules for integration testing and host-side
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │        TlsTransport (Transport)     SystemClock (Clock)        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  BotSession: polling · dispatch · api · upload         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  protocol: http framing · bounded reader · JSON payloads       │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod bot;
pub mod config;
pub mod error;
pub mod protocol;

pub use bot::BotSession;
pub use config::BotConfig;
pub use error::{BotError, Result};
