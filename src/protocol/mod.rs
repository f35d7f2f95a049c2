//! Transport-agnostic request/response layer.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Protocol Stack                          │
//! │                                                              │
//! │  ┌───────────┐   ┌──────────┐   ┌──────────┐   ┌─────────┐   │
//! │  │ Transport │──▶│  Reader  │──▶│   HTTP   │──▶│ Payload │   │
//! │  │ (trait)   │   │ (bounded)│   │ (framing)│   │ (JSON)  │   │
//! │  └───────────┘   └──────────┘   └──────────┘   └─────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod http;
pub mod payload;
pub mod reader;
pub mod transport;
