//! Adapters: concrete implementations of the session's port traits.
//!
//! | Adapter         | Implements | Connects to                          |
//! |-----------------|------------|--------------------------------------|
//! | `time`          | Clock      | ESP32 system timer / `Instant`       |
//! | `tls_transport` | Transport  | esp-tls client / plaintext TCP (sim) |

pub mod time;
pub mod tls_transport;
