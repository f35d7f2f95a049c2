//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one part of the session
//! against the scripted transport in `mock_transport`.  The live socket
//! tests use the host build of the real transport over loopback; nothing
//! needs network access.

#![cfg(not(target_os = "espidf"))]

mod dispatch_tests;
mod live_socket_tests;
mod upload_tests;
