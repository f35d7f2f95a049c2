//! Fuzz target: `parse_update_head` + `decode_update`
//!
//! Treats the input as a drained poll response body.  Parsing must fail
//! cleanly, never panic, and never report update id 0.
//!
//! cargo fuzz run fuzz_update_parser

#![no_main]

use asyncbot::protocol::payload::{decode_update, parse_update_head};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(Some((id, update))) = parse_update_head(data) {
        assert_ne!(id, 0, "zero id must read as no update");
        let _ = decode_update(update);
    }
});
