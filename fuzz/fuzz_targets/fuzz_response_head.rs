//! Fuzz target: `ResponseHead::feed_line` and `StreamMatcher::feed`
//!
//! Splits arbitrary bytes into lines the way the reader does and feeds
//! them to the head parser, then runs the same bytes through the success
//! marker matcher.  Neither may panic, and the matcher must agree with a
//! plain substring search.
//!
//! cargo fuzz run fuzz_response_head

#![no_main]

use asyncbot::protocol::http::{ResponseHead, SUCCESS_MARKER, contains};
use asyncbot::protocol::reader::StreamMatcher;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut head = ResponseHead::default();
    for line in data.split(|&b| b == b'\n') {
        if head.feed_line(line) {
            break;
        }
    }

    let mut matcher = StreamMatcher::new(SUCCESS_MARKER);
    let seen = data.iter().any(|&b| matcher.feed(b));
    assert_eq!(seen, contains(data, SUCCESS_MARKER));
});
