//! Integration tests for multipart uploads.

use crate::mock_transport::{TransportCall, bot, bot_with, http_ok};
use asyncbot::bot::upload::Upload;
use asyncbot::protocol::http::{END_BOUNDARY, multipart_preamble};
use asyncbot::{BotConfig, BotError};
use std::io::Read;

const PHOTO_OK: &str = r#"{"ok":true,"result":{"message_id":5,"photo":[]}}"#;

/// Source that never hands out more than `step` bytes per read.
struct Trickle<'a> {
    data: &'a [u8],
    step: usize,
}

impl Read for Trickle<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = buf.len().min(self.step).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

#[test]
fn payload_goes_out_in_configured_blocks() {
    let (mut bot, t, _clock) = bot();
    t.queue_reply(http_ok(PHOTO_OK));
    bot.send_photo_buffer(42, "cam.jpg", &[0xAB; 2500]).unwrap();

    let sizes = t.write_sizes();
    // head, preamble, three payload blocks, closing boundary
    assert_eq!(sizes.len(), 6);
    assert_eq!(&sizes[2..5], &[1024, 1024, 452]);
    assert_eq!(sizes[5], END_BOUNDARY.len());
}

#[test]
fn trickling_source_still_fills_whole_blocks() {
    let (mut bot, t, _clock) = bot();
    t.queue_reply(http_ok(PHOTO_OK));
    let data = vec![7u8; 2048];
    let mut source = Trickle { data: &data, step: 100 };
    bot.send_document_stream(42, "log.txt", "text/plain", &mut source, data.len())
        .unwrap();
    assert_eq!(&t.write_sizes()[2..4], &[1024, 1024]);
}

#[test]
fn multipart_body_is_well_formed() {
    let (mut bot, t, _clock) = bot();
    t.queue_reply(http_ok(PHOTO_OK));
    bot.send_document_buffer(-100200, "report.csv", "text/csv", b"a,b\n1,2\n")
        .unwrap();

    let sent = t.sent();
    assert!(sent.starts_with("POST /bot123:ABC/sendDocument HTTP/1.0\r\n"));
    assert!(sent.contains("name=\"chat_id\"\r\n\r\n-100200\r\n"));
    assert!(sent.contains("name=\"document\"; filename=\"report.csv\""));
    assert!(sent.contains("Content-Type: text/csv\r\n\r\na,b\n1,2\n"));
    assert!(sent.ends_with(END_BOUNDARY));

    let (head, body) = sent.split_once("\r\n\r\n").unwrap();
    let declared: usize = head
        .lines()
        .find_map(|l| l.strip_prefix("Content-Length: "))
        .and_then(|v| v.parse().ok())
        .unwrap();
    assert_eq!(declared, body.len());
}

#[test]
fn pending_poll_reply_is_not_taken_for_upload_confirmation() {
    let config = BotConfig {
        upload_timeout_ms: 500,
        ..BotConfig::default()
    };
    let (mut bot, t, _clock) = bot_with(config);
    bot.poll_once().unwrap();
    // poll reply is in but not drained yet
    t.deliver(&http_ok(r#"{"ok":true,"result":[]}"#));

    // the upload itself gets no answer
    let res = bot.send_buffer(&Upload::photo(42, "cam.jpg"), &[1u8; 64]);
    assert_eq!(res, Err(BotError::ApplicationError));
    assert!(!bot.is_reply_pending());
}

#[test]
fn next_request_after_upload_reconnects() {
    let (mut bot, t, _clock) = bot();
    t.queue_reply(http_ok(PHOTO_OK));
    bot.send_photo_buffer(42, "cam.jpg", &[0u8; 10]).unwrap();
    assert!(!t.is_connected());

    bot.poll_once().unwrap();
    assert_eq!(t.count(&TransportCall::Connect), 2);
    assert_eq!(t.requests_to("getUpdates"), 1);
}

#[test]
fn upload_without_network_writes_nothing() {
    let (mut bot, t, _clock) = bot();
    t.refuse_connect(true);
    assert_eq!(
        bot.send_photo_buffer(42, "cam.jpg", &[0u8; 10]),
        Err(BotError::TransportUnavailable)
    );
    assert!(t.write_sizes().is_empty());
}

#[test]
fn missing_chat_is_rejected_before_connecting() {
    let (mut bot, t, _clock) = bot();
    assert!(matches!(
        bot.send_photo_buffer(0, "cam.jpg", &[0u8; 10]),
        Err(BotError::InvalidArgument(_))
    ));
    assert!(t.calls().is_empty());
}

#[test]
fn short_source_keeps_declared_length() {
    let (mut bot, t, _clock) = bot();
    let upload = Upload::document(7, "a.bin", "application/octet-stream");
    let mut source: &[u8] = &[1u8; 10];
    assert_eq!(
        bot.send_stream(&upload, &mut source, 100),
        Err(BotError::ApplicationError)
    );

    let declared = multipart_preamble(7, "document", "a.bin", "application/octet-stream").len()
        + 100
        + END_BOUNDARY.len();
    assert!(t.sent().contains(&format!("Content-Length: {declared}\r\n")));
    assert!(!t.is_connected());
}

#[test]
fn failure_reply_is_not_confirmed() {
    let (mut bot, t, _clock) = bot();
    t.queue_reply(http_ok(r#"{"ok":false,"description":"Bad Request"}"#));
    assert_eq!(
        bot.send_photo_buffer(3, "x.jpg", &[0u8; 64]),
        Err(BotError::ApplicationError)
    );
    assert!(!t.is_connected());
}

#[test]
fn rejects_empty_upload() {
    let (mut bot, t, _clock) = bot();
    assert!(matches!(
        bot.send_buffer(&Upload::photo(3, "x.jpg"), b""),
        Err(BotError::InvalidArgument(_))
    ));
    assert!(t.write_sizes().is_empty());
}
