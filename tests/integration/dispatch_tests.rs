//! Integration tests for the message dispatcher: offset bookkeeping,
//! classification and keyboard fan-out.

use crate::mock_transport::{MockBot, MockTransport, bot, http_ok, update_reply};
use asyncbot::app::keyboard::InlineKeyboard;
use asyncbot::app::message::{CallbackQuery, Message, MessageType};
use asyncbot::bot::MAX_KEYBOARDS;
use asyncbot::protocol::payload::SendOptions;
use asyncbot::BotError;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Deliver one poll reply and run one dispatcher tick.
fn receive(bot: &mut MockBot, t: &MockTransport, reply: Vec<u8>) -> asyncbot::Result<Option<Message>> {
    // make sure a poll is outstanding so the reply has something to answer
    bot.poll_once()?;
    t.deliver(&reply);
    bot.next_message()
}

#[test]
fn offset_follows_update_ids() {
    let (mut bot, t, clock) = bot();
    for id in [100u64, 101, 105] {
        let msg = receive(
            &mut bot,
            &t,
            update_reply(id, r#""message":{"message_id":1,"chat":{"id":5},"text":"hi"}"#),
        )
        .unwrap();
        assert_eq!(msg.map(|m| m.message_type()), Some(MessageType::Text));
        assert_eq!(bot.update_offset(), id + 1);
        clock.advance(2000);
    }
    bot.poll_once().unwrap();
    assert!(t.sent().ends_with(r#""offset":106}"#));
}

#[test]
fn stale_update_id_never_moves_offset_back() {
    let (mut bot, t, clock) = bot();
    receive(&mut bot, &t, update_reply(50, r#""message":{"message_id":1,"text":"a"}"#)).unwrap();
    clock.advance(2000);
    receive(&mut bot, &t, update_reply(10, r#""message":{"message_id":2,"text":"b"}"#)).unwrap();
    assert_eq!(bot.update_offset(), 51);
}

#[test]
fn zero_update_id_is_no_data() {
    let (mut bot, t, _clock) = bot();
    let msg = receive(
        &mut bot,
        &t,
        update_reply(0, r#""message":{"message_id":1,"text":"ghost"}"#),
    )
    .unwrap();
    assert_eq!(msg, None);
    assert_eq!(bot.update_offset(), 0);
}

#[test]
fn garbage_body_is_malformed() {
    let (mut bot, t, _clock) = bot();
    let res = receive(&mut bot, &t, http_ok(r#"{"ok":true,"result":"#));
    assert_eq!(res, Err(BotError::MalformedResponse));
}

#[test]
fn callback_query_wins_over_message_fields() {
    let (mut bot, t, _clock) = bot();
    let msg = receive(
        &mut bot,
        &t,
        update_reply(
            9,
            r#""callback_query":{"id":"777","data":"LIGHT_ON","chat_instance":"-88",
               "from":{"id":31,"username":"ann"},
               "message":{"message_id":12,"chat":{"id":31},"date":1700000000,
                          "text":"Menu","contact":{"phone_number":"+1"}}},
               "message":{"message_id":13,"location":{"latitude":1.0,"longitude":2.0}}"#,
        ),
    )
    .unwrap()
    .unwrap();

    let Message::CallbackQuery(q) = msg else {
        panic!("expected callback query, got {msg:?}");
    };
    assert_eq!(q.id, "777");
    assert_eq!(q.data, "LIGHT_ON");
    assert_eq!(q.chat_instance, "-88");
    assert_eq!(q.envelope.sender.username, "ann");
    assert_eq!(q.envelope.message_id, 12);
    assert_eq!(q.text, "Menu");
}

#[test]
fn classification_priority() {
    let cases = [
        (
            r#""message":{"message_id":1,"location":{"latitude":3.5,"longitude":-7.25},
               "contact":{"phone_number":"+1"},"text":"x"}"#,
            MessageType::Location,
        ),
        (
            r#""message":{"message_id":1,"contact":{"phone_number":"+1","first_name":"Bo"},
               "reply_to_message":{"message_id":0},"text":"x"}"#,
            MessageType::Contact,
        ),
        (
            r#""message":{"message_id":1,"reply_to_message":{"message_id":0},"text":"re"}"#,
            MessageType::Reply,
        ),
        (r#""message":{"message_id":1,"text":"plain"}"#, MessageType::Text),
    ];
    for (i, (json, expected)) in cases.into_iter().enumerate() {
        let (mut bot, t, _clock) = bot();
        let msg = receive(&mut bot, &t, update_reply(i as u64 + 1, json))
            .unwrap()
            .unwrap();
        assert_eq!(msg.message_type(), expected, "case {i}");
    }
}

#[test]
fn location_coordinates_are_exact() {
    let (mut bot, t, _clock) = bot();
    let msg = receive(
        &mut bot,
        &t,
        update_reply(
            3,
            r#""message":{"message_id":4,"chat":{"id":8},"location":{"latitude":-33.875,"longitude":151.25}}"#,
        ),
    )
    .unwrap()
    .unwrap();
    let Message::Location { location, envelope } = msg else {
        panic!("expected location");
    };
    assert_eq!(location.latitude, -33.875);
    assert_eq!(location.longitude, 151.25);
    assert_eq!(envelope.chat.id, 8);
}

#[test]
fn message_without_id_is_no_data_but_consumes_offset() {
    let (mut bot, t, _clock) = bot();
    let msg = receive(&mut bot, &t, update_reply(70, r#""edited_message":{"message_id":3}"#)).unwrap();
    assert_eq!(msg, None);
    assert_eq!(bot.update_offset(), 71);
}

#[test]
fn document_without_resolution_is_still_returned() {
    let (mut bot, t, _clock) = bot();
    bot.poll_once().unwrap();
    t.deliver(&update_reply(
        12,
        r#""message":{"message_id":6,"document":{"file_id":"BQAD","file_name":"fw.bin"},"caption":"new build"}"#,
    ));
    // getFile answer is a failure envelope
    t.queue_reply(http_ok(r#"{"ok":false,"error_code":400}"#));
    let msg = bot.next_message().unwrap().unwrap();
    let Message::Document { document, caption, .. } = msg else {
        panic!("expected document");
    };
    assert_eq!(document.file_name, "fw.bin");
    assert_eq!(caption, "new build");
    assert!(!document.exists());
    assert_eq!(document.size, None);
}

static LIGHT_ON: AtomicU32 = AtomicU32::new(0);

fn light_on(_q: &CallbackQuery) {
    LIGHT_ON.fetch_add(1, Ordering::SeqCst);
}

#[test]
fn inline_keyboard_callback_runs_on_dispatch() {
    let (mut bot, t, _clock) = bot();
    let mut kb = InlineKeyboard::new();
    kb.add_button("On", "LIGHT_ON", Some(light_on));
    bot.add_keyboard(Box::new(kb)).unwrap();

    let before = LIGHT_ON.load(Ordering::SeqCst);
    receive(
        &mut bot,
        &t,
        update_reply(2, r#""callback_query":{"id":"5","data":"LIGHT_ON"}"#),
    )
    .unwrap();
    assert_eq!(LIGHT_ON.load(Ordering::SeqCst), before + 1);
}

#[test]
fn keyboard_registry_is_bounded() {
    let (mut bot, _t, _clock) = bot();
    for _ in 0..MAX_KEYBOARDS {
        bot.add_keyboard(Box::new(InlineKeyboard::new())).unwrap();
    }
    assert_eq!(
        bot.add_keyboard(Box::new(InlineKeyboard::new())),
        Err(BotError::BufferOverflow)
    );
}

#[test]
fn send_reply_drained_by_poller_is_not_a_message() {
    let (mut bot, t, _clock) = bot();
    t.queue_reply(http_ok(r#"{"ok":true,"result":{"message_id":99,"text":"pong"}}"#));
    bot.send_message(&SendOptions::new(5, "pong")).unwrap();
    assert_eq!(bot.next_message(), Ok(None));
    assert_eq!(bot.update_offset(), 0);
}

#[test]
fn empty_result_is_no_message() {
    let (mut bot, t, _clock) = bot();
    let msg = receive(&mut bot, &t, http_ok(r#"{"ok":true,"result":[]}"#)).unwrap();
    assert_eq!(msg, None);
    assert_eq!(bot.update_offset(), 0);
}

#[test]
fn location_update_advances_offset() {
    let (mut bot, t, _clock) = bot();
    let msg = receive(
        &mut bot,
        &t,
        update_reply(41, r#""message":{"message_id":2,"location":{"latitude":47.5,"longitude":19.25}}"#),
    )
    .unwrap()
    .unwrap();
    assert_eq!(msg.message_type(), MessageType::Location);
    assert_eq!(bot.update_offset(), 42);
}

#[test]
fn malformed_content_still_consumes_offset() {
    let (mut bot, t, _clock) = bot();
    let res = receive(&mut bot, &t, update_reply(7, r#""message":{"message_id":"x"}"#));
    assert_eq!(res, Err(BotError::MalformedResponse));
    assert_eq!(bot.update_offset(), 8);
}

#[test]
fn callback_query_is_offered_to_every_keyboard() {
    let (mut bot, t, _clock) = bot();
    let offered = Rc::new(Cell::new(0u32));
    for _ in 0..2 {
        let seen = Rc::clone(&offered);
        bot.add_keyboard(Box::new(move |q: &CallbackQuery| {
            seen.set(seen.get() + 1);
            q.data == "yes"
        }))
        .unwrap();
    }
    receive(
        &mut bot,
        &t,
        update_reply(3, r#""callback_query":{"id":"1","data":"yes"}"#),
    )
    .unwrap();
    assert_eq!(offered.get(), 2);
}

#[test]
fn document_is_resolved_with_get_file() {
    let (mut bot, t, _clock) = bot();
    bot.poll_once().unwrap();
    t.deliver(&update_reply(
        5,
        r#""message":{"message_id":1,"document":{"file_id":"F1","file_name":"a.txt"}}"#,
    ));
    t.queue_reply(http_ok(
        r#"{"ok":true,"result":{"file_id":"F1","file_size":12,"file_path":"documents/a.txt"}}"#,
    ));
    let msg = bot.next_message().unwrap().unwrap();
    let Message::Document { document, .. } = msg else {
        panic!("expected document");
    };
    assert_eq!(
        document.url.as_deref(),
        Some("https://api.telegram.org/file/bot123:ABC/documents/a.txt")
    );
    assert_eq!(document.size, Some(12));
    assert!(t.sent().contains(r#"{"file_id":"F1"}"#));
}

#[test]
fn document_resolves_with_send_reply_still_owed() {
    let (mut bot, t, _clock) = bot();
    bot.poll_once().unwrap();
    bot.send_message(&SendOptions::new(5, "alert")).unwrap();
    assert!(bot.is_reply_pending());

    // poll reply first, then the sendMessage reply, on the one connection
    t.deliver(&update_reply(
        12,
        r#""message":{"message_id":6,"document":{"file_id":"F2","file_name":"log.txt"}}"#,
    ));
    t.deliver(&http_ok(r#"{"ok":true,"result":{"message_id":9}}"#));
    t.queue_reply(http_ok(
        r#"{"ok":true,"result":{"file_id":"F2","file_size":3,"file_path":"documents/log.txt"}}"#,
    ));

    let msg = bot.next_message().unwrap().unwrap();
    let Message::Document { document, .. } = msg else {
        panic!("expected document");
    };
    assert!(document.exists());
    assert_eq!(document.size, Some(3));
    assert!(!bot.is_reply_pending());
    assert_eq!(bot.update_offset(), 13);
}
