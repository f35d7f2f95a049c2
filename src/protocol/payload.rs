//! Payload codec: JSON bodies for outbound calls, typed extraction from
//! inbound envelopes.
//!
//! Inbound parsing is split in two stages.  [`parse_update_head`] only
//! pulls `result[0].update_id` out of a poll response, so the session can
//! advance its offset before the content is looked at.  [`decode_update`]
//! then classifies the update into a [`Message`]; if that fails the offset
//! has already moved on and the broken update is never requested again.

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::message::{
    CallbackQuery, Chat, Contact, Document, Envelope, Location, Message, User,
};
use crate::error::{BotError, Result};

/// `cache_time` sent with every callback-query answer (seconds).
pub const CALLBACK_CACHE_SECS: u32 = 30;

/// Longest bot username the API allows.
pub const MAX_USERNAME: usize = 32;

// ═══════════════════════════════════════════════════════════════
//  Outbound
// ═══════════════════════════════════════════════════════════════

/// Text formatting mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    #[default]
    Plain,
    Markdown,
    MarkdownV2,
    Html,
}

impl ParseMode {
    /// Wire name, `None` for plain text (field omitted).
    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Markdown => Some("Markdown"),
            Self::MarkdownV2 => Some("MarkdownV2"),
            Self::Html => Some("HTML"),
        }
    }
}

/// Destination chat: numeric id or `@channelusername`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ChatId<'a> {
    Id(i64),
    Username(&'a str),
}

impl ChatId<'_> {
    fn is_valid(&self) -> bool {
        match self {
            Self::Id(id) => *id != 0,
            Self::Username(name) => !name.is_empty(),
        }
    }
}

/// Options for `sendMessage`.  Read-only input to [`encode_send_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions<'a> {
    pub chat_id: ChatId<'a>,
    pub text: &'a str,
    /// Already-serialised `reply_markup` object (keyboard JSON).
    pub markup: Option<&'a str>,
    /// Already-serialised `entities` array.
    pub entities: Option<&'a str>,
    pub parse_mode: ParseMode,
    pub disable_notification: bool,
    pub disable_web_page_preview: bool,
    /// 0 = not a reply.
    pub reply_to_message_id: i64,
    pub allow_sending_without_reply: bool,
    /// Ask the client to show a reply interface (`selective` + `force_reply`).
    pub force_reply: bool,
}

impl<'a> SendOptions<'a> {
    pub fn new(chat_id: i64, text: &'a str) -> Self {
        Self::to(ChatId::Id(chat_id), text)
    }

    /// Address a public channel or supergroup by `@username`.
    pub fn to_channel(username: &'a str, text: &'a str) -> Self {
        Self::to(ChatId::Username(username), text)
    }

    fn to(chat_id: ChatId<'a>, text: &'a str) -> Self {
        Self {
            chat_id,
            text,
            markup: None,
            entities: None,
            parse_mode: ParseMode::Plain,
            disable_notification: false,
            disable_web_page_preview: false,
            reply_to_message_id: 0,
            allow_sending_without_reply: false,
            force_reply: false,
        }
    }

    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self
    }

    pub fn markup(mut self, markup: &'a str) -> Self {
        self.markup = Some(markup);
        self
    }

    pub fn silent(mut self, on: bool) -> Self {
        self.disable_notification = on;
        self
    }

    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.reply_to_message_id = message_id;
        self
    }

    pub fn force_reply(mut self, on: bool) -> Self {
        self.force_reply = on;
        self
    }
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: ChatId<'a>,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    disable_web_page_preview: bool,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    disable_notification: bool,
    #[serde(skip_serializing_if = "is_zero")]
    reply_to_message_id: i64,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    allow_sending_without_reply: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    entities: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(v: &i64) -> bool {
    *v == 0
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_empty(s: &&str) -> bool {
    s.is_empty()
}

/// Encode a `sendMessage` body.
pub fn encode_send_message(opts: &SendOptions<'_>) -> Result<String> {
    if opts.text.is_empty() {
        return Err(BotError::InvalidArgument("empty text"));
    }
    if !opts.chat_id.is_valid() {
        return Err(BotError::InvalidArgument("missing chat id"));
    }

    let entities = match opts.entities {
        Some(raw) if !raw.is_empty() => Some(
            serde_json::from_str::<Value>(raw)
                .map_err(|_| BotError::InvalidArgument("entities are not JSON"))?,
        ),
        _ => None,
    };

    let body = SendMessageBody {
        chat_id: opts.chat_id,
        text: opts.text,
        parse_mode: opts.parse_mode.as_str(),
        disable_web_page_preview: opts.disable_web_page_preview,
        disable_notification: opts.disable_notification,
        reply_to_message_id: opts.reply_to_message_id,
        allow_sending_without_reply: opts.allow_sending_without_reply,
        entities,
        reply_markup: encode_markup(opts.markup, opts.force_reply)?,
    };
    Ok(serde_json::to_string(&body)?)
}

/// Parse caller markup and apply `force_reply`.  `None` when there is
/// nothing to send.
fn encode_markup(markup: Option<&str>, force_reply: bool) -> Result<Option<Value>> {
    let raw = markup.filter(|m| !m.is_empty());
    if raw.is_none() && !force_reply {
        return Ok(None);
    }
    let mut value = match raw {
        Some(raw) => serde_json::from_str::<Value>(raw)
            .map_err(|_| BotError::InvalidArgument("markup is not JSON"))?,
        None => Value::Object(serde_json::Map::new()),
    };
    let obj = value
        .as_object_mut()
        .ok_or(BotError::InvalidArgument("markup must be an object"))?;
    if force_reply {
        obj.insert("selective".into(), Value::Bool(true));
        obj.insert("force_reply".into(), Value::Bool(true));
    }
    Ok(Some(value))
}

/// `getUpdates` body asking for at most one update from `offset` on.
pub fn poll_body(offset: i64) -> String {
    format!(r#"{{"limit":1,"timeout":0,"offset":{offset}}}"#)
}

#[derive(Serialize)]
struct ForwardBody {
    chat_id: i64,
    from_chat_id: i64,
    message_id: i64,
}

pub fn encode_forward(to_chat: i64, from_chat: i64, message_id: i64) -> Result<String> {
    Ok(serde_json::to_string(&ForwardBody {
        chat_id: to_chat,
        from_chat_id: from_chat,
        message_id,
    })?)
}

#[derive(Serialize)]
struct PhotoBody<'a> {
    chat_id: i64,
    photo: &'a str,
    #[serde(skip_serializing_if = "is_empty")]
    caption: &'a str,
}

pub fn encode_photo_url(chat_id: i64, url: &str, caption: &str) -> Result<String> {
    if url.is_empty() {
        return Err(BotError::InvalidArgument("empty photo url"));
    }
    Ok(serde_json::to_string(&PhotoBody {
        chat_id,
        photo: url,
        caption,
    })?)
}

#[derive(Serialize)]
struct AnswerCallbackBody<'a> {
    callback_query_id: &'a str,
    text: &'a str,
    cache_time: u32,
    show_alert: bool,
}

pub fn encode_answer_callback(query_id: &str, text: &str, alert: bool) -> Result<String> {
    if query_id.is_empty() {
        return Err(BotError::InvalidArgument("missing callback query id"));
    }
    Ok(serde_json::to_string(&AnswerCallbackBody {
        callback_query_id: query_id,
        text,
        cache_time: CALLBACK_CACHE_SECS,
        show_alert: alert,
    })?)
}

/// Markup that hides a previously shown reply keyboard.
pub fn remove_keyboard_markup(selective: bool) -> String {
    format!(r#"{{"remove_keyboard":true,"selective":{selective}}}"#)
}

#[derive(Serialize)]
struct EditBody<'a> {
    chat_id: i64,
    message_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<Value>,
}

pub fn encode_edit(chat_id: i64, message_id: i64, text: &str, markup: Option<&str>) -> Result<String> {
    if text.is_empty() {
        return Err(BotError::InvalidArgument("empty text"));
    }
    Ok(serde_json::to_string(&EditBody {
        chat_id,
        message_id,
        text,
        reply_markup: encode_markup(markup, false)?,
    })?)
}

#[derive(Serialize)]
struct FileBody<'a> {
    file_id: &'a str,
}

pub fn encode_get_file(file_id: &str) -> Result<String> {
    if file_id.is_empty() {
        return Err(BotError::InvalidArgument("missing file id"));
    }
    Ok(serde_json::to_string(&FileBody { file_id })?)
}

/// One entry of the bot's command menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotCommand {
    pub command: String,
    pub description: String,
}

#[derive(Serialize)]
struct SetCommandsBody<'a> {
    commands: &'a [BotCommand],
}

pub fn encode_set_commands(commands: &[BotCommand]) -> Result<String> {
    Ok(serde_json::to_string(&SetCommandsBody { commands })?)
}

// ═══════════════════════════════════════════════════════════════
//  Inbound
// ═══════════════════════════════════════════════════════════════

/// `{"ok":..,"result":..}` wrapper every API response uses.
#[derive(Deserialize)]
struct ApiEnvelope<T> {
    result: Option<T>,
}

fn result_of<'de, T: Deserialize<'de>>(body: &'de [u8]) -> Result<T> {
    let env: ApiEnvelope<T> = serde_json::from_slice(body)?;
    env.result.ok_or(BotError::MalformedResponse)
}

/// Extract `result[0]` and its `update_id` from a poll response.
///
/// `Ok(None)` when the result is empty, not a list (the reply to some
/// other call), or the id is missing/zero (zero is treated as "no
/// update").  `Err` when the body is not an envelope.
pub fn parse_update_head(body: &[u8]) -> Result<Option<(u64, Value)>> {
    let Value::Array(result) = result_of::<Value>(body)? else {
        return Ok(None);
    };
    let Some(first) = result.into_iter().next() else {
        return Ok(None);
    };
    match first.get("update_id").and_then(Value::as_u64) {
        Some(id) if id != 0 => Ok(Some((id, first))),
        _ => Ok(None),
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawUser {
    id: i64,
    username: String,
    first_name: String,
    last_name: String,
    language_code: String,
}

impl From<RawUser> for User {
    fn from(u: RawUser) -> Self {
        Self {
            id: u.id,
            username: u.username,
            first_name: u.first_name,
            last_name: u.last_name,
            language_code: u.language_code,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawChat {
    id: i64,
    title: String,
}

#[derive(Deserialize)]
struct RawLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawContact {
    user_id: i64,
    first_name: String,
    last_name: String,
    phone_number: String,
    vcard: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawDocument {
    file_id: String,
    file_name: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawMessage {
    message_id: i64,
    from: RawUser,
    chat: RawChat,
    date: u64,
    text: Option<String>,
    caption: String,
    location: Option<RawLocation>,
    contact: Option<RawContact>,
    document: Option<RawDocument>,
    reply_to_message: Option<IgnoredAny>,
}

impl RawMessage {
    fn take_envelope(&mut self, sender: RawUser) -> Envelope {
        Envelope {
            message_id: self.message_id,
            chat: Chat {
                id: self.chat.id,
                title: core::mem::take(&mut self.chat.title),
            },
            sender: sender.into(),
            date: self.date,
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawCallbackQuery {
    id: String,
    from: RawUser,
    message: Option<RawMessage>,
    data: String,
    chat_instance: String,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawUpdate {
    message: Option<RawMessage>,
    callback_query: Option<RawCallbackQuery>,
}

/// Classify one update.
///
/// Priority: callback query, then location > contact > document >
/// reply > text.  `Ok(None)` for updates of a kind this client does not
/// model (stickers, edits, ...).  Documents come back unresolved.
pub fn decode_update(update: Value) -> Result<Option<Message>> {
    let raw = RawUpdate::deserialize(update)?;

    if let Some(cq) = raw.callback_query.filter(|cq| !cq.id.is_empty()) {
        let mut msg = cq.message.unwrap_or_default();
        let envelope = msg.take_envelope(cq.from);
        return Ok(Some(Message::CallbackQuery(CallbackQuery {
            id: cq.id,
            data: cq.data,
            chat_instance: cq.chat_instance,
            envelope,
            text: msg.text.unwrap_or_default(),
        })));
    }

    let Some(mut msg) = raw.message.filter(|m| m.message_id != 0) else {
        return Ok(None);
    };
    let sender = core::mem::take(&mut msg.from);
    let envelope = msg.take_envelope(sender);

    let message = if let Some(loc) = msg.location {
        Message::Location {
            envelope,
            location: Location {
                latitude: loc.latitude,
                longitude: loc.longitude,
            },
        }
    } else if let Some(c) = msg.contact {
        Message::Contact {
            envelope,
            contact: Contact {
                user_id: c.user_id,
                first_name: c.first_name,
                last_name: c.last_name,
                phone_number: c.phone_number,
                vcard: c.vcard,
            },
        }
    } else if let Some(d) = msg.document {
        Message::Document {
            envelope,
            document: Document {
                file_id: d.file_id,
                file_name: d.file_name,
                url: None,
                size: None,
            },
            caption: msg.caption,
        }
    } else if msg.reply_to_message.is_some() {
        Message::Reply {
            envelope,
            text: msg.text.unwrap_or_default(),
        }
    } else if let Some(text) = msg.text {
        Message::Text { envelope, text }
    } else {
        return Ok(None);
    };
    Ok(Some(message))
}

#[derive(Deserialize)]
struct MeResult {
    #[serde(default)]
    username: String,
}

/// Bot username from a `getMe` response.
pub fn parse_me(body: &[u8]) -> Result<heapless::String<MAX_USERNAME>> {
    let me: MeResult = result_of(body)?;
    let mut name = heapless::String::new();
    name.push_str(&me.username)
        .map_err(|_| BotError::MalformedResponse)?;
    Ok(name)
}

#[derive(Deserialize)]
struct FileResult {
    file_path: String,
    #[serde(default)]
    file_size: Option<u64>,
}

/// `(file_path, file_size)` from a `getFile` response.
pub fn parse_file(body: &[u8]) -> Result<(String, Option<u64>)> {
    let f: FileResult = result_of(body)?;
    Ok((f.file_path, f.file_size))
}

/// Download URL for a resolved file path.
pub fn file_url(host: &str, token: &str, file_path: &str) -> String {
    format!("https://{host}/file/bot{token}/{file_path}")
}

pub fn parse_commands(body: &[u8]) -> Result<Vec<BotCommand>> {
    result_of(body)
}
