//! Typed message model.
//!
//! One inbound update becomes exactly one [`Message`] variant.  Each variant
//! carries only the fields that are meaningful for it, so there is no way to
//! read a contact out of a location message.

/// Discriminator for [`Message`], plus `NoData` for "nothing this tick".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    NoData,
    Text,
    Location,
    Contact,
    Document,
    Reply,
    CallbackQuery,
}

/// Sender identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub language_code: String,
}

/// Chat (private chat, group or channel) a message belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chat {
    pub id: i64,
    /// Empty for private chats.
    pub title: String,
}

/// Fields shared by every message kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    pub message_id: i64,
    pub chat: Chat,
    pub sender: User,
    /// Unix timestamp (seconds).
    pub date: u64,
}

impl Envelope {
    /// Chat to answer into: the sender's private chat when known, else the
    /// chat the message arrived in.
    pub fn reply_chat_id(&self) -> i64 {
        if self.sender.id != 0 {
            self.sender.id
        } else {
            self.chat.id
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub vcard: String,
}

/// Reference to an uploaded document.
///
/// `url` and `size` stay `None` until a `getFile` round-trip resolves them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub file_id: String,
    pub file_name: String,
    pub url: Option<String>,
    pub size: Option<u64>,
}

impl Document {
    /// Whether the download location has been resolved.
    pub fn exists(&self) -> bool {
        self.url.is_some()
    }
}

/// A press on an inline keyboard button.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackQuery {
    pub id: String,
    /// Callback data attached to the pressed button.
    pub data: String,
    pub chat_instance: String,
    /// Envelope of the message the keyboard is attached to; `sender` is the
    /// user who pressed the button.
    pub envelope: Envelope,
    /// Text of the message the keyboard is attached to.
    pub text: String,
}

/// One parsed inbound update.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Text {
        envelope: Envelope,
        text: String,
    },
    Location {
        envelope: Envelope,
        location: Location,
    },
    Contact {
        envelope: Envelope,
        contact: Contact,
    },
    Document {
        envelope: Envelope,
        document: Document,
        caption: String,
    },
    /// A text message that replies to an earlier message.
    Reply {
        envelope: Envelope,
        text: String,
    },
    CallbackQuery(CallbackQuery),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Text { .. } => MessageType::Text,
            Self::Location { .. } => MessageType::Location,
            Self::Contact { .. } => MessageType::Contact,
            Self::Document { .. } => MessageType::Document,
            Self::Reply { .. } => MessageType::Reply,
            Self::CallbackQuery(_) => MessageType::CallbackQuery,
        }
    }

    pub fn envelope(&self) -> &Envelope {
        match self {
            Self::Text { envelope, .. }
            | Self::Location { envelope, .. }
            | Self::Contact { envelope, .. }
            | Self::Document { envelope, .. }
            | Self::Reply { envelope, .. } => envelope,
            Self::CallbackQuery(q) => &q.envelope,
        }
    }

    /// Free-form text: message text, document caption or the text of the
    /// message a callback keyboard belongs to.
    pub fn text(&self) -> &str {
        match self {
            Self::Text { text, .. } | Self::Reply { text, .. } => text,
            Self::Document { caption, .. } => caption,
            Self::CallbackQuery(q) => &q.text,
            Self::Location { .. } | Self::Contact { .. } => "",
        }
    }
}
