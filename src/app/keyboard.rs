//! Keyboard markup builders.
//!
//! [`InlineKeyboard`] builds `inline_keyboard` markup and doubles as a
//! [`KeyboardHandler`]: buttons registered with a callback are matched by
//! their callback data when the dispatcher offers a query.
//! [`ReplyKeyboard`] builds the custom reply keyboard shown instead of the
//! system keyboard.  Both serialise to the JSON string expected by
//! [`SendOptions::markup`](crate::protocol::payload::SendOptions).

use log::debug;
use serde::Serialize;

use super::message::CallbackQuery;
use super::ports::KeyboardHandler;

/// Callback run when a registered inline button is pressed.
pub type ButtonCallback = fn(&CallbackQuery);

// ───────────────────────────────────────────────────────────────
// Inline keyboard
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct InlineButton {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
}

#[derive(Serialize)]
struct InlineMarkup<'a> {
    inline_keyboard: &'a [Vec<InlineButton>],
}

#[derive(Debug, Clone, Default)]
pub struct InlineKeyboard {
    rows: Vec<Vec<InlineButton>>,
    callbacks: Vec<(String, ButtonCallback)>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback button to the current row.
    ///
    /// When `callback` is set, pressing the button runs it (see
    /// [`KeyboardHandler::offer`]).
    pub fn add_button(
        &mut self,
        text: &str,
        data: &str,
        callback: Option<ButtonCallback>,
    ) -> &mut Self {
        self.current_row().push(InlineButton {
            text: text.into(),
            callback_data: Some(data.into()),
            url: None,
        });
        if let Some(cb) = callback {
            self.callbacks.push((data.into(), cb));
        }
        self
    }

    /// Add a button that opens `url` to the current row.
    pub fn add_url(&mut self, text: &str, url: &str) -> &mut Self {
        self.current_row().push(InlineButton {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        });
        self
    }

    /// Start a new row.  Consecutive calls do not create empty rows.
    pub fn add_row(&mut self) -> &mut Self {
        if self.rows.last().is_some_and(|r| !r.is_empty()) {
            self.rows.push(Vec::new());
        }
        self
    }

    pub fn button_count(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Serialise to `{"inline_keyboard":[[...]]}`.
    pub fn to_json(&self) -> String {
        let rows: Vec<Vec<InlineButton>> = self
            .rows
            .iter()
            .filter(|r| !r.is_empty())
            .cloned()
            .collect();
        serde_json::to_string(&InlineMarkup {
            inline_keyboard: &rows,
        })
        .unwrap_or_default()
    }

    fn current_row(&mut self) -> &mut Vec<InlineButton> {
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        let last = self.rows.len() - 1;
        &mut self.rows[last]
    }
}

impl KeyboardHandler for InlineKeyboard {
    fn offer(&mut self, query: &CallbackQuery) -> bool {
        match self.callbacks.iter().find(|(data, _)| *data == query.data) {
            Some((data, cb)) => {
                debug!("Keyboard: callback '{}' matched", data);
                cb(query);
                true
            }
            None => false,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Reply keyboard
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
struct ReplyButton {
    text: String,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    request_contact: bool,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    request_location: bool,
}

/// What a reply keyboard button asks the client to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyButtonKind {
    /// Send the button text.
    Simple,
    /// Share the user's phone contact.
    Contact,
    /// Share the user's current location.
    Location,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplyKeyboard {
    keyboard: Vec<Vec<ReplyButton>>,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    resize_keyboard: bool,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    one_time_keyboard: bool,
}

impl ReplyKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_button(&mut self, text: &str, kind: ReplyButtonKind) -> &mut Self {
        if self.keyboard.is_empty() {
            self.keyboard.push(Vec::new());
        }
        let last = self.keyboard.len() - 1;
        self.keyboard[last].push(ReplyButton {
            text: text.into(),
            request_contact: kind == ReplyButtonKind::Contact,
            request_location: kind == ReplyButtonKind::Location,
        });
        self
    }

    pub fn add_row(&mut self) -> &mut Self {
        if self.keyboard.last().is_some_and(|r| !r.is_empty()) {
            self.keyboard.push(Vec::new());
        }
        self
    }

    /// Ask clients to shrink the keyboard to fit its buttons.
    pub fn resize(&mut self, on: bool) -> &mut Self {
        self.resize_keyboard = on;
        self
    }

    /// Hide the keyboard after the first press.
    pub fn one_time(&mut self, on: bool) -> &mut Self {
        self.one_time_keyboard = on;
        self
    }

    /// Serialise to `{"keyboard":[[...]],...}`.
    pub fn to_json(&self) -> String {
        let mut copy = self.clone();
        copy.keyboard.retain(|r| !r.is_empty());
        serde_json::to_string(&copy).unwrap_or_default()
    }
}
