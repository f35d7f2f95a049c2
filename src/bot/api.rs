//! Outbound API calls.
//!
//! Sends (`sendMessage`, `forwardMessage`, ...) are non-blocking; their
//! replies are drained by the poller.  Calls whose result the caller needs
//! right away (`getMe`, `getFile`, callback answers, command management)
//! block until the reply is in.

use log::{debug, info};

use super::BotSession;
use super::polling::GET_UPDATES;
use crate::app::message::{CallbackQuery, Document, Message};
use crate::app::ports::Clock;
use crate::error::{BotError, Result};
use crate::protocol::payload::{self, BotCommand, SendOptions};
use crate::protocol::transport::Transport;

impl<T: Transport, C: Clock> BotSession<T, C> {
    // ── Bootstrap ─────────────────────────────────────────────

    /// Connect and fetch the bot identity.
    pub fn begin(&mut self) -> Result<()> {
        if !self.ensure_connected() {
            return Err(BotError::TransportUnavailable);
        }
        self.get_me()?;
        info!("Bot: running as @{}", self.username);
        Ok(())
    }

    /// Blocking `getMe`; caches and returns the bot username.
    pub fn get_me(&mut self) -> Result<&str> {
        self.issue_request("getMe", "", true)?;
        self.username = payload::parse_me(&self.rx)?;
        Ok(&self.username)
    }

    /// Blocking `getFile`: fill in the download URL and size of `doc`.
    pub fn get_file(&mut self, doc: &mut Document) -> Result<()> {
        let body = payload::encode_get_file(&doc.file_id)?;
        self.issue_request("getFile", &body, true)?;
        let (path, size) = payload::parse_file(&self.rx)?;
        doc.url = Some(payload::file_url(&self.config.host, &self.token, &path));
        doc.size = size;
        Ok(())
    }

    /// Skip every update queued on the server.
    ///
    /// Reconnects, then asks for the newest update only (offset -1) and
    /// moves the offset past it.
    pub fn no_new_message(&mut self) -> Result<()> {
        if !self.reset() {
            return Err(BotError::TransportUnavailable);
        }
        self.issue_request(GET_UPDATES, &payload::poll_body(-1), true)?;
        self.last_poll_ms = Some(self.clock.now_ms());
        if let Some((id, _)) = payload::parse_update_head(&self.rx)? {
            self.update_offset = self.update_offset.max(id.saturating_add(1));
        }
        info!("Bot: pending updates skipped, offset {}", self.update_offset);
        Ok(())
    }

    // ── Sending ───────────────────────────────────────────────

    pub fn send_message(&mut self, opts: &SendOptions<'_>) -> Result<()> {
        let body = payload::encode_send_message(opts)?;
        self.issue_request("sendMessage", &body, false)
    }

    /// Answer the sender of `msg` (or its chat when the sender is unknown).
    pub fn reply(&mut self, msg: &Message, text: &str, markup: Option<&str>) -> Result<()> {
        let mut opts = SendOptions::new(msg.envelope().reply_chat_id(), text);
        opts.markup = markup;
        self.send_message(&opts)
    }

    pub fn forward_message(&mut self, to_chat: i64, from_chat: i64, message_id: i64) -> Result<()> {
        let body = payload::encode_forward(to_chat, from_chat, message_id)?;
        self.issue_request("forwardMessage", &body, false)
    }

    /// Send a photo the server downloads from `url`.
    pub fn send_photo_by_url(&mut self, chat_id: i64, url: &str, caption: &str) -> Result<()> {
        let body = payload::encode_photo_url(chat_id, url, caption)?;
        self.issue_request("sendPhoto", &body, false)
    }

    /// Post to a channel addressed by `@username`.
    pub fn send_to_channel(&mut self, channel: &str, text: &str, silent: bool) -> Result<()> {
        self.send_message(&SendOptions::to_channel(channel, text).silent(silent))
    }

    pub fn edit_message(
        &mut self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&str>,
    ) -> Result<()> {
        let body = payload::encode_edit(chat_id, message_id, text, markup)?;
        self.issue_request("editMessageText", &body, false)
    }

    /// Send `text` and hide the custom reply keyboard.
    pub fn remove_reply_keyboard(&mut self, chat_id: i64, text: &str, selective: bool) -> Result<()> {
        let markup = payload::remove_keyboard_markup(selective);
        self.send_message(&SendOptions::new(chat_id, text).markup(&markup))
    }

    /// Acknowledge a callback query; `alert` shows a dialog instead of a toast.
    pub fn end_query(&mut self, query: &CallbackQuery, text: &str, alert: bool) -> Result<()> {
        let body = payload::encode_answer_callback(&query.id, text, alert)?;
        self.issue_request("answerCallbackQuery", &body, true)
    }

    // ── Command menu ──────────────────────────────────────────

    pub fn get_my_commands(&mut self) -> Result<Vec<BotCommand>> {
        self.issue_request("getMyCommands", "", true)?;
        payload::parse_commands(&self.rx)
    }

    /// Add one command to the menu.
    ///
    /// `Ok(false)` without touching the menu when the command is already
    /// listed.
    pub fn set_my_commands(&mut self, command: &str, description: &str) -> Result<bool> {
        if command.is_empty() || description.is_empty() {
            return Err(BotError::InvalidArgument("empty command or description"));
        }
        let mut commands = self.get_my_commands()?;
        if commands.iter().any(|c| c.command == command) {
            debug!("Bot: command /{} already registered", command);
            return Ok(false);
        }
        commands.push(BotCommand {
            command: command.into(),
            description: description.into(),
        });
        let body = payload::encode_set_commands(&commands)?;
        self.issue_request("setMyCommands", &body, true)?;
        Ok(true)
    }

    pub fn delete_my_commands(&mut self) -> Result<()> {
        self.issue_request("deleteMyCommands", "", true)
    }
}
