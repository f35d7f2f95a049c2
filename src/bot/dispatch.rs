//! Message dispatcher: one drained poll response → one typed [`Message`].

use log::{debug, warn};

use super::BotSession;
use crate::app::message::{CallbackQuery, Message};
use crate::app::ports::Clock;
use crate::error::Result;
use crate::protocol::payload;
use crate::protocol::transport::Transport;

impl<T: Transport, C: Clock> BotSession<T, C> {
    /// Run one poll tick and turn whatever it drained into a message.
    ///
    /// `Ok(None)` means nothing to hand out this tick.  The update offset
    /// moves past every update that carried an id, even when its content
    /// fails to decode, so a broken update is never fetched twice.
    ///
    /// Documents come back with their download URL resolved (a blocking
    /// `getFile`); callback queries are offered to every registered
    /// keyboard before being returned.
    pub fn next_message(&mut self) -> Result<Option<Message>> {
        if !self.poll_once()? {
            return Ok(None);
        }
        let Some((update_id, update)) = payload::parse_update_head(&self.rx)? else {
            return Ok(None);
        };
        self.update_offset = self.update_offset.max(update_id.saturating_add(1));
        debug!("Bot: update {} received", update_id);

        let Some(mut message) = payload::decode_update(update)? else {
            debug!("Bot: update {} has no supported content", update_id);
            return Ok(None);
        };

        match &mut message {
            Message::Document { document, .. } => {
                if let Err(e) = self.get_file(document) {
                    warn!("Bot: could not resolve file '{}' ({})", document.file_id, e);
                }
            }
            Message::CallbackQuery(query) => self.offer_to_keyboards(query),
            _ => {}
        }
        Ok(Some(message))
    }

    fn offer_to_keyboards(&mut self, query: &CallbackQuery) {
        let mut handled = 0usize;
        for keyboard in self.keyboards.iter_mut() {
            if keyboard.offer(query) {
                handled += 1;
            }
        }
        debug!(
            "Bot: callback '{}' offered to {} keyboard(s), {} handled",
            query.data,
            self.keyboards.len(),
            handled
        );
    }
}
