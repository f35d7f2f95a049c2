//! Bulk transfer: multipart uploads from a buffer or a byte stream.
//!
//! An upload consumes the connection: the body is written in
//! `block_size` blocks with a cooperative yield after each, the session
//! waits for the success marker, and the transport is closed whatever the
//! outcome.  The next request reconnects.

use std::io::{self, Read};

use log::{debug, info, warn};

use super::BotSession;
use crate::app::ports::Clock;
use crate::error::{BotError, Result};
use crate::protocol::http::{self, END_BOUNDARY, SUCCESS_MARKER};
use crate::protocol::reader;
use crate::protocol::transport::Transport;

/// Where an upload goes and how its file part is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Upload<'a> {
    pub chat_id: i64,
    /// API method, e.g. `sendPhoto`.
    pub endpoint: &'a str,
    pub mime_type: &'a str,
    /// Form field carrying the file (`photo`, `document`, ...).
    pub field_name: &'a str,
    pub file_name: &'a str,
}

impl<'a> Upload<'a> {
    /// JPEG photo shown inline in the chat.
    pub fn photo(chat_id: i64, file_name: &'a str) -> Self {
        Self {
            chat_id,
            endpoint: "sendPhoto",
            mime_type: "image/jpeg",
            field_name: "photo",
            file_name,
        }
    }

    /// Generic file attachment.
    pub fn document(chat_id: i64, file_name: &'a str, mime_type: &'a str) -> Self {
        Self {
            chat_id,
            endpoint: "sendDocument",
            mime_type,
            field_name: "document",
            file_name,
        }
    }
}

impl<T: Transport, C: Clock> BotSession<T, C> {
    /// Upload `size` bytes read from `source`.
    ///
    /// `Content-Length` is fixed from `size` before the first byte goes
    /// out.  A source that runs dry early is logged; the server then sees a
    /// short body and the upload fails on the missing success marker.
    pub fn send_stream<R: Read>(&mut self, upload: &Upload<'_>, source: &mut R, size: usize) -> Result<()> {
        if upload.chat_id == 0 {
            return Err(BotError::InvalidArgument("missing chat id"));
        }
        if size == 0 {
            return Err(BotError::InvalidArgument("empty upload"));
        }
        if !self.ensure_connected() {
            return Err(BotError::TransportUnavailable);
        }
        self.settle_pending(upload.endpoint);

        let written = self.write_upload(upload, source, size);
        let confirmed = written.is_ok() && {
            self.pending_replies = 1;
            reader::wait_for(
                &mut self.transport,
                &mut self.clock,
                SUCCESS_MARKER,
                self.config.upload_timeout_ms,
            )
        };

        self.transport.stop();
        self.pending_replies = 0;
        self.last_activity_ms = self.clock.now_ms();

        written?;
        if !confirmed {
            warn!("Bot: upload to '{}' not confirmed", upload.endpoint);
            return Err(BotError::ApplicationError);
        }
        info!("Bot: uploaded {} bytes via '{}'", size, upload.endpoint);
        Ok(())
    }

    /// Upload an in-memory file.
    pub fn send_buffer(&mut self, upload: &Upload<'_>, data: &[u8]) -> Result<()> {
        let mut source = data;
        self.send_stream(upload, &mut source, data.len())
    }

    pub fn send_photo_buffer(&mut self, chat_id: i64, file_name: &str, data: &[u8]) -> Result<()> {
        self.send_buffer(&Upload::photo(chat_id, file_name), data)
    }

    pub fn send_photo_stream<R: Read>(
        &mut self,
        chat_id: i64,
        file_name: &str,
        source: &mut R,
        size: usize,
    ) -> Result<()> {
        self.send_stream(&Upload::photo(chat_id, file_name), source, size)
    }

    pub fn send_document_buffer(
        &mut self,
        chat_id: i64,
        file_name: &str,
        mime_type: &str,
        data: &[u8],
    ) -> Result<()> {
        self.send_buffer(&Upload::document(chat_id, file_name, mime_type), data)
    }

    pub fn send_document_stream<R: Read>(
        &mut self,
        chat_id: i64,
        file_name: &str,
        mime_type: &str,
        source: &mut R,
        size: usize,
    ) -> Result<()> {
        self.send_stream(&Upload::document(chat_id, file_name, mime_type), source, size)
    }

    fn write_upload<R: Read>(&mut self, upload: &Upload<'_>, source: &mut R, size: usize) -> Result<()> {
        let preamble = http::multipart_preamble(
            upload.chat_id,
            upload.field_name,
            upload.file_name,
            upload.mime_type,
        );
        let content_length = preamble.len() + size + END_BOUNDARY.len();
        let head = http::multipart_head(&self.config.host, &self.token, upload.endpoint, content_length);

        self.write_all(head.as_bytes())?;
        self.write_all(preamble.as_bytes())?;

        let mut block = vec![0u8; self.config.block_size];
        let mut remaining = size;
        while remaining > 0 {
            let want = remaining.min(block.len());
            let n = fill(source, &mut block[..want]);
            if n == 0 {
                warn!("Bot: upload source ended {} bytes short", remaining);
                break;
            }
            self.write_all(&block[..n])?;
            remaining -= n;
            self.clock.relax();
        }
        debug!("Bot: upload body sent ({} of {} bytes)", size - remaining, size);

        self.write_all(END_BOUNDARY.as_bytes())
    }
}

/// Read until `buf` is full or the source is exhausted.
fn fill<R: Read>(source: &mut R, buf: &mut [u8]) -> usize {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                warn!("Bot: upload source read failed ({})", e);
                break;
            }
        }
    }
    filled
}
