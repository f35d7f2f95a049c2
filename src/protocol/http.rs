//! Minimal HTTP/1.0 framing for the bot API.
//!
//! Requests are assembled into one buffer and written in a single call;
//! this keeps a whole request inside as few TLS records as possible.
//! HTTP/1.0 is used on purpose: servers never answer it with chunked
//! transfer encoding, so a response body is always a plain byte run.
//!
//! ```text
//! POST /bot<token>/<endpoint> HTTP/1.0\r\n
//! Host: <host>\r\n
//! Connection: keep-alive\r\n
//! Content-Type: application/json\r\n
//! Content-Length: <n>\r\n
//! \r\n
//! <body>
//! ```

use core::fmt::Write as _;

/// Substring every successful API envelope contains.
pub const SUCCESS_MARKER: &[u8] = br#""ok":true"#;

/// Multipart boundary used for uploads.
pub const BOUNDARY: &str = "----WebKitFormBoundary7MA4YWxkTrZu0gW";

/// Closing delimiter of a multipart body.
pub const END_BOUNDARY: &str = "\r\n------WebKitFormBoundary7MA4YWxkTrZu0gW--\r\n";

/// Longest header line kept for inspection; the rest of a line is skipped.
pub const MAX_HEADER_LINE: usize = 128;

/// Build a complete JSON request (head and body) ready for one write.
pub fn json_request(host: &str, token: &str, endpoint: &str, body: &str) -> String {
    let mut req = String::with_capacity(160 + token.len() + endpoint.len() + body.len());
    request_line(&mut req, token, endpoint);
    // Writing into a String cannot fail.
    let _ = write!(
        req,
        "Host: {host}\r\n\
         Connection: keep-alive\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         \r\n",
        body.len()
    );
    req.push_str(body);
    req
}

/// Build the head of a multipart upload request.
///
/// `content_length` is the full body length, fixed before any payload byte
/// is written.
pub fn multipart_head(host: &str, token: &str, endpoint: &str, content_length: usize) -> String {
    let mut req = String::with_capacity(200 + token.len() + endpoint.len());
    request_line(&mut req, token, endpoint);
    let _ = write!(
        req,
        "Host: {host}\r\n\
         Content-Length: {content_length}\r\n\
         Content-Type: multipart/form-data; boundary={BOUNDARY}\r\n\
         \r\n"
    );
    req
}

/// Form parts preceding the raw file bytes: the `chat_id` field, then the
/// header of the file part.
pub fn multipart_preamble(chat_id: i64, field: &str, file_name: &str, mime: &str) -> String {
    let mut form = String::with_capacity(256);
    let _ = write!(
        form,
        "--{BOUNDARY}\r\n\
         Content-disposition: form-data; name=\"chat_id\"\r\n\
         \r\n\
         {chat_id}\r\n\
         --{BOUNDARY}\r\n\
         Content-disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
         Content-Type: {mime}\r\n\
         \r\n"
    );
    form
}

fn request_line(req: &mut String, token: &str, endpoint: &str) {
    let _ = write!(req, "POST /bot{token}/{endpoint} HTTP/1.0\r\n");
}

/// Lightweight success check: no structural parse, just the marker.
pub fn is_success(body: &[u8]) -> bool {
    contains(body, SUCCESS_MARKER)
}

pub fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

// ───────────────────────────────────────────────────────────────
// Response head
// ───────────────────────────────────────────────────────────────

/// What the session needs to know from a response head.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseHead {
    /// Status code from the status line, if it parsed.
    pub status: Option<u16>,
    /// Declared body length.
    pub content_length: Option<usize>,
    /// The server announced it will close the connection.
    pub close: bool,
    lines: usize,
}

impl ResponseHead {
    /// Feed one line (terminator already stripped, trailing `\r` allowed).
    ///
    /// Returns `true` when the line is the blank line ending the head.
    pub fn feed_line(&mut self, line: &[u8]) -> bool {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            return true;
        }
        self.lines += 1;
        if self.lines == 1 && line.starts_with(b"HTTP/") {
            self.status = parse_status(line);
            return false;
        }
        if contains_ignore_case(line, b"close") {
            self.close = true;
        }
        if let Some(value) = header_value(line, b"content-length") {
            self.content_length = core::str::from_utf8(value)
                .ok()
                .and_then(|v| v.trim().parse().ok());
        }
        false
    }
}

fn parse_status(line: &[u8]) -> Option<u16> {
    let text = core::str::from_utf8(line).ok()?;
    text.split_ascii_whitespace().nth(1)?.parse().ok()
}

fn header_value<'a>(line: &'a [u8], name: &[u8]) -> Option<&'a [u8]> {
    let colon = line.iter().position(|&b| b == b':')?;
    let (key, rest) = line.split_at(colon);
    key.trim_ascii().eq_ignore_ascii_case(name).then(|| &rest[1..])
}

fn contains_ignore_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle))
}
