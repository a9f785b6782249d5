//! Incremental framing of the server-sent event body.
//!
//! The generation endpoint streams frames separated by a blank line:
//! ```text
//! event: partial
//! data: {"cover_letter_chunk": "Dear "}
//!
//! event: final
//! data: {"document_url": "...", "cover_letter_text": "...", "resume_text": "..."}
//!
//! ```
//!
//! Network chunks may split anywhere, including inside a multi-byte UTF-8
//! sequence or inside the delimiter itself. [`FrameDecoder`] keeps the
//! undecoded tail between calls so that the frames produced never depend on
//! where the splits fell.

/// Blank-line frame delimiter.
pub const FRAME_DELIMITER: &str = "\n\n";

/// One raw protocol frame, without its trailing delimiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame(String);

impl Frame {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lines of the frame with any trailing `\r` removed.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
    }
}

/// Incremental UTF-8 decoder that holds back an incomplete trailing
/// multi-byte sequence until the rest of it arrives.
#[derive(Debug, Default)]
struct Utf8Residue {
    pending: Vec<u8>,
}

impl Utf8Residue {
    /// Decode as much of `pending + bytes` as possible into `out`.
    fn decode_into(&mut self, bytes: &[u8], out: &mut String) {
        let owned;
        let mut input: &[u8] = if self.pending.is_empty() {
            bytes
        } else {
            self.pending.extend_from_slice(bytes);
            owned = std::mem::take(&mut self.pending);
            &owned
        };

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            self.pending.extend_from_slice(rest);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// Flush a dangling incomplete sequence at end of stream.
    fn finish_into(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(char::REPLACEMENT_CHARACTER);
        }
    }
}

/// Splits a chunked byte stream into [`Frame`]s.
///
/// Each instance is owned by exactly one session; nothing is shared.
///
/// # Example
/// ```
/// use career_copilot::sse::FrameDecoder;
///
/// let mut decoder = FrameDecoder::new();
/// assert!(decoder.feed(b"event: error\nda").is_empty());
/// let frames = decoder.feed(b"ta: boom\n\n");
/// assert_eq!(frames[0].as_str(), "event: error\ndata: boom");
/// assert!(decoder.finish().is_none());
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    utf8: Utf8Residue,
    buffer: String,
    /// Offset in `buffer` before which no delimiter can start.
    scan_from: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk and return every frame it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.utf8.decode_into(chunk, &mut self.buffer);

        let mut frames = Vec::new();
        while let Some(offset) = self.buffer[self.scan_from..].find(FRAME_DELIMITER) {
            let end = self.scan_from + offset;
            let frame = self.buffer[..end].to_string();
            self.buffer.drain(..end + FRAME_DELIMITER.len());
            self.scan_from = 0;
            if !is_blank(&frame) {
                frames.push(Frame(frame));
            }
        }

        // A lone trailing '\n' may be the first half of the next delimiter.
        self.scan_from = self.buffer.len().saturating_sub(FRAME_DELIMITER.len() - 1);
        while !self.buffer.is_char_boundary(self.scan_from) {
            self.scan_from -= 1;
        }
        frames
    }

    /// Signal end of stream and return whatever remains as a trailing frame.
    ///
    /// Servers may omit the final delimiter, so a non-blank remainder is
    /// handed on; the classifier decides whether it means anything.
    pub fn finish(&mut self) -> Option<Frame> {
        self.utf8.finish_into(&mut self.buffer);
        self.scan_from = 0;
        let rest = std::mem::take(&mut self.buffer);
        if is_blank(&rest) {
            None
        } else {
            Some(Frame(rest.trim_end_matches(['\r', '\n']).to_string()))
        }
    }

    /// Number of decoded characters' bytes waiting for a delimiter.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() + self.utf8.pending.len()
    }

    /// Drop everything buffered, e.g. after cancellation.
    pub fn discard(&mut self) {
        self.buffer.clear();
        self.utf8.pending.clear();
        self.scan_from = 0;
    }
}

fn is_blank(text: &str) -> bool {
    text.trim_matches(['\r', '\n']).is_empty()
}
