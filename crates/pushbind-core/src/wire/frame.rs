//! Length-prefixed frame reader over the bind stream body.
//!
//! Each frame is an ASCII decimal length on its own line followed by
//! exactly that many characters. Lengths count *characters*, not bytes:
//! the stream is UTF-8 text and a multi-byte character counts once.
//!
//! The reader is sans-io so this crate stays runtime-free: the caller
//! feeds raw body chunks in with [`FrameReader::feed`] and drains complete
//! frames with [`FrameReader::next_frame`]. Chunk boundaries may split
//! UTF-8 sequences; the undecoded tail is carried across feeds.

use bytes::{Buf, BytesMut};

use crate::error::{ChannelError, Result};

/// Incremental reader for length-prefixed frames.
#[derive(Debug, Default)]
pub struct FrameReader {
    /// Decoded characters not yet consumed.
    buf: String,
    /// Raw bytes whose trailing UTF-8 sequence is still incomplete.
    tail: BytesMut,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one body chunk.
    ///
    /// # Errors
    /// `MalformedFrame` if the stream contains invalid UTF-8.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        self.tail.extend_from_slice(chunk);

        match std::str::from_utf8(&self.tail) {
            Ok(s) => {
                self.buf.push_str(s);
                self.tail.clear();
            }
            Err(e) if e.error_len().is_some() => {
                return Err(ChannelError::MalformedFrame(
                    "stream is not valid utf-8".into(),
                ));
            }
            Err(e) => {
                // Incomplete trailing sequence: keep it for the next feed.
                let valid = e.valid_up_to();
                if let Ok(s) = std::str::from_utf8(&self.tail[..valid]) {
                    self.buf.push_str(s);
                }
                self.tail.advance(valid);
            }
        }
        Ok(())
    }

    /// Next complete frame, or `None` if more input is needed.
    ///
    /// # Errors
    /// `MalformedFrame` if a length line is not an unsigned decimal number.
    /// No resynchronization is attempted; the stream is unusable after this.
    pub fn next_frame(&mut self) -> Result<Option<String>> {
        let Some(newline) = self.buf.find('\n') else {
            return Ok(None);
        };

        let line = self.buf[..newline].trim_end_matches('\r');
        let len: usize = line.parse().map_err(|_| {
            ChannelError::MalformedFrame(format!("length line {line:?} is not a number"))
        })?;

        let body_start = newline + 1;
        let body = &self.buf[body_start..];

        // Find the byte offset just past the len-th character.
        let mut end_rel = if len == 0 { Some(0) } else { None };
        if end_rel.is_none() {
            let mut seen = 0;
            for (i, c) in body.char_indices() {
                seen += 1;
                if seen == len {
                    end_rel = Some(i + c.len_utf8());
                    break;
                }
            }
        }
        let Some(end_rel) = end_rel else {
            return Ok(None);
        };

        let frame = body[..end_rel].to_string();
        self.buf.drain(..body_start + end_rel);
        Ok(Some(frame))
    }

    /// Validate clean exhaustion at end of stream.
    ///
    /// Stream end before any length line is normal; a buffered length line
    /// whose body never fully arrived is corruption.
    ///
    /// # Errors
    /// `MalformedFrame` if a partial frame remains buffered.
    pub fn finish(&self) -> Result<()> {
        if self.buf.is_empty() && self.tail.is_empty() {
            Ok(())
        } else {
            Err(ChannelError::MalformedFrame(format!(
                "stream ended mid-frame ({} characters pending)",
                self.buf.chars().count()
            )))
        }
    }
}
