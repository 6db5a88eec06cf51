//! Line codec for tokio.
//!
//! Reads `\n`-terminated lines and writes `\r\n`-terminated ones. Servers
//! relay whatever bytes their users send, so decoding never fails on content:
//! invalid UTF-8 is replaced with U+FFFD and an overlong line is dropped up to
//! its terminator.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error;

/// Default line limit, the RFC 1459 maximum including `\r\n`.
pub const DEFAULT_MAX_LEN: usize = 512;

/// Line-based codec for IRC traffic.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index of next byte to check for newline
    next_index: usize,
    /// Maximum line length, not counting the line ending
    max_len: usize,
    /// Inside an overlong line; drop bytes up to the next newline.
    discarding: bool,
}

impl LineCodec {
    /// Create a codec with the default line limit.
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LEN)
    }

    /// Create a codec with a custom line limit.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }

    /// Maximum line length, not counting the line ending.
    pub fn max_len(&self) -> usize {
        self.max_len
    }

    fn to_line(&self, raw: &[u8]) -> Option<String> {
        let raw = strip_line_ending(raw);
        if raw.len() > self.max_len {
            return None;
        }
        Some(String::from_utf8_lossy(raw).into_owned())
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_line_ending(mut raw: &[u8]) -> &[u8] {
    if let [rest @ .., b'\n'] = raw {
        raw = rest;
    }
    if let [rest @ .., b'\r'] = raw {
        raw = rest;
    }
    raw
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = error::ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                if self.discarding || src.len() > self.max_len + 1 {
                    // Keep nothing of an overlong line but remember to skip its tail.
                    src.clear();
                    self.next_index = 0;
                    self.discarding = true;
                } else {
                    self.next_index = src.len();
                }
                return Ok(None);
            };

            let raw = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if let Some(line) = self.to_line(&raw) {
                return Ok(Some(line));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }

        let raw = src.split();
        self.next_index = 0;
        if self.discarding {
            self.discarding = false;
            return Ok(None);
        }
        Ok(self.to_line(&raw))
    }
}

impl Encoder<String> for LineCodec {
    type Error = error::ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.reserve(msg.len() + 2);
        dst.extend_from_slice(msg.as_bytes());
        if !msg.ends_with('\n') {
            dst.extend_from_slice(b"\r\n");
        }
        Ok(())
    }
}
