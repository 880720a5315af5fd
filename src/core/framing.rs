//! Wire framing for envelopes.
//!
//! Two modes:
//! - **Length-prefixed** (default): `[4 bytes length, big-endian] [payload]`.
//!   Binary-safe, payload may contain anything.
//! - **Delimited** (legacy): `!START!<payload>!END!`. Kept for receivers
//!   written against the old protocol. A payload containing the literal end
//!   marker cannot be delimited and is refused.
//!
//! [`FrameDecoder`] is the receiving side: feed it whatever `read` returned
//! and pull complete frames out, regardless of how TCP split or coalesced
//! them.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Legacy frame start marker
pub const START_MARKER: &[u8] = b"!START!";
/// Legacy frame end marker
pub const END_MARKER: &[u8] = b"!END!";
/// Length prefix size in bytes
pub const LENGTH_PREFIX: usize = 4;
/// Largest frame the decoder accepts by default (64 MiB)
pub const DEFAULT_MAX_FRAME: usize = 64 * 1024 * 1024;

/// Framing errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },

    #[error("Payload contains the end marker and cannot be sent with delimited framing")]
    EmbeddedMarker,
}

/// Framing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Framing {
    /// 4-byte big-endian length prefix
    #[default]
    LengthPrefixed,
    /// `!START!` ... `!END!`
    Delimited,
}

impl Framing {
    /// Frame a payload for the wire.
    pub fn encode(&self, payload: &[u8]) -> Result<Vec<u8>, FrameError> {
        match self {
            Framing::LengthPrefixed => {
                let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
                    len: payload.len(),
                    max: u32::MAX as usize,
                })?;
                let mut framed = Vec::with_capacity(LENGTH_PREFIX + payload.len());
                framed.extend_from_slice(&len.to_be_bytes());
                framed.extend_from_slice(payload);
                Ok(framed)
            }
            Framing::Delimited => {
                if find(payload, END_MARKER).is_some() {
                    return Err(FrameError::EmbeddedMarker);
                }
                let mut framed =
                    Vec::with_capacity(START_MARKER.len() + payload.len() + END_MARKER.len());
                framed.extend_from_slice(START_MARKER);
                framed.extend_from_slice(payload);
                framed.extend_from_slice(END_MARKER);
                Ok(framed)
            }
        }
    }
}

impl std::fmt::Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framing::LengthPrefixed => f.write_str("length-prefixed"),
            Framing::Delimited => f.write_str("delimited"),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Incremental frame decoder.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    buf: Vec<u8>,
    max_frame: usize,
}

impl FrameDecoder {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buf: Vec::new(),
            max_frame: DEFAULT_MAX_FRAME,
        }
    }

    pub fn with_max_frame(mut self, max_frame: usize) -> Self {
        self.max_frame = max_frame;
        self
    }

    /// Append received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Bytes held that do not form a complete frame yet.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete payload, or `None` if more bytes are needed.
    pub fn next_frame(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        match self.framing {
            Framing::LengthPrefixed => self.next_prefixed(),
            Framing::Delimited => self.next_delimited(),
        }
    }

    fn next_prefixed(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        if self.buf.len() < LENGTH_PREFIX {
            return Ok(None);
        }
        let len = u32::from_be_bytes([self.buf[0], self.buf[1], self.buf[2], self.buf[3]]) as usize;
        if len > self.max_frame {
            return Err(FrameError::TooLarge {
                len,
                max: self.max_frame,
            });
        }
        if self.buf.len() < LENGTH_PREFIX + len {
            return Ok(None);
        }
        let payload = self.buf[LENGTH_PREFIX..LENGTH_PREFIX + len].to_vec();
        self.buf.drain(..LENGTH_PREFIX + len);
        Ok(Some(payload))
    }

    fn next_delimited(&mut self) -> Result<Option<Vec<u8>>, FrameError> {
        match find(&self.buf, START_MARKER) {
            Some(0) => {}
            Some(pos) => {
                warn!("Discarding {} bytes before frame start", pos);
                self.buf.drain(..pos);
            }
            None => {
                // Keep a tail that may be the beginning of a split start marker.
                let keep = START_MARKER.len() - 1;
                if self.buf.len() > keep {
                    let junk = self.buf.len() - keep;
                    warn!("Discarding {} bytes outside any frame", junk);
                    self.buf.drain(..junk);
                }
                return Ok(None);
            }
        }

        let body = &self.buf[START_MARKER.len()..];
        match find(body, END_MARKER) {
            Some(end) => {
                let payload = body[..end].to_vec();
                self.buf.drain(..START_MARKER.len() + end + END_MARKER.len());
                Ok(Some(payload))
            }
            None if body.len() > self.max_frame => Err(FrameError::TooLarge {
                len: body.len(),
                max: self.max_frame,
            }),
            None => Ok(None),
        }
    }
}
