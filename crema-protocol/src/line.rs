//! Line assembly for the serial command channel.
//!
//! Bytes arrive one at a time from the UART driver; the parser collects
//! them until a newline terminates the line. Over-long lines are
//! discarded up to the next newline so the channel resynchronises on
//! its own.

use heapless::String;

use crate::command::ProtocolError;

/// Maximum accepted line length in bytes (excluding the terminator)
///
/// Large enough for a `PUT settings` line carrying every key.
pub const MAX_LINE_LEN: usize = 384;

/// A complete received line
pub type Line = String<MAX_LINE_LEN>;

/// Incremental line parser
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    buffer: Line,
    /// Set while the rest of the current line is being thrown away
    discard: Option<ProtocolError>,
}

impl LineParser {
    /// Create a new line parser
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            discard: None,
        }
    }

    /// Reset the parser state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discard = None;
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(line))` when a newline completes a line,
    /// `Ok(None)` when more bytes are needed, or `Err` when the line
    /// that just ended was too long or not valid text.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Line>, ProtocolError> {
        match byte {
            b'\n' => {
                let result = match self.discard.take() {
                    Some(error) => Err(error),
                    None => Ok(Some(core::mem::take(&mut self.buffer))),
                };
                self.reset();
                result
            }
            b'\r' => Ok(None),
            _ if self.discard.is_some() => Ok(None),
            byte if !byte.is_ascii() => {
                self.discard = Some(ProtocolError::InvalidText);
                self.buffer.clear();
                Ok(None)
            }
            byte => {
                if self.buffer.push(byte as char).is_err() {
                    self.discard = Some(ProtocolError::LineTooLong);
                    self.buffer.clear();
                }
                Ok(None)
            }
        }
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete line found, if any.
    /// Remaining bytes after a complete line are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> Result<Option<Line>, ProtocolError> {
        for &byte in bytes {
            if let Some(line) = self.feed(byte)? {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }
}
