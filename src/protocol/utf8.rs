//! UTF-8 validation for WebSocket text messages (RFC 6455 Section 8.1).
//!
//! Text messages may be split across frames at any byte, including inside a
//! multi-byte character, so validation carries a partial character from one
//! fragment to the next.

use crate::error::{Error, Result};

/// Incremental UTF-8 validator for fragmented WebSocket messages.
///
/// Only the trailing partial character of a fragment (at most 3 bytes) is
/// retained between calls.
#[derive(Debug, Clone)]
pub struct Utf8Validator {
    /// Bytes of a character split across fragments.
    incomplete: [u8; 4],
    /// Number of bytes in the incomplete buffer.
    incomplete_len: usize,
}

impl Default for Utf8Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8Validator {
    /// Create a new UTF-8 validator.
    pub fn new() -> Self {
        Self {
            incomplete: [0; 4],
            incomplete_len: 0,
        }
    }

    /// Validate a fragment of UTF-8 data.
    ///
    /// For non-final fragments a character cut off at the end is saved for
    /// the next call. A final fragment must leave no partial character.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidUtf8` if the data contains invalid UTF-8 sequences.
    pub fn validate(&mut self, data: &[u8], is_final: bool) -> Result<()> {
        let data = self.finish_pending(data, is_final)?;

        match std::str::from_utf8(data) {
            Ok(_) => Ok(()),
            Err(e) if !is_final && e.error_len().is_none() => {
                let rest = &data[e.valid_up_to()..];
                self.incomplete[..rest.len()].copy_from_slice(rest);
                self.incomplete_len = rest.len();
                Ok(())
            }
            Err(_) => Err(Error::InvalidUtf8),
        }
    }

    /// Complete a character left over from the previous fragment using the
    /// head of `data`, returning the bytes still to check.
    fn finish_pending<'a>(&mut self, data: &'a [u8], is_final: bool) -> Result<&'a [u8]> {
        if self.incomplete_len == 0 {
            return Ok(data);
        }
        let width = char_width(self.incomplete[0]);
        let take = (width - self.incomplete_len).min(data.len());
        self.incomplete[self.incomplete_len..self.incomplete_len + take]
            .copy_from_slice(&data[..take]);
        self.incomplete_len += take;

        match std::str::from_utf8(&self.incomplete[..self.incomplete_len]) {
            Ok(_) => {
                self.incomplete_len = 0;
                Ok(&data[take..])
            }
            Err(e) if !is_final && e.error_len().is_none() => Ok(&data[take..]),
            Err(_) => {
                self.incomplete_len = 0;
                Err(Error::InvalidUtf8)
            }
        }
    }

    /// Reset the validator state, discarding any incomplete sequences.
    pub fn reset(&mut self) {
        self.incomplete_len = 0;
    }

    /// Check if there are pending incomplete bytes.
    pub fn has_incomplete(&self) -> bool {
        self.incomplete_len > 0
    }
}

/// Encoded length announced by a UTF-8 lead byte.
const fn char_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        _ => 2,
    }
}

/// Validate that a byte slice is valid UTF-8.
///
/// # Errors
///
/// Returns `Error::InvalidUtf8` if the data is not valid UTF-8.
pub fn validate_utf8(data: &[u8]) -> Result<()> {
    std::str::from_utf8(data)
        .map(|_| ())
        .map_err(|_| Error::InvalidUtf8)
}
