//! Line decoding and echo encoding for the command protocol.
//!
//! Record format:
//! - COMMAND: unsigned decimal integer (packed pin value)
//! - `,` separator
//! - DURATION: unsigned decimal integer
//! - terminated by `\n` (a trailing `\r` and surrounding spaces are ignored)

use core::fmt::Write as _;
use core::str;

use heapless::{String, Vec};

/// Token that ends a listening session
pub const END_TOKEN: &str = "END";

/// Maximum accepted line length in bytes (excluding the newline)
pub const MAX_LINE_LEN: usize = 32;

/// Maximum echo length: two 10-digit integers, a comma and a newline
pub const MAX_ECHO_LEN: usize = 24;

/// Errors that can occur while decoding a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LineError {
    /// Line exceeded [`MAX_LINE_LEN`]
    TooLong,
    /// Line is not valid UTF-8
    Encoding,
    /// Line does not have exactly two comma-separated fields
    FieldCount,
    /// A field is not an unsigned 32-bit integer
    InvalidNumber,
}

/// One decoded event record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LineCommand {
    /// Packed pin value
    pub command: u32,
    /// Duration in the run's unit
    pub duration: u32,
}

impl LineCommand {
    /// Create a new record
    pub const fn new(command: u32, duration: u32) -> Self {
        Self { command, duration }
    }

    /// Parse a single line (without its newline)
    ///
    /// Returns `Ok(None)` for blank lines.
    pub fn parse(line: &str) -> Result<Option<Line>, LineError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if line == END_TOKEN {
            return Ok(Some(Line::End));
        }

        let mut fields = line.split(',');
        let (Some(command), Some(duration), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(LineError::FieldCount);
        };

        let command = command
            .trim()
            .parse::<u32>()
            .map_err(|_| LineError::InvalidNumber)?;
        let duration = duration
            .trim()
            .parse::<u32>()
            .map_err(|_| LineError::InvalidNumber)?;

        Ok(Some(Line::Record(Self { command, duration })))
    }

    /// Encode this record as an echo line, newline included
    pub fn encode(&self) -> String<MAX_ECHO_LEN> {
        let mut out = String::new();
        // Cannot fail: MAX_ECHO_LEN fits two u32::MAX values
        let _ = writeln!(out, "{},{}", self.command, self.duration);
        out
    }
}

/// A decoded, non-blank line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// `<command>,<duration>`
    Record(LineCommand),
    /// `END`
    End,
}

/// Incremental line decoder
///
/// Feed bytes as they arrive from the transport. The parser never panics
/// and always resynchronizes on the next newline after an error.
#[derive(Debug, Clone, Default)]
pub struct LineParser {
    buffer: Vec<u8, MAX_LINE_LEN>,
    /// Current line overflowed, discard until newline
    overflowed: bool,
}

impl LineParser {
    /// Create a new line parser
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            overflowed: false,
        }
    }

    /// Reset the parser state, discarding any partial line
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }

    /// Check if a partial line is buffered
    pub fn is_idle(&self) -> bool {
        self.buffer.is_empty() && !self.overflowed
    }

    /// Feed a single byte to the parser
    ///
    /// Returns `Ok(Some(line))` when a newline completes a non-blank line,
    /// `Ok(None)` when more bytes are needed or the line was blank, or
    /// `Err` when the completed line is malformed.
    pub fn feed(&mut self, byte: u8) -> Result<Option<Line>, LineError> {
        if byte != b'\n' {
            if !self.overflowed && self.buffer.push(byte).is_err() {
                self.overflowed = true;
            }
            return Ok(None);
        }

        if self.overflowed {
            self.reset();
            return Err(LineError::TooLong);
        }

        let result = match str::from_utf8(&self.buffer) {
            Ok(text) => LineCommand::parse(text),
            Err(_) => Err(LineError::Encoding),
        };
        self.reset();
        result
    }

    /// Feed multiple bytes to the parser
    ///
    /// Returns the first complete line or error found, with the number of
    /// bytes consumed. Remaining bytes after it are not consumed.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> (usize, Result<Option<Line>, LineError>) {
        for (i, &byte) in bytes.iter().enumerate() {
            match self.feed(byte) {
                Ok(None) => {}
                other => return (i + 1, other),
            }
        }
        (bytes.len(), Ok(None))
    }
}
