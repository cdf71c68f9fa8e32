//! Small string and console helpers

use heapless::{String, Vec};

/// Copy `text`, replacing every character except the first and last `keep` with `*`
///
/// Text of `2 * keep` characters or fewer is returned unchanged. Output
/// beyond the capacity `N` is dropped.
pub fn mask<const N: usize>(text: &str, keep: usize) -> String<N> {
    let len = text.chars().count();
    let mut out = String::new();
    for (i, c) in text.chars().enumerate() {
        let shown = i < keep || i + keep >= len;
        if out.push(if shown { c } else { '*' }).is_err() {
            break;
        }
    }
    out
}

/// Line assembler for byte-at-a-time serial input
///
/// Stores the first `N` bytes of each line and silently discards the rest.
/// Carriage returns are ignored; a newline completes the line.
pub struct LineReader<const N: usize> {
    buf: Vec<u8, N>,
    truncated: bool,
    complete: bool,
}

impl<const N: usize> LineReader<N> {
    pub const fn new() -> Self {
        Self {
            buf: Vec::new(),
            truncated: false,
            complete: false,
        }
    }

    /// Feed one byte; returns the completed line on newline
    ///
    /// A completed line stays readable until the next byte is pushed.
    pub fn push(&mut self, byte: u8) -> Option<&str> {
        if self.complete {
            self.clear();
        }
        match byte {
            b'\r' => None,
            b'\n' => {
                self.complete = true;
                Some(valid_prefix(&self.buf))
            }
            _ => {
                if self.buf.push(byte).is_err() {
                    self.truncated = true;
                }
                None
            }
        }
    }

    /// True if the current line has lost bytes
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Bytes of the current line
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }

    /// Discard the current line
    pub fn clear(&mut self) {
        self.buf.clear();
        self.truncated = false;
        self.complete = false;
    }
}

/// Longest UTF-8 prefix of `bytes`; a character cut by truncation is dropped
fn valid_prefix(bytes: &[u8]) -> &str {
    match core::str::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => core::str::from_utf8(&bytes[..err.valid_up_to()]).unwrap_or(""),
    }
}

impl<const N: usize> Default for LineReader<N> {
    fn default() -> Self {
        Self::new()
    }
}
