//! `FrameBuffer`: Single-write buffer for one terminal frame.

use crate::buffer::sanitize::{sanitize_into, SanitizeMode, SGR_RESET};
use crate::terminal::device::TerminalDevice;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::terminal::{Clear, ClearType};
use crossterm::Command;
use std::fmt;

/// Growable buffer for building a frame of control sequences and text.
///
/// A frame is accumulated here, then flushed to the terminal device in a
/// single `write()` so it cannot interleave with another writer of the
/// same terminal.
pub struct FrameBuffer {
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Create a new frame buffer with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Create a buffer sized for a typical window (4KB).
    pub fn new() -> Self {
        Self::with_capacity(4096)
    }

    /// Start a new frame, keeping the allocation.
    #[inline]
    pub fn reset(&mut self) {
        self.data.clear();
    }

    /// Get the buffer contents.
    #[cfg(test)]
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Check if buffer is empty.
    #[cfg(test)]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current allocation size.
    #[cfg(test)]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Make room for `additional` bytes.
    ///
    /// On overflow the new capacity is `2 * (len + additional)`.
    fn ensure(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        if needed > self.data.capacity() {
            self.data.reserve_exact(needed * 2 - self.data.len());
        }
    }

    /// Append raw bytes.
    #[inline]
    pub fn append(&mut self, bytes: &[u8]) {
        self.ensure(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    /// Append formatted text.
    pub fn append_fmt(&mut self, args: fmt::Arguments<'_>) {
        // Writing into memory cannot fail.
        let _ = fmt::Write::write_fmt(self, args);
    }

    /// Append the ANSI form of a crossterm command.
    pub fn command(&mut self, command: impl Command) {
        let _ = command.write_ansi(self);
    }

    /// Move cursor to the start of `row` (1-indexed).
    #[inline]
    pub fn move_to_row(&mut self, row: u16) {
        self.command(MoveTo(0, row.saturating_sub(1)));
    }

    /// Carriage return, then clear the whole line.
    #[inline]
    pub fn clear_line(&mut self) {
        self.append(b"\r");
        self.command(Clear(ClearType::CurrentLine));
    }

    /// Hide cursor.
    #[inline]
    pub fn cursor_hide(&mut self) {
        self.command(Hide);
    }

    /// Show cursor.
    #[inline]
    pub fn cursor_show(&mut self) {
        self.command(Show);
    }

    /// Confine scrolling to rows `top..=bottom` (DECSTBM).
    #[inline]
    pub fn set_scroll_region(&mut self, top: u16, bottom: u16) {
        self.append_fmt(format_args!("\x1b[{top};{bottom}r"));
    }

    /// Restore full-screen scrolling.
    #[inline]
    pub fn reset_scroll_region(&mut self) {
        self.append(b"\x1b[r");
    }

    /// Dim foreground used for the line-number gutter.
    #[inline]
    pub fn dim(&mut self) {
        self.append(b"\x1b[90m");
    }

    /// Reset all attributes.
    #[inline]
    pub fn reset_attrs(&mut self) {
        self.append(SGR_RESET);
    }

    /// Append a sanitized line of at most `max_columns` visible columns.
    ///
    /// Returns the visible column count.
    pub fn sanitized_line(&mut self, raw: &[u8], max_columns: usize, mode: SanitizeMode) -> usize {
        // Escape bytes are copied as-is; visible output never exceeds max_columns.
        self.ensure(raw.len() + max_columns + SGR_RESET.len());
        sanitize_into(&mut self.data, raw, max_columns, mode)
    }

    /// Emit the frame with exactly one write to `device`, then reset.
    ///
    /// A short or failed write is not retried: a torn frame is preferable
    /// to a second write that another writer could slip in front of.
    /// Returns the number of bytes the device accepted.
    pub fn flush_to<D: TerminalDevice + ?Sized>(&mut self, device: &mut D) -> usize {
        if self.data.is_empty() {
            return 0;
        }
        let written = match device.write_frame(&self.data) {
            Ok(n) => {
                if n < self.data.len() {
                    tracing::debug!(written = n, len = self.data.len(), "torn frame");
                }
                n
            }
            Err(err) => {
                tracing::debug!(%err, len = self.data.len(), "frame dropped");
                0
            }
        };
        self.data.clear();
        written
    }
}

impl fmt::Write for FrameBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.append(s.as_bytes());
        Ok(())
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("len", &self.data.len())
            .field("capacity", &self.data.capacity())
            .finish()
    }
}
