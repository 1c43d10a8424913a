//! Terminal device: the controlling terminal as a frame sink.
//!
//! The session never assumes exclusive access to the device. It only needs
//! three things from it: the current geometry, an optional cursor-row probe,
//! and a way to emit one frame with one write.

use nix::sys::termios::{tcgetattr, tcsetattr, LocalFlags, SetArg, SpecialCharacterIndices};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

/// Path of the controlling terminal.
pub const CONTROLLING_TTY: &str = "/dev/tty";

/// Device status report query: "report cursor position".
pub const DSR_QUERY: &[u8] = b"\x1b[6n";

/// Upper bound on the DSR reply we are willing to read.
const DSR_REPLY_MAX: usize = 32;

/// Abstraction over the terminal the window is drawn on.
pub trait TerminalDevice {
    /// Current `(columns, rows)`, or `None` if the device cannot tell.
    fn size(&self) -> Option<(u16, u16)>;

    /// Ask the terminal for the cursor's current row (1-indexed).
    ///
    /// Returns `None` on timeout or a malformed reply.
    fn query_cursor_row(&mut self) -> Option<u16>;

    /// Write `frame` with exactly one write call.
    ///
    /// Returns how many bytes the device accepted; the caller does not retry.
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<usize>;
}

impl<D: TerminalDevice + ?Sized> TerminalDevice for Box<D> {
    fn size(&self) -> Option<(u16, u16)> {
        (**self).size()
    }

    fn query_cursor_row(&mut self) -> Option<u16> {
        (**self).query_cursor_row()
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<usize> {
        (**self).write_frame(frame)
    }
}

/// The process's controlling terminal, opened read/write.
#[derive(Debug)]
pub struct TtyDevice {
    tty: File,
}

impl TtyDevice {
    /// Open the controlling terminal.
    ///
    /// Fails when the process has no controlling terminal.
    pub fn open() -> io::Result<Self> {
        Self::open_path(CONTROLLING_TTY)
    }

    /// Open a specific terminal device.
    pub fn open_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let tty = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { tty })
    }

    /// Read the probe reply one byte at a time, stopping at `R`.
    fn read_reply(&self) -> Vec<u8> {
        let mut reply = Vec::with_capacity(DSR_REPLY_MAX);
        let mut byte = [0u8; 1];
        while reply.len() < DSR_REPLY_MAX - 1 {
            match (&self.tty).read(&mut byte) {
                Ok(1) => {
                    reply.push(byte[0]);
                    if byte[0] == b'R' {
                        break;
                    }
                }
                // Timeout (0 bytes), EINTR or a real error all end the probe.
                _ => break,
            }
        }
        reply
    }
}

impl TerminalDevice for TtyDevice {
    #[allow(unsafe_code)]
    fn size(&self) -> Option<(u16, u16)> {
        let mut ws = libc::winsize {
            ws_row: 0,
            ws_col: 0,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        // SAFETY: TIOCGWINSZ fills the winsize we pass; the fd is owned by self.
        let ret = unsafe { libc::ioctl(self.tty.as_raw_fd(), libc::TIOCGWINSZ, &mut ws) };
        (ret == 0).then_some((ws.ws_col, ws.ws_row))
    }

    fn query_cursor_row(&mut self) -> Option<u16> {
        let original = tcgetattr(&self.tty).ok()?;

        // Non-canonical, no echo, reads return after 100ms without input.
        let mut raw = original.clone();
        raw.local_flags.remove(LocalFlags::ICANON | LocalFlags::ECHO);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 1;
        tcsetattr(&self.tty, SetArg::TCSANOW, &raw).ok()?;

        let reply = match (&self.tty).write(DSR_QUERY) {
            Ok(_) => self.read_reply(),
            Err(_) => Vec::new(),
        };

        if let Err(err) = tcsetattr(&self.tty, SetArg::TCSANOW, &original) {
            tracing::warn!(%err, "failed to restore terminal mode after cursor probe");
        }

        let row = parse_cursor_row(&reply);
        tracing::debug!(reply = ?String::from_utf8_lossy(&reply), ?row, "cursor probe");
        row
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<usize> {
        (&self.tty).write(frame)
    }
}

/// Parse the row out of a cursor position report (`ESC [ row ; col R`).
///
/// Leading garbage before `[` is skipped. Returns `None` for a missing or
/// zero row.
pub fn parse_cursor_row(reply: &[u8]) -> Option<u16> {
    let start = reply.iter().position(|&b| b == b'[')? + 1;
    let digits = reply[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    let row: u16 = std::str::from_utf8(&reply[start..start + digits])
        .ok()?
        .parse()
        .ok()?;
    (row > 0).then_some(row)
}
