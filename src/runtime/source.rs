//! Line source: newline-delimited reads that an interrupt can cut short.
//!
//! Buffered readers from `std` retry `EINTR` internally, which would keep
//! the loop blocked after Ctrl-C. This reader sees every `Interrupted`
//! error itself and gives up when an interrupt or broken pipe is pending.

use super::signals::Notifications;
use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::os::fd::AsFd;

const READ_CHUNK: usize = 8192;

/// Reads `\n`-terminated lines from any byte stream.
pub struct LineSource<R> {
    reader: R,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    eof: bool,
}

impl LineSource<File> {
    /// Read from this process's standard input.
    pub fn stdin() -> io::Result<Self> {
        let fd = io::stdin().as_fd().try_clone_to_owned()?;
        Ok(Self::new(File::from(fd)))
    }
}

impl<R: Read> LineSource<R> {
    /// Wrap a reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: vec![0; READ_CHUNK].into_boxed_slice(),
            start: 0,
            end: 0,
            eof: false,
        }
    }

    /// Read the next line into `line` (cleared first), terminator included.
    ///
    /// Returns `Ok(false)` at end of stream. A final line without `\n` is
    /// still returned. An interrupted read while `notifications` has an
    /// interrupt or broken pipe pending ends the stream.
    pub fn next_line(
        &mut self,
        line: &mut Vec<u8>,
        notifications: &Notifications,
    ) -> io::Result<bool> {
        line.clear();
        loop {
            let pending = &self.buf[self.start..self.end];
            if let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                line.extend_from_slice(&pending[..=pos]);
                self.start += pos + 1;
                return Ok(true);
            }
            line.extend_from_slice(pending);
            self.start = 0;
            self.end = 0;

            if self.eof {
                return Ok(!line.is_empty());
            }

            match self.reader.read(&mut self.buf) {
                Ok(0) => self.eof = true,
                Ok(n) => self.end = n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {
                    if notifications.stop_requested() {
                        tracing::debug!("read interrupted, ending input");
                        self.eof = true;
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
