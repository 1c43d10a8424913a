//! Output files that receive every line verbatim.

use crate::error::warn_user;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// How an output file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SinkMode {
    /// Create or truncate (`-w`).
    #[default]
    Truncate,
    /// Create or append (`-a`).
    Append,
}

/// One requested output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    /// File to write.
    pub path: PathBuf,
    /// Truncate or append.
    pub mode: SinkMode,
}

impl SinkSpec {
    /// Spec for `-w path`.
    pub fn truncate(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: SinkMode::Truncate,
        }
    }

    /// Spec for `-a path`.
    pub fn append(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            mode: SinkMode::Append,
        }
    }

    fn open(&self) -> io::Result<File> {
        let mut options = OpenOptions::new();
        options.create(true);
        match self.mode {
            SinkMode::Truncate => options.write(true).truncate(true),
            SinkMode::Append => options.append(true),
        };
        options.open(&self.path)
    }
}

/// The set of output files for a run.
///
/// Slots keep their command-line index even after a file fails, so warnings
/// name the same file number throughout the run.
#[derive(Debug, Default)]
pub struct OutputSinks {
    sinks: Vec<Option<BufWriter<File>>>,
    flush_each_line: bool,
}

impl OutputSinks {
    /// Open every spec in order. A file that fails to open is reported and
    /// left out; the run continues without it.
    pub fn open(specs: &[SinkSpec], flush_each_line: bool) -> Self {
        let sinks = specs
            .iter()
            .map(|spec| match spec.open() {
                Ok(file) => Some(BufWriter::new(file)),
                Err(err) => {
                    warn_user(format_args!("cannot open '{}': {err}", spec.path.display()));
                    None
                }
            })
            .collect();
        Self {
            sinks,
            flush_each_line,
        }
    }

    /// Number of files still open.
    pub fn open_count(&self) -> usize {
        self.sinks.iter().filter(|sink| sink.is_some()).count()
    }

    /// Write one raw line to every open file.
    ///
    /// A failing file is closed and skipped from then on; the others are
    /// unaffected.
    pub fn write_line(&mut self, line: &[u8]) {
        let flush = self.flush_each_line;
        for (index, slot) in self.sinks.iter_mut().enumerate() {
            let Some(writer) = slot else { continue };
            let result = writer
                .write_all(line)
                .and_then(|()| if flush { writer.flush() } else { Ok(()) });
            if let Err(err) = result {
                warn_user(format_args!("write error on file {index}: {err}"));
                *slot = None;
            }
        }
    }

    /// Flush and close every file.
    pub fn close(&mut self) {
        for (index, slot) in self.sinks.iter_mut().enumerate() {
            if let Some(mut writer) = slot.take() {
                if let Err(err) = writer.flush() {
                    warn_user(format_args!("write error on file {index}: {err}"));
                }
            }
        }
    }
}

impl Drop for OutputSinks {
    fn drop(&mut self) {
        self.close();
    }
}
