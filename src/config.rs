//! Run configuration.

use crate::runtime::process::ExecMode;
use crate::runtime::sinks::SinkSpec;
use std::ffi::OsString;
use std::num::NonZeroUsize;

/// Window height used when none is given.
pub const DEFAULT_WINDOW_HEIGHT: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(height) => height,
    None => unreachable!(),
};

/// Whether escape sequences in lines are rendered and the gutter is dimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    /// Decide from the terminal and environment.
    #[default]
    Auto,
    /// Always on (`-c`).
    Always,
    /// Always off (`-C`).
    Never,
}

impl ColorMode {
    /// Resolve to on/off.
    ///
    /// `Auto` is on only with a controlling terminal, no `NO_COLOR`, and a
    /// `TERM` that is set and not `dumb`.
    pub fn resolve(self, tty_present: bool, no_color: bool, term: Option<&str>) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => tty_present && !no_color && term.is_some_and(|term| term != "dumb"),
        }
    }

    /// [`resolve`](Self::resolve) against the process environment.
    pub fn resolve_from_env(self, tty_present: bool) -> bool {
        let no_color = std::env::var_os("NO_COLOR").is_some();
        let term = std::env::var("TERM").ok();
        self.resolve(tty_present, no_color, term.as_deref())
    }
}

/// Everything a run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Rows in the live window.
    pub window_height: NonZeroUsize,
    /// Flush output files after every line.
    pub flush_each_line: bool,
    /// How the command is started.
    pub exec_mode: ExecMode,
    /// Draw the line-number gutter.
    pub line_numbers: bool,
    /// Color policy.
    pub color: ColorMode,
    /// Output files, in command-line order.
    pub outputs: Vec<SinkSpec>,
    /// Command to run; empty means read standard input.
    pub command: Vec<OsString>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_height: DEFAULT_WINDOW_HEIGHT,
            flush_each_line: false,
            exec_mode: ExecMode::default(),
            line_numbers: false,
            color: ColorMode::default(),
            outputs: Vec::new(),
            command: Vec::new(),
        }
    }
}

impl Config {
    /// Whether lines come from a spawned command rather than stdin.
    pub fn has_command(&self) -> bool {
        !self.command.is_empty()
    }
}
