//! Error type shared by the library.

use std::{fmt, io};

/// Errors that stop a run before or while it starts.
///
/// Everything that happens per line (a sink failing, a torn frame, a failed
/// cursor probe) is handled where it occurs and never surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum SashError {
    /// No command words were given to spawn.
    #[error("no command given")]
    EmptyCommand,

    /// The child process could not be created.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that was being started.
        program: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A signal handler could not be installed.
    #[error("failed to install {signal} handler: {source}")]
    Signal {
        /// Signal name.
        signal: &'static str,
        /// Underlying OS error.
        #[source]
        source: nix::Error,
    },

    /// Any other I/O failure, with what was being attempted.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl SashError {
    /// Wrap an I/O error with a short description of the failed step.
    pub const fn io(context: &'static str, source: io::Error) -> Self {
        Self::Io { context, source }
    }
}

/// Result alias for library operations.
pub type Result<T, E = SashError> = std::result::Result<T, E>;

/// Print a non-fatal warning on standard error, prefixed with the tool name.
///
/// Warnings never go to the terminal window itself.
pub fn warn_user(message: fmt::Arguments<'_>) {
    tracing::warn!("{message}");
    eprintln!("sash: {message}");
}
