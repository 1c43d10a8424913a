//! Diagnostic logging.
//!
//! Nothing is installed unless `SASH_LOG` is set, so log lines never land on
//! the terminal the window is drawn on by accident. Point `SASH_LOG_FILE` at a
//! file to keep them off the terminal entirely.

use std::fs::File;
use std::io;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter directives, in `RUST_LOG` syntax.
pub const LOG_ENV: &str = "SASH_LOG";

/// Log destination; standard error when unset.
pub const LOG_FILE_ENV: &str = "SASH_LOG_FILE";

/// Install the global subscriber if `SASH_LOG` is set.
///
/// Returns whether a subscriber was installed.
pub fn init_from_env() -> io::Result<bool> {
    let Some(directives) = std::env::var_os(LOG_ENV) else {
        return Ok(false);
    };
    let filter = parse_filter(&directives.to_string_lossy());

    let (writer, ansi) = match std::env::var_os(LOG_FILE_ENV) {
        Some(path) => (BoxMakeWriter::new(Arc::new(File::create(path)?)), false),
        None => (BoxMakeWriter::new(io::stderr), true),
    };

    build_subscriber(filter, writer, ansi)
        .try_init()
        .map_err(io::Error::other)?;
    tracing::debug!("logging initialized");
    Ok(true)
}

/// Parse filter directives, skipping invalid ones. Defaults to `warn`.
pub fn parse_filter(directives: &str) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}

/// The subscriber used by the binary: one fmt layer behind an env filter.
pub fn build_subscriber(
    filter: EnvFilter,
    writer: BoxMakeWriter,
    ansi: bool,
) -> impl tracing::Subscriber + Send + Sync {
    let fmt_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true);

    tracing_subscriber::registry().with(fmt_layer).with(filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::NamedTempFile;

    fn capture(directives: &str, emit: impl FnOnce()) -> String {
        let log_file = NamedTempFile::new().unwrap();
        let writer = BoxMakeWriter::new(Arc::new(log_file.reopen().unwrap()));
        let subscriber = build_subscriber(parse_filter(directives), writer, false);
        tracing::subscriber::with_default(subscriber, emit);
        fs::read_to_string(log_file.path()).unwrap()
    }

    #[test]
    fn test_filter_levels() {
        let logged = capture("sash=debug", || {
            tracing::debug!(target: "sash::terminal", "window configured");
            tracing::trace!(target: "sash::terminal", "too fine");
        });
        assert!(logged.contains("window configured"));
        assert!(!logged.contains("too fine"));
    }

    #[test]
    fn test_default_is_warn() {
        let logged = capture("", || {
            tracing::info!("quiet");
            tracing::warn!("loud");
        });
        assert!(!logged.contains("quiet"));
        assert!(logged.contains("loud"));
    }
}
