//! # Sash
//!
//! `tee` with a live tail window.
//!
//! Sash copies a line stream (standard input, or the merged output of a
//! command it runs) to any number of files, and meanwhile shows the last N
//! lines in a fixed window at the bottom of the terminal. Output printed
//! above the window is left alone.
//!
//! ## Core Concepts
//!
//! - **Line ring**: only the last N lines are kept
//! - **Scroll region**: the rows above the window scroll on their own, so
//!   other writers of the terminal never draw into it
//! - **One write per frame**: every repaint is built in memory and emitted
//!   with a single write
//! - **Flags, not work, in signal handlers**: resize and interrupt are acted
//!   on between lines by the main loop
//!
//! ## Example
//!
//! ```rust,ignore
//! use sash::{Coordinator, LineRing, LineSource, Notifications, OutputSinks};
//! use sash::terminal::TtyDevice;
//!
//! let notifications = Notifications::new();
//! let outcome = Coordinator::<TtyDevice, _>::new(
//!     LineRing::new(10),
//!     None,
//!     OutputSinks::default(),
//!     std::io::stdout(),
//!     &notifications,
//! )
//! .run(LineSource::new(&b"hello\n"[..]));
//! assert_eq!(outcome.exit_code, 0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod buffer;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod terminal;

// Re-exports for convenience
pub use buffer::{sanitize, LineRing, SanitizeMode};
pub use config::{ColorMode, Config};
pub use error::{Result, SashError};
pub use runtime::{
    Coordinator, ExecMode, LineSource, Notifications, OutputSinks, ProcessBridge, RunOutcome,
    SinkMode, SinkSpec,
};
pub use terminal::{FrameBuffer, RenderOptions, TerminalDevice, TerminalSession, TtyDevice};
