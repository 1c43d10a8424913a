//! Runtime: everything between the line source and the terminal window.
//!
//! A run is single-threaded. Signal handlers only raise flags in
//! [`Notifications`]; the [`Coordinator`] acts on them between lines.
//!
//! # Data flow
//!
//! ```text
//! ┌──────────────┐   lines    ┌──────────────┐   raw bytes   ┌──────────────┐
//! │ stdin / child│ ─────────▶ │ Coordinator  │ ────────────▶ │ OutputSinks  │
//! │ (LineSource) │            │              │               └──────────────┘
//! └──────────────┘            │              │   push        ┌──────────────┐
//!        ▲                    │              │ ────────────▶ │   LineRing   │
//!        │ EINTR              │              │               └──────────────┘
//! ┌──────────────┐  pending   │              │   repaint     ┌──────────────┐
//! │   signals    │ ─────────▶ │              │ ────────────▶ │   Session    │
//! └──────────────┘            └──────────────┘               └──────────────┘
//! ```

pub mod coordinator;
pub mod process;
pub mod signals;
pub mod sinks;
pub mod source;

pub use coordinator::{Coordinator, RunOutcome, EXIT_INTERRUPTED, EXIT_PIPE_CLOSED};
pub use process::{ChildProcess, ExecMode, ProcessBridge};
pub use signals::{Notifications, Pending};
pub use sinks::{OutputSinks, SinkMode, SinkSpec};
pub use source::LineSource;
