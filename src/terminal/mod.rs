//! Terminal module: everything that touches the controlling terminal.
//!
//! This module contains:
//! - [`TerminalDevice`]: the device seam, with [`TtyDevice`] for `/dev/tty`
//! - [`FrameBuffer`]: one frame of control sequences, flushed in a single write
//! - [`TerminalSession`]: window placement, repaint, resize and teardown

pub mod device;
pub mod output;
pub mod session;

pub use device::{TerminalDevice, TtyDevice};
pub use output::FrameBuffer;
pub use session::{Geometry, RenderOptions, SessionState, TerminalSession};
