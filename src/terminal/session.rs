//! Terminal session: owns window geometry and renders the live tail window.
//!
//! The window is a fixed block of rows at or near the bottom of the screen.
//! Everything above it is a scroll region (DECSTBM), so output from other
//! writers of the same terminal scrolls there and never into the window.
//! Every setup, repaint, resize and teardown is built in one [`FrameBuffer`]
//! and emitted with a single write.

use crate::buffer::ring::LineRing;
use crate::buffer::sanitize::SanitizeMode;
use crate::terminal::device::TerminalDevice;
use crate::terminal::output::FrameBuffer;

/// Columns taken by the line-number gutter up to line 99999: five digits
/// plus `│`. Larger numbers widen it.
pub const GUTTER_WIDTH: u16 = 6;

const GUTTER_MIN_DIGITS: usize = 5;
const GUTTER_SEPARATOR: &str = "\u{2502}";

/// Geometry assumed until the device reports its own.
const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

/// Lifecycle of a [`TerminalSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing polled or drawn yet.
    Uninitialized,
    /// Geometry computed, window not drawn yet.
    Configured,
    /// Window drawn; cursor hidden; scroll region in effect.
    Active,
    /// Terminal restored; nothing more is drawn.
    TornDown,
}

/// How rows are decorated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Draw a right-aligned line number gutter.
    pub line_numbers: bool,
    /// Dim the gutter and pass escape sequences in lines through.
    pub color: bool,
}

/// Where the window sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Terminal width.
    pub cols: u16,
    /// Terminal height.
    pub rows: u16,
    /// Rows actually drawn: `min(configured, rows - 1)`, at least 1.
    pub height: u16,
    /// First row of the window (1-indexed).
    pub window_top: u16,
    /// Last row of the scroll region above the window; 0 means none.
    pub scroll_bottom: u16,
}

impl Geometry {
    /// Geometry for a window of `configured` rows pinned to the bottom of a
    /// `cols` x `rows` terminal.
    pub fn bottom(cols: u16, rows: u16, configured: usize) -> Self {
        let height = effective_height(configured, rows);
        let window_top = rows.saturating_sub(height) + 1;
        Self {
            cols,
            rows,
            height,
            window_top,
            scroll_bottom: window_top - 1,
        }
    }

    /// Geometry for a window starting at `cursor_row`, if it fits below it.
    pub fn at_cursor(cols: u16, rows: u16, configured: usize, cursor_row: u16) -> Option<Self> {
        let height = effective_height(configured, rows);
        let fits =
            cursor_row > 0 && u32::from(cursor_row) + u32::from(height) - 1 <= u32::from(rows);
        fits.then_some(Self {
            cols,
            rows,
            height,
            window_top: cursor_row,
            scroll_bottom: cursor_row - 1,
        })
    }

    /// Row just below the window, clamped to the screen.
    pub fn row_after(&self) -> u16 {
        self.window_top.saturating_add(self.height).min(self.rows)
    }

    /// Columns left for line content beside a gutter of `gutter_width`.
    pub fn content_cols(&self, gutter_width: usize) -> usize {
        usize::from(self.cols).saturating_sub(gutter_width).max(1)
    }

    /// Whether a scroll region can be set (DECSTBM needs top < bottom).
    pub const fn has_scroll_region(&self) -> bool {
        self.scroll_bottom >= 2
    }
}

/// Window height actually used on a terminal with `rows` rows.
pub fn effective_height(configured: usize, rows: u16) -> u16 {
    let limit = usize::from(rows.saturating_sub(1));
    u16::try_from(configured.min(limit).max(1)).unwrap_or(1)
}

/// Digits needed to show line numbers up to `largest`, at least five.
fn gutter_digits(largest: u64) -> usize {
    let mut digits = 1;
    let mut rest = largest / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits.max(GUTTER_MIN_DIGITS)
}

/// The live tail window on a terminal device.
///
/// Dropping an active session tears it down, so the terminal is restored on
/// every exit path that unwinds.
pub struct TerminalSession<D: TerminalDevice> {
    device: D,
    frame: FrameBuffer,
    configured_height: usize,
    geometry: Geometry,
    options: RenderOptions,
    total_lines: u64,
    state: SessionState,
}

impl<D: TerminalDevice> TerminalSession<D> {
    /// Create a session for a window of `configured_height` rows.
    pub fn new(device: D, configured_height: usize, options: RenderOptions) -> Self {
        Self {
            device,
            frame: FrameBuffer::new(),
            configured_height: configured_height.max(1),
            geometry: Geometry::bottom(DEFAULT_COLS, DEFAULT_ROWS, configured_height),
            options,
            total_lines: 0,
            state: SessionState::Uninitialized,
        }
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Current window geometry.
    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Count one more input line for the line-number gutter.
    pub fn count_line(&mut self) {
        self.total_lines += 1;
    }

    /// Re-read the terminal size, keeping the previous value for any
    /// dimension the device reports as zero.
    fn poll_size(&self) -> (u16, u16) {
        let (mut cols, mut rows) = (self.geometry.cols, self.geometry.rows);
        if let Some((c, r)) = self.device.size() {
            if c > 0 {
                cols = c;
            }
            if r > 0 {
                rows = r;
            }
        }
        (cols, rows)
    }

    /// Poll the terminal and place the window, without drawing.
    fn configure(&mut self) -> u16 {
        let (cols, rows) = self.poll_size();
        let placed = self
            .device
            .query_cursor_row()
            .and_then(|row| Geometry::at_cursor(cols, rows, self.configured_height, row));

        // Below the cursor if it fits; otherwise at the bottom, scrolling
        // existing content up to make room.
        let (geometry, newlines) = placed.map_or_else(
            || {
                let geometry = Geometry::bottom(cols, rows, self.configured_height);
                (geometry, geometry.height - 1)
            },
            |geometry| (geometry, 0),
        );

        self.geometry = geometry;
        self.state = SessionState::Configured;
        tracing::debug!(?geometry, newlines, "window configured");
        newlines
    }

    /// Draw the window for the first time.
    ///
    /// Hides the cursor (for the rest of the run), reserves the window rows,
    /// confines scrolling to the rows above them and renders `ring`.
    /// Does nothing unless the session is uninitialized.
    pub fn setup(&mut self, ring: &LineRing) {
        if self.state != SessionState::Uninitialized {
            return;
        }
        let newlines = self.configure();

        self.frame.reset();
        for _ in 0..newlines {
            self.frame.append(b"\n");
        }
        self.frame.cursor_hide();
        if self.geometry.has_scroll_region() {
            self.frame.set_scroll_region(1, self.geometry.scroll_bottom);
        }
        self.build_window(ring);
        self.frame.flush_to(&mut self.device);

        self.state = SessionState::Active;
    }

    /// Redraw every window row from `ring`.
    pub fn repaint(&mut self, ring: &LineRing) {
        if self.state != SessionState::Active {
            return;
        }
        self.frame.reset();
        self.build_window(ring);
        self.frame.flush_to(&mut self.device);
    }

    /// React to a terminal size change.
    ///
    /// The window moves to the bottom of the resized screen and is redrawn
    /// immediately. Before setup (or after teardown) this is a no-op.
    pub fn resize(&mut self, ring: &LineRing) {
        if self.state != SessionState::Active {
            return;
        }
        let (cols, rows) = self.poll_size();
        self.geometry = Geometry::bottom(cols, rows, self.configured_height);
        tracing::debug!(geometry = ?self.geometry, "window resized");

        self.frame.reset();
        if self.geometry.has_scroll_region() {
            self.frame.set_scroll_region(1, self.geometry.scroll_bottom);
        } else {
            self.frame.reset_scroll_region();
        }
        self.build_window(ring);
        self.frame.flush_to(&mut self.device);
    }

    /// Restore the terminal: full-screen scrolling, cursor below the window
    /// and visible again.
    ///
    /// Runs at most once; errors are ignored. A session that never drew its
    /// window emits nothing.
    pub fn teardown(&mut self) {
        if self.state == SessionState::TornDown {
            return;
        }
        let was_active = self.state == SessionState::Active;
        self.state = SessionState::TornDown;
        if !was_active {
            return;
        }

        self.frame.reset();
        self.frame.reset_scroll_region();
        self.frame.move_to_row(self.geometry.row_after());
        self.frame.append(b"\n");
        self.frame.cursor_show();
        self.frame.flush_to(&mut self.device);
        tracing::debug!("window torn down");
    }

    /// Append the window rows to the frame, then park the cursor in the
    /// scroll region so concurrent output lands above the window.
    fn build_window(&mut self, ring: &LineRing) {
        let Geometry {
            height,
            window_top,
            scroll_bottom,
            ..
        } = self.geometry;
        let height = usize::from(height);
        let mode = SanitizeMode::for_color(self.options.color);

        let visible = ring.len().min(height);
        let base = self.total_lines.saturating_sub(visible as u64) + 1;
        // Sized for the largest number on screen so a row never wraps.
        let digits = gutter_digits(base + visible as u64 - 1);
        let gutter_cols = if self.options.line_numbers { digits + 1 } else { 0 };
        let content_cols = self.geometry.content_cols(gutter_cols);

        let mut lines = ring.tail(height);
        self.frame.move_to_row(window_top);
        for row in 0..height {
            self.frame.clear_line();

            let line = match lines.next() {
                Some(line) => {
                    self.gutter(Some(base + row as u64), digits);
                    line
                }
                None => {
                    self.gutter(None, digits);
                    &[][..]
                }
            };
            self.frame.sanitized_line(line, content_cols, mode);

            if row + 1 < height {
                self.frame.append(b"\n");
            }
        }

        if scroll_bottom > 0 {
            self.frame.move_to_row(scroll_bottom);
        }
    }

    fn gutter(&mut self, number: Option<u64>, digits: usize) {
        if !self.options.line_numbers {
            return;
        }
        if self.options.color {
            self.frame.dim();
        }
        match number {
            Some(n) => self.frame.append_fmt(format_args!("{n:>digits$}{GUTTER_SEPARATOR}")),
            None => self.frame.append_fmt(format_args!("{:digits$}{GUTTER_SEPARATOR}", "")),
        }
        if self.options.color {
            self.frame.reset_attrs();
        }
    }
}

impl<D: TerminalDevice> Drop for TerminalSession<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
