//! The main loop: read a line, fan it out, redraw.

use super::process::ChildProcess;
use super::signals::Notifications;
use super::sinks::OutputSinks;
use super::source::LineSource;
use crate::buffer::ring::LineRing;
use crate::terminal::device::TerminalDevice;
use crate::terminal::session::TerminalSession;
use std::io::{Read, Write};

/// Exit code after an interrupt (128 + SIGINT).
pub const EXIT_INTERRUPTED: i32 = 130;

/// Exit code after a broken pipe (128 + SIGPIPE).
pub const EXIT_PIPE_CLOSED: i32 = 141;

/// Result of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Code the process should exit with.
    pub exit_code: i32,
}

/// Owns everything one run touches and drives it line by line.
///
/// With a session, each line redraws the window. Without one, lines are
/// copied to `passthrough` unchanged.
pub struct Coordinator<'n, D: TerminalDevice, W: Write> {
    // Declared first so an early drop stops the child before the window is
    // torn down.
    child: Option<ChildProcess>,
    session: Option<TerminalSession<D>>,
    ring: LineRing,
    sinks: OutputSinks,
    passthrough: W,
    notifications: &'n Notifications,
}

impl<'n, D: TerminalDevice, W: Write> Coordinator<'n, D, W> {
    /// Assemble a run. `session` is `None` when there is no terminal.
    pub fn new(
        ring: LineRing,
        session: Option<TerminalSession<D>>,
        sinks: OutputSinks,
        passthrough: W,
        notifications: &'n Notifications,
    ) -> Self {
        Self {
            child: None,
            session,
            ring,
            sinks,
            passthrough,
            notifications,
        }
    }

    /// Attach the child whose output is being read, so it is reaped at the
    /// end of the run.
    #[must_use]
    pub fn with_child(mut self, child: ChildProcess) -> Self {
        self.child = Some(child);
        self
    }

    /// Run until `source` is exhausted or an interrupt ends it, then reap the
    /// child, restore the terminal and work out the exit code.
    pub fn run<R: Read>(mut self, mut source: LineSource<R>) -> RunOutcome {
        if let Some(session) = &mut self.session {
            session.setup(&self.ring);
        }

        let mut line = Vec::with_capacity(256);
        loop {
            match source.next_line(&mut line, self.notifications) {
                Ok(true) => self.handle_line(&line),
                Ok(false) => break,
                Err(err) => {
                    tracing::warn!(%err, "read failed, ending input");
                    break;
                }
            }
        }

        let child_code = self.child.as_mut().map(|child| {
            if self.notifications.stop_requested() {
                child.terminate()
            } else {
                child.wait()
            }
        });

        if let Some(session) = &mut self.session {
            session.teardown();
        }
        if let Err(err) = self.passthrough.flush() {
            tracing::debug!(%err, "passthrough flush failed");
        }
        self.sinks.close();

        let exit_code = if self.notifications.interrupted() {
            EXIT_INTERRUPTED
        } else if self.notifications.pipe_closed() {
            EXIT_PIPE_CLOSED
        } else {
            child_code.unwrap_or(0)
        };
        tracing::debug!(exit_code, ?child_code, "run finished");
        RunOutcome { exit_code }
    }

    fn handle_line(&mut self, line: &[u8]) {
        if self.notifications.take_resize() {
            if let Some(session) = &mut self.session {
                session.resize(&self.ring);
            }
        }

        self.sinks.write_line(line);
        self.ring.push(line);

        match &mut self.session {
            Some(session) => {
                session.count_line();
                session.repaint(&self.ring);
            }
            None => {
                if let Err(err) = self.passthrough.write_all(line) {
                    tracing::debug!(%err, "passthrough write failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::process::{ExecMode, ProcessBridge};
    use crate::runtime::signals::Pending;
    use crate::runtime::sinks::SinkSpec;
    use crate::terminal::device::testing::ScriptedDevice;
    use crate::terminal::session::RenderOptions;
    use std::cell::RefCell;
    use std::ffi::OsString;
    use std::fs;
    use std::io;
    use std::rc::Rc;

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    fn screen_rows(frames: &[Vec<u8>], cols: u16, rows: u16) -> Vec<String> {
        let mut parser = vt100::Parser::new(rows, cols, 0);
        for frame in frames {
            parser.process(frame);
        }
        parser.screen().rows(0, cols).collect()
    }

    fn passthrough_run(input: &[u8], notifications: &Notifications) -> (Vec<u8>, RunOutcome) {
        let mut out = Vec::new();
        let outcome = Coordinator::<ScriptedDevice, _>::new(
            LineRing::new(3),
            None,
            OutputSinks::default(),
            &mut out,
            notifications,
        )
        .run(LineSource::new(input));
        (out, outcome)
    }

    fn command_run(script: &str, notifications: &Notifications) -> (Vec<u8>, RunOutcome) {
        let bridge = ProcessBridge::spawn(&[OsString::from(script)], ExecMode::Shell).unwrap();
        let mut out = Vec::new();
        let outcome = Coordinator::<ScriptedDevice, _>::new(
            LineRing::new(3),
            None,
            OutputSinks::default(),
            &mut out,
            notifications,
        )
        .with_child(bridge.child)
        .run(LineSource::new(bridge.output));
        (out, outcome)
    }

    #[test]
    fn test_window_shows_newest_lines() {
        let device = ScriptedDevice::new(20, 10);
        let log = device.log();
        let session = TerminalSession::new(device, 3, RenderOptions::default());
        let notifications = Notifications::new();

        let outcome = Coordinator::new(
            LineRing::new(3),
            Some(session),
            OutputSinks::default(),
            Vec::new(),
            &notifications,
        )
        .run(LineSource::new(&b"a\nb\nc\nd\n"[..]));
        assert_eq!(outcome.exit_code, 0);

        let log = log.borrow();
        // setup, four repaints, teardown
        assert_eq!(log.frames.len(), 6);
        let last_repaint = &log.frames[4];
        assert_eq!(count(last_repaint, b"\x1b[2K"), 3);

        let screen = screen_rows(&log.frames[..5], 20, 10);
        assert_eq!(screen[7].trim_end(), "b");
        assert_eq!(screen[8].trim_end(), "c");
        assert_eq!(screen[9].trim_end(), "d");
    }

    #[test]
    fn test_passthrough_without_terminal() {
        let input = b"plain\n\x1b[31mred\x1b[0m\nlast";
        let (out, outcome) = passthrough_run(input, &Notifications::new());
        assert_eq!(out, input);
        assert_eq!(outcome.exit_code, 0);
    }

    #[test]
    fn test_passthrough_emits_no_escapes() {
        let (out, _) = passthrough_run(b"one\ntwo\nthree\nfour\n", &Notifications::new());
        assert!(!out.contains(&0x1b));
    }

    #[test]
    fn test_sinks_receive_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.log");
        let notifications = Notifications::new();
        let device = ScriptedDevice::new(40, 12);
        let session = TerminalSession::new(device, 2, RenderOptions::default());

        Coordinator::new(
            LineRing::new(2),
            Some(session),
            OutputSinks::open(&[SinkSpec::truncate(&path)], false),
            Vec::new(),
            &notifications,
        )
        .run(LineSource::new(&b"1\n2\n3\n4\n5\n"[..]));

        assert_eq!(fs::read(&path).unwrap(), b"1\n2\n3\n4\n5\n");
    }

    /// Shrinks the scripted terminal and raises a resize just before the
    /// first read, as SIGWINCH would mid-run.
    struct ResizingReader<'a> {
        size: Rc<RefCell<(u16, u16)>>,
        notifications: &'a Notifications,
        input: &'a [u8],
        resized: bool,
    }

    impl Read for ResizingReader<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.resized {
                self.resized = true;
                *self.size.borrow_mut() = (30, 4);
                self.notifications.raise(Pending::RESIZE);
            }
            self.input.read(buf)
        }
    }

    #[test]
    fn test_pending_resize_applied_before_line() {
        let device = ScriptedDevice::new(30, 20);
        let log = device.log();
        let size = device.size_handle();
        let session = TerminalSession::new(device, 5, RenderOptions::default());
        let notifications = Notifications::new();
        let reader = ResizingReader {
            size,
            notifications: &notifications,
            input: b"x\n",
            resized: false,
        };

        Coordinator::new(
            LineRing::new(5),
            Some(session),
            OutputSinks::default(),
            Vec::new(),
            &notifications,
        )
        .run(LineSource::new(reader));

        assert!(!notifications.take_resize());
        let log = log.borrow();
        // setup, resize, repaint, teardown
        assert_eq!(log.frames.len(), 4);
        assert_eq!(count(&log.frames[0], b"\x1b[1;15r"), 1);
        let resize = &log.frames[1];
        assert_eq!(count(resize, b"\x1b[2K"), 3);
        assert_eq!(count(resize, b"\x1b[r"), 1);

        let screen = screen_rows(&log.frames[..3], 30, 4);
        assert_eq!(screen[1].trim_end(), "x");
    }

    #[test]
    fn test_child_output_and_exit_code() {
        let (out, outcome) = command_run("echo hi; echo there >&2; exit 2", &Notifications::new());
        assert_eq!(outcome.exit_code, 2);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("hi\n"));
        assert!(text.contains("there\n"));
    }

    #[test]
    fn test_child_killed_by_signal() {
        let (_, outcome) = command_run("kill -9 $$", &Notifications::new());
        assert_eq!(outcome.exit_code, 137);
    }

    #[test]
    fn test_child_exec_failure() {
        let bridge = ProcessBridge::spawn(
            &[OsString::from("/nonexistent/sash-test-program")],
            ExecMode::Direct,
        )
        .unwrap();
        let notifications = Notifications::new();
        let outcome = Coordinator::<ScriptedDevice, _>::new(
            LineRing::new(1),
            None,
            OutputSinks::default(),
            Vec::new(),
            &notifications,
        )
        .with_child(bridge.child)
        .run(LineSource::new(bridge.output));
        assert_eq!(outcome.exit_code, 127);
    }

    #[test]
    fn test_interrupt_overrides_child_code() {
        let notifications = Notifications::new();
        notifications.raise(Pending::INTERRUPT | Pending::PIPE_CLOSED);
        let (_, outcome) = command_run("exit 2", &notifications);
        assert_eq!(outcome.exit_code, EXIT_INTERRUPTED);
    }

    #[test]
    fn test_broken_pipe_overrides_child_code() {
        let notifications = Notifications::new();
        notifications.raise(Pending::PIPE_CLOSED);
        let (_, outcome) = passthrough_run(b"a\n", &notifications);
        assert_eq!(outcome.exit_code, EXIT_PIPE_CLOSED);
    }

    #[test]
    fn test_terminal_restored_at_end() {
        let device = ScriptedDevice::new(20, 10);
        let log = device.log();
        let session = TerminalSession::new(device, 3, RenderOptions::default());
        let notifications = Notifications::new();

        Coordinator::new(
            LineRing::new(3),
            Some(session),
            OutputSinks::default(),
            Vec::new(),
            &notifications,
        )
        .run(LineSource::new(&b""[..]));

        let log = log.borrow();
        let last = log.frames.last().unwrap();
        assert!(last.starts_with(b"\x1b[r"));
        assert!(last.ends_with(b"\x1b[?25h"));
    }
}
