//! Process bridge: run a command with stdout and stderr merged into one pipe.

use crate::error::{warn_user, Result, SashError};
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::io::{self, ErrorKind, PipeReader};
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command, ExitStatus, Stdio};

/// Interpreter used for [`ExecMode::Shell`].
pub const SHELL: &str = "/bin/sh";

/// Status reported when the target program could not be executed.
pub const EXEC_FAILED_STATUS: i32 = 127;

/// How the command words are turned into a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecMode {
    /// Join the words with spaces and hand them to `/bin/sh -c`.
    #[default]
    Shell,
    /// Execute the first word directly with the rest as arguments.
    Direct,
}

/// A spawned command and the read end of its output pipe.
#[derive(Debug)]
pub struct ProcessBridge {
    /// Handle for reaping or terminating the child.
    pub child: ChildProcess,
    /// Combined stdout and stderr of the child.
    pub output: PipeReader,
}

impl ProcessBridge {
    /// Spawn `command` with both output streams redirected into one pipe.
    ///
    /// If the target cannot be executed the bridge still succeeds: the
    /// failure is reported on stderr, the output stream is empty and the
    /// child reports status 127. Any other spawn failure is an error.
    pub fn spawn(command: &[OsString], mode: ExecMode) -> Result<Self> {
        let (program, args) = command.split_first().ok_or(SashError::EmptyCommand)?;
        let (output, writer) = io::pipe().map_err(|e| SashError::io("create pipe", e))?;

        let mut cmd = match mode {
            ExecMode::Shell => {
                let mut cmd = Command::new(SHELL);
                cmd.arg("-c").arg(join_words(command));
                cmd
            }
            ExecMode::Direct => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        };
        let stderr = writer
            .try_clone()
            .map_err(|e| SashError::io("duplicate pipe", e))?;
        cmd.stdout(Stdio::from(writer)).stderr(Stdio::from(stderr));

        let spawned = cmd.spawn();
        // The parent's copies of the write end must close so EOF arrives.
        drop(cmd);

        let child = match spawned {
            Ok(child) => {
                tracing::debug!(pid = child.id(), ?mode, "spawned child");
                ChildProcess::running(child)
            }
            // Only a failure to create the process at all is fatal.
            Err(source) if is_fork_failure(&source) => {
                return Err(SashError::Spawn {
                    program: program.to_string_lossy().into_owned(),
                    source,
                })
            }
            Err(err) => {
                warn_user(format_args!("exec: {err}"));
                ChildProcess::exec_failed()
            }
        };

        Ok(Self { child, output })
    }
}

/// EAGAIN and ENOMEM come from process creation, not from executing the
/// target.
fn is_fork_failure(err: &io::Error) -> bool {
    matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::OutOfMemory)
        || matches!(err.raw_os_error(), Some(libc::EAGAIN | libc::ENOMEM))
}

fn join_words(words: &[OsString]) -> OsString {
    let mut joined = OsString::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            joined.push(" ");
        }
        joined.push(word);
    }
    joined
}

#[derive(Debug)]
enum ChildState {
    Running(Child),
    Finished(i32),
}

/// A child process that is reaped at most once.
///
/// Dropping a handle whose child is still running terminates it.
#[derive(Debug)]
pub struct ChildProcess {
    state: ChildState,
}

impl ChildProcess {
    fn running(child: Child) -> Self {
        Self {
            state: ChildState::Running(child),
        }
    }

    fn exec_failed() -> Self {
        Self {
            state: ChildState::Finished(EXEC_FAILED_STATUS),
        }
    }

    /// OS process id while the child has not been reaped.
    pub fn id(&self) -> Option<u32> {
        match &self.state {
            ChildState::Running(child) => Some(child.id()),
            ChildState::Finished(_) => None,
        }
    }

    /// Block until the child exits and return its mapped exit code.
    pub fn wait(&mut self) -> i32 {
        let code = match &mut self.state {
            ChildState::Finished(code) => return *code,
            ChildState::Running(child) => match child.wait() {
                Ok(status) => exit_code_from_status(status),
                Err(err) => {
                    tracing::warn!(%err, "failed to wait for child");
                    1
                }
            },
        };
        tracing::debug!(code, "child reaped");
        self.state = ChildState::Finished(code);
        code
    }

    /// Send SIGTERM if the child is still running, then reap it.
    pub fn terminate(&mut self) -> i32 {
        if let ChildState::Running(child) = &mut self.state {
            if matches!(child.try_wait(), Ok(None)) {
                if let Ok(pid) = i32::try_from(child.id()) {
                    if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
                        tracing::debug!(%err, pid, "SIGTERM failed");
                    }
                }
            }
        }
        self.wait()
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if matches!(self.state, ChildState::Running(_)) {
            self.terminate();
        }
    }
}

/// Map a wait status to a shell-style exit code: the exit code itself, or
/// `128 + signal` for a child killed by a signal.
pub fn exit_code_from_status(status: ExitStatus) -> i32 {
    match (status.code(), status.signal()) {
        (Some(code), _) => code,
        (None, Some(signal)) => 128 + signal,
        (None, None) => 1,
    }
}
