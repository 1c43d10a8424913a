//! Pending notifications raised by signal handlers.
//!
//! Handlers do nothing but set a bit. All real work (resizing, choosing the
//! exit code) happens on the main loop, so the ring and frame buffer only
//! ever have one writer.

use crate::error::{Result, SashError};
use bitflags::bitflags;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::atomic::{AtomicU8, Ordering};

bitflags! {
    /// Notifications waiting to be acted on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Pending: u8 {
        /// The terminal was resized (SIGWINCH).
        const RESIZE = 1 << 0;
        /// The user interrupted the run (SIGINT).
        const INTERRUPT = 1 << 1;
        /// A write hit a closed pipe (SIGPIPE).
        const PIPE_CLOSED = 1 << 2;
    }
}

/// Lock-free set of [`Pending`] flags.
#[derive(Debug, Default)]
pub struct Notifications {
    bits: AtomicU8,
}

impl Notifications {
    /// An empty set.
    pub const fn new() -> Self {
        Self {
            bits: AtomicU8::new(0),
        }
    }

    /// Mark `pending` as raised. Async-signal-safe.
    pub fn raise(&self, pending: Pending) {
        self.bits.fetch_or(pending.bits(), Ordering::SeqCst);
    }

    /// Everything raised so far and not yet taken.
    pub fn snapshot(&self) -> Pending {
        Pending::from_bits_truncate(self.bits.load(Ordering::SeqCst))
    }

    /// Consume a pending resize, returning whether there was one.
    pub fn take_resize(&self) -> bool {
        let previous = self.bits.fetch_and(!Pending::RESIZE.bits(), Ordering::SeqCst);
        Pending::from_bits_truncate(previous).contains(Pending::RESIZE)
    }

    /// Whether an interrupt was received.
    pub fn interrupted(&self) -> bool {
        self.snapshot().contains(Pending::INTERRUPT)
    }

    /// Whether a broken pipe was reported.
    pub fn pipe_closed(&self) -> bool {
        self.snapshot().contains(Pending::PIPE_CLOSED)
    }

    /// Whether a blocked read should give up instead of retrying.
    pub fn stop_requested(&self) -> bool {
        self.snapshot().intersects(Pending::INTERRUPT | Pending::PIPE_CLOSED)
    }
}

/// Process-wide flags the signal handlers write to.
static PROCESS_NOTIFICATIONS: Notifications = Notifications::new();

extern "C" fn record_signal(signal: libc::c_int) {
    let pending = match signal {
        libc::SIGWINCH => Pending::RESIZE,
        libc::SIGINT => Pending::INTERRUPT,
        libc::SIGPIPE => Pending::PIPE_CLOSED,
        _ => return,
    };
    PROCESS_NOTIFICATIONS.raise(pending);
}

#[allow(unsafe_code)]
fn install_handler(signal: Signal, flags: SaFlags) -> Result<()> {
    let action = SigAction::new(SigHandler::Handler(record_signal), flags, SigSet::empty());
    // SAFETY: the handler only performs an atomic fetch_or.
    unsafe { sigaction(signal, &action) }.map_err(|source| SashError::Signal {
        signal: signal.as_str(),
        source,
    })?;
    Ok(())
}

/// Install the resize, interrupt and broken-pipe handlers.
///
/// Resize restarts interrupted reads. Interrupt and broken pipe do not, so a
/// blocked read returns and the loop can wind down.
pub fn install() -> Result<&'static Notifications> {
    install_handler(Signal::SIGWINCH, SaFlags::SA_RESTART)?;
    install_handler(Signal::SIGINT, SaFlags::empty())?;
    install_handler(Signal::SIGPIPE, SaFlags::empty())?;
    tracing::debug!("signal handlers installed");
    Ok(&PROCESS_NOTIFICATIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_empty() {
        let notifications = Notifications::new();
        assert_eq!(notifications.snapshot(), Pending::empty());
        assert!(!notifications.take_resize());
        assert!(!notifications.stop_requested());
    }

    #[test]
    fn test_take_resize_clears_only_resize() {
        let notifications = Notifications::new();
        notifications.raise(Pending::RESIZE | Pending::INTERRUPT);

        assert!(notifications.take_resize());
        assert!(!notifications.take_resize());
        assert!(notifications.interrupted());
    }

    #[test]
    fn test_interrupt_and_pipe_are_sticky() {
        let notifications = Notifications::new();
        notifications.raise(Pending::PIPE_CLOSED);
        assert!(notifications.pipe_closed());
        assert!(notifications.stop_requested());
        assert!(notifications.pipe_closed());
        assert!(!notifications.interrupted());
    }

    #[test]
    fn test_handler_records_known_signals() {
        record_signal(libc::SIGUSR1);
        record_signal(libc::SIGWINCH);
        assert!(PROCESS_NOTIFICATIONS.take_resize());
    }
}
