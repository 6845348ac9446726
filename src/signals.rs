//! Signal dispositions for the shell and its children.
//!
//! The shell itself ignores SIGINT so `Ctrl-C` only ever reaches a foreground
//! child. SIGTSTP is repurposed: instead of suspending anything it toggles
//! foreground-only mode, in which trailing `&` markers are ignored and every
//! command runs in the foreground.

use std::sync::atomic::{AtomicBool, Ordering};

use nix::libc;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

/// Process-wide foreground-only flag. Written only by the SIGTSTP handler,
/// read by the launcher when deciding whether to honor a background marker.
static FOREGROUND_ONLY: AtomicBool = AtomicBool::new(false);

const ENTER_MESSAGE: &str = "\nEntering foreground-only mode (& is now ignored)\n";
const EXIT_MESSAGE: &str = "\nExiting foreground-only mode\n";

/// Whether foreground-only mode is currently active.
pub fn is_foreground_only() -> bool {
    FOREGROUND_ONLY.load(Ordering::SeqCst)
}

#[cfg(test)]
pub(crate) fn set_foreground_only(value: bool) {
    FOREGROUND_ONLY.store(value, Ordering::SeqCst);
}

/// Tests touching the process-global flag (or spawning commands whose
/// behavior depends on it) must hold this lock to keep out of each other's
/// way under the parallel test runner.
#[cfg(test)]
pub(crate) fn flag_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// SIGTSTP handler: flip the flag and announce the new mode.
///
/// Only async-signal-safe work happens here — the atomic flip and a single
/// raw `write(2)` of a fixed literal. No buffered-stream flushing, no
/// allocation.
extern "C" fn handle_sigtstp(_signo: libc::c_int) {
    let was_active = FOREGROUND_ONLY.fetch_xor(true, Ordering::SeqCst);
    let message = if was_active {
        EXIT_MESSAGE
    } else {
        ENTER_MESSAGE
    };
    unsafe {
        libc::write(
            libc::STDOUT_FILENO,
            message.as_ptr().cast(),
            message.len(),
        );
    }
}

/// Install the shell's own dispositions. Called once, before the first prompt.
///
/// SIGINT is ignored; SIGTSTP gets the mode-toggle handler. SA_RESTART keeps
/// an in-flight terminal read going after the toggle message is written.
pub fn install_shell_handlers() -> nix::Result<()> {
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    let toggle = SigAction::new(
        SigHandler::Handler(handle_sigtstp),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGINT, &ignore)?;
        sigaction(Signal::SIGTSTP, &toggle)?;
    }
    Ok(())
}

/// Per-child dispositions, applied in the forked child before exec.
///
/// A foreground child restores SIGINT to its default so `Ctrl-C` terminates
/// it normally. Every child ignores SIGTSTP: the suspend signal is consumed
/// entirely by the shell's mode toggle.
pub fn apply_child_dispositions(foreground: bool) {
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    let ignore = SigAction::new(SigHandler::SigIgn, SaFlags::empty(), SigSet::empty());
    unsafe {
        if foreground {
            let _ = sigaction(Signal::SIGINT, &default);
        }
        let _ = sigaction(Signal::SIGTSTP, &ignore);
    }
}
