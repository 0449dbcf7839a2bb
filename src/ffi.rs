//! The few primitives used while the process is dying
//!
//! Everything here is async-signal-safe.

use libc::{c_void, STDERR_FILENO};
use nix::sys::signal::{kill, sigaction, SaFlags, SigAction, SigHandler};
use nix::sys::signal::{SigSet, Signal};
use nix::unistd::getpid;

/// Write a fixed message to stderr with a single `write(2)`
pub fn write_stderr(message: &[u8]) {
    unsafe {
        libc::write(STDERR_FILENO, message.as_ptr() as *const c_void,
                    message.len());
    }
}

/// Reset the disposition of `signals` to `SIG_DFL`
pub fn reset_to_default(signals: &[Signal]) {
    let default = SigAction::new(SigHandler::SigDfl,
                                 SaFlags::empty(), SigSet::empty());
    for &sig in signals {
        unsafe {
            let _ = sigaction(sig, &default);
        }
    }
}

/// Kill the current process with `SIGKILL`
pub fn kill_self() -> ! {
    let _ = kill(getpid(), Signal::SIGKILL);
    // SIGKILL can't be blocked, so this only runs if kill(2) itself failed
    unsafe { libc::_exit(128 + libc::SIGKILL) }
}
