//! Handler for fatal signals
//!
//! The handler is installed with `sigaction` for every monitored signal when
//! the crash handler activates. While active, a signal is turned into a
//! `CrashSnapshot`, delivered to the observers and the process is killed
//! with `SIGKILL`, so it never continues in a corrupted state.
//!
//! Only `write(2)`, `sigaction(2)` and `kill(2)` are strictly safe here.
//! Capturing the stack and formatting the reason allocate, which may
//! deadlock if the signal interrupted the allocator. That risk is accepted:
//! the process is lost either way, and the observers are reached in every
//! other case.
//!
//! The handler runs on the faulting thread's own stack. A `SIGSEGV` from a
//! stack overflow therefore can't be handled and the kernel kills the
//! process without a report.

use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::SystemTime;

use libc::c_int;
use nix::sys::signal::{raise, sigaction, SaFlags, SigAction, SigHandler};
use nix::sys::signal::{SigSet, Signal};

use crate::activation::{self, CrashContext};
use crate::error::{Error, Result};
use crate::ffi::{kill_self, reset_to_default, write_stderr};
use crate::snapshot::{CrashKind, CrashSnapshot};

/// Mnemonic of signal numbers that are not monitored
pub const OTHER: &str = "OTHER";

static HANDLING: AtomicBool = AtomicBool::new(false);

/// Install the handler for each of `signals`
///
/// `prior` keeps the disposition every signal had before this crate first
/// took it over. Re-installing over our own handler leaves the record as
/// is, so repeated activation never chains the handler to itself.
/// Stops at the first failure, signals handled so far stay installed.
pub(crate) fn install(signals: &[Signal], prior: &mut Vec<(Signal, SigAction)>)
    -> Result<()>
{
    // Not SA_ONSTACK: the alternate stack std sets up is too small for
    // symbolizing a backtrace
    let action = SigAction::new(SigHandler::Handler(handle_signal),
                                SaFlags::empty(), SigSet::empty());
    for &sig in signals {
        let old = unsafe { sigaction(sig, &action) }
            .map_err(|e| Error::InstallSignal { signal: sig, source: e })?;
        if is_own_handler(&old) {
            continue;
        }
        match prior.iter_mut().find(|entry| entry.0 == sig) {
            Some(entry) => entry.1 = old,
            None => prior.push((sig, old)),
        }
    }
    Ok(())
}

/// Put back the recorded dispositions
pub(crate) fn restore(prior: &[(Signal, SigAction)]) {
    for &(sig, ref action) in prior {
        unsafe {
            let _ = sigaction(sig, action);
        }
    }
}

fn is_own_handler(action: &SigAction) -> bool {
    match action.handler() {
        SigHandler::Handler(f) => {
            f as *const () as usize == handle_signal as *const () as usize
        }
        _ => false,
    }
}

/// Mnemonic for `signo`, `OTHER` unless it's one of `monitored`
pub(crate) fn signal_name(monitored: &[Signal], signo: c_int) -> &'static str {
    match Signal::try_from(signo) {
        Ok(sig) if monitored.contains(&sig) => sig.as_str(),
        _ => OTHER,
    }
}

pub(crate) fn reason(name: &str, signo: c_int) -> String {
    format!("Signal {}({}) was raised.", name, signo)
}

extern "C" fn handle_signal(signo: c_int) {
    let ctx = match activation::installed() {
        Some(ctx) => ctx,
        None => return,
    };
    if !ctx.is_active() {
        forward(ctx, signo);
        return;
    }
    if HANDLING.swap(true, Ordering::SeqCst) {
        // Faulted again while reporting the first signal
        terminate(ctx);
    }
    let config = &ctx.config;
    let name = signal_name(&config.signals, signo);
    let stack = config.stack.capture().into_iter()
        .skip(config.skip_signal_frames)
        .collect();
    let snapshot = CrashSnapshot::new(SystemTime::now(), CrashKind::Signal,
        name, reason(name, signo), stack);
    if ctx.observers.try_notify_all(&snapshot).is_none() {
        write_stderr(b"crashwatch: observer registry is locked, \
                       crash was not reported\n");
    }
    terminate(ctx);
}

/// Hand the signal to whatever disposition it had before us
fn forward(ctx: &CrashContext, signo: c_int) {
    let sig = match Signal::try_from(signo) {
        Ok(sig) => sig,
        Err(_) => return,
    };
    let default = SigAction::new(SigHandler::SigDfl,
                                 SaFlags::empty(), SigSet::empty());
    let prior = ctx.prior_signals.try_read();
    let action = prior.as_ref()
        .and_then(|list| list.iter().find(|entry| entry.0 == sig))
        .map(|entry| &entry.1)
        .unwrap_or(&default);
    unsafe {
        let _ = sigaction(sig, action);
    }
    // Blocked until we return, then delivered to the prior disposition
    let _ = raise(sig);
}

fn terminate(ctx: &CrashContext) -> ! {
    if !thread::panicking() {
        panic::set_hook(Box::new(|_| {}));
    }
    reset_to_default(&ctx.config.signals);
    kill_self()
}

#[cfg(test)]
mod test {
    use nix::sys::signal::Signal;

    use super::{reason, signal_name, OTHER};
    use crate::config::{Config, FATAL_SIGNALS};

    #[test]
    fn monitored_names() {
        assert_eq!(signal_name(&FATAL_SIGNALS, libc::SIGSEGV), "SIGSEGV");
        assert_eq!(signal_name(&FATAL_SIGNALS, libc::SIGABRT), "SIGABRT");
        assert_eq!(signal_name(&FATAL_SIGNALS, libc::SIGPIPE), "SIGPIPE");
    }

    #[test]
    fn unmonitored_is_other() {
        assert_eq!(signal_name(&FATAL_SIGNALS, libc::SIGTRAP), OTHER);
        assert_eq!(signal_name(&[Signal::SIGSEGV], libc::SIGBUS), OTHER);
        assert_eq!(signal_name(&FATAL_SIGNALS, 0), OTHER);
        assert_eq!(signal_name(&FATAL_SIGNALS, 1000), OTHER);
    }

    #[test]
    fn trap_is_named_when_monitored_by_default() {
        let config = Config::new();
        assert_eq!(signal_name(config.monitored_signals(), libc::SIGTRAP),
                   "SIGTRAP");
        let config = config.trap_breakpoints(false);
        assert_eq!(signal_name(config.monitored_signals(), libc::SIGTRAP),
                   OTHER);
    }

    #[test]
    fn reason_names_the_number() {
        assert_eq!(reason("SIGSEGV", 11), "Signal SIGSEGV(11) was raised.");
    }
}
