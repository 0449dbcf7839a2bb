//! Process-wide settings
//!
//! The handler runs with `Config::default()` unless a configuration is
//! installed before the first observer registers:
//!
//! ```rust,no_run
//! use nix::sys::signal::Signal;
//!
//! crashwatch::Config::new()
//!     .signals(&[Signal::SIGSEGV, Signal::SIGBUS, Signal::SIGABRT])?
//!     .trap_breakpoints(false)
//!     .install()?;
//! # Ok::<(), crashwatch::Error>(())
//! ```

use std::fmt;
use std::sync::Arc;

use nix::sys::signal::Signal;

use crate::activation;
use crate::error::{Error, Result};
use crate::stack::{BacktraceCapture, StackCapture};

/// Signals intercepted by default, besides `SIGTRAP`
pub const FATAL_SIGNALS: [Signal; 6] = [
    Signal::SIGABRT,
    Signal::SIGILL,
    Signal::SIGSEGV,
    Signal::SIGFPE,
    Signal::SIGBUS,
    Signal::SIGPIPE,
];

/// The signal handler and the kernel's signal trampoline
const HANDLER_FRAMES: usize = 2;

pub struct Config {
    pub(crate) signals: Vec<Signal>,
    pub(crate) restore_signals_on_deactivate: bool,
    pub(crate) skip_signal_frames: usize,
    pub(crate) stack: Arc<dyn StackCapture>,
}

impl Config {
    /// All of `FATAL_SIGNALS` plus `SIGTRAP`, signal handlers kept
    /// installed after deactivation, stacks from `BacktraceCapture`
    pub fn new() -> Config {
        let mut signals = FATAL_SIGNALS.to_vec();
        signals.push(Signal::SIGTRAP);
        Config {
            signals: signals,
            restore_signals_on_deactivate: false,
            skip_signal_frames: HANDLER_FRAMES,
            stack: Arc::new(BacktraceCapture),
        }
    }

    /// Replace the set of intercepted signals
    ///
    /// Fails for signals that can't be caught. Duplicates are ignored.
    pub fn signals(mut self, signals: &[Signal]) -> Result<Config> {
        let mut list = Vec::with_capacity(signals.len());
        for &sig in signals {
            match sig {
                Signal::SIGKILL | Signal::SIGSTOP => {
                    return Err(Error::Uncatchable(sig));
                }
                _ if list.contains(&sig) => {}
                _ => list.push(sig),
            }
        }
        self.signals = list;
        Ok(self)
    }

    /// Whether `SIGTRAP` is intercepted too
    ///
    /// Some runtimes report fatal errors by executing a trap instruction.
    /// Disable it when a debugger needs breakpoints in the process.
    pub fn trap_breakpoints(mut self, enabled: bool) -> Config {
        self.signals.retain(|&sig| sig != Signal::SIGTRAP);
        if enabled {
            self.signals.push(Signal::SIGTRAP);
        }
        self
    }

    /// Put back the previous signal dispositions when the last observer
    /// unregisters
    ///
    /// By default only the panic hook is restored and the signal handlers
    /// stay in place, doing nothing but forwarding while inactive.
    pub fn restore_signals_on_deactivate(mut self, enabled: bool) -> Config {
        self.restore_signals_on_deactivate = enabled;
        self
    }

    /// Number of innermost frames dropped from signal stacks
    ///
    /// Counted after the frames of `BacktraceCapture` itself, which are
    /// never reported.
    pub fn skip_signal_frames(mut self, count: usize) -> Config {
        self.skip_signal_frames = count;
        self
    }

    /// Use a custom stack capture for both panics and signals
    pub fn stack_capture<S>(mut self, capture: S) -> Config
        where S: StackCapture + 'static
    {
        self.stack = Arc::new(capture);
        self
    }

    pub fn monitored_signals(&self) -> &[Signal] {
        &self.signals
    }

    /// Make this the process-wide configuration
    ///
    /// Must happen before the first observer registers, otherwise
    /// `Error::AlreadyConfigured` is returned.
    pub fn install(self) -> Result<()> {
        activation::configure(self)
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::new()
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Config")
            .field("signals", &self.signals)
            .field("restore_signals_on_deactivate",
                   &self.restore_signals_on_deactivate)
            .field("skip_signal_frames", &self.skip_signal_frames)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use nix::sys::signal::Signal;

    use super::{Config, FATAL_SIGNALS};
    use crate::error::Error;

    #[test]
    fn defaults() {
        let config = Config::new();
        let signals = config.monitored_signals();
        for sig in FATAL_SIGNALS.iter() {
            assert!(signals.contains(sig), "{:?} missing", sig);
        }
        assert!(signals.contains(&Signal::SIGTRAP));
        assert_eq!(signals.len(), 7);
        assert!(!config.restore_signals_on_deactivate);
        assert_eq!(config.skip_signal_frames, 2);
    }

    #[test]
    fn without_trap() {
        let config = Config::new().trap_breakpoints(false);
        assert_eq!(config.monitored_signals(), &FATAL_SIGNALS[..]);
        let config = config.trap_breakpoints(true).trap_breakpoints(true);
        assert_eq!(config.monitored_signals().len(), 7);
    }

    #[test]
    fn custom_signals() {
        let config = Config::new()
            .signals(&[Signal::SIGSEGV, Signal::SIGBUS, Signal::SIGSEGV])
            .unwrap();
        assert_eq!(config.monitored_signals(),
                   &[Signal::SIGSEGV, Signal::SIGBUS]);
    }

    #[test]
    fn uncatchable_signal() {
        match Config::new().signals(&[Signal::SIGSEGV, Signal::SIGKILL]) {
            Err(Error::Uncatchable(Signal::SIGKILL)) => {}
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn custom_stack_capture() {
        let config = Config::new()
            .stack_capture(|| vec!["frame".to_string()])
            .skip_signal_frames(0);
        assert_eq!(config.stack.capture(), vec!["frame".to_string()]);
        assert_eq!(config.skip_signal_frames, 0);
    }
}
