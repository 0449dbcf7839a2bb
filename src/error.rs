//! Error types for crash handler setup.

use nix::sys::signal::Signal;
use thiserror::Error;

/// Errors that can occur while configuring or installing the handlers.
///
/// Registering and unregistering observers never fails; these only come
/// from [`Config`](crate::Config).
#[derive(Error, Debug)]
pub enum Error {
    /// The signal can't have a handler (`SIGKILL`, `SIGSTOP`).
    #[error("Signal {0:?} can't be intercepted")]
    Uncatchable(Signal),

    /// `sigaction` refused the handler.
    #[error("Failed to install handler for {signal:?}: {source}")]
    InstallSignal {
        signal: Signal,
        #[source]
        source: nix::Error,
    },

    /// The process-wide context has already been created.
    #[error("Crash handler is already configured")]
    AlreadyConfigured,
}

/// Result type for crash handler setup.
pub type Result<T> = std::result::Result<T, Error>;
