//! In-process crash interception
//!
//! The library turns fatal conditions of the current process into
//! `CrashSnapshot`s and hands them to registered observers:
//!
//! 1. Fatal signals (`SIGSEGV`, `SIGILL`, `SIGABRT`, `SIGBUS`, `SIGFPE`,
//!    `SIGPIPE` and by default `SIGTRAP`). Observers are notified from the
//!    signal handler, then the process is killed with `SIGKILL`.
//! 2. Panics, through the panic hook. The previously installed hook runs
//!    first, then the observers, then the panic continues as usual.
//!
//! Interception is switched on when the first observer registers and off
//! when the last one unregisters:
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crashwatch::CrashSnapshot;
//!
//! let observer = Arc::new(|snapshot: &CrashSnapshot| {
//!     eprintln!("{}", snapshot);
//! });
//! crashwatch::register(&observer);
//! assert!(crashwatch::is_active());
//! crashwatch::unregister(&observer);
//! ```
//!
//! Observers are referenced weakly: dropping the last `Arc` of an observer
//! is enough to stop its notifications.
//!
//! Observers run in a signal handler for signal crashes, see
//! `CrashObserver` for what they may do there.
//!
//! Only unix platforms are supported.

mod activation;
mod error;
mod ffi;
mod trap;
pub mod config;
pub mod exception;
pub mod registry;
pub mod snapshot;
pub mod stack;

use std::sync::Arc;

pub use config::Config;
pub use error::{Error, Result};
pub use exception::Exception;
pub use registry::{CrashObserver, ObserverRegistry};
pub use snapshot::{CrashKind, CrashSnapshot};
pub use stack::{BacktraceCapture, StackCapture};

/// Start delivering crashes to `observer`
///
/// The first registration activates interception. Registering the same
/// observer again keeps a single entry.
pub fn register<O>(observer: &Arc<O>)
    where O: CrashObserver + 'static
{
    let ctx = activation::context();
    ctx.observers.register(observer);
    ctx.activate();
}

/// Stop delivering crashes to `observer`
///
/// Interception is deactivated once no live observer is left.
pub fn unregister<O>(observer: &Arc<O>)
    where O: CrashObserver + ?Sized
{
    if let Some(ctx) = activation::installed() {
        if ctx.observers.unregister(observer) {
            ctx.deactivate();
        }
    }
}

/// Whether the handlers of this crate are currently in charge
pub fn is_active() -> bool {
    activation::installed().map_or(false, |ctx| ctx.is_active())
}
