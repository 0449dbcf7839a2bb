//! Panic interception
//!
//! A panic is this crate's "uncaught exception". The handler is a panic
//! hook, so it runs on the panicking thread before unwinding starts (or
//! before the abort, with `panic = "abort"`), whether or not the panic is
//! caught later by `catch_unwind`.
//!
//! The hook that was installed before activation is always called first.
//! This keeps the default panic message, and any other crash reporter in the
//! process, working as if we weren't there.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{self, PanicHookInfo};
use std::time::SystemTime;

use log::debug;

use crate::activation;
use crate::snapshot::{CrashKind, CrashSnapshot};

/// Exception name of panics that carry a plain message
pub const PANIC: &str = "panic";

/// Panic payload with an exception category
///
/// Raise it with `Exception::raise` (or `std::panic::panic_any`) to have the
/// snapshot named after the category instead of the generic `"panic"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    name: String,
    reason: Option<String>,
}

impl Exception {
    pub fn new<N: Into<String>>(name: N, reason: Option<String>) -> Exception {
        Exception {
            name: name.into(),
            reason: reason,
        }
    }

    /// Panic with an `Exception` payload
    pub fn raise<N, R>(name: N, reason: R) -> !
        where N: Into<String>,
              R: Into<String>,
    {
        panic::panic_any(Exception::new(name, Some(reason.into())))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_ref().map(|x| &x[..])
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.reason {
            Some(ref reason) => write!(f, "{}: {}", self.name, reason),
            None => f.write_str(&self.name),
        }
    }
}

impl StdError for Exception {}

/// Exception name and reason of a panic payload
pub(crate) fn describe(payload: &(dyn Any + Send)) -> (String, String) {
    if let Some(exception) = payload.downcast_ref::<Exception>() {
        let reason = exception.reason().unwrap_or("");
        (exception.name.clone(), reason.to_string())
    } else if let Some(message) = payload.downcast_ref::<&'static str>() {
        (PANIC.to_string(), message.to_string())
    } else if let Some(message) = payload.downcast_ref::<String>() {
        (PANIC.to_string(), message.clone())
    } else {
        (PANIC.to_string(), String::new())
    }
}

/// The installed panic hook
pub(crate) fn intercept_panic(info: &PanicHookInfo<'_>) {
    let ctx = match activation::installed() {
        Some(ctx) => ctx,
        None => return,
    };
    ctx.call_prior_hook(info);
    if !ctx.is_active() {
        return;
    }
    let (name, reason) = describe(info.payload());
    let snapshot = CrashSnapshot::new(SystemTime::now(), CrashKind::Exception,
        name, reason, ctx.config.stack.capture());
    let delivered = ctx.observers.notify_all(&snapshot);
    match info.location() {
        Some(loc) => debug!("Panic {:?} at {} reported to {} observers",
                            snapshot.name(), loc, delivered),
        None => debug!("Panic {:?} reported to {} observers",
                       snapshot.name(), delivered),
    }
}
