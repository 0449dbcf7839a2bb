//! Process-wide state and the activation switch
//!
//! All state lives in one `CrashContext`, created on first use (or by
//! `Config::install`) and never dropped. It is either inactive, the initial
//! state, or active, with the panic hook and signal handlers of this crate
//! installed.
//!
//! Activation records the panic hook found at that moment and deactivation
//! puts it back, so another crash reporter that was there first keeps
//! working. Deactivation can only put back a wrapper around the recorded
//! hook, so the next activation recognizes that wrapper by address and keeps
//! the recorded hook instead of wrapping it again. Signal handlers stay installed after deactivation unless
//! `Config::restore_signals_on_deactivate` is set; while inactive they just
//! forward to the disposition they replaced.

use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use log::{debug, error, warn};
use nix::sys::signal::{SigAction, Signal};
use spin::{Mutex, RwLock};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::exception;
use crate::registry::ObserverRegistry;
use crate::trap;

pub(crate) type PanicHook = dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static;

static CONTEXT: OnceLock<CrashContext> = OnceLock::new();

pub(crate) struct CrashContext {
    pub(crate) config: Config,
    pub(crate) observers: ObserverRegistry,
    active: AtomicBool,
    /// Address of the hook installed by the last deactivation, zero if none
    transition: Mutex<usize>,
    prior_hook: RwLock<Option<Arc<PanicHook>>>,
    pub(crate) prior_signals: RwLock<Vec<(Signal, SigAction)>>,
}

/// The context, created with the default configuration if needed
pub(crate) fn context() -> &'static CrashContext {
    CONTEXT.get_or_init(|| CrashContext::new(Config::default()))
}

/// The context if it was already created
///
/// Never initializes anything, so it's usable from a signal handler.
pub(crate) fn installed() -> Option<&'static CrashContext> {
    CONTEXT.get()
}

fn hook_addr(hook: &PanicHook) -> usize {
    hook as *const PanicHook as *const () as usize
}

pub(crate) fn configure(config: Config) -> Result<()> {
    debug!("Configuring crash handler: {:?}", config);
    CONTEXT.set(CrashContext::new(config))
        .map_err(|_| Error::AlreadyConfigured)
}

impl CrashContext {
    fn new(config: Config) -> CrashContext {
        CrashContext {
            config: config,
            observers: ObserverRegistry::new(),
            active: AtomicBool::new(false),
            transition: Mutex::new(0),
            prior_hook: RwLock::new(None),
            prior_signals: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Install the panic hook and signal handlers, no-op if active
    pub(crate) fn activate(&self) {
        let mut restored = self.transition.lock();
        if self.is_active() {
            return;
        }
        // take_hook and set_hook panic on a panicking thread
        if thread::panicking() {
            warn!("Crash handler not activated: thread is panicking");
            return;
        }
        let current = panic::take_hook();
        {
            let mut prior = self.prior_hook.write();
            // the wrapper holds a clone, so a count of one means it's gone
            let ours = match *prior {
                Some(ref hook) => {
                    *restored != 0 && hook_addr(&*current) == *restored
                        && Arc::strong_count(hook) > 1
                }
                None => false,
            };
            if ours {
                drop(current);
            } else {
                *prior = Some(Arc::from(current));
            }
        }
        *restored = 0;
        panic::set_hook(Box::new(exception::intercept_panic));
        self.active.store(true, Ordering::SeqCst);

        let mut prior_signals = self.prior_signals.write();
        if let Err(e) = trap::install(&self.config.signals, &mut prior_signals) {
            error!("{}, some fatal signals are not intercepted", e);
        }
        debug!("Crash handler activated for {:?}", self.config.signals);
    }

    /// Restore the prior panic hook, no-op if inactive
    pub(crate) fn deactivate(&self) {
        let mut restored = self.transition.lock();
        if !self.is_active() {
            return;
        }
        if thread::panicking() {
            warn!("Crash handler not deactivated: thread is panicking");
            return;
        }
        self.active.store(false, Ordering::SeqCst);
        let prior = self.prior_hook.read().clone();
        drop(panic::take_hook());
        if let Some(prior) = prior {
            let wrapper: Box<PanicHook> =
                Box::new(move |info: &PanicHookInfo<'_>| prior(info));
            *restored = hook_addr(&*wrapper);
            panic::set_hook(wrapper);
        }

        if self.config.restore_signals_on_deactivate {
            let mut prior_signals = self.prior_signals.write();
            trap::restore(&prior_signals);
            prior_signals.clear();
        }
        debug!("Crash handler deactivated");
    }

    /// Run the panic hook that was installed before activation
    pub(crate) fn call_prior_hook(&self, info: &PanicHookInfo<'_>) {
        let prior = self.prior_hook.read().clone();
        if let Some(prior) = prior {
            prior(info);
        }
    }
}
