//! Observers interested in crashes
//!
//! The registry never owns an observer: it keeps a `Weak` reference and the
//! address of the observer's allocation as its identity. An observer that
//! has been dropped is simply skipped on delivery and is pruned on the next
//! `register` or `unregister` call.

use std::sync::{Arc, Weak};

use log::trace;
use spin::RwLock;

use crate::snapshot::CrashSnapshot;

/// Receiver of crash snapshots
///
/// The callback runs synchronously on the crashing thread. For signals that
/// means inside a signal handler, where only async-signal-safe operations
/// are reliable: avoid allocating, taking locks and registering or
/// unregistering observers from here. The callback must not panic.
pub trait CrashObserver: Send + Sync {
    fn on_crash_captured(&self, snapshot: &CrashSnapshot);
}

impl<F> CrashObserver for F
    where F: Fn(&CrashSnapshot) + Send + Sync
{
    fn on_crash_captured(&self, snapshot: &CrashSnapshot) {
        self(snapshot)
    }
}

struct Entry {
    id: usize,
    observer: Weak<dyn CrashObserver>,
}

impl Entry {
    fn is_live(&self) -> bool {
        self.observer.strong_count() > 0
    }
}

fn identity<O: ?Sized>(observer: &Arc<O>) -> usize {
    Arc::as_ptr(observer) as *const () as usize
}

/// Ordered table of weakly referenced observers
pub struct ObserverRegistry {
    entries: RwLock<Vec<Entry>>,
}

impl ObserverRegistry {
    pub const fn new() -> ObserverRegistry {
        ObserverRegistry {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Add `observer` at the end of the delivery order
    ///
    /// Registering an observer that is already present moves it to the end
    /// instead of adding a second entry.
    pub fn register<O>(&self, observer: &Arc<O>)
        where O: CrashObserver + 'static
    {
        let id = identity(observer);
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn CrashObserver> = weak;
        let mut entries = self.entries.write();
        entries.retain(|e| e.is_live() && e.id != id);
        entries.push(Entry { id: id, observer: weak });
        trace!("Registered crash observer {:#x}, {} entries", id, entries.len());
    }

    /// Remove `observer`, returns `true` if no entries are left
    pub fn unregister<O>(&self, observer: &Arc<O>) -> bool
        where O: CrashObserver + ?Sized
    {
        let id = identity(observer);
        let mut entries = self.entries.write();
        entries.retain(|e| e.is_live() && e.id != id);
        trace!("Unregistered crash observer {:#x}, {} entries",
               id, entries.len());
        entries.is_empty()
    }

    /// Deliver `snapshot` to every live observer in registration order
    ///
    /// Observers are collected before any of them is called, so they may
    /// modify the registry. Returns the number of observers notified.
    pub fn notify_all(&self, snapshot: &CrashSnapshot) -> usize {
        let live = self.entries.read().iter()
            .filter_map(|e| e.observer.upgrade())
            .collect::<Vec<_>>();
        for observer in &live {
            observer.on_crash_captured(snapshot);
        }
        live.len()
    }

    /// Allocation-free delivery for use inside a signal handler
    ///
    /// Returns `None` without notifying anyone if the table is being
    /// modified, since the writer may be the very thread that was
    /// interrupted and waiting for it would never finish.
    pub(crate) fn try_notify_all(&self, snapshot: &CrashSnapshot)
        -> Option<usize>
    {
        let entries = self.entries.try_read()?;
        let mut delivered = 0;
        for entry in entries.iter() {
            if let Some(observer) = entry.observer.upgrade() {
                observer.on_crash_captured(snapshot);
                delivered += 1;
            }
        }
        Some(delivered)
    }

    /// Number of observers that are still alive
    pub fn len(&self) -> usize {
        self.entries.read().iter().filter(|e| e.is_live()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ObserverRegistry {
    fn default() -> ObserverRegistry {
        ObserverRegistry::new()
    }
}
