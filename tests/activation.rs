use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crashwatch::{CrashObserver, CrashSnapshot};
use serial_test::serial;

#[derive(Default)]
struct Counter {
    hits: AtomicUsize,
}

impl CrashObserver for Counter {
    fn on_crash_captured(&self, _: &CrashSnapshot) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

impl Counter {
    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn caught_panic(message: &'static str) {
    let result = panic::catch_unwind(move || {
        panic!("{}", message);
    });
    assert!(result.is_err());
}

#[test]
#[serial]
fn first_and_last_observer_toggle_activation() {
    let a = Arc::new(Counter::default());
    let b = Arc::new(Counter::default());
    assert!(!crashwatch::is_active());
    crashwatch::register(&a);
    assert!(crashwatch::is_active());
    crashwatch::register(&b);
    assert!(crashwatch::is_active());
    crashwatch::unregister(&a);
    assert!(crashwatch::is_active());
    crashwatch::unregister(&b);
    assert!(!crashwatch::is_active());
    crashwatch::unregister(&b);
    assert!(!crashwatch::is_active());
}

#[test]
#[serial]
fn duplicate_registration_is_a_single_entry() {
    let a = Arc::new(Counter::default());
    crashwatch::register(&a);
    crashwatch::register(&a);
    crashwatch::unregister(&a);
    assert!(!crashwatch::is_active());
}

#[test]
#[serial]
fn expired_observer_does_not_keep_interception_alive() {
    let a = Arc::new(Counter::default());
    let b = Arc::new(Counter::default());
    crashwatch::register(&a);
    crashwatch::register(&b);
    drop(a);
    crashwatch::unregister(&b);
    assert!(!crashwatch::is_active());
}

#[test]
#[serial]
fn unregistering_a_stranger_prunes_expired_entries() {
    let a = Arc::new(Counter::default());
    crashwatch::register(&a);
    drop(a);
    assert!(crashwatch::is_active());
    let stranger = Arc::new(Counter::default());
    crashwatch::unregister(&stranger);
    assert!(!crashwatch::is_active());
}

#[test]
#[serial]
fn repeated_cycles_keep_one_prior_hook() {
    let prior_calls = Arc::new(AtomicUsize::new(0));
    let calls = prior_calls.clone();
    panic::set_hook(Box::new(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
    }));

    let observer = Arc::new(Counter::default());
    for _ in 0..3 {
        crashwatch::register(&observer);
        crashwatch::unregister(&observer);
    }
    crashwatch::register(&observer);
    crashwatch::register(&observer);

    caught_panic("while active");
    assert_eq!(prior_calls.load(Ordering::SeqCst), 1);
    assert_eq!(observer.hits(), 1);

    crashwatch::unregister(&observer);
    caught_panic("after deactivation");
    assert_eq!(prior_calls.load(Ordering::SeqCst), 2);
    assert_eq!(observer.hits(), 1);

    drop(panic::take_hook());
}

#[test]
#[serial]
fn many_cycles_do_not_nest_the_prior_hook() {
    let prior_calls = Arc::new(AtomicUsize::new(0));
    let calls = prior_calls.clone();
    panic::set_hook(Box::new(move |_| {
        calls.fetch_add(1, Ordering::SeqCst);
    }));

    let observer = Arc::new(Counter::default());
    for _ in 0..20_000 {
        crashwatch::register(&observer);
        crashwatch::unregister(&observer);
    }
    crashwatch::register(&observer);

    // a hook nested once per cycle would overflow this stack
    let result = thread::Builder::new()
        .stack_size(256 * 1024)
        .spawn(|| panic!("deep"))
        .unwrap()
        .join();
    assert!(result.is_err());
    assert_eq!(prior_calls.load(Ordering::SeqCst), 1);
    assert_eq!(observer.hits(), 1);

    crashwatch::unregister(&observer);
    drop(panic::take_hook());
}
