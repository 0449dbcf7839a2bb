use std::env::args;
use std::sync::Arc;

use crashwatch::{CrashSnapshot, Exception};
use nix::sys::signal::{raise, Signal};

fn main() {
    env_logger::init();

    let report = Arc::new(|snapshot: &CrashSnapshot| {
        eprintln!("=== crash report ===\n{}", snapshot);
    });
    crashwatch::register(&report);

    match args().nth(1).as_ref().map(|x| &x[..]) {
        Some("panic") => panic!("Something went wrong"),
        Some("exception") => {
            Exception::raise("NSRangeException", "index 3 beyond bounds [0 .. 2]")
        }
        Some("segv") => {
            raise(Signal::SIGSEGV).unwrap();
        }
        Some("abort") => std::process::abort(),
        _ => {
            println!("Usage: crash_report {{panic|exception|segv|abort}}");
        }
    }
    crashwatch::unregister(&report);
}
