//! Call stack capture

/// Source of the current thread's call stack
///
/// Frames are returned innermost-first, the most recent call at index zero,
/// as plain strings. What a frame looks like is up to the implementation.
pub trait StackCapture: Send + Sync {
    fn capture(&self) -> Vec<String>;
}

impl<F> StackCapture for F
    where F: Fn() -> Vec<String> + Send + Sync
{
    fn capture(&self) -> Vec<String> {
        self()
    }
}

/// Stack capture based on the `backtrace` crate
///
/// Each frame is rendered as `<index> <ip> <symbol>`, using the first symbol
/// resolved for the instruction pointer or `<unknown>`. Frames of the
/// capture itself are left out, so index zero is its caller. Resolution
/// takes a lock and allocates, which is tolerated on the signal path only
/// because the process is about to be killed anyway.
#[derive(Debug, Clone, Copy, Default)]
pub struct BacktraceCapture;

fn is_capture_frame(name: &str) -> bool {
    name.starts_with("backtrace::") || name.contains("BacktraceCapture")
}

impl StackCapture for BacktraceCapture {
    fn capture(&self) -> Vec<String> {
        let mut raw = Vec::new();
        backtrace::trace(|frame| {
            let mut name = None;
            backtrace::resolve_frame(frame, |symbol| {
                if name.is_none() {
                    name = symbol.name().map(|x| x.to_string());
                }
            });
            raw.push((frame.ip(), name));
            true
        });
        raw.into_iter()
            .skip_while(|&(_, ref name)| {
                name.as_ref().map(|x| is_capture_frame(x)).unwrap_or(false)
            })
            .enumerate()
            .map(|(index, (ip, name))| match name {
                Some(name) => format!("{:<4}{:p} {}", index, ip, name),
                None => format!("{:<4}{:p} <unknown>", index, ip),
            })
            .collect()
    }
}
