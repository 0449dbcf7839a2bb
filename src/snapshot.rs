//! Captured description of a single crash

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// What kind of fatal condition produced a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrashKind {
    /// A fatal signal such as `SIGSEGV`
    Signal,
    /// A panic that reached the panic hook
    Exception,
}

impl CrashKind {
    pub fn as_str(&self) -> &'static str {
        match *self {
            CrashKind::Signal => "signal",
            CrashKind::Exception => "exception",
        }
    }
}

impl fmt::Display for CrashKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one crash event
///
/// Snapshots are built once by the interceptor that caught the crash and
/// then handed by reference to every observer in turn.
#[derive(Debug, Clone, PartialEq)]
pub struct CrashSnapshot {
    occurred_at: SystemTime,
    kind: CrashKind,
    name: String,
    reason: String,
    call_stack: Vec<String>,
}

impl CrashSnapshot {
    pub fn new<N, R>(occurred_at: SystemTime, kind: CrashKind,
                     name: N, reason: R, call_stack: Vec<String>)
        -> CrashSnapshot
        where N: Into<String>,
              R: Into<String>,
    {
        CrashSnapshot {
            occurred_at: occurred_at,
            kind: kind,
            name: name.into(),
            reason: reason.into(),
            call_stack: call_stack,
        }
    }

    pub fn occurred_at(&self) -> SystemTime {
        self.occurred_at
    }

    /// Seconds since the unix epoch, negative for times before it
    pub fn timestamp(&self) -> f64 {
        match self.occurred_at.duration_since(UNIX_EPOCH) {
            Ok(since) => since.as_secs_f64(),
            Err(before) => -before.duration().as_secs_f64(),
        }
    }

    pub fn kind(&self) -> CrashKind {
        self.kind
    }

    /// Signal mnemonic (`SIGSEGV`) or exception category
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Frames innermost-first, as produced by the stack capture
    pub fn call_stack(&self) -> &[String] {
        &self.call_stack
    }
}

impl fmt::Display for CrashSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} at {:.3}", self.kind, self.name, self.timestamp())?;
        if !self.reason.is_empty() {
            write!(f, ": {}", self.reason.trim_end())?;
        }
        for frame in &self.call_stack {
            write!(f, "\n    {}", frame)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, UNIX_EPOCH};
    use super::{CrashKind, CrashSnapshot};

    fn snapshot(reason: &str, stack: &[&str]) -> CrashSnapshot {
        CrashSnapshot::new(UNIX_EPOCH + Duration::from_millis(1500),
            CrashKind::Exception, "panic", reason,
            stack.iter().map(|x| x.to_string()).collect())
    }

    #[test]
    fn fractional_timestamp() {
        assert_eq!(snapshot("", &[]).timestamp(), 1.5);
    }

    #[test]
    fn timestamp_before_epoch() {
        let snap = CrashSnapshot::new(UNIX_EPOCH - Duration::from_secs(2),
            CrashKind::Signal, "SIGBUS", "", Vec::new());
        assert_eq!(snap.timestamp(), -2.0);
    }

    #[test]
    fn display_with_frames() {
        let text = snapshot("boom", &["0 main", "1 start"]).to_string();
        assert_eq!(text, "exception panic at 1.500: boom\n    0 main\n    1 start");
    }

    #[test]
    fn display_without_reason() {
        let text = snapshot("", &[]).to_string();
        assert_eq!(text, "exception panic at 1.500");
    }
}
