//! Multi-wait types and the suspension capability
//!
//! A blocking `wait_any` with a positive timeout never spins: it hands the
//! set of futures to a `Suspender`, which parks the calling thread until one
//! of them completes or the timeout expires, and resumes it exactly once.

use std::fmt;
use std::time::Duration;

use crate::ids::{Future, FutureId};

/// Timeout value meaning "wait without deadline"
pub const WAIT_FOREVER_NANOS: u64 = u64::MAX;

/// One slot of a `wait_any` request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FutureWaitInfo {
    /// The future to wait on
    pub future: Future,
    /// Set by `wait_any` when the future has completed
    pub completed: bool,
}

impl FutureWaitInfo {
    pub fn new(future: Future) -> Self {
        Self {
            future,
            completed: false,
        }
    }
}

impl From<Future> for FutureWaitInfo {
    fn from(future: Future) -> Self {
        Self::new(future)
    }
}

/// Outcome of a `wait_any` call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitStatus {
    /// At least one future completed
    Success,
    /// No future completed before the timeout
    TimedOut,
    /// The request itself was invalid
    Error,
}

impl fmt::Display for WaitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WaitStatus::Success => "Success",
            WaitStatus::TimedOut => "TimedOut",
            WaitStatus::Error => "Error",
        };
        f.write_str(name)
    }
}

/// Cooperative suspension capability used by timed waits
///
/// Negotiated once per instance. Implementations block the calling thread
/// until one of `futures` has completed (its host result has been delivered
/// or it is no longer tracked) or until `timeout` elapses. `None` as timeout
/// means no deadline.
pub trait Suspender: Send + Sync {
    /// Returns the completed future, or `None` on timeout
    fn wait_any(&self, futures: &[FutureId], timeout: Option<Duration>) -> Option<FutureId>;
}

/// Convert a nanosecond timeout into the suspender's form
pub fn timeout_from_nanos(timeout_ns: u64) -> Option<Duration> {
    if timeout_ns == WAIT_FOREVER_NANOS {
        None
    } else {
        Some(Duration::from_nanos(timeout_ns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_conversion() {
        assert_eq!(timeout_from_nanos(WAIT_FOREVER_NANOS), None);
        assert_eq!(timeout_from_nanos(1_000), Some(Duration::from_micros(1)));
    }

    #[test]
    fn test_wait_info_starts_incomplete() {
        let info = FutureWaitInfo::from(Future::new(FutureId::from_raw(3)));
        assert!(!info.completed);
    }
}
