//! Identity and mode types shared by every tracked event

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::EventManagerError;

/// Process-wide future id source. 0 is the null future.
static NEXT_FUTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide instance id source. 0 is the null instance.
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one asynchronous operation
///
/// Ids are issued from a single process-wide counter, so they are unique,
/// never reused, and ordered by issuance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FutureId(u64);

impl FutureId {
    /// The null future, never issued by `next()`
    pub const NULL: FutureId = FutureId(0);

    /// Issue the next future id
    pub fn next() -> Self {
        Self(NEXT_FUTURE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a raw id received from a host
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FutureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "future-{}", self.0)
    }
}

/// Identifier of one instance (one root of the API object tree)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct InstanceId(u64);

impl InstanceId {
    /// The null instance: events tracked without an owning instance
    pub const NULL: InstanceId = InstanceId(0);

    /// Issue the next instance id
    pub fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance-{}", self.0)
    }
}

/// How a future may legally be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallbackMode {
    /// Only through a blocking `wait_any`
    WaitAnyOnly,
    /// Through `wait_any` or an explicit `process_events`
    AllowProcessEvents,
    /// Immediately, on whatever thread reports readiness
    AllowSpontaneous,
}

impl CallbackMode {
    pub fn is_spontaneous(&self) -> bool {
        matches!(self, CallbackMode::AllowSpontaneous)
    }

    /// Raw value of this mode
    pub fn as_raw(&self) -> u32 {
        match self {
            CallbackMode::WaitAnyOnly => 1,
            CallbackMode::AllowProcessEvents => 2,
            CallbackMode::AllowSpontaneous => 3,
        }
    }
}

impl TryFrom<u32> for CallbackMode {
    type Error = EventManagerError;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(CallbackMode::WaitAnyOnly),
            2 => Ok(CallbackMode::AllowProcessEvents),
            3 => Ok(CallbackMode::AllowSpontaneous),
            other => Err(EventManagerError::InvalidCallbackMode(other)),
        }
    }
}

impl fmt::Display for CallbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallbackMode::WaitAnyOnly => "WaitAnyOnly",
            CallbackMode::AllowProcessEvents => "AllowProcessEvents",
            CallbackMode::AllowSpontaneous => "AllowSpontaneous",
        };
        f.write_str(name)
    }
}

/// Why an event is being completed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCompletionType {
    /// The host reported a result
    Ready,
    /// The owning instance went away before the operation finished
    Shutdown,
}

/// Handle to one asynchronous operation, returned by every async entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Future {
    pub id: FutureId,
}

impl Future {
    /// The future returned for rejected requests
    pub const NULL: Future = Future { id: FutureId::NULL };

    pub fn new(id: FutureId) -> Self {
        Self { id }
    }

    pub fn is_null(&self) -> bool {
        self.id.is_null()
    }
}

impl From<FutureId> for Future {
    fn from(id: FutureId) -> Self {
        Self { id }
    }
}
