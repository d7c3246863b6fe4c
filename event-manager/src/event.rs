//! The tracked-event contract
//!
//! Every asynchronous operation is represented by one boxed `TrackedEvent`
//! owned by the `EventManager` from tracking until completion. An event kind
//! supplies two operations:
//!
//! - `ReadyEvent::ready`: absorb what the host reported (runs under the
//!   manager lock, so it must only store data)
//! - `TrackedEvent::complete`: settle final values and invoke the user
//!   callback (runs outside any lock, consumes the event)
//!
//! `EventKind` is the explicit tag used to type-check a future before its
//! event is downcast.

use std::any::Any;
use std::fmt;

use crate::ids::{CallbackMode, EventCompletionType, FutureId, InstanceId};

/// Tag identifying each kind of tracked event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RequestAdapter,
    RequestDevice,
    DeviceLost,
    MapAsync,
    CreateComputePipeline,
    CreateRenderPipeline,
    WorkDone,
    PopErrorScope,
    CompilationInfo,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::RequestAdapter => "RequestAdapter",
            EventKind::RequestDevice => "RequestDevice",
            EventKind::DeviceLost => "DeviceLost",
            EventKind::MapAsync => "MapAsync",
            EventKind::CreateComputePipeline => "CreateComputePipeline",
            EventKind::CreateRenderPipeline => "CreateRenderPipeline",
            EventKind::WorkDone => "WorkDone",
            EventKind::PopErrorScope => "PopErrorScope",
            EventKind::CompilationInfo => "CompilationInfo",
        };
        f.write_str(name)
    }
}

/// One in-flight asynchronous operation
pub trait TrackedEvent: Any + Send {
    /// Kind tag, checked before any typed access
    fn kind(&self) -> EventKind;

    /// Instance that owns this event
    fn instance_id(&self) -> InstanceId;

    /// How the event may be resolved
    fn callback_mode(&self) -> CallbackMode;

    /// Settle final values and invoke the callback
    ///
    /// Called exactly once, outside the manager lock. On
    /// `EventCompletionType::Shutdown` implementations substitute their
    /// cancellation values instead of any staged result.
    fn complete(self: Box<Self>, future_id: FutureId, completion: EventCompletionType);

    /// Access for typed downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// An event kind that can absorb a typed host result
pub trait ReadyEvent: TrackedEvent + Sized {
    /// Kind tag matching `TrackedEvent::kind`
    const KIND: EventKind;

    /// What the host reports for this kind
    type Ready;

    /// Store the reported result
    ///
    /// Runs under the manager lock. May run more than once for kinds that
    /// accept repeated notifications; each kind decides how repeats combine.
    fn ready(&mut self, result: Self::Ready);
}
