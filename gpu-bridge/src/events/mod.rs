//! Tracked events, one per kind of asynchronous operation
//!
//! Each event stores what the host reported in its `ready` hook and turns it
//! into the final callback arguments in `complete`. On shutdown the staged
//! result is discarded and the operation resolves as cancelled.

mod adapter;
mod device;
mod error_scope;
mod map;
mod pipeline;
mod queue;
mod shader;

pub(crate) use adapter::RequestAdapterEvent;
pub(crate) use device::{DeviceLostEvent, RequestDeviceEvent};
pub(crate) use error_scope::PopErrorScopeEvent;
pub(crate) use map::MapAsyncEvent;
pub(crate) use pipeline::{CreateComputePipelineEvent, CreateRenderPipelineEvent};
pub(crate) use queue::WorkDoneEvent;
pub(crate) use shader::CompilationInfoEvent;

use gpu_event_manager::EventKind;
use tracing::warn;

/// Message delivered with every cancellation caused by dropping the instance
pub const INSTANCE_DROPPED_MESSAGE: &str = "A valid external Instance reference no longer exists.";

/// Keep the first reported result; later reports are ignored
pub(crate) fn stage_first<T>(slot: &mut Option<T>, result: T, kind: EventKind) {
    if slot.is_some() {
        warn!(kind = %kind, "Ignoring repeated ready notification");
        return;
    }
    *slot = Some(result);
}
