//! Inbound entry points for host results
//!
//! The host reports each result by the raw future id it was handed through
//! `HostBridge`. Any thread may call these at any time, including from
//! inside a `HostBridge` call. A result for an unknown or already resolved
//! future is dropped and the call returns `false`.
//!
//! ```rust,ignore
//! let completions = HostCompletions::for_instance(&instance);
//!
//! // Later, on a host worker thread
//! completions.work_done_completed(future_id, QueueWorkDoneStatus::Success, None);
//! ```

use std::fmt;
use std::sync::Arc;

use gpu_event_manager::{EventManager, FutureId, ReadyEvent};
use tracing::trace;

use crate::bridge::AdapterInfo;
use crate::events::{
    CompilationInfoEvent, CreateComputePipelineEvent, CreateRenderPipelineEvent, DeviceLostEvent,
    MapAsyncEvent, PopErrorScopeEvent, RequestAdapterEvent, RequestDeviceEvent, WorkDoneEvent,
};
use crate::instance::Instance;
use crate::status::{
    CompilationInfo, CompilationInfoRequestStatus, CreatePipelineAsyncStatus, DeviceLostReason,
    ErrorType, MapAsyncStatus, PopErrorScopeStatus, QueueWorkDoneStatus, RequestAdapterStatus,
    RequestDeviceStatus,
};

/// Delivers host results to the event manager
#[derive(Clone)]
pub struct HostCompletions {
    manager: Arc<EventManager>,
}

impl HostCompletions {
    pub fn new(manager: Arc<EventManager>) -> Self {
        Self { manager }
    }

    /// Completions for the manager tracking `instance`'s futures
    pub fn for_instance(instance: &Instance) -> Self {
        Self::new(Arc::clone(instance.event_manager()))
    }

    fn deliver<E: ReadyEvent>(&self, future: u64, result: E::Ready) -> bool {
        let future_id = FutureId::from_raw(future);
        let delivered = self.manager.set_future_ready::<E>(future_id, result);
        if !delivered {
            trace!(future_id = %future_id, kind = %E::KIND, "Dropped result for untracked future");
        }
        delivered
    }

    /// `info` is required with `Success`
    pub fn request_adapter_completed(
        &self,
        future: u64,
        status: RequestAdapterStatus,
        info: Option<AdapterInfo>,
        message: Option<&str>,
    ) -> bool {
        self.deliver::<RequestAdapterEvent>(future, (status, info, owned(message)))
    }

    pub fn request_device_completed(
        &self,
        future: u64,
        status: RequestDeviceStatus,
        message: Option<&str>,
    ) -> bool {
        self.deliver::<RequestDeviceEvent>(future, (status, owned(message)))
    }

    /// Report a device loss through the device's lost future
    pub fn device_lost(&self, future: u64, reason: DeviceLostReason, message: Option<&str>) -> bool {
        self.deliver::<DeviceLostEvent>(future, (reason, owned(message)))
    }

    pub fn map_async_completed(
        &self,
        future: u64,
        status: MapAsyncStatus,
        message: Option<&str>,
    ) -> bool {
        self.deliver::<MapAsyncEvent>(future, (status, owned(message)))
    }

    pub fn work_done_completed(
        &self,
        future: u64,
        status: QueueWorkDoneStatus,
        message: Option<&str>,
    ) -> bool {
        self.deliver::<WorkDoneEvent>(future, (status, owned(message)))
    }

    pub fn pop_error_scope_completed(
        &self,
        future: u64,
        status: PopErrorScopeStatus,
        error_type: ErrorType,
        message: Option<&str>,
    ) -> bool {
        self.deliver::<PopErrorScopeEvent>(future, (status, error_type, owned(message)))
    }

    pub fn compilation_info_completed(
        &self,
        future: u64,
        status: CompilationInfoRequestStatus,
        info: Option<CompilationInfo>,
    ) -> bool {
        self.deliver::<CompilationInfoEvent>(future, (status, info))
    }

    pub fn compute_pipeline_completed(
        &self,
        future: u64,
        status: CreatePipelineAsyncStatus,
        message: Option<&str>,
    ) -> bool {
        self.deliver::<CreateComputePipelineEvent>(future, (status, owned(message)))
    }

    pub fn render_pipeline_completed(
        &self,
        future: u64,
        status: CreatePipelineAsyncStatus,
        message: Option<&str>,
    ) -> bool {
        self.deliver::<CreateRenderPipelineEvent>(future, (status, owned(message)))
    }
}

fn owned(message: Option<&str>) -> String {
    message.map(str::to_string).unwrap_or_default()
}

impl fmt::Debug for HostCompletions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostCompletions")
            .field("pending", &self.manager.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_future_is_ignored() {
        let completions = HostCompletions::new(Arc::new(EventManager::new()));
        assert!(!completions.work_done_completed(42, QueueWorkDoneStatus::Success, None));
        assert!(!completions.device_lost(0, DeviceLostReason::Unknown, Some("gone")));
    }

    #[test]
    fn test_owned_message() {
        assert_eq!(owned(None), "");
        assert_eq!(owned(Some("lost")), "lost");
    }
}
