//! The outbound boundary to the host that does the real GPU work
//!
//! Every method is a one-way notification. The host reports results later,
//! from any thread, through `HostCompletions`, addressing the operation by
//! the `FutureId` it was given here. Objects the host should create are
//! identified up front by an `ObjectId` chosen on this side.

use std::fmt;
use std::sync::Arc;

use gpu_event_manager::{FutureId, Suspender};
use serde::{Deserialize, Serialize};

use crate::object::ObjectId;
use crate::status::{AdapterType, BufferUsage, ErrorFilter, MapMode, PowerPreference};

// ============================================================================
// Descriptors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestAdapterOptions {
    pub power_preference: PowerPreference,
    pub force_fallback_adapter: bool,
}

/// What the host reports about an adapter it found
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterInfo {
    pub vendor: String,
    pub architecture: String,
    pub device: String,
    pub description: String,
    pub adapter_type: AdapterType,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceDescriptor {
    pub label: Option<String>,
}

/// Identities allocated for a requested device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceRequest {
    pub device: ObjectId,
    pub queue: ObjectId,
    /// Future the host resolves through `HostCompletions::device_lost`
    pub lost_future: FutureId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub size: u64,
    pub usage: BufferUsage,
    pub mapped_at_creation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ShaderModuleDescriptor {
    pub label: Option<String>,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipelineDescriptor {
    pub label: Option<String>,
    pub module: ObjectId,
    pub entry_point: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPipelineDescriptor {
    pub label: Option<String>,
    pub vertex_module: ObjectId,
    pub vertex_entry_point: String,
    /// Fragment stage, if any
    pub fragment: Option<(ObjectId, String)>,
}

// ============================================================================
// Timed wait capability
// ============================================================================

/// How the host supports blocking `wait_any` with a timeout
#[derive(Clone, Default)]
pub enum TimedWaitSupport {
    /// Timed waits are unavailable
    #[default]
    Unsupported,
    /// Use the event manager's own condition variable
    Native,
    /// Use a host-provided suspender
    Host(Arc<dyn Suspender>),
}

impl fmt::Debug for TimedWaitSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimedWaitSupport::Unsupported => f.write_str("Unsupported"),
            TimedWaitSupport::Native => f.write_str("Native"),
            TimedWaitSupport::Host(_) => f.write_str("Host(..)"),
        }
    }
}

// ============================================================================
// HostBridge
// ============================================================================

/// Notifications sent to the host
///
/// Implementations must not block waiting on a result they will report
/// through `HostCompletions`; they may report it synchronously from inside
/// the call.
pub trait HostBridge: Send + Sync {
    fn request_adapter(
        &self,
        instance: ObjectId,
        future: FutureId,
        adapter: ObjectId,
        options: &RequestAdapterOptions,
    );

    fn request_device(
        &self,
        adapter: ObjectId,
        future: FutureId,
        request: &DeviceRequest,
        descriptor: &DeviceDescriptor,
    );

    fn create_buffer(&self, device: ObjectId, buffer: ObjectId, descriptor: &BufferDescriptor);

    fn buffer_map_async(
        &self,
        buffer: ObjectId,
        future: FutureId,
        mode: MapMode,
        offset: u64,
        size: u64,
    );

    fn buffer_unmap(&self, buffer: ObjectId);

    fn buffer_destroy(&self, buffer: ObjectId);

    /// Copy out of a mapped range
    fn buffer_read(&self, buffer: ObjectId, offset: u64, data: &mut [u8]);

    /// Copy into a mapped range
    fn buffer_write(&self, buffer: ObjectId, offset: u64, data: &[u8]);

    fn queue_submit(&self, queue: ObjectId);

    fn queue_on_submitted_work_done(&self, queue: ObjectId, future: FutureId);

    fn device_destroy(&self, device: ObjectId);

    fn device_push_error_scope(&self, device: ObjectId, filter: ErrorFilter);

    fn device_pop_error_scope(&self, device: ObjectId, future: FutureId);

    fn create_shader_module(
        &self,
        device: ObjectId,
        module: ObjectId,
        descriptor: &ShaderModuleDescriptor,
    );

    fn shader_module_get_compilation_info(&self, module: ObjectId, future: FutureId);

    fn create_compute_pipeline_async(
        &self,
        device: ObjectId,
        future: FutureId,
        pipeline: ObjectId,
        descriptor: &ComputePipelineDescriptor,
    );

    fn create_render_pipeline_async(
        &self,
        device: ObjectId,
        future: FutureId,
        pipeline: ObjectId,
        descriptor: &RenderPipelineDescriptor,
    );

    /// The object's last reference is gone
    fn release_object(&self, object: ObjectId);

    fn set_label(&self, _object: ObjectId, _label: &str) {}

    /// Queried once, when an instance is built
    fn timed_wait_support(&self) -> TimedWaitSupport {
        TimedWaitSupport::Unsupported
    }
}
