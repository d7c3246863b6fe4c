//! # GPU Bridge - futures and handles for a host-bridged GPU API
//!
//! A WebGPU-shaped object surface whose real work happens in an external
//! host. Every asynchronous operation returns a [`Future`] that resolves
//! exactly once: when the host reports a result, or with `CallbackCancelled`
//! when the owning instance is dropped first.
//!
//! ```rust,ignore
//! use gpu_bridge::prelude::*;
//!
//! let instance = Instance::builder()
//!     .descriptor(InstanceDescriptor::timed_wait())
//!     .bridge(host_bridge)
//!     .build()?;
//! let completions = HostCompletions::for_instance(&instance);
//!
//! let future = instance.request_adapter(
//!     &RequestAdapterOptions::default(),
//!     CallbackInfo::wait_any_only(|status, adapter, message| {
//!         println!("adapter: {status:?} {message}");
//!     }),
//! );
//!
//! // The host answers through `completions` on any thread
//! let mut infos = [FutureWaitInfo::new(future)];
//! instance.wait_any(&mut infos, WAIT_FOREVER_NANOS);
//! ```
//!
//! ## Callback modes
//!
//! - **`AllowSpontaneous`**: the callback runs on whichever thread delivers
//!   the host result
//! - **`AllowProcessEvents`**: the callback runs inside
//!   `Instance::process_events`
//! - **`WaitAnyOnly`**: the callback runs inside `Instance::wait_any`
//!
//! ## Architecture
//!
//! ```text
//! Instance / Adapter / Device / Queue / Buffer / ShaderModule / Pipelines
//!     │ track event                        ▲ callback (outside locks)
//!     ▼                                    │
//! gpu_event_manager::EventManager ─────────┘
//!     │ FutureId                           ▲ set_future_ready
//!     ▼                                    │
//! HostBridge (outbound) ──── host ──── HostCompletions (inbound)
//! ```

// Modules
mod adapter;
mod bridge;
mod buffer;
mod callback;
mod completion;
mod config;
mod device;
mod error;
mod events;
mod instance;
pub mod logging;
mod object;
mod pipeline;
mod queue;
mod shader_module;
mod status;

// Main exports
pub use adapter::Adapter;
pub use buffer::Buffer;
pub use device::Device;
pub use instance::{global_event_manager, Instance, InstanceBuilder};
pub use pipeline::{ComputePipeline, RenderPipeline};
pub use queue::Queue;
pub use shader_module::ShaderModule;

pub use bridge::{
    AdapterInfo, BufferDescriptor, ComputePipelineDescriptor, DeviceDescriptor, DeviceRequest,
    HostBridge, RenderPipelineDescriptor, RequestAdapterOptions, ShaderModuleDescriptor,
    TimedWaitSupport,
};
pub use callback::{
    CallbackInfo, CompilationInfoCallback, CreateComputePipelineCallback,
    CreateRenderPipelineCallback, DeviceLostCallback, MapAsyncCallback, PopErrorScopeCallback,
    RequestAdapterCallback, RequestDeviceCallback, UncapturedErrorCallback, WorkDoneCallback,
};
pub use completion::HostCompletions;
pub use config::{InstanceDescriptor, InstanceFeature, InstanceLimits, MAX_TIMED_WAIT_ANY_COUNT};
pub use error::{BridgeError, Result};
pub use events::INSTANCE_DROPPED_MESSAGE;
pub use object::ObjectId;
pub use status::{
    AdapterType, BufferMapState, BufferUsage, CompilationInfo, CompilationInfoRequestStatus,
    CompilationMessage, CompilationMessageType, CreatePipelineAsyncStatus, DeviceLostReason,
    ErrorFilter, ErrorType, MapAsyncStatus, MapMode, PopErrorScopeStatus, PowerPreference,
    QueueWorkDoneStatus, RequestAdapterStatus, RequestDeviceStatus,
};

// Re-export the engine types that appear in this crate's API
pub use gpu_event_manager::{
    CallbackMode, EventManager, Future, FutureId, FutureWaitInfo, InstanceId, Suspender,
    WaitStatus, WAIT_FOREVER_NANOS,
};
pub use refcount::Ref;

/// Commonly used types
pub mod prelude {
    pub use crate::{
        Adapter, BridgeError, Buffer, BufferDescriptor, BufferMapState, BufferUsage, CallbackInfo,
        CallbackMode, Device, DeviceDescriptor, DeviceLostReason, Future, FutureWaitInfo,
        HostBridge, HostCompletions, Instance, InstanceDescriptor, MapAsyncStatus, MapMode,
        Queue, QueueWorkDoneStatus, Ref, RequestAdapterOptions, RequestAdapterStatus,
        RequestDeviceStatus, Result, WaitStatus, WAIT_FOREVER_NANOS,
    };
}
