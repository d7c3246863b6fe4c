//! Devices: the factory for buffers, shader modules and pipelines
//!
//! Every device carries exactly one lost future, tracked when the device is
//! created. It resolves once, through whichever comes first:
//!
//! - a host report (`HostCompletions::device_lost`)
//! - `Device::destroy`, explicit or on the last external drop
//! - a failed device request (`FailedCreation`)
//! - instance shutdown (`CallbackCancelled`)
//!
//! Imported devices belong to the host: they never synthesize a lost
//! result locally and losing their last external reference does not
//! destroy them.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gpu_event_manager::{CallbackMode, Future, FutureId};
use parking_lot::Mutex;
use refcount::{Counts, ExternalRefCount, InternalRef, Ref, RefCounted};
use tracing::{debug, warn};

use crate::adapter::Adapter;
use crate::bridge::{
    BufferDescriptor, ComputePipelineDescriptor, RenderPipelineDescriptor, ShaderModuleDescriptor,
};
use crate::buffer::Buffer;
use crate::callback::{
    CallbackInfo, CreateComputePipelineCallback, CreateRenderPipelineCallback, DeviceLostCallback,
    PopErrorScopeCallback, UncapturedErrorCallback,
};
use crate::error::{BridgeError, Result};
use crate::events::{
    CreateComputePipelineEvent, CreateRenderPipelineEvent, DeviceLostEvent, PopErrorScopeEvent,
};
use crate::object::{object_accessors, InstanceContext, ObjectBase, ObjectId};
use crate::pipeline::{ComputePipeline, RenderPipeline};
use crate::queue::Queue;
use crate::shader_module::ShaderModule;
use crate::status::{
    BufferUsage, CreatePipelineAsyncStatus, DeviceLostReason, ErrorFilter, ErrorType,
    PopErrorScopeStatus,
};

const DESTROYED_MESSAGE: &str = "Device was destroyed.";
const FAILED_CREATION_MESSAGE: &str = "Device failed at creation.";

pub struct Device {
    refs: ExternalRefCount,
    base: ObjectBase,

    /// Keeps the adapter alive for devices it created
    _adapter: Option<InternalRef<Adapter>>,
    queue: Ref<Queue>,
    lost_future: FutureId,
    imported: bool,

    destroyed: AtomicBool,
    lost: AtomicBool,
    uncaptured_error: Mutex<Option<UncapturedErrorCallback>>,
}

object_accessors!(Device);

impl Device {
    /// Create a device and track its lost future
    pub(crate) fn create(
        context: &Arc<InstanceContext>,
        adapter: Option<InternalRef<Adapter>>,
        label: Option<&str>,
        imported: bool,
        lost_mode: CallbackMode,
        lost_callback: Option<DeviceLostCallback>,
    ) -> Ref<Self> {
        Ref::new_cyclic(|this| {
            let lost_future = context.manager.track_event(DeviceLostEvent::new(
                context.instance_id,
                lost_mode,
                this,
                lost_callback,
            ));

            Self {
                refs: ExternalRefCount::new(),
                base: ObjectBase::new(context, ObjectId::next(), label),
                _adapter: adapter,
                queue: Queue::create(context, ObjectId::next(), None),
                lost_future,
                imported,
                destroyed: AtomicBool::new(false),
                lost: AtomicBool::new(false),
                uncaptured_error: Mutex::new(None),
            }
        })
    }

    /// Future resolved when the device is lost
    pub fn lost_future(&self) -> Future {
        Future::new(self.lost_future)
    }

    /// Whether the device's loss has been determined
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub fn is_imported(&self) -> bool {
        self.imported
    }

    pub fn queue(&self) -> Ref<Queue> {
        self.queue.clone()
    }

    /// Destroy the device
    ///
    /// Resolves the lost future with `Destroyed` unless the device was
    /// imported or its loss is already known. Repeated calls are no-ops.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        debug!(device = %self.id(), imported = self.imported, "Destroying device");
        if !self.imported && !self.lost.swap(true, Ordering::AcqRel) {
            self.report_lost(DeviceLostReason::Destroyed, DESTROYED_MESSAGE);
        }
        self.base.bridge().device_destroy(self.id());
    }

    /// The request that created this device failed
    pub(crate) fn fail_creation(&self) {
        self.destroyed.store(true, Ordering::Release);
        if !self.lost.swap(true, Ordering::AcqRel) {
            self.report_lost(DeviceLostReason::FailedCreation, FAILED_CREATION_MESSAGE);
        }
    }

    pub(crate) fn mark_lost(&self) {
        self.lost.store(true, Ordering::Release);
    }

    fn report_lost(&self, reason: DeviceLostReason, message: &str) {
        self.base
            .context
            .manager
            .set_future_ready::<DeviceLostEvent>(self.lost_future, (reason, message.to_string()));
    }

    // ========================================================================
    // Object creation
    // ========================================================================

    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<Ref<Buffer>> {
        let usage = descriptor.usage;
        if usage.contains(BufferUsage::MAP_READ | BufferUsage::MAP_WRITE) {
            return Err(BridgeError::Validation(
                "Buffer usage cannot include both MAP_READ and MAP_WRITE.".to_string(),
            ));
        }
        if descriptor.mapped_at_creation && descriptor.size % 4 != 0 {
            return Err(BridgeError::Validation(format!(
                "Buffer size ({}) must be a multiple of 4 when mapped at creation.",
                descriptor.size
            )));
        }

        let buffer = Buffer::create(&self.base.context, ObjectId::next(), descriptor);
        debug!(device = %self.id(), buffer = %buffer.id(), size = descriptor.size, "Created buffer");
        self.base
            .bridge()
            .create_buffer(self.id(), buffer.id(), descriptor);
        Ok(buffer)
    }

    pub fn create_shader_module(&self, descriptor: &ShaderModuleDescriptor) -> Ref<ShaderModule> {
        let module = ShaderModule::create(
            &self.base.context,
            ObjectId::next(),
            descriptor.label.as_deref(),
        );
        self.base
            .bridge()
            .create_shader_module(self.id(), module.id(), descriptor);
        module
    }

    pub fn create_compute_pipeline_async<F>(
        &self,
        descriptor: &ComputePipelineDescriptor,
        callback: CallbackInfo<F>,
    ) -> Future
    where
        F: FnOnce(CreatePipelineAsyncStatus, Option<Ref<ComputePipeline>>, String) + Send + 'static,
    {
        let (mode, callback) = match callback.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(device = %self.id(), "Rejected compute pipeline request: {}", e);
                return Future::NULL;
            }
        };

        let context = &self.base.context;
        let pipeline_id = ObjectId::next();
        let event = CreateComputePipelineEvent::new(
            context,
            mode,
            pipeline_id,
            descriptor.label.clone(),
            callback.map(|f| Box::new(f) as CreateComputePipelineCallback),
        );
        let future = context.track(event);

        context
            .bridge
            .create_compute_pipeline_async(self.id(), future.id, pipeline_id, descriptor);
        future
    }

    pub fn create_render_pipeline_async<F>(
        &self,
        descriptor: &RenderPipelineDescriptor,
        callback: CallbackInfo<F>,
    ) -> Future
    where
        F: FnOnce(CreatePipelineAsyncStatus, Option<Ref<RenderPipeline>>, String) + Send + 'static,
    {
        let (mode, callback) = match callback.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(device = %self.id(), "Rejected render pipeline request: {}", e);
                return Future::NULL;
            }
        };

        let context = &self.base.context;
        let pipeline_id = ObjectId::next();
        let event = CreateRenderPipelineEvent::new(
            context,
            mode,
            pipeline_id,
            descriptor.label.clone(),
            callback.map(|f| Box::new(f) as CreateRenderPipelineCallback),
        );
        let future = context.track(event);

        context
            .bridge
            .create_render_pipeline_async(self.id(), future.id, pipeline_id, descriptor);
        future
    }

    // ========================================================================
    // Errors
    // ========================================================================

    pub fn push_error_scope(&self, filter: ErrorFilter) {
        self.base.bridge().device_push_error_scope(self.id(), filter);
    }

    /// Pop the innermost error scope, resolving with the error it captured
    pub fn pop_error_scope<F>(&self, callback: CallbackInfo<F>) -> Future
    where
        F: FnOnce(PopErrorScopeStatus, ErrorType, String) + Send + 'static,
    {
        let (mode, callback) = match callback.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(device = %self.id(), "Rejected error scope pop: {}", e);
                return Future::NULL;
            }
        };

        let context = &self.base.context;
        let event = PopErrorScopeEvent::new(
            context.instance_id,
            mode,
            callback.map(|f| Box::new(f) as PopErrorScopeCallback),
        );
        let future = context.track(event);

        context.bridge.device_pop_error_scope(self.id(), future.id);
        future
    }

    /// Set the hook for errors not captured by any error scope
    pub fn set_uncaptured_error_callback<F>(&self, callback: F)
    where
        F: Fn(ErrorType, &str) + Send + Sync + 'static,
    {
        *self.uncaptured_error.lock() = Some(Arc::new(callback));
    }

    /// Deliver an error no scope captured
    ///
    /// Runs the hook synchronously on the calling thread; without a hook the
    /// error is logged.
    pub fn on_uncaptured_error(&self, error_type: ErrorType, message: &str) {
        let hook = self.uncaptured_error.lock().clone();
        match hook {
            Some(hook) => hook(error_type, message),
            None => warn!(
                device = %self.id(),
                error_type = %error_type,
                "Uncaptured error: {}",
                message
            ),
        }
    }
}

impl RefCounted for Device {
    fn counts(&self) -> Counts<'_> {
        Counts::WithExternal(&self.refs)
    }

    fn will_drop_last_external_ref(&self) {
        if !self.imported {
            self.destroy();
        }
    }

    fn on_last_ref_released(&self) {
        self.base.release();
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("base", &self.base)
            .field("lost_future", &self.lost_future)
            .field("imported", &self.imported)
            .field("destroyed", &self.destroyed.load(Ordering::Relaxed))
            .field("lost", &self.lost.load(Ordering::Relaxed))
            .finish()
    }
}
