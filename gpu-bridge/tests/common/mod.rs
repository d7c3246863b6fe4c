//! Shared fixtures: a host bridge that records every notification
//!
//! The fake never answers on its own. Tests play the host by feeding results
//! through `HostCompletions`, which keeps every interleaving explicit.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gpu_bridge::{
    Adapter, AdapterInfo, BufferDescriptor, CallbackInfo, ComputePipelineDescriptor, Device,
    DeviceDescriptor, DeviceLostCallback, DeviceRequest, ErrorFilter, EventManager, FutureId,
    HostBridge, HostCompletions, Instance, InstanceDescriptor, MapMode, ObjectId, Ref,
    RenderPipelineDescriptor, RequestAdapterOptions, RequestAdapterStatus, RequestDeviceStatus,
    ShaderModuleDescriptor, TimedWaitSupport,
};

/// One notification received by the fake host
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RequestAdapter { future: FutureId, adapter: ObjectId },
    RequestDevice { future: FutureId, request: DeviceRequest },
    CreateBuffer { device: ObjectId, buffer: ObjectId, size: u64 },
    BufferMapAsync { buffer: ObjectId, future: FutureId, mode: MapMode, offset: u64, size: u64 },
    BufferUnmap(ObjectId),
    BufferDestroy(ObjectId),
    QueueSubmit(ObjectId),
    QueueWorkDone { queue: ObjectId, future: FutureId },
    DeviceDestroy(ObjectId),
    PushErrorScope { device: ObjectId, filter: ErrorFilter },
    PopErrorScope { device: ObjectId, future: FutureId },
    CreateShaderModule { device: ObjectId, module: ObjectId },
    CompilationInfo { module: ObjectId, future: FutureId },
    CreateComputePipeline { device: ObjectId, future: FutureId, pipeline: ObjectId },
    CreateRenderPipeline { device: ObjectId, future: FutureId, pipeline: ObjectId },
    Release(ObjectId),
    SetLabel(ObjectId, String),
}

/// Recording host bridge with a byte store standing in for buffer memory
#[derive(Default)]
pub struct FakeBridge {
    calls: Mutex<Vec<Call>>,
    memory: Mutex<HashMap<ObjectId, Vec<u8>>>,
    timed_wait: TimedWaitSupport,
}

impl FakeBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_timed_wait(timed_wait: TimedWaitSupport) -> Arc<Self> {
        Arc::new(Self {
            timed_wait,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| predicate(call)).count()
    }

    /// Future of the most recent device request
    pub fn last_device_request(&self) -> Option<(FutureId, DeviceRequest)> {
        self.calls.lock().unwrap().iter().rev().find_map(|call| match call {
            Call::RequestDevice { future, request } => Some((*future, *request)),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl HostBridge for FakeBridge {
    fn request_adapter(
        &self,
        _instance: ObjectId,
        future: FutureId,
        adapter: ObjectId,
        _options: &RequestAdapterOptions,
    ) {
        self.record(Call::RequestAdapter { future, adapter });
    }

    fn request_device(
        &self,
        _adapter: ObjectId,
        future: FutureId,
        request: &DeviceRequest,
        _descriptor: &DeviceDescriptor,
    ) {
        self.record(Call::RequestDevice {
            future,
            request: *request,
        });
    }

    fn create_buffer(&self, device: ObjectId, buffer: ObjectId, descriptor: &BufferDescriptor) {
        self.memory
            .lock()
            .unwrap()
            .insert(buffer, vec![0; descriptor.size as usize]);
        self.record(Call::CreateBuffer {
            device,
            buffer,
            size: descriptor.size,
        });
    }

    fn buffer_map_async(&self, buffer: ObjectId, future: FutureId, mode: MapMode, offset: u64, size: u64) {
        self.record(Call::BufferMapAsync {
            buffer,
            future,
            mode,
            offset,
            size,
        });
    }

    fn buffer_unmap(&self, buffer: ObjectId) {
        self.record(Call::BufferUnmap(buffer));
    }

    fn buffer_destroy(&self, buffer: ObjectId) {
        self.record(Call::BufferDestroy(buffer));
    }

    fn buffer_read(&self, buffer: ObjectId, offset: u64, data: &mut [u8]) {
        let memory = self.memory.lock().unwrap();
        let start = offset as usize;
        data.copy_from_slice(&memory[&buffer][start..start + data.len()]);
    }

    fn buffer_write(&self, buffer: ObjectId, offset: u64, data: &[u8]) {
        let mut memory = self.memory.lock().unwrap();
        let start = offset as usize;
        if let Some(bytes) = memory.get_mut(&buffer) {
            bytes[start..start + data.len()].copy_from_slice(data);
        }
    }

    fn queue_submit(&self, queue: ObjectId) {
        self.record(Call::QueueSubmit(queue));
    }

    fn queue_on_submitted_work_done(&self, queue: ObjectId, future: FutureId) {
        self.record(Call::QueueWorkDone { queue, future });
    }

    fn device_destroy(&self, device: ObjectId) {
        self.record(Call::DeviceDestroy(device));
    }

    fn device_push_error_scope(&self, device: ObjectId, filter: ErrorFilter) {
        self.record(Call::PushErrorScope { device, filter });
    }

    fn device_pop_error_scope(&self, device: ObjectId, future: FutureId) {
        self.record(Call::PopErrorScope { device, future });
    }

    fn create_shader_module(&self, device: ObjectId, module: ObjectId, _descriptor: &ShaderModuleDescriptor) {
        self.record(Call::CreateShaderModule { device, module });
    }

    fn shader_module_get_compilation_info(&self, module: ObjectId, future: FutureId) {
        self.record(Call::CompilationInfo { module, future });
    }

    fn create_compute_pipeline_async(
        &self,
        device: ObjectId,
        future: FutureId,
        pipeline: ObjectId,
        _descriptor: &ComputePipelineDescriptor,
    ) {
        self.record(Call::CreateComputePipeline {
            device,
            future,
            pipeline,
        });
    }

    fn create_render_pipeline_async(
        &self,
        device: ObjectId,
        future: FutureId,
        pipeline: ObjectId,
        _descriptor: &RenderPipelineDescriptor,
    ) {
        self.record(Call::CreateRenderPipeline {
            device,
            future,
            pipeline,
        });
    }

    fn release_object(&self, object: ObjectId) {
        self.record(Call::Release(object));
    }

    fn set_label(&self, object: ObjectId, label: &str) {
        self.record(Call::SetLabel(object, label.to_string()));
    }

    fn timed_wait_support(&self) -> TimedWaitSupport {
        self.timed_wait.clone()
    }
}

// ============================================================================
// Object fixtures
// ============================================================================

/// Instance on its own event manager, isolated from other tests
pub fn instance(bridge: &Arc<FakeBridge>) -> Ref<Instance> {
    instance_with(bridge, InstanceDescriptor::default())
}

pub fn instance_with(bridge: &Arc<FakeBridge>, descriptor: InstanceDescriptor) -> Ref<Instance> {
    Instance::builder()
        .descriptor(descriptor)
        .bridge(Arc::clone(bridge) as Arc<dyn HostBridge>)
        .with_event_manager(Arc::new(EventManager::new()))
        .build()
        .unwrap()
}

pub fn adapter(instance: &Instance) -> Ref<Adapter> {
    let completions = HostCompletions::for_instance(instance);
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);

    let future = instance.request_adapter(
        &RequestAdapterOptions::default(),
        CallbackInfo::spontaneous(
            move |_: RequestAdapterStatus, adapter: Option<Ref<Adapter>>, _: String| {
                *sink.lock().unwrap() = adapter;
            },
        ),
    );
    let info = AdapterInfo {
        vendor: "test-vendor".to_string(),
        ..AdapterInfo::default()
    };
    completions.request_adapter_completed(
        future.id.as_u64(),
        RequestAdapterStatus::Success,
        Some(info),
        None,
    );

    let adapter = slot.lock().unwrap().take();
    adapter.unwrap()
}

/// A device whose loss is not observed
pub fn device(instance: &Instance, adapter: &Adapter) -> Ref<Device> {
    device_with_lost(instance, adapter, CallbackInfo::<DeviceLostCallback>::none())
}

pub fn device_with_lost<L>(instance: &Instance, adapter: &Adapter, device_lost: CallbackInfo<L>) -> Ref<Device>
where
    L: FnOnce(Option<Ref<Device>>, gpu_bridge::DeviceLostReason, String) + Send + 'static,
{
    let completions = HostCompletions::for_instance(instance);
    let slot = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&slot);

    let future = adapter.request_device(
        &DeviceDescriptor::default(),
        device_lost,
        CallbackInfo::spontaneous(
            move |_: RequestDeviceStatus, device: Option<Ref<Device>>, _: String| {
                *sink.lock().unwrap() = device;
            },
        ),
    );
    completions.request_device_completed(future.id.as_u64(), RequestDeviceStatus::Success, None);

    let device = slot.lock().unwrap().take();
    device.unwrap()
}

pub fn map_read_buffer(device: &Device, size: u64) -> Ref<gpu_bridge::Buffer> {
    device
        .create_buffer(&BufferDescriptor {
            label: None,
            size,
            usage: gpu_bridge::BufferUsage::MAP_READ | gpu_bridge::BufferUsage::COPY_DST,
            mapped_at_creation: false,
        })
        .unwrap()
}
