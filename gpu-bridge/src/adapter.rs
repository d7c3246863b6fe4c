//! Adapters: a host GPU chosen by `Instance::request_adapter`

use std::fmt;
use std::sync::Arc;

use gpu_event_manager::Future;
use refcount::{Counts, Ref, RefCount, RefCounted, WeakRef};
use tracing::{debug, warn};

use crate::bridge::{AdapterInfo, DeviceDescriptor, DeviceRequest};
use crate::callback::{CallbackInfo, DeviceLostCallback, RequestDeviceCallback};
use crate::device::Device;
use crate::events::RequestDeviceEvent;
use crate::object::{object_accessors, InstanceContext, ObjectBase, ObjectId};
use crate::status::{DeviceLostReason, RequestDeviceStatus};

pub struct Adapter {
    refs: RefCount,
    base: ObjectBase,
    this: WeakRef<Adapter>,
    info: AdapterInfo,
}

object_accessors!(Adapter);

impl Adapter {
    pub(crate) fn create(context: &Arc<InstanceContext>, id: ObjectId, info: AdapterInfo) -> Ref<Self> {
        Ref::new_cyclic(|this| Self {
            refs: RefCount::new(),
            base: ObjectBase::new(context, id, None),
            this,
            info,
        })
    }

    pub fn info(&self) -> &AdapterInfo {
        &self.info
    }

    /// Request a device from this adapter
    ///
    /// The device and its lost future exist as soon as this returns; the
    /// device is handed to `callback` on success. On failure the lost future
    /// resolves with `DeviceLostReason::FailedCreation` first.
    pub fn request_device<L, F>(
        &self,
        descriptor: &DeviceDescriptor,
        device_lost: CallbackInfo<L>,
        callback: CallbackInfo<F>,
    ) -> Future
    where
        L: FnOnce(Option<Ref<Device>>, DeviceLostReason, String) + Send + 'static,
        F: FnOnce(RequestDeviceStatus, Option<Ref<Device>>, String) + Send + 'static,
    {
        let resolved = device_lost.resolve().and_then(|lost| Ok((lost, callback.resolve()?)));
        let ((lost_mode, lost_callback), (mode, callback)) = match resolved {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(adapter = %self.id(), "Rejected device request: {}", e);
                return Future::NULL;
            }
        };
        let Some(adapter) = self.this.upgrade() else {
            return Future::NULL;
        };

        let context = &self.base.context;
        let device = Device::create(
            context,
            Some(adapter),
            descriptor.label.as_deref(),
            false,
            lost_mode,
            lost_callback.map(|f| Box::new(f) as DeviceLostCallback),
        );
        let request = DeviceRequest {
            device: device.id(),
            queue: device.queue().id(),
            lost_future: device.lost_future().id,
        };

        let event = RequestDeviceEvent::new(
            context.instance_id,
            mode,
            device,
            callback.map(|f| Box::new(f) as RequestDeviceCallback),
        );
        let future = context.track(event);

        debug!(
            adapter = %self.id(),
            device = %request.device,
            future_id = %future.id,
            "Requested device"
        );
        context.bridge.request_device(self.id(), future.id, &request, descriptor);
        future
    }
}

impl RefCounted for Adapter {
    fn counts(&self) -> Counts<'_> {
        Counts::Single(&self.refs)
    }

    fn on_last_ref_released(&self) {
        self.base.release();
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("base", &self.base)
            .field("info", &self.info)
            .finish()
    }
}
