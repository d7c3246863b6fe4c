use std::any::Any;

use gpu_event_manager::{
    CallbackMode, EventCompletionType, EventKind, FutureId, InstanceId, ReadyEvent, TrackedEvent,
};
use refcount::{InternalRef, Ref, WeakRef};

use super::{stage_first, INSTANCE_DROPPED_MESSAGE};
use crate::callback::{DeviceLostCallback, RequestDeviceCallback};
use crate::device::Device;
use crate::status::{DeviceLostReason, RequestDeviceStatus};

// ============================================================================
// RequestDeviceEvent
// ============================================================================

/// Resolves a device request
///
/// The device object exists from the moment it is requested; this event
/// owns it until the callback receives it. A failed request resolves the
/// device's lost future with `FailedCreation` before the callback runs.
pub(crate) struct RequestDeviceEvent {
    instance_id: InstanceId,
    mode: CallbackMode,
    device: Ref<Device>,
    callback: Option<RequestDeviceCallback>,
    result: Option<(RequestDeviceStatus, String)>,
}

impl RequestDeviceEvent {
    pub(crate) fn new(
        instance_id: InstanceId,
        mode: CallbackMode,
        device: Ref<Device>,
        callback: Option<RequestDeviceCallback>,
    ) -> Self {
        Self {
            instance_id,
            mode,
            device,
            callback,
            result: None,
        }
    }
}

impl TrackedEvent for RequestDeviceEvent {
    fn kind(&self) -> EventKind {
        EventKind::RequestDevice
    }

    fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, _future_id: FutureId, completion: EventCompletionType) {
        let this = *self;
        let (status, message) = match completion {
            EventCompletionType::Shutdown => (
                RequestDeviceStatus::CallbackCancelled,
                INSTANCE_DROPPED_MESSAGE.to_string(),
            ),
            EventCompletionType::Ready => this
                .result
                .unwrap_or((RequestDeviceStatus::Error, String::new())),
        };

        let device = if status == RequestDeviceStatus::Success {
            Some(this.device)
        } else {
            if completion == EventCompletionType::Ready {
                this.device.fail_creation();
            }
            None
        };

        if let Some(callback) = this.callback {
            callback(status, device, message);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReadyEvent for RequestDeviceEvent {
    const KIND: EventKind = EventKind::RequestDevice;
    type Ready = (RequestDeviceStatus, String);

    fn ready(&mut self, result: Self::Ready) {
        stage_first(&mut self.result, result, Self::KIND);
    }
}

// ============================================================================
// DeviceLostEvent
// ============================================================================

/// The one lost notification of a device
///
/// Tracked when the device is created. The first report wins, whether it
/// comes from the host, from `Device::destroy`, or from a failed request.
pub(crate) struct DeviceLostEvent {
    instance_id: InstanceId,
    mode: CallbackMode,
    device: WeakRef<Device>,
    callback: Option<DeviceLostCallback>,
    result: Option<(DeviceLostReason, String)>,
}

impl DeviceLostEvent {
    pub(crate) fn new(
        instance_id: InstanceId,
        mode: CallbackMode,
        device: WeakRef<Device>,
        callback: Option<DeviceLostCallback>,
    ) -> Self {
        Self {
            instance_id,
            mode,
            device,
            callback,
            result: None,
        }
    }
}

impl TrackedEvent for DeviceLostEvent {
    fn kind(&self) -> EventKind {
        EventKind::DeviceLost
    }

    fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, _future_id: FutureId, completion: EventCompletionType) {
        let this = *self;
        let (reason, message) = match completion {
            EventCompletionType::Shutdown => (
                DeviceLostReason::CallbackCancelled,
                INSTANCE_DROPPED_MESSAGE.to_string(),
            ),
            EventCompletionType::Ready => this
                .result
                .unwrap_or((DeviceLostReason::Unknown, String::new())),
        };

        let device = this.device.upgrade();
        if let Some(device) = &device {
            device.mark_lost();
        }

        // No handle while the device is losing its last external owner
        let device = device.as_ref().and_then(InternalRef::try_to_external);
        if let Some(callback) = this.callback {
            callback(device, reason, message);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReadyEvent for DeviceLostEvent {
    const KIND: EventKind = EventKind::DeviceLost;
    type Ready = (DeviceLostReason, String);

    fn ready(&mut self, result: Self::Ready) {
        stage_first(&mut self.result, result, Self::KIND);
    }
}
