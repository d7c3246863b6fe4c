//! Instances: the root of every object graph and the owner of its futures
//!
//! An instance registers itself with an `EventManager` when it is built and
//! unregisters when its last reference is dropped. Unregistering completes
//! every future still pending under the instance with `Shutdown`, so no
//! callback is ever lost.

use std::fmt;
use std::sync::{Arc, OnceLock};

use gpu_event_manager::{EventManager, Future, FutureWaitInfo, InstanceId, Suspender, WaitStatus};
use refcount::{Counts, Ref, RefCount, RefCounted};
use tracing::{debug, info, warn};

use crate::adapter::Adapter;
use crate::bridge::{DeviceDescriptor, HostBridge, RequestAdapterOptions, TimedWaitSupport};
use crate::callback::{CallbackInfo, DeviceLostCallback, RequestAdapterCallback};
use crate::config::{InstanceDescriptor, InstanceFeature, InstanceLimits};
use crate::device::Device;
use crate::error::{BridgeError, Result};
use crate::events::RequestAdapterEvent;
use crate::object::{object_accessors, InstanceContext, ObjectBase, ObjectId};
use crate::status::{DeviceLostReason, RequestAdapterStatus};

static GLOBAL_EVENT_MANAGER: OnceLock<Arc<EventManager>> = OnceLock::new();

/// The process-wide event manager
///
/// Created on first use and shared by every instance built without an
/// explicit manager.
pub fn global_event_manager() -> Arc<EventManager> {
    Arc::clone(GLOBAL_EVENT_MANAGER.get_or_init(|| Arc::new(EventManager::new())))
}

pub struct Instance {
    refs: RefCount,
    base: ObjectBase,
    descriptor: InstanceDescriptor,

    /// Present when `TimedWaitAny` was negotiated
    suspender: Option<Arc<dyn Suspender>>,
}

object_accessors!(Instance);

impl Instance {
    pub fn builder() -> InstanceBuilder {
        InstanceBuilder::default()
    }

    /// Create an instance with the default descriptor
    pub fn new(bridge: Arc<dyn HostBridge>) -> Result<Ref<Self>> {
        Self::builder().bridge(bridge).build()
    }

    pub fn instance_id(&self) -> InstanceId {
        self.base.context.instance_id
    }

    pub fn descriptor(&self) -> &InstanceDescriptor {
        &self.descriptor
    }

    pub fn has_feature(&self, feature: InstanceFeature) -> bool {
        self.descriptor.has_feature(feature)
    }

    pub fn limits(&self) -> InstanceLimits {
        self.descriptor.required_limits
    }

    pub fn event_manager(&self) -> &Arc<EventManager> {
        &self.base.context.manager
    }

    /// Ask the host for an adapter
    pub fn request_adapter<F>(
        &self,
        options: &RequestAdapterOptions,
        callback: CallbackInfo<F>,
    ) -> Future
    where
        F: FnOnce(RequestAdapterStatus, Option<Ref<Adapter>>, String) + Send + 'static,
    {
        let (mode, callback) = match callback.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(instance_id = %self.instance_id(), "Rejected adapter request: {}", e);
                return Future::NULL;
            }
        };

        let context = &self.base.context;
        let adapter_id = ObjectId::next();
        let event = RequestAdapterEvent::new(
            context,
            mode,
            adapter_id,
            callback.map(|f| Box::new(f) as RequestAdapterCallback),
        );
        let future = context.track(event);

        debug!(
            instance_id = %context.instance_id,
            future_id = %future.id,
            adapter = %adapter_id,
            "Requested adapter"
        );
        context
            .bridge
            .request_adapter(self.id(), future.id, adapter_id, options);
        future
    }

    /// Wrap a device the host already created
    ///
    /// The device is usable immediately. It never reports a local loss and
    /// dropping it does not destroy it on the host.
    pub fn import_device<L>(
        &self,
        descriptor: &DeviceDescriptor,
        device_lost: CallbackInfo<L>,
    ) -> Result<Ref<Device>>
    where
        L: FnOnce(Option<Ref<Device>>, DeviceLostReason, String) + Send + 'static,
    {
        let (lost_mode, lost_callback) = device_lost.resolve()?;
        let device = Device::create(
            &self.base.context,
            None,
            descriptor.label.as_deref(),
            true,
            lost_mode,
            lost_callback.map(|f| Box::new(f) as DeviceLostCallback),
        );
        debug!(instance_id = %self.instance_id(), device = %device.id(), "Imported device");
        Ok(device)
    }

    /// Complete every ready `AllowProcessEvents` future of this instance
    ///
    /// Returns the number of callbacks run.
    pub fn process_events(&self) -> usize {
        self.event_manager().process_events(self.instance_id())
    }

    /// Wait until any of `infos` completes
    ///
    /// A zero timeout polls. A positive timeout requires the `TimedWaitAny`
    /// feature and at most `timed_wait_any_max_count` futures; otherwise the
    /// call fails with `WaitStatus::Error` without waiting.
    pub fn wait_any(&self, infos: &mut [FutureWaitInfo], timeout_ns: u64) -> WaitStatus {
        let instance_id = self.instance_id();
        let suspender = if timeout_ns > 0 {
            if !self.has_feature(InstanceFeature::TimedWaitAny) {
                warn!(instance_id = %instance_id, "Timed wait requires TimedWaitAny");
                return WaitStatus::Error;
            }

            let limit = self.limits().timed_wait_any_max_count;
            if infos.len() > limit {
                warn!(
                    instance_id = %instance_id,
                    count = infos.len(),
                    limit,
                    "Too many futures for a timed wait"
                );
                return WaitStatus::Error;
            }

            match &self.suspender {
                Some(suspender) => Some(suspender.as_ref()),
                None => {
                    warn!(instance_id = %instance_id, "No suspender negotiated for timed wait");
                    return WaitStatus::Error;
                }
            }
        } else {
            None
        };

        self.event_manager()
            .wait_any(instance_id, infos, timeout_ns, suspender)
    }
}

impl RefCounted for Instance {
    fn counts(&self) -> Counts<'_> {
        Counts::Single(&self.refs)
    }

    fn on_last_ref_released(&self) {
        let instance_id = self.instance_id();
        let cancelled = self.event_manager().unregister_instance(instance_id);
        info!(instance_id = %instance_id, cancelled, "Instance released");
        self.base.release();
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("base", &self.base)
            .field("descriptor", &self.descriptor)
            .field("timed_wait", &self.suspender.is_some())
            .finish()
    }
}

// ============================================================================
// InstanceBuilder
// ============================================================================

/// Builder for instance configuration
#[derive(Default)]
pub struct InstanceBuilder {
    descriptor: InstanceDescriptor,
    bridge: Option<Arc<dyn HostBridge>>,
    event_manager: Option<Arc<EventManager>>,
}

impl InstanceBuilder {
    /// Set the required features and limits
    pub fn descriptor(mut self, descriptor: InstanceDescriptor) -> Self {
        self.descriptor = descriptor;
        self
    }

    /// Set the host bridge (required)
    pub fn bridge(mut self, bridge: Arc<dyn HostBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Track futures on `manager` instead of the global event manager
    pub fn with_event_manager(mut self, manager: Arc<EventManager>) -> Self {
        self.event_manager = Some(manager);
        self
    }

    /// Build the instance
    ///
    /// Fails if no bridge was given or the descriptor asks for something the
    /// bridge cannot provide.
    pub fn build(self) -> Result<Ref<Instance>> {
        let bridge = self.bridge.ok_or(BridgeError::MissingBridge)?;

        let support = bridge.timed_wait_support();
        let supported: &[InstanceFeature] = match support {
            TimedWaitSupport::Unsupported => &[],
            TimedWaitSupport::Native | TimedWaitSupport::Host(_) => {
                &[InstanceFeature::TimedWaitAny]
            }
        };
        self.descriptor.validate(supported)?;

        let manager = self.event_manager.unwrap_or_else(global_event_manager);
        let instance_id = InstanceId::next();
        manager.register_instance(instance_id)?;

        let suspender = if self.descriptor.has_feature(InstanceFeature::TimedWaitAny) {
            match support {
                TimedWaitSupport::Native => Some(manager.suspender()),
                TimedWaitSupport::Host(suspender) => Some(suspender),
                TimedWaitSupport::Unsupported => None,
            }
        } else {
            None
        };

        let context = Arc::new(InstanceContext {
            instance_id,
            manager,
            bridge,
        });
        let instance = Ref::new(Instance {
            refs: RefCount::new(),
            base: ObjectBase::new(&context, ObjectId::next(), None),
            descriptor: self.descriptor,
            suspender,
        });

        info!(
            instance_id = %instance_id,
            timed_wait = instance.suspender.is_some(),
            "Instance created"
        );
        Ok(instance)
    }
}

impl fmt::Debug for InstanceBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceBuilder")
            .field("descriptor", &self.descriptor)
            .field("has_bridge", &self.bridge.is_some())
            .field("has_event_manager", &self.event_manager.is_some())
            .finish()
    }
}
