//! Identity and shared plumbing of every handle object

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use gpu_event_manager::{EventManager, Future, InstanceId, ReadyEvent, TrackedEvent};
use parking_lot::Mutex;
use tracing::trace;

use crate::bridge::HostBridge;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-wide identity of a handle object, used to address it on the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn next() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "object-{}", self.0)
    }
}

/// What every object of one instance shares
///
/// Children hold this rather than the `Instance` itself, so dropping the
/// last instance reference is never delayed by live children.
pub(crate) struct InstanceContext {
    pub(crate) instance_id: InstanceId,
    pub(crate) manager: Arc<EventManager>,
    pub(crate) bridge: Arc<dyn HostBridge>,
}

impl InstanceContext {
    pub(crate) fn track<E: TrackedEvent>(&self, event: E) -> Future {
        Future::new(self.manager.track_event(event))
    }

    /// Track an event whose result is already known
    pub(crate) fn track_ready<E: ReadyEvent>(&self, event: E, result: E::Ready) -> Future {
        let future_id = self.manager.track_event(event);
        self.manager.set_future_ready::<E>(future_id, result);
        Future::new(future_id)
    }
}

/// Identity, label and release notification shared by all handles
pub(crate) struct ObjectBase {
    id: ObjectId,
    label: Mutex<Option<String>>,
    pub(crate) context: Arc<InstanceContext>,
}

impl ObjectBase {
    pub(crate) fn new(context: &Arc<InstanceContext>, id: ObjectId, label: Option<&str>) -> Self {
        Self {
            id,
            label: Mutex::new(label.map(str::to_string)),
            context: Arc::clone(context),
        }
    }

    pub(crate) fn id(&self) -> ObjectId {
        self.id
    }

    pub(crate) fn label(&self) -> Option<String> {
        self.label.lock().clone()
    }

    pub(crate) fn set_label(&self, label: &str) {
        *self.label.lock() = Some(label.to_string());
        self.context.bridge.set_label(self.id, label);
    }

    pub(crate) fn bridge(&self) -> &dyn HostBridge {
        self.context.bridge.as_ref()
    }

    /// Tell the host the object is gone
    pub(crate) fn release(&self) {
        trace!(object_id = %self.id, "Releasing object");
        self.context.bridge.release_object(self.id);
    }
}

impl fmt::Debug for ObjectBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBase")
            .field("id", &self.id)
            .field("label", &*self.label.lock())
            .field("instance_id", &self.context.instance_id)
            .finish()
    }
}

/// Handle methods every object type exposes
macro_rules! object_accessors {
    ($ty:ty) => {
        impl $ty {
            /// Host-side identity of this object
            pub fn id(&self) -> $crate::object::ObjectId {
                self.base.id()
            }

            pub fn label(&self) -> Option<String> {
                self.base.label()
            }

            pub fn set_label(&self, label: &str) {
                self.base.set_label(label)
            }
        }
    };
}

pub(crate) use object_accessors;
