use std::fmt;
use std::sync::Arc;

use gpu_event_manager::Future;
use refcount::{Counts, Ref, RefCount, RefCounted};
use tracing::{debug, warn};

use crate::callback::{CallbackInfo, WorkDoneCallback};
use crate::events::WorkDoneEvent;
use crate::object::{object_accessors, InstanceContext, ObjectBase, ObjectId};
use crate::status::QueueWorkDoneStatus;

/// A device's command queue
pub struct Queue {
    refs: RefCount,
    base: ObjectBase,
}

object_accessors!(Queue);

impl Queue {
    pub(crate) fn create(context: &Arc<InstanceContext>, id: ObjectId, label: Option<&str>) -> Ref<Self> {
        Ref::new(Self {
            refs: RefCount::new(),
            base: ObjectBase::new(context, id, label),
        })
    }

    /// Submit recorded work
    pub fn submit(&self) {
        self.base.bridge().queue_submit(self.id());
    }

    /// Resolve once all work submitted so far has finished
    pub fn on_submitted_work_done<F>(&self, callback: CallbackInfo<F>) -> Future
    where
        F: FnOnce(QueueWorkDoneStatus, String) + Send + 'static,
    {
        let (mode, callback) = match callback.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(queue = %self.id(), "Rejected work done request: {}", e);
                return Future::NULL;
            }
        };

        let context = &self.base.context;
        let event = WorkDoneEvent::new(
            context.instance_id,
            mode,
            callback.map(|f| Box::new(f) as WorkDoneCallback),
        );
        let future = context.track(event);

        debug!(queue = %self.id(), future_id = %future.id, "Requested work done notification");
        context.bridge.queue_on_submitted_work_done(self.id(), future.id);
        future
    }
}

impl RefCounted for Queue {
    fn counts(&self) -> Counts<'_> {
        Counts::Single(&self.refs)
    }

    fn on_last_ref_released(&self) {
        self.base.release();
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue").field("base", &self.base).finish()
    }
}
