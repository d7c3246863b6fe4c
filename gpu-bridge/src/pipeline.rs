//! Compute and render pipelines, created asynchronously by a device

use std::fmt;
use std::sync::Arc;

use gpu_event_manager::EventKind;
use refcount::{Counts, Ref, RefCount, RefCounted};

use crate::object::{object_accessors, InstanceContext, ObjectBase, ObjectId};

/// Pipelines the host creates on request
pub(crate) trait AsyncPipeline: RefCounted + Sized {
    const KIND: EventKind;

    fn create(context: &Arc<InstanceContext>, id: ObjectId, label: Option<&str>) -> Ref<Self>;
}

pub struct ComputePipeline {
    refs: RefCount,
    base: ObjectBase,
}

object_accessors!(ComputePipeline);

impl AsyncPipeline for ComputePipeline {
    const KIND: EventKind = EventKind::CreateComputePipeline;

    fn create(context: &Arc<InstanceContext>, id: ObjectId, label: Option<&str>) -> Ref<Self> {
        Ref::new(Self {
            refs: RefCount::new(),
            base: ObjectBase::new(context, id, label),
        })
    }
}

impl RefCounted for ComputePipeline {
    fn counts(&self) -> Counts<'_> {
        Counts::Single(&self.refs)
    }

    fn on_last_ref_released(&self) {
        self.base.release();
    }
}

impl fmt::Debug for ComputePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputePipeline")
            .field("base", &self.base)
            .finish()
    }
}

pub struct RenderPipeline {
    refs: RefCount,
    base: ObjectBase,
}

object_accessors!(RenderPipeline);

impl AsyncPipeline for RenderPipeline {
    const KIND: EventKind = EventKind::CreateRenderPipeline;

    fn create(context: &Arc<InstanceContext>, id: ObjectId, label: Option<&str>) -> Ref<Self> {
        Ref::new(Self {
            refs: RefCount::new(),
            base: ObjectBase::new(context, id, label),
        })
    }
}

impl RefCounted for RenderPipeline {
    fn counts(&self) -> Counts<'_> {
        Counts::Single(&self.refs)
    }

    fn on_last_ref_released(&self) {
        self.base.release();
    }
}

impl fmt::Debug for RenderPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("base", &self.base)
            .finish()
    }
}
