use std::fmt;
use std::sync::Arc;

use gpu_event_manager::Future;
use parking_lot::Mutex;
use refcount::{Counts, Ref, RefCount, RefCounted, WeakRef};
use tracing::{debug, warn};

use crate::callback::{CallbackInfo, CompilationInfoCallback};
use crate::events::CompilationInfoEvent;
use crate::object::{object_accessors, InstanceContext, ObjectBase, ObjectId};
use crate::status::{CompilationInfo, CompilationInfoRequestStatus};

pub struct ShaderModule {
    refs: RefCount,
    base: ObjectBase,
    this: WeakRef<ShaderModule>,

    /// First successful compilation result
    compilation_info: Mutex<Option<Arc<CompilationInfo>>>,
}

object_accessors!(ShaderModule);

impl ShaderModule {
    pub(crate) fn create(context: &Arc<InstanceContext>, id: ObjectId, label: Option<&str>) -> Ref<Self> {
        Ref::new_cyclic(|this| Self {
            refs: RefCount::new(),
            base: ObjectBase::new(context, id, label),
            this,
            compilation_info: Mutex::new(None),
        })
    }

    /// Request the module's compilation diagnostics
    ///
    /// Once a result has been cached the request resolves without asking
    /// the host again.
    pub fn get_compilation_info<F>(&self, callback: CallbackInfo<F>) -> Future
    where
        F: FnOnce(CompilationInfoRequestStatus, Option<Arc<CompilationInfo>>) + Send + 'static,
    {
        let (mode, callback) = match callback.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(module = %self.id(), "Rejected compilation info request: {}", e);
                return Future::NULL;
            }
        };
        let Some(module) = self.this.upgrade() else {
            return Future::NULL;
        };

        let context = &self.base.context;
        let event = CompilationInfoEvent::new(
            context.instance_id,
            mode,
            module,
            callback.map(|f| Box::new(f) as CompilationInfoCallback),
        );

        if self.compilation_info().is_some() {
            debug!(module = %self.id(), "Compilation info already cached");
            return context.track_ready(event, (CompilationInfoRequestStatus::Success, None));
        }

        let future = context.track(event);
        context.bridge.shader_module_get_compilation_info(self.id(), future.id);
        future
    }

    /// Cached compilation result, if any
    pub fn compilation_info(&self) -> Option<Arc<CompilationInfo>> {
        self.compilation_info.lock().clone()
    }

    /// Cache a result unless one is already cached, returning the cached one
    pub(crate) fn cache_compilation_info(&self, info: CompilationInfo) -> Arc<CompilationInfo> {
        let mut cached = self.compilation_info.lock();
        Arc::clone(cached.get_or_insert_with(|| Arc::new(info)))
    }
}

impl RefCounted for ShaderModule {
    fn counts(&self) -> Counts<'_> {
        Counts::Single(&self.refs)
    }

    fn on_last_ref_released(&self) {
        self.base.release();
    }
}

impl fmt::Debug for ShaderModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderModule")
            .field("base", &self.base)
            .field("cached", &self.compilation_info.lock().is_some())
            .finish()
    }
}
