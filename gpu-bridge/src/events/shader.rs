use std::any::Any;

use gpu_event_manager::{
    CallbackMode, EventCompletionType, EventKind, FutureId, InstanceId, ReadyEvent, TrackedEvent,
};
use refcount::InternalRef;
use tracing::warn;

use super::stage_first;
use crate::callback::CompilationInfoCallback;
use crate::shader_module::ShaderModule;
use crate::status::{CompilationInfo, CompilationInfoRequestStatus};

/// Resolves a compilation info request
///
/// A successful result is cached on the module; a success with no info
/// reads whatever the module already cached, and is an error if nothing is.
pub(crate) struct CompilationInfoEvent {
    instance_id: InstanceId,
    mode: CallbackMode,
    module: InternalRef<ShaderModule>,
    callback: Option<CompilationInfoCallback>,
    result: Option<(CompilationInfoRequestStatus, Option<CompilationInfo>)>,
}

impl CompilationInfoEvent {
    pub(crate) fn new(
        instance_id: InstanceId,
        mode: CallbackMode,
        module: InternalRef<ShaderModule>,
        callback: Option<CompilationInfoCallback>,
    ) -> Self {
        Self {
            instance_id,
            mode,
            module,
            callback,
            result: None,
        }
    }
}

impl TrackedEvent for CompilationInfoEvent {
    fn kind(&self) -> EventKind {
        EventKind::CompilationInfo
    }

    fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, _future_id: FutureId, completion: EventCompletionType) {
        let this = *self;
        let (status, info) = match completion {
            EventCompletionType::Shutdown => {
                (CompilationInfoRequestStatus::CallbackCancelled, None)
            }
            EventCompletionType::Ready => match this.result {
                Some((CompilationInfoRequestStatus::Success, Some(info))) => (
                    CompilationInfoRequestStatus::Success,
                    Some(this.module.cache_compilation_info(info)),
                ),
                Some((CompilationInfoRequestStatus::Success, None)) => {
                    match this.module.compilation_info() {
                        Some(cached) => (CompilationInfoRequestStatus::Success, Some(cached)),
                        None => {
                            warn!(module = %this.module.id(), "Compilation succeeded without info");
                            (CompilationInfoRequestStatus::Error, None)
                        }
                    }
                }
                Some((status, _)) => (status, None),
                None => (CompilationInfoRequestStatus::Error, None),
            },
        };

        if let Some(callback) = this.callback {
            callback(status, info);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReadyEvent for CompilationInfoEvent {
    const KIND: EventKind = EventKind::CompilationInfo;
    type Ready = (CompilationInfoRequestStatus, Option<CompilationInfo>);

    fn ready(&mut self, result: Self::Ready) {
        stage_first(&mut self.result, result, Self::KIND);
    }
}
