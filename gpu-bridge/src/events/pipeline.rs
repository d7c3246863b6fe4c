use std::any::Any;
use std::sync::Arc;

use gpu_event_manager::{
    CallbackMode, EventCompletionType, EventKind, FutureId, InstanceId, ReadyEvent, TrackedEvent,
};
use refcount::Ref;

use super::{stage_first, INSTANCE_DROPPED_MESSAGE};
use crate::object::{InstanceContext, ObjectId};
use crate::pipeline::{AsyncPipeline, ComputePipeline, RenderPipeline};
use crate::status::CreatePipelineAsyncStatus;

type PipelineCallback<P> = Box<dyn FnOnce(CreatePipelineAsyncStatus, Option<Ref<P>>, String) + Send>;

pub(crate) type CreateComputePipelineEvent = CreatePipelineEvent<ComputePipeline>;
pub(crate) type CreateRenderPipelineEvent = CreatePipelineEvent<RenderPipeline>;

/// Resolves an asynchronous pipeline creation
///
/// The pipeline object is only materialized on success.
pub(crate) struct CreatePipelineEvent<P: AsyncPipeline> {
    context: Arc<InstanceContext>,
    mode: CallbackMode,
    pipeline_id: ObjectId,
    label: Option<String>,
    callback: Option<PipelineCallback<P>>,
    result: Option<(CreatePipelineAsyncStatus, String)>,
}

impl<P: AsyncPipeline> CreatePipelineEvent<P> {
    pub(crate) fn new(
        context: &Arc<InstanceContext>,
        mode: CallbackMode,
        pipeline_id: ObjectId,
        label: Option<String>,
        callback: Option<PipelineCallback<P>>,
    ) -> Self {
        Self {
            context: Arc::clone(context),
            mode,
            pipeline_id,
            label,
            callback,
            result: None,
        }
    }
}

impl<P: AsyncPipeline> TrackedEvent for CreatePipelineEvent<P> {
    fn kind(&self) -> EventKind {
        P::KIND
    }

    fn instance_id(&self) -> InstanceId {
        self.context.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, _future_id: FutureId, completion: EventCompletionType) {
        let this = *self;
        let (status, message) = match completion {
            EventCompletionType::Shutdown => (
                CreatePipelineAsyncStatus::CallbackCancelled,
                INSTANCE_DROPPED_MESSAGE.to_string(),
            ),
            EventCompletionType::Ready => this
                .result
                .unwrap_or((CreatePipelineAsyncStatus::InternalError, String::new())),
        };

        let pipeline = (status == CreatePipelineAsyncStatus::Success)
            .then(|| P::create(&this.context, this.pipeline_id, this.label.as_deref()));

        if let Some(callback) = this.callback {
            callback(status, pipeline, message);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<P: AsyncPipeline> ReadyEvent for CreatePipelineEvent<P> {
    const KIND: EventKind = P::KIND;
    type Ready = (CreatePipelineAsyncStatus, String);

    fn ready(&mut self, result: Self::Ready) {
        stage_first(&mut self.result, result, Self::KIND);
    }
}
