use std::any::Any;
use std::sync::Arc;

use gpu_event_manager::{
    CallbackMode, EventCompletionType, EventKind, FutureId, InstanceId, ReadyEvent, TrackedEvent,
};

use super::{stage_first, INSTANCE_DROPPED_MESSAGE};
use crate::adapter::Adapter;
use crate::bridge::AdapterInfo;
use crate::callback::RequestAdapterCallback;
use crate::object::{InstanceContext, ObjectId};
use crate::status::RequestAdapterStatus;

pub(crate) struct RequestAdapterEvent {
    context: Arc<InstanceContext>,
    mode: CallbackMode,
    adapter_id: ObjectId,
    callback: Option<RequestAdapterCallback>,
    result: Option<(RequestAdapterStatus, Option<AdapterInfo>, String)>,
}

impl RequestAdapterEvent {
    pub(crate) fn new(
        context: &Arc<InstanceContext>,
        mode: CallbackMode,
        adapter_id: ObjectId,
        callback: Option<RequestAdapterCallback>,
    ) -> Self {
        Self {
            context: Arc::clone(context),
            mode,
            adapter_id,
            callback,
            result: None,
        }
    }
}

impl TrackedEvent for RequestAdapterEvent {
    fn kind(&self) -> EventKind {
        EventKind::RequestAdapter
    }

    fn instance_id(&self) -> InstanceId {
        self.context.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, _future_id: FutureId, completion: EventCompletionType) {
        let this = *self;
        let (status, adapter, message) = match completion {
            EventCompletionType::Shutdown => (
                RequestAdapterStatus::CallbackCancelled,
                None,
                INSTANCE_DROPPED_MESSAGE.to_string(),
            ),
            EventCompletionType::Ready => match this.result {
                Some((RequestAdapterStatus::Success, Some(info), message)) => (
                    RequestAdapterStatus::Success,
                    Some(Adapter::create(&this.context, this.adapter_id, info)),
                    message,
                ),
                Some((RequestAdapterStatus::Success, None, _)) => (
                    RequestAdapterStatus::Error,
                    None,
                    "Adapter request succeeded without adapter information.".to_string(),
                ),
                Some((status, _, message)) => (status, None, message),
                None => (RequestAdapterStatus::Error, None, String::new()),
            },
        };

        if let Some(callback) = this.callback {
            callback(status, adapter, message);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReadyEvent for RequestAdapterEvent {
    const KIND: EventKind = EventKind::RequestAdapter;
    type Ready = (RequestAdapterStatus, Option<AdapterInfo>, String);

    fn ready(&mut self, result: Self::Ready) {
        stage_first(&mut self.result, result, Self::KIND);
    }
}
