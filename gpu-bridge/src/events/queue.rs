use std::any::Any;

use gpu_event_manager::{
    CallbackMode, EventCompletionType, EventKind, FutureId, InstanceId, ReadyEvent, TrackedEvent,
};

use super::{stage_first, INSTANCE_DROPPED_MESSAGE};
use crate::callback::WorkDoneCallback;
use crate::status::QueueWorkDoneStatus;

pub(crate) struct WorkDoneEvent {
    instance_id: InstanceId,
    mode: CallbackMode,
    callback: Option<WorkDoneCallback>,
    result: Option<(QueueWorkDoneStatus, String)>,
}

impl WorkDoneEvent {
    pub(crate) fn new(
        instance_id: InstanceId,
        mode: CallbackMode,
        callback: Option<WorkDoneCallback>,
    ) -> Self {
        Self {
            instance_id,
            mode,
            callback,
            result: None,
        }
    }
}

impl TrackedEvent for WorkDoneEvent {
    fn kind(&self) -> EventKind {
        EventKind::WorkDone
    }

    fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, _future_id: FutureId, completion: EventCompletionType) {
        let (status, message) = match completion {
            EventCompletionType::Shutdown => (
                QueueWorkDoneStatus::CallbackCancelled,
                INSTANCE_DROPPED_MESSAGE.to_string(),
            ),
            EventCompletionType::Ready => self
                .result
                .unwrap_or((QueueWorkDoneStatus::Error, String::new())),
        };

        if let Some(callback) = self.callback {
            callback(status, message);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReadyEvent for WorkDoneEvent {
    const KIND: EventKind = EventKind::WorkDone;
    type Ready = (QueueWorkDoneStatus, String);

    fn ready(&mut self, result: Self::Ready) {
        stage_first(&mut self.result, result, Self::KIND);
    }
}
