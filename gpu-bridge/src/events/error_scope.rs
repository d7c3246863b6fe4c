use std::any::Any;

use gpu_event_manager::{
    CallbackMode, EventCompletionType, EventKind, FutureId, InstanceId, ReadyEvent, TrackedEvent,
};

use super::{stage_first, INSTANCE_DROPPED_MESSAGE};
use crate::callback::PopErrorScopeCallback;
use crate::status::{ErrorType, PopErrorScopeStatus};

pub(crate) struct PopErrorScopeEvent {
    instance_id: InstanceId,
    mode: CallbackMode,
    callback: Option<PopErrorScopeCallback>,
    result: Option<(PopErrorScopeStatus, ErrorType, String)>,
}

impl PopErrorScopeEvent {
    pub(crate) fn new(
        instance_id: InstanceId,
        mode: CallbackMode,
        callback: Option<PopErrorScopeCallback>,
    ) -> Self {
        Self {
            instance_id,
            mode,
            callback,
            result: None,
        }
    }
}

impl TrackedEvent for PopErrorScopeEvent {
    fn kind(&self) -> EventKind {
        EventKind::PopErrorScope
    }

    fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, _future_id: FutureId, completion: EventCompletionType) {
        let (status, error_type, message) = match completion {
            EventCompletionType::Shutdown => (
                PopErrorScopeStatus::CallbackCancelled,
                ErrorType::NoError,
                INSTANCE_DROPPED_MESSAGE.to_string(),
            ),
            EventCompletionType::Ready => self.result.unwrap_or((
                PopErrorScopeStatus::Error,
                ErrorType::Unknown,
                String::new(),
            )),
        };

        if let Some(callback) = self.callback {
            callback(status, error_type, message);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReadyEvent for PopErrorScopeEvent {
    const KIND: EventKind = EventKind::PopErrorScope;
    type Ready = (PopErrorScopeStatus, ErrorType, String);

    fn ready(&mut self, result: Self::Ready) {
        stage_first(&mut self.result, result, Self::KIND);
    }
}
