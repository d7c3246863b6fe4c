use std::any::Any;

use gpu_event_manager::{
    CallbackMode, EventCompletionType, EventKind, FutureId, InstanceId, ReadyEvent, TrackedEvent,
};
use refcount::InternalRef;
use tracing::{debug, trace};

use super::INSTANCE_DROPPED_MESSAGE;
use crate::buffer::Buffer;
use crate::callback::MapAsyncCallback;
use crate::status::MapAsyncStatus;

/// Resolves a buffer map request
///
/// `request` is the buffer's serial for the pending map this event drives,
/// or `None` for a request rejected up front, which never touches the
/// buffer's map state.
pub(crate) struct MapAsyncEvent {
    instance_id: InstanceId,
    mode: CallbackMode,
    buffer: InternalRef<Buffer>,
    request: Option<u64>,
    callback: Option<MapAsyncCallback>,
    result: Option<(MapAsyncStatus, String)>,
}

impl MapAsyncEvent {
    pub(crate) fn new(
        instance_id: InstanceId,
        mode: CallbackMode,
        buffer: InternalRef<Buffer>,
        request: Option<u64>,
        callback: Option<MapAsyncCallback>,
    ) -> Self {
        Self {
            instance_id,
            mode,
            buffer,
            request,
            callback,
            result: None,
        }
    }
}

impl TrackedEvent for MapAsyncEvent {
    fn kind(&self) -> EventKind {
        EventKind::MapAsync
    }

    fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    fn callback_mode(&self) -> CallbackMode {
        self.mode
    }

    fn complete(self: Box<Self>, future_id: FutureId, completion: EventCompletionType) {
        let this = *self;
        let (status, message) = match completion {
            EventCompletionType::Shutdown => (
                MapAsyncStatus::CallbackCancelled,
                INSTANCE_DROPPED_MESSAGE.to_string(),
            ),
            EventCompletionType::Ready => this
                .result
                .unwrap_or((MapAsyncStatus::Error, String::new())),
        };

        if let Some(request) = this.request {
            this.buffer.finish_map(request, status);
        }
        debug!(future_id = %future_id, buffer = %this.buffer.id(), status = ?status, "Map resolved");

        if let Some(callback) = this.callback {
            callback(status, message);
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl ReadyEvent for MapAsyncEvent {
    const KIND: EventKind = EventKind::MapAsync;
    type Ready = (MapAsyncStatus, String);

    fn ready(&mut self, result: Self::Ready) {
        combine_map_result(&mut self.result, result);
    }
}

/// Later results replace the staged one unless they are less severe
fn combine_map_result(slot: &mut Option<(MapAsyncStatus, String)>, result: (MapAsyncStatus, String)) {
    match slot {
        Some((staged, _)) if result.0.precedence() < staged.precedence() => {
            trace!(staged = ?staged, incoming = ?result.0, "Keeping more severe map result");
        }
        _ => *slot = Some(result),
    }
}
