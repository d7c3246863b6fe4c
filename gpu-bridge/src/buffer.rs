//! Buffers and their map state machine
//!
//! ```text
//!             map_async             host Success
//! Unmapped ─────────────► Pending ───────────────► Mapped
//!    ▲                       │                        │
//!    │   failure / unmap /   │                        │ unmap / destroy
//!    └───── destroy ─────────┘◄───────────────────────┘
//! ```
//!
//! At most one map request is pending. Requests made while one is pending
//! or while mapped resolve immediately with an error and leave the current
//! request alone. The map state lock is never held while calling into the
//! event manager, so completions may re-enter the buffer freely.

use std::fmt;
use std::sync::Arc;

use gpu_event_manager::{Future, FutureId};
use parking_lot::Mutex;
use refcount::{Counts, ExternalRefCount, Ref, RefCounted, WeakRef};
use tracing::{debug, warn};

use crate::bridge::BufferDescriptor;
use crate::callback::{CallbackInfo, MapAsyncCallback};
use crate::error::{BridgeError, Result};
use crate::events::MapAsyncEvent;
use crate::object::{object_accessors, InstanceContext, ObjectBase, ObjectId};
use crate::status::{BufferMapState, BufferUsage, MapAsyncStatus, MapMode};

const ALREADY_PENDING_MESSAGE: &str = "Buffer already has an outstanding map pending.";
const ALREADY_MAPPED_MESSAGE: &str = "Buffer is already mapped.";
const UNMAPPED_BEFORE_RESOLVED_MESSAGE: &str = "Buffer was unmapped before mapping was resolved.";
const DESTROYED_BEFORE_RESOLVED_MESSAGE: &str = "Buffer was destroyed before mapping was resolved.";

/// Offset alignment for map requests and mapped range access
const MAP_OFFSET_ALIGNMENT: u64 = 8;
/// Size alignment for map requests and mapped range access
const MAP_SIZE_ALIGNMENT: u64 = 4;

#[derive(Debug, Clone, Copy)]
struct MappedRange {
    mode: MapMode,
    offset: u64,
    size: u64,
}

impl MappedRange {
    fn contains(&self, offset: u64, size: u64) -> bool {
        offset >= self.offset
            && offset
                .checked_add(size)
                .map_or(false, |end| end <= self.offset + self.size)
    }
}

#[derive(Debug)]
struct PendingMap {
    /// Serial matching this request to its event
    request: u64,
    /// Set once the event is tracked
    future: Option<FutureId>,
    range: MappedRange,
}

#[derive(Debug)]
struct MapStatus {
    state: BufferMapState,
    pending: Option<PendingMap>,
    mapped: Option<MappedRange>,
    destroyed: bool,
    next_request: u64,
}

pub struct Buffer {
    refs: ExternalRefCount,
    base: ObjectBase,
    this: WeakRef<Buffer>,
    size: u64,
    usage: BufferUsage,
    map: Mutex<MapStatus>,
}

object_accessors!(Buffer);

impl Buffer {
    pub(crate) fn create(
        context: &Arc<InstanceContext>,
        id: ObjectId,
        descriptor: &BufferDescriptor,
    ) -> Ref<Self> {
        let mapped = descriptor.mapped_at_creation.then_some(MappedRange {
            mode: MapMode::WRITE,
            offset: 0,
            size: descriptor.size,
        });
        let state = if mapped.is_some() {
            BufferMapState::Mapped
        } else {
            BufferMapState::Unmapped
        };

        Ref::new_cyclic(|this| Self {
            refs: ExternalRefCount::new(),
            base: ObjectBase::new(context, id, descriptor.label.as_deref()),
            this,
            size: descriptor.size,
            usage: descriptor.usage,
            map: Mutex::new(MapStatus {
                state,
                pending: None,
                mapped,
                destroyed: false,
                next_request: 1,
            }),
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    pub fn map_state(&self) -> BufferMapState {
        self.map.lock().state
    }

    pub fn is_destroyed(&self) -> bool {
        self.map.lock().destroyed
    }

    /// Map `[offset, offset + size)` for reading or writing
    ///
    /// Invalid requests still return a future, already resolved with
    /// `MapAsyncStatus::Error`.
    pub fn map_async<F>(
        &self,
        mode: MapMode,
        offset: u64,
        size: u64,
        callback: CallbackInfo<F>,
    ) -> Future
    where
        F: FnOnce(MapAsyncStatus, String) + Send + 'static,
    {
        let (callback_mode, callback) = match callback.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!(buffer = %self.id(), "Rejected map request: {}", e);
                return Future::NULL;
            }
        };
        let Some(buffer) = self.this.upgrade() else {
            return Future::NULL;
        };
        let callback = callback.map(|f| Box::new(f) as MapAsyncCallback);
        let context = &self.base.context;
        let range = MappedRange { mode, offset, size };

        let request = {
            let mut map = self.map.lock();
            self.validate_map_request(&map, range).map(|()| {
                let request = map.next_request;
                map.next_request += 1;
                map.state = BufferMapState::Pending;
                map.pending = Some(PendingMap {
                    request,
                    future: None,
                    range,
                });
                request
            })
        };

        let request = match request {
            Ok(request) => request,
            Err(message) => {
                debug!(buffer = %self.id(), "Map request rejected: {}", message);
                let event =
                    MapAsyncEvent::new(context.instance_id, callback_mode, buffer, None, callback);
                return context.track_ready(event, (MapAsyncStatus::Error, message));
            }
        };

        let event = MapAsyncEvent::new(
            context.instance_id,
            callback_mode,
            buffer,
            Some(request),
            callback,
        );
        let future = context.track(event);

        // The pending record may have been cleared while the event was
        // being tracked.
        let aborted = {
            let mut guard = self.map.lock();
            let map = &mut *guard;
            match map.pending.as_mut() {
                Some(pending) if pending.request == request => {
                    pending.future = Some(future.id);
                    None
                }
                _ if map.destroyed => Some(DESTROYED_BEFORE_RESOLVED_MESSAGE),
                _ => Some(UNMAPPED_BEFORE_RESOLVED_MESSAGE),
            }
        };

        match aborted {
            None => {
                debug!(buffer = %self.id(), future_id = %future.id, offset, size, "Map requested");
                context
                    .bridge
                    .buffer_map_async(self.id(), future.id, mode, offset, size);
            }
            Some(message) => self.abort_pending(future.id, message),
        }
        future
    }

    fn validate_map_request(&self, map: &MapStatus, range: MappedRange) -> std::result::Result<(), String> {
        if map.destroyed {
            return Err("Buffer is destroyed.".to_string());
        }
        match map.state {
            BufferMapState::Pending => return Err(ALREADY_PENDING_MESSAGE.to_string()),
            BufferMapState::Mapped => return Err(ALREADY_MAPPED_MESSAGE.to_string()),
            BufferMapState::Unmapped => {}
        }

        let required_usage = if range.mode == MapMode::READ {
            BufferUsage::MAP_READ
        } else if range.mode == MapMode::WRITE {
            BufferUsage::MAP_WRITE
        } else {
            return Err("Map mode must be exactly one of READ or WRITE.".to_string());
        };
        if !self.usage.contains(required_usage) {
            return Err(format!(
                "Buffer usage {:?} does not allow map mode {:?}.",
                self.usage, range.mode
            ));
        }

        check_alignment(range.offset, range.size)?;
        let whole = MappedRange {
            mode: range.mode,
            offset: 0,
            size: self.size,
        };
        if !whole.contains(range.offset, range.size) {
            return Err(format!(
                "Map range (offset {}, size {}) exceeds buffer size ({}).",
                range.offset, range.size, self.size
            ));
        }
        Ok(())
    }

    /// Settle the map state for a finished request
    ///
    /// Ignored unless `request` is still the pending one.
    pub(crate) fn finish_map(&self, request: u64, status: MapAsyncStatus) {
        let mut map = self.map.lock();
        if map.pending.as_ref().map_or(true, |pending| pending.request != request) {
            return;
        }

        if let Some(pending) = map.pending.take() {
            if status == MapAsyncStatus::Success {
                map.state = BufferMapState::Mapped;
                map.mapped = Some(pending.range);
            } else {
                map.state = BufferMapState::Unmapped;
            }
        }
    }

    fn abort_pending(&self, future: FutureId, message: &str) {
        self.base
            .context
            .manager
            .set_future_ready::<MapAsyncEvent>(future, (MapAsyncStatus::Aborted, message.to_string()));
    }

    /// Drop the mapping, aborting a pending request
    pub fn unmap(&self) {
        let aborted = {
            let mut map = self.map.lock();
            if map.state == BufferMapState::Unmapped {
                return;
            }
            map.state = BufferMapState::Unmapped;
            map.mapped = None;
            map.pending.take().and_then(|pending| pending.future)
        };

        if let Some(future) = aborted {
            self.abort_pending(future, UNMAPPED_BEFORE_RESOLVED_MESSAGE);
        }
        debug!(buffer = %self.id(), "Unmapped");
        self.base.bridge().buffer_unmap(self.id());
    }

    /// Destroy the buffer, aborting a pending request
    ///
    /// The host is notified once; repeated calls are no-ops.
    pub fn destroy(&self) {
        let aborted = {
            let mut map = self.map.lock();
            if map.destroyed {
                return;
            }
            map.destroyed = true;
            map.state = BufferMapState::Unmapped;
            map.mapped = None;
            map.pending.take().and_then(|pending| pending.future)
        };

        if let Some(future) = aborted {
            self.abort_pending(future, DESTROYED_BEFORE_RESOLVED_MESSAGE);
        }
        debug!(buffer = %self.id(), "Destroyed");
        self.base.bridge().buffer_destroy(self.id());
    }

    /// Copy bytes out of the mapped range
    pub fn read_mapped_range(&self, offset: u64, data: &mut [u8]) -> Result<()> {
        self.check_mapped_access(MapMode::READ, offset, data.len() as u64)?;
        self.base.bridge().buffer_read(self.id(), offset, data);
        Ok(())
    }

    /// Copy bytes into the mapped range
    pub fn write_mapped_range(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.check_mapped_access(MapMode::WRITE, offset, data.len() as u64)?;
        self.base.bridge().buffer_write(self.id(), offset, data);
        Ok(())
    }

    fn check_mapped_access(&self, mode: MapMode, offset: u64, size: u64) -> Result<()> {
        let map = self.map.lock();
        let mapped = match (map.state, map.mapped) {
            (BufferMapState::Mapped, Some(mapped)) => mapped,
            _ => return Err(BridgeError::Validation("Buffer is not mapped.".to_string())),
        };

        if !mapped.mode.contains(mode) {
            return Err(BridgeError::Validation(format!(
                "Buffer is mapped with {:?}, not {:?}.",
                mapped.mode, mode
            )));
        }
        check_alignment(offset, size).map_err(BridgeError::Validation)?;
        if !mapped.contains(offset, size) {
            return Err(BridgeError::Validation(format!(
                "Range (offset {}, size {}) is outside the mapped range (offset {}, size {}).",
                offset, size, mapped.offset, mapped.size
            )));
        }
        Ok(())
    }
}

fn check_alignment(offset: u64, size: u64) -> std::result::Result<(), String> {
    if offset % MAP_OFFSET_ALIGNMENT != 0 {
        return Err(format!(
            "Offset ({offset}) must be a multiple of {MAP_OFFSET_ALIGNMENT}."
        ));
    }
    if size % MAP_SIZE_ALIGNMENT != 0 {
        return Err(format!("Size ({size}) must be a multiple of {MAP_SIZE_ALIGNMENT}."));
    }
    Ok(())
}

impl RefCounted for Buffer {
    fn counts(&self) -> Counts<'_> {
        Counts::WithExternal(&self.refs)
    }

    fn will_drop_last_external_ref(&self) {
        self.destroy();
    }

    fn on_last_ref_released(&self) {
        self.base.release();
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.map.lock();
        f.debug_struct("Buffer")
            .field("base", &self.base)
            .field("size", &self.size)
            .field("usage", &self.usage)
            .field("map_state", &map.state)
            .field("destroyed", &map.destroyed)
            .finish()
    }
}
