//! Callback registration for asynchronous entry points
//!
//! Every async method takes a `CallbackInfo` pairing a callback with the
//! `CallbackMode` that decides where it may run. Omitting both is allowed
//! and behaves as a spontaneous request whose result is discarded. Supplying
//! a callback without a mode, or an unknown raw mode, is caller misuse: the
//! method returns `Future::NULL` and nothing is issued.

use std::sync::Arc;

use gpu_event_manager::{CallbackMode, EventManagerError};
use refcount::Ref;

use crate::adapter::Adapter;
use crate::device::Device;
use crate::pipeline::{ComputePipeline, RenderPipeline};
use crate::status::{
    CompilationInfo, CompilationInfoRequestStatus, CreatePipelineAsyncStatus, DeviceLostReason,
    ErrorType, MapAsyncStatus, PopErrorScopeStatus, QueueWorkDoneStatus, RequestAdapterStatus,
    RequestDeviceStatus,
};

pub type RequestAdapterCallback =
    Box<dyn FnOnce(RequestAdapterStatus, Option<Ref<Adapter>>, String) + Send>;
pub type RequestDeviceCallback =
    Box<dyn FnOnce(RequestDeviceStatus, Option<Ref<Device>>, String) + Send>;
pub type DeviceLostCallback = Box<dyn FnOnce(Option<Ref<Device>>, DeviceLostReason, String) + Send>;
pub type MapAsyncCallback = Box<dyn FnOnce(MapAsyncStatus, String) + Send>;
pub type WorkDoneCallback = Box<dyn FnOnce(QueueWorkDoneStatus, String) + Send>;
pub type PopErrorScopeCallback = Box<dyn FnOnce(PopErrorScopeStatus, ErrorType, String) + Send>;
pub type CompilationInfoCallback =
    Box<dyn FnOnce(CompilationInfoRequestStatus, Option<Arc<CompilationInfo>>) + Send>;
pub type CreateComputePipelineCallback =
    Box<dyn FnOnce(CreatePipelineAsyncStatus, Option<Ref<ComputePipeline>>, String) + Send>;
pub type CreateRenderPipelineCallback =
    Box<dyn FnOnce(CreatePipelineAsyncStatus, Option<Ref<RenderPipeline>>, String) + Send>;
pub type UncapturedErrorCallback = Arc<dyn Fn(ErrorType, &str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModeSpec {
    Unset,
    Valid(CallbackMode),
    Invalid(u32),
}

/// A callback plus the mode it may be invoked under
///
/// ```rust,ignore
/// let future = queue.on_submitted_work_done(CallbackInfo::process_events(
///     |status, message| println!("work done: {status:?} {message}"),
/// ));
/// ```
pub struct CallbackInfo<F> {
    mode: ModeSpec,
    callback: Option<F>,
}

impl<F> CallbackInfo<F> {
    pub fn new(mode: CallbackMode, callback: F) -> Self {
        Self {
            mode: ModeSpec::Valid(mode),
            callback: Some(callback),
        }
    }

    pub fn spontaneous(callback: F) -> Self {
        Self::new(CallbackMode::AllowSpontaneous, callback)
    }

    pub fn process_events(callback: F) -> Self {
        Self::new(CallbackMode::AllowProcessEvents, callback)
    }

    pub fn wait_any_only(callback: F) -> Self {
        Self::new(CallbackMode::WaitAnyOnly, callback)
    }

    /// No callback and no mode
    pub fn none() -> Self {
        Self {
            mode: ModeSpec::Unset,
            callback: None,
        }
    }

    /// A mode without a callback; the result is only observable by waiting
    pub fn without_callback(mode: CallbackMode) -> Self {
        Self {
            mode: ModeSpec::Valid(mode),
            callback: None,
        }
    }

    /// Build from a raw mode value, where 0 means "not set"
    pub fn from_raw(mode: u32, callback: Option<F>) -> Self {
        let mode = match mode {
            0 => ModeSpec::Unset,
            raw => match CallbackMode::try_from(raw) {
                Ok(mode) => ModeSpec::Valid(mode),
                Err(_) => ModeSpec::Invalid(raw),
            },
        };
        Self { mode, callback }
    }

    pub fn mode(&self) -> Option<CallbackMode> {
        match self.mode {
            ModeSpec::Valid(mode) => Some(mode),
            _ => None,
        }
    }

    /// Normalize into the mode the event is tracked with
    pub(crate) fn resolve(self) -> Result<(CallbackMode, Option<F>), EventManagerError> {
        match (self.mode, self.callback) {
            (ModeSpec::Invalid(raw), _) => Err(EventManagerError::InvalidCallbackMode(raw)),
            (ModeSpec::Unset, Some(_)) => Err(EventManagerError::MissingCallbackMode),
            (ModeSpec::Unset, None) => Ok((CallbackMode::AllowSpontaneous, None)),
            (ModeSpec::Valid(mode), callback) => Ok((mode, callback)),
        }
    }
}

impl<F> Default for CallbackInfo<F> {
    fn default() -> Self {
        Self::none()
    }
}
