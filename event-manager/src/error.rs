use thiserror::Error;

use crate::event::EventKind;
use crate::ids::{FutureId, InstanceId};

/// Errors that can occur in the event manager
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventManagerError {
    /// Raw callback mode value outside the known set
    #[error("Invalid callback mode: {0}")]
    InvalidCallbackMode(u32),

    /// A callback was supplied without a callback mode
    #[error("A callback mode is required when a callback is supplied")]
    MissingCallbackMode,

    /// Instance registered twice
    #[error("Instance {0} is already registered")]
    InstanceAlreadyRegistered(InstanceId),

    /// The null instance cannot be registered
    #[error("The null instance cannot be registered")]
    NullInstance,

    /// Future resolved with the wrong event type
    #[error("Future {future_id} is a {actual} event, not {expected}")]
    KindMismatch {
        future_id: FutureId,
        expected: EventKind,
        actual: EventKind,
    },
}

/// Result type for Event Manager operations
pub type Result<T> = std::result::Result<T, EventManagerError>;
