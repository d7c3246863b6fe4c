//! Status codes, error kinds and flag sets shared by the handle objects
//!
//! Every asynchronous operation resolves with one of the status enums below.
//! `CallbackCancelled` is never reported by a host; it is what an operation
//! resolves with when its instance is dropped first.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestAdapterStatus {
    Success,
    CallbackCancelled,
    Unavailable,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestDeviceStatus {
    Success,
    CallbackCancelled,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceLostReason {
    Unknown,
    Destroyed,
    CallbackCancelled,
    FailedCreation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapAsyncStatus {
    Success,
    CallbackCancelled,
    Error,
    Aborted,
}

impl MapAsyncStatus {
    /// Severity used to combine repeated map results
    ///
    /// A later result replaces a staged one when its precedence is equal or
    /// higher.
    pub fn precedence(&self) -> u8 {
        match self {
            MapAsyncStatus::Success => 0,
            MapAsyncStatus::Error => 1,
            MapAsyncStatus::Aborted | MapAsyncStatus::CallbackCancelled => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueWorkDoneStatus {
    Success,
    CallbackCancelled,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PopErrorScopeStatus {
    Success,
    CallbackCancelled,
    /// The device's error scope stack was empty
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreatePipelineAsyncStatus {
    Success,
    CallbackCancelled,
    ValidationError,
    InternalError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilationInfoRequestStatus {
    Success,
    CallbackCancelled,
    Error,
}

/// Kind of error captured by an error scope or reported as uncaptured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorType {
    NoError,
    Validation,
    OutOfMemory,
    Internal,
    Unknown,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorType::NoError => "no error",
            ErrorType::Validation => "validation",
            ErrorType::OutOfMemory => "out of memory",
            ErrorType::Internal => "internal",
            ErrorType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Which errors an error scope captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorFilter {
    Validation,
    OutOfMemory,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferMapState {
    Unmapped,
    Pending,
    Mapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PowerPreference {
    #[default]
    Undefined,
    LowPower,
    HighPerformance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AdapterType {
    DiscreteGpu,
    IntegratedGpu,
    Cpu,
    #[default]
    Unknown,
}

// ============================================================================
// Flag sets
// ============================================================================

bitflags! {
    /// Access requested by a buffer map
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MapMode: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
    }
}

bitflags! {
    /// Allowed uses of a buffer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct BufferUsage: u32 {
        const MAP_READ = 1 << 0;
        const MAP_WRITE = 1 << 1;
        const COPY_SRC = 1 << 2;
        const COPY_DST = 1 << 3;
        const INDEX = 1 << 4;
        const VERTEX = 1 << 5;
        const UNIFORM = 1 << 6;
        const STORAGE = 1 << 7;
    }
}

// ============================================================================
// Shader compilation results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilationMessageType {
    Error,
    Warning,
    Info,
}

/// One diagnostic produced while compiling a shader module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationMessage {
    pub message: String,
    pub message_type: CompilationMessageType,
    pub line_num: u64,
    pub line_pos: u64,
}

/// Diagnostics for a shader module
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompilationInfo {
    pub messages: Vec<CompilationMessage>,
}

impl CompilationInfo {
    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.message_type == CompilationMessageType::Error)
    }
}
