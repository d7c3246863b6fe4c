use thiserror::Error;

use crate::config::InstanceFeature;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Event manager error: {0}")]
    EventManager(#[from] gpu_event_manager::EventManagerError),

    #[error("A host bridge is required to build an instance")]
    MissingBridge,

    #[error("Instance feature not supported: {0:?}")]
    UnsupportedFeature(InstanceFeature),

    #[error("Limit {name} requested {requested}, maximum is {max}")]
    LimitExceeded {
        name: &'static str,
        requested: u64,
        max: u64,
    },

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
