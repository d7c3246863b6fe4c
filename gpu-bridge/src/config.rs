//! Instance configuration
//!
//! An `InstanceDescriptor` names the features and limits an instance needs.
//! It is checked against what the host bridge supports when the instance is
//! built; requesting something unsupported fails the build instead of
//! degrading at call time.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Highest `timed_wait_any_max_count` an instance may request
pub const MAX_TIMED_WAIT_ANY_COUNT: usize = 64;

/// Optional instance capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceFeature {
    /// `wait_any` with a positive timeout
    TimedWaitAny,
}

/// Limits applied to instance-level operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceLimits {
    /// Most futures a single timed `wait_any` may name
    /// Default: 64
    pub timed_wait_any_max_count: usize,
}

impl Default for InstanceLimits {
    fn default() -> Self {
        Self {
            timed_wait_any_max_count: MAX_TIMED_WAIT_ANY_COUNT,
        }
    }
}

/// What an instance is created with
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceDescriptor {
    /// Features that must be available
    pub required_features: Vec<InstanceFeature>,

    /// Limits the instance runs with
    pub required_limits: InstanceLimits,
}

impl InstanceDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor enabling timed `wait_any`
    pub fn timed_wait() -> Self {
        Self::default().with_feature(InstanceFeature::TimedWaitAny)
    }

    pub fn with_feature(mut self, feature: InstanceFeature) -> Self {
        if !self.required_features.contains(&feature) {
            self.required_features.push(feature);
        }
        self
    }

    pub fn with_timed_wait_any_max_count(mut self, count: usize) -> Self {
        self.required_limits.timed_wait_any_max_count = count;
        self
    }

    pub fn has_feature(&self, feature: InstanceFeature) -> bool {
        self.required_features.contains(&feature)
    }

    /// Validate the descriptor against the features a host supports
    pub fn validate(&self, supported: &[InstanceFeature]) -> Result<()> {
        if let Some(missing) = self
            .required_features
            .iter()
            .find(|feature| !supported.contains(feature))
        {
            return Err(BridgeError::UnsupportedFeature(*missing));
        }

        let count = self.required_limits.timed_wait_any_max_count;
        if count > MAX_TIMED_WAIT_ANY_COUNT {
            return Err(BridgeError::LimitExceeded {
                name: "timed_wait_any_max_count",
                requested: count as u64,
                max: MAX_TIMED_WAIT_ANY_COUNT as u64,
            });
        }

        if count == 0 && self.has_feature(InstanceFeature::TimedWaitAny) {
            return Err(BridgeError::Configuration(
                "timed_wait_any_max_count must be greater than 0 when TimedWaitAny is required"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
