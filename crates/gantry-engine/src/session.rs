//! The persisted session envelope.

use std::time::Duration;

use gantry_core::ComponentConfig;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Default round-robin budget stored in a fresh envelope: 1/120 s.
pub const DEFAULT_SESSION_LAG_SECS: f64 = 1.0 / 120.0;

fn default_lag_secs() -> f64 {
    DEFAULT_SESSION_LAG_SECS
}

/// Saved orchestrator state: the round-robin budget plus one blob per
/// persisted component, in registration order.
///
/// ```
/// use gantry_core::ComponentConfig;
/// use gantry_engine::SessionConfig;
///
/// let session = SessionConfig {
///     tolerable_lag_secs: 0.005,
///     components: vec![ComponentConfig::new("cache")],
/// };
/// let json = session.to_json().unwrap();
/// assert_eq!(SessionConfig::from_json(&json).unwrap(), session);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Round-robin budget, in seconds.
    #[serde(default = "default_lag_secs")]
    pub tolerable_lag_secs: f64,
    /// Blobs of the components to re-register.
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tolerable_lag_secs: DEFAULT_SESSION_LAG_SECS,
            components: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// The stored budget as a [`Duration`].
    ///
    /// Fails with [`ConfigError::InvalidTolerableLag`] if the stored value
    /// is negative, NaN, or too large to represent.
    pub fn tolerable_lag(&self) -> Result<Duration, ConfigError> {
        Duration::try_from_secs_f64(self.tolerable_lag_secs).map_err(|_| {
            ConfigError::InvalidTolerableLag {
                value: self.tolerable_lag_secs,
            }
        })
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
