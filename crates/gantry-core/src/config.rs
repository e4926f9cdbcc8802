//! Per-component persisted configuration blobs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ComponentError;

/// One component's serialized configuration.
///
/// `kind` matches [`Component::kind()`](crate::Component::kind) and is used
/// to find a constructor when a saved session is loaded; `data` is opaque
/// to the orchestrator and owned by the component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Kind of the component this blob belongs to.
    pub kind: String,
    /// Component-defined payload.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ComponentConfig {
    /// A blob with no payload.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: serde_json::Value::Null,
        }
    }

    /// A blob with the given payload.
    pub fn with_data(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }

    /// Serialize a typed settings struct into a blob.
    pub fn encode<T: Serialize>(kind: impl Into<String>, settings: &T) -> Result<Self, ComponentError> {
        let data = serde_json::to_value(settings).map_err(|e| {
            ComponentError::InvalidConfiguration {
                reason: e.to_string(),
            }
        })?;
        Ok(Self::with_data(kind, data))
    }

    /// Deserialize the payload into a typed settings struct.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ComponentError> {
        T::deserialize(&self.data).map_err(|e| ComponentError::InvalidConfiguration {
            reason: format!("{} blob: {e}", self.kind),
        })
    }
}
