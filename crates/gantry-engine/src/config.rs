//! Orchestrator configuration and configuration errors.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use gantry_core::ComponentError;
use gantry_graph::{GraphError, MAX_PROFILING_WINDOW};

// ── Error type ──────────────────────────────────────────────────

/// Errors from configuring an orchestrator or loading a saved session.
#[derive(Debug)]
pub enum ConfigError {
    /// The tolerable lag is negative, NaN, or infinite.
    InvalidTolerableLag {
        /// The rejected value, in seconds.
        value: f64,
    },
    /// The profiling window exceeds [`MAX_PROFILING_WINDOW`].
    ProfilingWindowTooLarge {
        /// The requested window length.
        requested: usize,
    },
    /// A saved component's kind has no constructor in the `KindRegistry`.
    UnknownKind {
        /// The unknown kind.
        kind: String,
    },
    /// A kind was registered twice in the `KindRegistry`.
    DuplicateKind {
        /// The duplicated kind.
        kind: String,
    },
    /// A component failed to produce its configuration blob.
    Component {
        /// Kind of the failing component.
        kind: String,
        /// What went wrong.
        error: ComponentError,
    },
    /// The session envelope could not be (de)serialized.
    Serialization(serde_json::Error),
    /// A structural graph error.
    Graph(GraphError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTolerableLag { value } => write!(
                f,
                "tolerable_lag must be finite and non-negative, got {value}"
            ),
            Self::ProfilingWindowTooLarge { requested } => write!(
                f,
                "profiling window {requested} exceeds maximum of {MAX_PROFILING_WINDOW}"
            ),
            Self::UnknownKind { kind } => write!(f, "no constructor registered for kind '{kind}'"),
            Self::DuplicateKind { kind } => write!(f, "kind '{kind}' is already registered"),
            Self::Component { kind, error } => {
                write!(f, "saving configuration of '{kind}': {error}")
            }
            Self::Serialization(e) => write!(f, "session envelope: {e}"),
            Self::Graph(e) => write!(f, "graph: {e}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Component { error, .. } => Some(error),
            Self::Serialization(e) => Some(e),
            Self::Graph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GraphError> for ConfigError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e)
    }
}

// ── OrchestratorConfig ──────────────────────────────────────────

/// Default round-robin budget per phase: one 60 Hz frame.
pub const DEFAULT_TOLERABLE_LAG: Duration = Duration::from_nanos(16_666_667);

/// Runtime settings for an [`Orchestrator`](crate::Orchestrator).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Wall-clock budget of each phase, measured from the phase start.
    ///
    /// The round-robin scan stops once it is spent. Zero disables the
    /// scan and leaves only the full update pass.
    pub tolerable_lag: Duration,
    /// Samples kept in each per-entry moving average. Zero disables
    /// profiling.
    pub profiling_average_length: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tolerable_lag: DEFAULT_TOLERABLE_LAG,
            profiling_average_length: 0,
        }
    }
}

impl OrchestratorConfig {
    /// Check the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_profiling_window(self.profiling_average_length)
    }
}

pub(crate) fn validate_profiling_window(window: usize) -> Result<(), ConfigError> {
    if window > MAX_PROFILING_WINDOW {
        return Err(ConfigError::ProfilingWindowTooLarge { requested: window });
    }
    Ok(())
}
