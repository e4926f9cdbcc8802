//! Errors raised by individual components.
//!
//! Structural errors (duplicate capabilities, cycles, unresolved
//! dependencies) live with the graph that detects them; this module only
//! covers failures inside a component's own hooks, which the orchestrator
//! isolates per entry.

use std::error::Error;
use std::fmt;

/// A failure inside one component's lifecycle, update, or tick hook.
///
/// Returned by [`Component`](crate::Component) hooks. The orchestrator
/// never lets one of these abort a pass: the failing entry is logged,
/// reported, and skipped for the remainder of the pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentError {
    /// The hook reported a failure.
    Failed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// The hook panicked; the panic was contained by the orchestrator.
    Panicked {
        /// Panic payload rendered as text, when it was a string.
        message: String,
    },
    /// A persisted configuration blob could not be applied.
    InvalidConfiguration {
        /// Description of what was wrong with the blob.
        reason: String,
    },
}

impl ComponentError {
    /// Shorthand for [`ComponentError::Failed`].
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { reason } => write!(f, "hook failed: {reason}"),
            Self::Panicked { message } => write!(f, "hook panicked: {message}"),
            Self::InvalidConfiguration { reason } => {
                write!(f, "invalid configuration: {reason}")
            }
        }
    }
}

impl Error for ComponentError {}
