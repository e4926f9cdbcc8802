//! Per-entry fault isolation.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use gantry_core::ComponentError;

/// Run a component hook, converting a panic into [`ComponentError::Panicked`].
///
/// The orchestrator treats a panicking entry exactly like one that returned
/// an error. State the hook touched before panicking is owned by that
/// component alone, and the entry is skipped for the rest of the pass.
pub(crate) fn isolate<T>(
    hook: impl FnOnce() -> Result<T, ComponentError>,
) -> Result<T, ComponentError> {
    match panic::catch_unwind(AssertUnwindSafe(hook)) {
        Ok(result) => result,
        Err(payload) => Err(ComponentError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
