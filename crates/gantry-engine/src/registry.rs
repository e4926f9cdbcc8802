//! Kind → constructor lookup used when reloading a saved session.

use std::fmt;

use gantry_core::{Component, ComponentConfig, Factory};
use indexmap::IndexMap;
use log::debug;

use crate::config::ConfigError;

/// Maps component kinds to constructors.
///
/// A saved [`SessionConfig`](crate::SessionConfig) only records each
/// component's kind and blob; the registry turns a kind back into a fresh
/// instance, which then receives the blob through `load_configuration`.
#[derive(Default)]
pub struct KindRegistry {
    constructors: IndexMap<String, Factory>,
}

impl KindRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the constructor for `kind`.
    pub fn register(&mut self, kind: impl Into<String>, make: Factory) -> Result<(), ConfigError> {
        let kind = kind.into();
        if self.constructors.contains_key(&kind) {
            return Err(ConfigError::DuplicateKind { kind });
        }
        debug!("registered constructor for kind '{kind}'");
        self.constructors.insert(kind, make);
        Ok(())
    }

    /// Build a fresh component for `config.kind`.
    pub fn instantiate(&self, config: &ComponentConfig) -> Result<Box<dyn Component>, ConfigError> {
        let make = self
            .constructors
            .get(&config.kind)
            .ok_or_else(|| ConfigError::UnknownKind {
                kind: config.kind.clone(),
            })?;
        Ok(make())
    }

    /// Whether `kind` has a constructor.
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gantry_test_utils::{factory, ConfigurableComponent};

    #[test]
    fn instantiates_registered_kind() {
        let mut reg = KindRegistry::new();
        reg.register(ConfigurableComponent::KIND, factory(ConfigurableComponent::default))
            .unwrap();
        let c = reg
            .instantiate(&ComponentConfig::new(ConfigurableComponent::KIND))
            .unwrap();
        assert_eq!(c.kind(), ConfigurableComponent::KIND);
    }

    #[test]
    fn unknown_kind_is_reported() {
        let reg = KindRegistry::new();
        match reg.instantiate(&ComponentConfig::new("ghost")) {
            Err(ConfigError::UnknownKind { kind }) => assert_eq!(kind, "ghost"),
            Err(other) => panic!("expected UnknownKind, got {other:?}"),
            Ok(_) => panic!("expected UnknownKind"),
        }
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let mut reg = KindRegistry::new();
        reg.register("a", factory(ConfigurableComponent::default)).unwrap();
        assert!(matches!(
            reg.register("a", factory(ConfigurableComponent::default)),
            Err(ConfigError::DuplicateKind { .. })
        ));
        assert_eq!(reg.len(), 1);
    }
}
