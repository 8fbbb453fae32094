//! Explicitly owned registry of named engine configurations.
//!
//! Replaces an ambient, lazily-populated module cache: factories are
//! registered eagerly under a logical key at startup, and the registry's
//! lifetime is tied to whoever owns the instance.

use tracing::warn;

use crate::engine::TransferEngine;

/// Factory producing a configured engine for one registered action.
pub type EngineFactory = Box<dyn Fn() -> TransferEngine + Send + Sync>;

/// Key → factory table, in registration order.
#[derive(Default)]
pub struct ActionRegistry {
    entries: Vec<(String, EngineFactory)>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `key`, replacing any previous
    /// registration for the same key.
    pub fn register(&mut self, key: &str, factory: EngineFactory) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            warn!(key, "replacing registered action");
            entry.1 = factory;
        } else {
            self.entries.push((key.to_string(), factory));
        }
    }

    /// Instantiates the engine registered under `key`.
    pub fn resolve(&self, key: &str) -> Option<TransferEngine> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, factory)| factory())
    }

    /// Registered keys, in registration order.
    pub fn keys(&self) -> Vec<&str> {
        self.entries.iter().map(|(k, _)| k.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
