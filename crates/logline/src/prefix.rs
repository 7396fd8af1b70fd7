//! Prefix registry.
//!
//! Loggers register their prefix here so every line can pad its `[prefix]`
//! column to the widest prefix seen so far. The registry is an ordinary value
//! passed to loggers by `Arc`; [`global_registry`] is the instance loggers share
//! unless they are given another one.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use console::measure_text_width;

#[derive(Debug, Default)]
struct RegistryState {
    prefixes: BTreeSet<String>,
    max_len: usize,
}

/// Running maximum of registered prefix widths.
#[derive(Debug, Default)]
pub struct PrefixRegistry {
    state: Mutex<RegistryState>,
}

impl PrefixRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `prefix`. Registering the same prefix again has no effect.
    pub fn register(&self, prefix: &str) {
        if prefix.is_empty() {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.prefixes.insert(prefix.to_string()) {
            state.max_len = state.max_len.max(measure_text_width(prefix));
        }
    }

    /// Display width of the widest registered prefix.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .max_len
    }

    #[must_use]
    pub fn prefixes(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .prefixes
            .iter()
            .cloned()
            .collect()
    }

    /// Forget every prefix.
    pub fn reset(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = RegistryState::default();
    }
}

/// The process-wide registry.
pub fn global_registry() -> Arc<PrefixRegistry> {
    static REGISTRY: OnceLock<Arc<PrefixRegistry>> = OnceLock::new();
    Arc::clone(REGISTRY.get_or_init(|| Arc::new(PrefixRegistry::new())))
}
