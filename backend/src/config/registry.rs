//! Process-wide, read-mostly, case-insensitive config key/value map
//! (`spec.md` §2.1 "Config registry", §5 "The config registry is
//! read-mostly; writes occur only during single-threaded init").
//!
//! Unlike [`crate::config::AppConfig`] (typed CLI/env settings loaded once
//! via `ortho_config`), this registry models the source's free-form
//! `knobman`-style lookup: any named knob, looked up by string, absent on a
//! miss rather than erroring.

use std::collections::HashMap;

/// A case-insensitive snapshot of named configuration values.
///
/// Built once at process init from the environment and never mutated after;
/// concurrent reads need no locking because the map itself is immutable
/// after construction.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    values: HashMap<String, String>,
}

impl ConfigRegistry {
    /// Build an empty registry. Mainly useful for tests; production code
    /// should prefer [`ConfigRegistry::from_env`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from the current process environment, normalizing
    /// every key to uppercase so lookups are case-insensitive.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build a registry from an arbitrary key/value iterator (used by
    /// `from_env` and by tests that want a deterministic snapshot).
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let values = pairs
            .into_iter()
            .map(|(key, value)| (key.to_uppercase(), value))
            .collect();
        Self { values }
    }

    /// Raw string lookup. `None` on a missing key, never an error.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_uppercase()).map(String::as_str)
    }

    /// Parse the named key as `u32`. `None` if absent; the caller decides
    /// whether a malformed value is fatal.
    #[must_use]
    pub fn get_u32(&self, key: &str) -> Option<u32> {
        self.get_str(key).and_then(|raw| raw.parse().ok())
    }

    /// Parse the named key as `f64`.
    #[must_use]
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get_str(key).and_then(|raw| raw.parse().ok())
    }

    /// Parse the named key as a boolean (`"true"`/`"1"` are truthy,
    /// case-insensitively).
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_str(key)
            .map(|raw| matches!(raw.to_lowercase().as_str(), "true" | "1"))
    }
}
