//! Store configuration
//!
//! Configuration loaded from .flux-store.toml.

use serde::{Deserialize, Serialize};

/// What the store does with selector/callback failures collected during a
/// notification sweep.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberErrorPolicy {
    /// Return the failures to the caller of `dispatch` as an error
    #[default]
    Return,
    /// Log each failure at error level; `dispatch` succeeds
    Log,
}

/// Store configuration loaded from .flux-store.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// How subscriber failures are reported
    #[serde(default)]
    pub subscriber_errors: SubscriberErrorPolicy,

    /// Invoke a new subscription's callback with the current value on subscribe.
    /// Failures of that call are always logged, never returned.
    #[serde(default)]
    pub initial_callback: bool,

    /// Number of entries kept by the snapshot middleware
    #[serde(default = "default_snapshot_capacity")]
    pub snapshot_capacity: usize,
}

fn default_snapshot_capacity() -> usize {
    256
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            subscriber_errors: SubscriberErrorPolicy::default(),
            initial_callback: false,
            snapshot_capacity: default_snapshot_capacity(),
        }
    }
}

impl StoreConfig {
    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        match crate::load_config_file() {
            Some(content) => Self::from_toml(&content),
            None => {
                log::debug!("Using default store config");
                Self::default()
            }
        }
    }

    /// Parse config content, falling back to defaults on malformed input
    pub fn from_toml(content: &str) -> Self {
        match toml::from_str(content) {
            Ok(config) => {
                log::info!("Loaded store config from file");
                config
            }
            Err(e) => {
                log::warn!("Failed to parse config file: {}", e);
                Self::default()
            }
        }
    }
}
