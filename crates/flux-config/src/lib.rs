//! Configuration for flux-store
//!
//! This crate provides:
//! - Config and cache directory utilities
//! - Configuration file lookup (TOML)
//! - Store configuration (StoreConfig)

pub mod config_file;
pub mod paths;
pub mod store_config;

pub use config_file::load_config_file;
pub use paths::{cache_dir, config_dir};
pub use store_config::{StoreConfig, SubscriberErrorPolicy};
