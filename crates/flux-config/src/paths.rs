//! Configuration and cache directory paths
//!
//! Uses XDG directories via `dirs` crate.
//!
//! Platform-specific locations:
//! - Linux: `~/.config/flux-store/`, `~/.cache/flux-store/`
//! - macOS: `~/Library/Application Support/flux-store/`, `~/Library/Caches/flux-store/`
//! - Windows: `%APPDATA%\flux-store\`, `%LOCALAPPDATA%\flux-store\`

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_NAME: &str = "flux-store";

/// Get the application config directory, creating it if missing
pub fn config_dir() -> Result<PathBuf> {
    let base = dirs::config_dir().context("Could not determine config directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the application cache directory, creating it if missing
pub fn cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir().context("Could not determine cache directory")?;
    let dir = base.join(APP_NAME);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get path to the store config file inside the config directory
pub fn store_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_exists() {
        let dir = config_dir().unwrap();
        assert!(dir.exists());
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn test_cache_dir_exists() {
        let dir = cache_dir().unwrap();
        assert!(dir.exists());
        assert!(dir.ends_with(APP_NAME));
    }

    #[test]
    fn test_store_config_path() {
        let path = store_config_path().unwrap();
        assert!(path.ends_with("config.toml"));
    }
}
