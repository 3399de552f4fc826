use std::{env, path::PathBuf};

const CONFIG_FILE: &str = ".flux-store.toml";

/// Load config file content
///
/// Searches for the config file in:
/// 1. Current working directory as .flux-store.toml
/// 2. Home directory as .flux-store.toml
/// 3. The application config directory as config.toml
///
/// Returns the file content if found, None otherwise.
pub fn load_config_file() -> Option<String> {
    let candidates = [
        Some(PathBuf::from(CONFIG_FILE)),
        get_home_config_path(),
        crate::paths::store_config_path().ok(),
    ];

    for path in candidates.into_iter().flatten() {
        if let Ok(content) = std::fs::read_to_string(&path) {
            log::debug!("Loaded config from {}", path.display());
            return Some(content);
        }
    }

    None
}

/// Get the path to the config file in the home directory
///
/// Returns ~/.flux-store.toml if HOME environment variable is set.
fn get_home_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE))
}
