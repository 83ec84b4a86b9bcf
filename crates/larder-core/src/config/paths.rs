//! File locations inside the larder config directory.

use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "larder.toml";
pub const CREDENTIALS_FILE: &str = "credentials.json";
pub const DEFAULT_PROFILE_FILE: &str = "default-profile.json";
pub const RECIPES_DIR: &str = "recipes";

/// `<config_dir>/larder` for the current user.
pub fn default_config_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
        .join("larder");
    Ok(dir)
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE)
}

pub fn credentials_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CREDENTIALS_FILE)
}

pub fn default_profile_path(config_dir: &Path) -> PathBuf {
    config_dir.join(DEFAULT_PROFILE_FILE)
}

pub fn recipes_dir(config_dir: &Path) -> PathBuf {
    config_dir.join(RECIPES_DIR)
}
