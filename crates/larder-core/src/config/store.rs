//! Config store for loading and saving larder.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use super::{LarderConfig, parser, paths};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store rooted at the user's config directory.
    pub fn from_default_dir() -> anyhow::Result<Self> {
        Ok(Self::new(paths::default_config_dir()?))
    }

    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config_path = paths::config_file_path(&config_dir);
        Self {
            config_dir,
            config_path,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the config file, or defaults when it does not exist.
    pub fn load(&self) -> anyhow::Result<LarderConfig> {
        if !self.config_path.exists() {
            debug!(path = %self.config_path.display(), "no config file, using defaults");
            return Ok(LarderConfig::new());
        }
        parser::parse_config_file(&self.config_path)
    }

    pub fn save(&self, config: &LarderConfig) -> anyhow::Result<()> {
        config.validate()?;
        let content = parser::to_toml(config)?;
        std::fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.config_dir.display()
            )
        })?;
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}
