//! Application context shared by frontends.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use tracing::debug;

use crate::config::{ConfigStore, Credentials, LarderConfig, SourceKind, paths};
use crate::install::{InstallOptions, TaskExecutor};
use crate::source::{
    HttpClient, LocalRecipeFetcher, RecipeFileFetcher, RecipeSource, RecommendationFetcher,
};

/// Loaded configuration and credentials, plus factories for the services
/// built from them.
///
/// Frontends create this once per invocation, apply command-line overrides
/// through [`AppContext::config_mut`], then build what they need.
#[derive(Debug, Clone)]
pub struct AppContext {
    config_dir: PathBuf,
    config: LarderConfig,
    credentials: Credentials,
    profile: Option<String>,
}

impl AppContext {
    /// Load from the user's config directory.
    pub fn from_default_dir() -> anyhow::Result<Self> {
        Self::load(paths::default_config_dir()?)
    }

    /// Load from an explicit config directory (used by tests).
    pub fn load(config_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let config_dir = config_dir.into();
        let config = ConfigStore::new(&config_dir).load()?;
        let credentials = Credentials::load(&config_dir).context("Failed to load credentials")?;
        Ok(Self::new(config_dir, config, credentials))
    }

    pub fn new(config_dir: PathBuf, config: LarderConfig, credentials: Credentials) -> Self {
        Self {
            config_dir,
            config,
            credentials,
            profile: None,
        }
    }

    /// Use a profile other than the configured one.
    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        if profile.is_some() {
            self.profile = profile;
        }
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config(&self) -> &LarderConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut LarderConfig {
        &mut self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn profile_name(&self) -> Option<&str> {
        self.profile.as_deref().or(self.config.profile.as_deref())
    }

    pub fn license_key(&self) -> Option<String> {
        self.credentials.license_key(self.profile_name())
    }

    pub fn api_key(&self) -> Option<String> {
        self.credentials
            .active_profile(self.profile_name())
            .ok()
            .and_then(|p| p.api_key())
            .map(str::to_string)
    }

    pub fn http_client(&self) -> anyhow::Result<HttpClient> {
        let timeout = Duration::from_secs(self.config.source.timeout_secs);
        HttpClient::new(timeout).context("Failed to create HTTP client")
    }

    /// Build the recipe source selected by `[source]`.
    pub fn recipe_source(&self) -> anyhow::Result<RecipeSource> {
        self.config.source.validate()?;
        let source = &self.config.source;

        let recipe_source = match source.kind {
            SourceKind::Local => {
                let dir = source
                    .directory
                    .clone()
                    .unwrap_or_else(|| paths::recipes_dir(&self.config_dir));
                RecipeSource::Local(LocalRecipeFetcher::new(dir))
            }
            SourceKind::Files => RecipeSource::Files(
                RecipeFileFetcher::new(self.http_client()?)
                    .with_locations(source.locations.iter().cloned()),
            ),
            SourceKind::Service => {
                let url = source
                    .service_url
                    .clone()
                    .context("'source.service_url' is not set")?;
                let mut fetcher = RecommendationFetcher::new(self.http_client()?, url);
                if let Some(key) = self.api_key() {
                    fetcher = fetcher.with_api_key(key);
                }
                RecipeSource::Service(fetcher)
            }
        };

        debug!(kind = recipe_source.kind(), "selected recipe source");
        Ok(recipe_source)
    }

    /// Loader for explicit recipe paths and URLs.
    pub fn file_fetcher(&self) -> anyhow::Result<RecipeFileFetcher> {
        Ok(RecipeFileFetcher::new(self.http_client()?))
    }

    pub fn task_executor(&self) -> TaskExecutor {
        match &self.config.install.task_binary {
            Some(path) => TaskExecutor::new(path),
            None => TaskExecutor::default(),
        }
    }

    pub fn install_options(&self) -> InstallOptions {
        InstallOptions::from_config(&self.config.install)
    }
}
