//! Schema definitions for larder.toml

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::resolve::ResolutionDepth;

/// Default fetch timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Root configuration structure for larder.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LarderConfig {
    /// Credentials profile to use instead of the default one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    /// Where recipes come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Installation policy
    #[serde(default)]
    pub install: InstallConfig,
}

/// Which recipe source is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A directory of recipe documents
    #[default]
    Local,
    /// The remote recommendation service
    Service,
    /// A fixed list of recipe paths or URLs
    Files,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: SourceKind,

    /// Recipe directory for the local source (defaults to `<config_dir>/recipes`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// GraphQL endpoint of the recommendation service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<Url>,

    /// Locations served by the files source
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,

    /// Per-request timeout for remote fetches
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            directory: None,
            service_url: None,
            locations: Vec::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallConfig {
    /// Never install the infrastructure agent
    #[serde(default)]
    pub skip_infra: bool,

    #[serde(default)]
    pub resolution: ResolutionDepth,

    /// Abort the batch on the first failed recipe
    #[serde(default)]
    pub fail_fast: bool,

    /// Path to the `task` runner (defaults to `task` on PATH)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_binary: Option<PathBuf>,
}

impl LarderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.source.validate()?;
        if self.profile.as_deref().is_some_and(|p| p.trim().is_empty()) {
            anyhow::bail!("'profile' must not be empty");
        }
        Ok(())
    }
}

impl SourceConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.timeout_secs == 0 {
            anyhow::bail!("'source.timeout_secs' must be greater than zero");
        }
        match self.kind {
            SourceKind::Service if self.service_url.is_none() => {
                anyhow::bail!("'source.service_url' is required when kind = \"service\"")
            }
            SourceKind::Files if self.locations.is_empty() => {
                anyhow::bail!("'source.locations' must list at least one recipe when kind = \"files\"")
            }
            _ => Ok(()),
        }
    }
}
