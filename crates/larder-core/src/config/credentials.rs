//! Account credentials profiles.
//!
//! `credentials.json` maps profile names to account details and
//! `default-profile.json` holds the default profile name as a JSON string.
//! Both files are optional and never written by larder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::paths;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("profile '{name}' not found")]
    ProfileNotFound { name: String },

    #[error("no default profile configured")]
    NoDefaultProfile,
}

/// One account profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub region: String,
    #[serde(default, rename = "accountID")]
    pub account_id: Option<u64>,
    #[serde(default)]
    pub license_key: String,
}

impl Profile {
    pub fn license_key(&self) -> Option<&str> {
        (!self.license_key.is_empty()).then_some(self.license_key.as_str())
    }

    pub fn api_key(&self) -> Option<&str> {
        (!self.api_key.is_empty()).then_some(self.api_key.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    profiles: BTreeMap<String, Profile>,
    default_profile: Option<String>,
}

impl Credentials {
    pub fn new(profiles: BTreeMap<String, Profile>, default_profile: Option<String>) -> Self {
        Self {
            profiles,
            default_profile,
        }
    }

    /// Load both files from the config directory. Missing files are empty.
    pub fn load(config_dir: &Path) -> Result<Self, CredentialsError> {
        let profiles: BTreeMap<String, Profile> =
            read_json(&paths::credentials_path(config_dir))?.unwrap_or_default();
        let default_profile: Option<String> =
            read_json(&paths::default_profile_path(config_dir))?;

        debug!(
            profiles = profiles.len(),
            default = default_profile.as_deref().unwrap_or("<none>"),
            "loaded credentials"
        );
        Ok(Self::new(
            profiles,
            default_profile.filter(|name| !name.is_empty()),
        ))
    }

    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn default_profile(&self) -> Option<&str> {
        self.default_profile.as_deref()
    }

    /// The explicitly requested profile, else the default one.
    pub fn active_profile(&self, explicit: Option<&str>) -> Result<&Profile, CredentialsError> {
        let name = explicit
            .or(self.default_profile.as_deref())
            .ok_or(CredentialsError::NoDefaultProfile)?;
        self.profile(name)
            .ok_or_else(|| CredentialsError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// License key of the active profile, if one is configured.
    pub fn license_key(&self, explicit: Option<&str>) -> Option<String> {
        self.active_profile(explicit)
            .ok()
            .and_then(Profile::license_key)
            .map(str::to_string)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, CredentialsError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(CredentialsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|source| CredentialsError::Parse {
            path: path.to_path_buf(),
            source,
        })
}
