//! Recipe entity
//!
//! The strongly-typed form of a recipe document. Deserialization is lenient:
//! absent or `null` fields take their zero value and scalar fields accept
//! numbers and booleans. Anything else is a type error naming the field.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::de;

/// Declarative description of one installable component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Recipe {
    /// Unique name within a run (never empty)
    #[serde(deserialize_with = "de::text")]
    pub name: String,
    #[serde(deserialize_with = "de::text")]
    pub display_name: String,
    #[serde(deserialize_with = "de::text")]
    pub id: String,
    #[serde(deserialize_with = "de::text")]
    pub description: String,
    #[serde(deserialize_with = "de::text")]
    pub repository: String,

    /// Capability keywords (e.g., "apm", "infrastructure")
    #[serde(deserialize_with = "de::text_list")]
    pub keywords: Vec<String>,
    #[serde(deserialize_with = "de::parsed")]
    pub stability: Option<Stability>,

    /// Names of recipes that must be installed first, in declaration order
    #[serde(deserialize_with = "de::text_list")]
    pub dependencies: Vec<String>,

    /// Targets this recipe supports; empty means universally applicable
    #[serde(deserialize_with = "de::sections")]
    pub install_targets: Vec<InstallTarget>,

    /// Variables resolved before execution
    #[serde(deserialize_with = "de::sections")]
    pub input_vars: Vec<InputVariable>,

    /// Opaque install payload handed to the executor verbatim
    pub install: InstallSteps,

    #[serde(deserialize_with = "de::section")]
    pub pre_install: PreInstall,
    #[serde(deserialize_with = "de::section")]
    pub post_install: PostInstall,

    /// Log sources, passed through to validation collaborators
    #[serde(deserialize_with = "de::sections")]
    pub log_match: Vec<LogMatch>,

    /// Process patterns, passed through to discovery collaborators
    #[serde(deserialize_with = "de::text_list")]
    pub process_match: Vec<String>,

    #[serde(deserialize_with = "de::section")]
    pub success_link_config: SuccessLinkConfig,

    #[serde(rename = "validationNrql", deserialize_with = "de::text")]
    pub validation_nrql: String,
}

impl Recipe {
    /// Check for a keyword, ignoring case.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
    }

    /// Whether this recipe instruments an application (APM).
    pub fn is_apm(&self) -> bool {
        self.has_keyword("apm")
    }

    pub fn has_target_type(&self, target_type: TargetType) -> bool {
        self.install_targets
            .iter()
            .any(|t| t.target_type == Some(target_type))
    }

    pub fn has_host_target_type(&self) -> bool {
        self.has_target_type(TargetType::Host)
    }

    pub fn has_application_target_type(&self) -> bool {
        self.has_target_type(TargetType::Application)
    }

    /// Informational text shown before installation, if any.
    pub fn pre_install_message(&self) -> Option<&str> {
        non_empty(&self.pre_install.info)
    }

    /// Informational text shown after installation, if any.
    pub fn post_install_message(&self) -> Option<&str> {
        non_empty(&self.post_install.info)
    }

    /// Human-facing label: display name when set, else the recipe name.
    pub fn label(&self) -> &str {
        non_empty(&self.display_name).unwrap_or(&self.name)
    }
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}

/// One targeting predicate. Empty fields are wildcards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InstallTarget {
    #[serde(deserialize_with = "de::text")]
    pub os: String,
    #[serde(deserialize_with = "de::text")]
    pub platform: String,
    #[serde(deserialize_with = "de::text")]
    pub platform_family: String,
    #[serde(deserialize_with = "de::text")]
    pub platform_version: String,
    #[serde(deserialize_with = "de::text")]
    pub kernel_arch: String,
    #[serde(deserialize_with = "de::text")]
    pub kernel_version: String,
    #[serde(rename = "type", deserialize_with = "de::parsed")]
    pub target_type: Option<TargetType>,
}

impl InstallTarget {
    /// Target restricted to a single operating system.
    pub fn for_os(os: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            ..Default::default()
        }
    }
}

/// Kind of environment a target describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetType {
    Host,
    Application,
    Cloud,
    Kubernetes,
}

impl FromStr for TargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HOST" => Ok(Self::Host),
            "APPLICATION" => Ok(Self::Application),
            "CLOUD" => Ok(Self::Cloud),
            "KUBERNETES" => Ok(Self::Kubernetes),
            _ => Err(format!("unknown target type '{}'", s)),
        }
    }
}

/// Maturity of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stability {
    Experimental,
    Stable,
    Disabled,
}

impl FromStr for Stability {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EXPERIMENTAL" => Ok(Self::Experimental),
            "STABLE" => Ok(Self::Stable),
            "DISABLED" => Ok(Self::Disabled),
            _ => Err(format!("unknown stability '{}'", s)),
        }
    }
}

impl fmt::Display for Stability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Experimental => "experimental",
            Self::Stable => "stable",
            Self::Disabled => "disabled",
        };
        write!(f, "{}", s)
    }
}

/// A value the user must supply before the recipe can run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputVariable {
    #[serde(deserialize_with = "de::text")]
    pub name: String,
    #[serde(deserialize_with = "de::text")]
    pub prompt: String,
    #[serde(deserialize_with = "de::text")]
    pub default: String,
    #[serde(deserialize_with = "de::flag")]
    pub secret: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreInstall {
    #[serde(deserialize_with = "de::text")]
    pub info: String,
    #[serde(deserialize_with = "de::text")]
    pub prompt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostInstall {
    #[serde(deserialize_with = "de::text")]
    pub info: String,
}

/// A log source the installed component is expected to produce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogMatch {
    #[serde(deserialize_with = "de::text")]
    pub name: String,
    #[serde(deserialize_with = "de::text")]
    pub file: String,
    #[serde(deserialize_with = "de::text")]
    pub pattern: String,
    #[serde(deserialize_with = "de::text")]
    pub systemd: String,
    #[serde(deserialize_with = "de::text_map")]
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessLinkConfig {
    #[serde(rename = "type", deserialize_with = "de::text")]
    pub link_type: String,
    #[serde(deserialize_with = "de::text")]
    pub filter: String,
}

/// Opaque install payload.
///
/// The resolution engine never looks inside; the executor receives it as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallSteps(serde_yaml::Mapping);

impl InstallSteps {
    pub fn new(mapping: serde_yaml::Mapping) -> Self {
        Self(mapping)
    }

    pub fn as_mapping(&self) -> &serde_yaml::Mapping {
        &self.0
    }

    /// Render the payload back to YAML for an external executor.
    pub fn to_yaml_string(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&self.0)
    }
}
