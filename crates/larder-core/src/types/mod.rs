//! Shared core types consumed across sources, matching, and installation.

use serde::{Deserialize, Serialize};

/// A process observed on the host during discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Executable or command name as reported by discovery.
    pub name: String,
}

impl ProcessInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Snapshot of host facts produced by discovery.
///
/// Created once per run and only read afterwards. Every field is optional in
/// the serialized form so a partial manifest still loads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryManifest {
    /// Operating system family (e.g., "linux", "windows", "darwin")
    #[serde(default)]
    pub os: String,

    /// Distribution or platform name (e.g., "ubuntu", "amazon")
    #[serde(default)]
    pub platform: String,

    /// Platform family (e.g., "debian", "rhel")
    #[serde(default)]
    pub platform_family: String,

    /// Platform version (e.g., "20.04")
    #[serde(default)]
    pub platform_version: String,

    /// CPU architecture as reported by the runtime (e.g., "amd64")
    #[serde(default)]
    pub arch: String,

    /// Kernel architecture (e.g., "x86_64")
    #[serde(default)]
    pub kernel_arch: String,

    /// Kernel version (e.g., "5.4.0-1045-aws")
    #[serde(default)]
    pub kernel_version: String,

    /// Processes detected on the host
    #[serde(default)]
    pub processes: Vec<ProcessInfo>,
}

impl DiscoveryManifest {
    /// Create a manifest with just the OS and architecture populated.
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
            ..Default::default()
        }
    }

    /// Build a minimal manifest for the running host from compile-time constants.
    ///
    /// Discovery proper lives outside this crate; this is the fallback when no
    /// manifest file is supplied.
    pub fn from_host() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            other => other,
        };

        Self {
            os: os.to_string(),
            arch: arch.to_string(),
            kernel_arch: std::env::consts::ARCH.to_string(),
            ..Default::default()
        }
    }

    /// Parse a manifest from its JSON representation.
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse discovery manifest: {}", e))
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    pub fn with_platform_family(mut self, family: impl Into<String>) -> Self {
        self.platform_family = family.into();
        self
    }

    pub fn with_platform_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = version.into();
        self
    }

    pub fn with_kernel(mut self, arch: impl Into<String>, version: impl Into<String>) -> Self {
        self.kernel_arch = arch.into();
        self.kernel_version = version.into();
        self
    }

    pub fn with_process(mut self, name: impl Into<String>) -> Self {
        self.processes.push(ProcessInfo::new(name));
        self
    }

    /// Names of the detected processes, in discovery order.
    pub fn process_names(&self) -> impl Iterator<Item = &str> {
        self.processes.iter().map(|p| p.name.as_str())
    }
}
