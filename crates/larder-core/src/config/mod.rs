//! Configuration and credentials.
//!
//! Everything lives in one directory (`<config_dir>/larder` by default):
//! - `larder.toml`: source selection and install policy
//! - `credentials.json` / `default-profile.json`: account profiles (read-only)

pub mod credentials;
pub mod parser;
pub mod paths;
pub mod schema;
pub mod store;

pub use credentials::{Credentials, CredentialsError, Profile};
pub use parser::{parse_config_file, parse_config_str, to_toml};
pub use paths::default_config_dir;
pub use schema::{DEFAULT_TIMEOUT_SECS, InstallConfig, LarderConfig, SourceConfig, SourceKind};
pub use store::ConfigStore;
