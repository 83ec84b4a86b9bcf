//! Installation orchestration.
//!
//! Collects the requested recipes, resolves their dependencies, removes
//! duplicates, then resolves variables and executes each recipe in order.

pub mod executor;
pub mod orchestrator;
pub mod prompt;
pub mod status;
pub mod variables;

use thiserror::Error;

use crate::resolve::ResolveError;
use crate::source::FetchError;

pub use executor::{ExecutionError, ExecutionRequest, StepExecutor, TaskExecutor};
pub use orchestrator::{
    InstallOptions, InstallReport, RecipeInstallResult, RecipeInstaller, RecipeOutcome,
    deduplicate, dependencies_first,
};
pub use prompt::{NonInteractivePrompter, PromptRequest, Prompter};
pub use status::{InstallStatus, NoopStatus};
pub use variables::{LICENSE_KEY_VARIABLE, VariableSet, resolve_input_variables};

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("failed to load recipe from '{location}': {source}")]
    LoadRecipe {
        location: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to fetch recommendations: {0}")]
    Recommendations(#[source] FetchError),

    #[error("failed to resolve dependencies of '{recipe}': {source}")]
    Resolve {
        recipe: String,
        #[source]
        source: ResolveError,
    },

    #[error("license key not found in active profile (required by '{recipe}')")]
    MissingLicenseKey { recipe: String },

    #[error("missing required input '{variable}' for '{recipe}': {reason}")]
    MissingRequiredInput {
        recipe: String,
        variable: String,
        reason: String,
    },

    #[error("installing '{recipe}' failed: {source}")]
    Execution {
        recipe: String,
        #[source]
        source: ExecutionError,
    },

    #[error("installation cancelled")]
    Cancelled,
}

impl InstallError {
    pub fn is_missing_license_key(&self) -> bool {
        matches!(self, Self::MissingLicenseKey { .. })
    }

    pub fn is_missing_required_input(&self) -> bool {
        matches!(self, Self::MissingRequiredInput { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
