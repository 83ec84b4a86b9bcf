//! Larder Core Library
//!
//! Recipe resolution and installation: normalizes recipe documents, fetches
//! them from local or remote sources, matches them against the host, resolves
//! dependencies, and drives their installation.

pub mod config;
pub mod context;
pub mod install;
pub mod recipe;
pub mod resolve;
pub mod source;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Host description
    pub use crate::types::{DiscoveryManifest, ProcessInfo};

    // Recipes
    pub use crate::recipe::{
        INFRA_AGENT_RECIPE_NAME, InstallSteps, InstallTarget, NormalizeError, Recipe,
        constrain_recipes, matches, parse_recipe,
    };

    // Sources
    pub use crate::source::{
        FetchError, LocalRecipeFetcher, RecipeFetcher, RecipeFileFetcher, RecipeLoader,
        RecipeSource, RecommendationFetcher,
    };

    // Resolution
    pub use crate::resolve::{DependencyResolver, ResolutionDepth, ResolveError};

    // Installation
    pub use crate::install::{
        ExecutionError, InstallError, InstallOptions, InstallReport, InstallStatus, Prompter,
        RecipeInstaller, StepExecutor, TaskExecutor, VariableSet,
    };

    // Configuration
    pub use crate::config::{ConfigStore, Credentials, LarderConfig};
    pub use crate::context::AppContext;

    pub use tokio_util::sync::CancellationToken;
}
