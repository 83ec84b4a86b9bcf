//! Recipes: the typed entity, document normalization, and host targeting.

mod de;
pub mod normalize;
pub mod schema;
pub mod targeting;

pub use normalize::{NormalizeError, normalize, parse_recipe};
pub use schema::{
    InputVariable, InstallSteps, InstallTarget, LogMatch, PostInstall, PreInstall, Recipe,
    Stability, SuccessLinkConfig, TargetType,
};
pub use targeting::{constrain_recipes, matches};

/// Recipe that installs the host infrastructure agent.
pub const INFRA_AGENT_RECIPE_NAME: &str = "infrastructure-agent-installer";

/// File extensions recognised as recipe documents.
pub const RECIPE_EXTENSIONS: &[&str] = &["yml", "yaml"];
