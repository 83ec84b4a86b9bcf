//! Dependency resolution.
//!
//! Expands a recipe's declared dependencies into concrete recipes fetched from
//! a [`RecipeFetcher`]. A dependency that cannot be fetched is skipped with a
//! warning; the dependent recipe is still installed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::recipe::Recipe;
use crate::source::{FetchError, RecipeFetcher};
use crate::types::DiscoveryManifest;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("recipe '{recipe}' declares a dependency on itself")]
    SelfDependency { recipe: String },

    #[error("dependency cycle detected: {}", chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    #[error("dependency resolution cancelled")]
    Cancelled,
}

/// How far dependency declarations are followed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionDepth {
    /// Only the recipe's own `dependencies`.
    #[default]
    Direct,
    /// Dependencies of dependencies, depth first.
    Transitive,
}

/// A declared dependency that was not resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDependency {
    /// Recipe that declared the dependency
    pub recipe: String,
    pub dependency: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyResolution {
    /// Fetched dependencies, each before anything that depends on it
    pub recipes: Vec<Recipe>,
    pub skipped: Vec<SkippedDependency>,
}

pub struct DependencyResolver<'a> {
    fetcher: &'a dyn RecipeFetcher,
    depth: ResolutionDepth,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(fetcher: &'a dyn RecipeFetcher) -> Self {
        Self {
            fetcher,
            depth: ResolutionDepth::Direct,
        }
    }

    pub fn with_depth(mut self, depth: ResolutionDepth) -> Self {
        self.depth = depth;
        self
    }

    /// Resolve the dependencies of `recipe` (the recipe itself is not included).
    pub fn resolve(
        &self,
        recipe: &Recipe,
        manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<DependencyResolution, ResolveError> {
        let mut walk = Walk {
            stack: vec![recipe.name.clone()],
            visited: HashSet::new(),
            resolution: DependencyResolution::default(),
        };

        for dependency in &recipe.dependencies {
            self.visit(&recipe.name, dependency, manifest, cancel, &mut walk)?;
        }

        debug!(
            recipe = %recipe.name,
            resolved = walk.resolution.recipes.len(),
            skipped = walk.resolution.skipped.len(),
            "resolved dependencies"
        );
        Ok(walk.resolution)
    }

    fn visit(
        &self,
        dependent: &str,
        name: &str,
        manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
        walk: &mut Walk,
    ) -> Result<(), ResolveError> {
        if name == dependent {
            return Err(ResolveError::SelfDependency {
                recipe: dependent.to_string(),
            });
        }
        if walk.stack.iter().any(|n| n == name) {
            let mut chain = walk.stack.clone();
            chain.push(name.to_string());
            return Err(ResolveError::DependencyCycle { chain });
        }
        if !walk.visited.insert(name.to_string()) {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(ResolveError::Cancelled);
        }

        let recipe = match self.fetcher.fetch_recipe(manifest, name, cancel) {
            Ok(recipe) => recipe,
            Err(FetchError::Cancelled) => return Err(ResolveError::Cancelled),
            Err(e) => {
                warn!(recipe = dependent, dependency = name, error = %e, "skipping dependency");
                walk.resolution.skipped.push(SkippedDependency {
                    recipe: dependent.to_string(),
                    dependency: name.to_string(),
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        if self.depth == ResolutionDepth::Transitive {
            walk.stack.push(recipe.name.clone());
            for nested in &recipe.dependencies {
                self.visit(&recipe.name, nested, manifest, cancel, walk)?;
            }
            walk.stack.pop();
        }

        walk.resolution.recipes.push(recipe);
        Ok(())
    }
}

struct Walk {
    /// Names on the current path from the root
    stack: Vec<String>,
    visited: HashSet<String>,
    resolution: DependencyResolution,
}
