//! Targeted recipe installation.

use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::InstallConfig;
use crate::recipe::{INFRA_AGENT_RECIPE_NAME, Recipe};
use crate::resolve::{DependencyResolver, ResolutionDepth, ResolveError};
use crate::source::{FetchError, RecipeFetcher, RecipeLoader};
use crate::types::DiscoveryManifest;

use super::executor::{ExecutionError, ExecutionRequest, StepExecutor};
use super::prompt::Prompter;
use super::status::{InstallStatus, NoopStatus};
use super::variables::{LICENSE_KEY_VARIABLE, resolve_input_variables};
use super::InstallError;

/// What to install and how.
///
/// Explicit recipe paths take priority over recipe names. With neither, the
/// source's recommendations for the host are installed.
#[derive(Debug, Clone, Default)]
pub struct InstallOptions {
    /// Paths or URLs of recipe documents
    pub recipe_paths: Vec<String>,
    /// Names looked up in the configured source
    pub recipe_names: Vec<String>,
    /// Never install the infrastructure agent recipe
    pub skip_infra: bool,
    pub resolution: ResolutionDepth,
    /// Stop at the first recipe that fails
    pub fail_fast: bool,
}

impl InstallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from the `[install]` section of the config file.
    pub fn from_config(config: &InstallConfig) -> Self {
        Self {
            skip_infra: config.skip_infra,
            resolution: config.resolution,
            fail_fast: config.fail_fast,
            ..Self::default()
        }
    }

    pub fn with_recipe_paths(mut self, paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.recipe_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_recipe_names(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.recipe_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skip_infra(mut self, skip_infra: bool) -> Self {
        self.skip_infra = skip_infra;
        self
    }

    pub fn with_resolution(mut self, resolution: ResolutionDepth) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    fn excludes(&self, name: &str) -> bool {
        self.skip_infra && name == INFRA_AGENT_RECIPE_NAME
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeOutcome {
    Installed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeInstallResult {
    pub recipe: String,
    pub outcome: RecipeOutcome,
}

#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    /// Recipe names in execution order
    pub selected: Vec<String>,
    pub results: Vec<RecipeInstallResult>,
    /// Non-fatal problems met while collecting and resolving
    pub warnings: Vec<String>,
}

impl InstallReport {
    pub fn installed(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|r| r.outcome == RecipeOutcome::Installed)
            .map(|r| r.recipe.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            RecipeOutcome::Failed { reason } => Some((r.recipe.as_str(), reason.as_str())),
            RecipeOutcome::Installed => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failed().next().is_none()
    }
}

/// Drop repeated recipe names, keeping the first occurrence.
pub fn deduplicate(recipes: Vec<Recipe>) -> Vec<Recipe> {
    let mut seen = HashSet::new();
    recipes
        .into_iter()
        .filter(|r| seen.insert(r.name.clone()))
        .collect()
}

/// Move every recipe after the dependencies it shares a list with.
///
/// Names must already be unique. Recipes with no ordering constraint between
/// them keep their relative order. A cycle inside the list is broken at the
/// first recipe reached.
pub fn dependencies_first(recipes: Vec<Recipe>) -> Vec<Recipe> {
    let order = {
        let index: HashMap<&str, usize> = recipes
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.as_str(), i))
            .collect();
        let mut marks = vec![Mark::Unvisited; recipes.len()];
        let mut order = Vec::with_capacity(recipes.len());
        for i in 0..recipes.len() {
            place(i, &recipes, &index, &mut marks, &mut order);
        }
        order
    };

    let mut slots: Vec<Option<Recipe>> = recipes.into_iter().map(Some).collect();
    order.into_iter().filter_map(|i| slots[i].take()).collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Placed,
}

fn place(
    i: usize,
    recipes: &[Recipe],
    index: &HashMap<&str, usize>,
    marks: &mut [Mark],
    order: &mut Vec<usize>,
) {
    if marks[i] != Mark::Unvisited {
        return;
    }
    marks[i] = Mark::InProgress;
    for dependency in &recipes[i].dependencies {
        if let Some(&d) = index.get(dependency.as_str()) {
            place(d, recipes, index, marks, order);
        }
    }
    marks[i] = Mark::Placed;
    order.push(i);
}

/// Drives one installation run.
pub struct RecipeInstaller<'a> {
    fetcher: &'a dyn RecipeFetcher,
    loader: &'a dyn RecipeLoader,
    executor: &'a dyn StepExecutor,
    prompter: &'a dyn Prompter,
    status: &'a dyn InstallStatus,
    license_key: Option<String>,
}

impl<'a> RecipeInstaller<'a> {
    pub fn new(
        fetcher: &'a dyn RecipeFetcher,
        loader: &'a dyn RecipeLoader,
        executor: &'a dyn StepExecutor,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            fetcher,
            loader,
            executor,
            prompter,
            status: &NoopStatus,
            license_key: None,
        }
    }

    pub fn with_status(mut self, status: &'a dyn InstallStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_license_key(mut self, license_key: Option<String>) -> Self {
        self.license_key = license_key.filter(|k| !k.is_empty());
        self
    }

    /// Collect, resolve, and install recipes for the host.
    pub fn install(
        &self,
        manifest: &DiscoveryManifest,
        options: &InstallOptions,
        cancel: &CancellationToken,
    ) -> Result<InstallReport, InstallError> {
        let mut report = InstallReport::default();

        let requested = self.collect(manifest, options, cancel, &mut report)?;
        let available = self.expand(requested, manifest, options, cancel, &mut report)?;
        self.status.recipes_available(&available);

        let selected: Vec<Recipe> = available
            .into_iter()
            .filter(|r| {
                let excluded = options.excludes(&r.name);
                if excluded {
                    info!(recipe = %r.name, "skipping infrastructure agent");
                }
                !excluded
            })
            .collect();
        self.status.recipes_selected(&selected);
        report.selected = selected.iter().map(|r| r.name.clone()).collect();

        if selected.is_empty() {
            info!("no recipes to install");
            return Ok(report);
        }

        let Some(license_key) = self.license_key.as_deref() else {
            return Err(InstallError::MissingLicenseKey {
                recipe: selected[0].name.clone(),
            });
        };

        for recipe in &selected {
            if cancel.is_cancelled() {
                return Err(InstallError::Cancelled);
            }
            self.status.recipe_installing(recipe);

            match self.install_recipe(recipe, license_key, cancel) {
                Ok(()) => {
                    info!(recipe = %recipe.name, "recipe installed");
                    self.status.recipe_installed(recipe);
                    report.results.push(RecipeInstallResult {
                        recipe: recipe.name.clone(),
                        outcome: RecipeOutcome::Installed,
                    });
                }
                Err(InstallError::Cancelled) => return Err(InstallError::Cancelled),
                Err(e) => {
                    warn!(recipe = %recipe.name, error = %e, "recipe failed");
                    self.status.recipe_failed(recipe, &e);
                    report.results.push(RecipeInstallResult {
                        recipe: recipe.name.clone(),
                        outcome: RecipeOutcome::Failed {
                            reason: e.to_string(),
                        },
                    });
                    if options.fail_fast {
                        return Err(e);
                    }
                }
            }
        }

        Ok(report)
    }

    fn collect(
        &self,
        manifest: &DiscoveryManifest,
        options: &InstallOptions,
        cancel: &CancellationToken,
        report: &mut InstallReport,
    ) -> Result<Vec<Recipe>, InstallError> {
        if !options.recipe_paths.is_empty() {
            let mut recipes = Vec::new();
            for location in &options.recipe_paths {
                if options.excludes(location) {
                    continue;
                }
                check_cancelled(cancel)?;
                let recipe = self
                    .loader
                    .load(location, cancel)
                    .map_err(|source| match source {
                        FetchError::Cancelled => InstallError::Cancelled,
                        source => InstallError::LoadRecipe {
                            location: location.clone(),
                            source,
                        },
                    })?;
                recipes.push(recipe);
            }
            return Ok(recipes);
        }

        if !options.recipe_names.is_empty() {
            let mut recipes = Vec::new();
            for name in &options.recipe_names {
                if options.excludes(name) {
                    debug!(recipe = %name, "skipping infrastructure agent");
                    continue;
                }
                check_cancelled(cancel)?;
                match self.fetcher.fetch_recipe(manifest, name, cancel) {
                    Ok(recipe) if recipe.name == *name => recipes.push(recipe),
                    Ok(recipe) => {
                        warn!(requested = %name, returned = %recipe.name, "source returned a different recipe");
                        report
                            .warnings
                            .push(format!("requested {} but the source returned {}", name, recipe.name));
                    }
                    Err(FetchError::Cancelled) => return Err(InstallError::Cancelled),
                    Err(e) => {
                        warn!(recipe = %name, error = %e, "could not fetch recipe");
                        report
                            .warnings
                            .push(format!("could not fetch recipe {}: {}", name, e));
                    }
                }
            }
            return Ok(recipes);
        }

        check_cancelled(cancel)?;
        self.fetcher
            .fetch_recommendations(manifest, cancel)
            .map_err(|source| match source {
                FetchError::Cancelled => InstallError::Cancelled,
                source => InstallError::Recommendations(source),
            })
    }

    /// Put each recipe's dependencies ahead of it, drop repeats, then order
    /// the survivors so no recipe precedes a dependency listed with it.
    fn expand(
        &self,
        requested: Vec<Recipe>,
        manifest: &DiscoveryManifest,
        options: &InstallOptions,
        cancel: &CancellationToken,
        report: &mut InstallReport,
    ) -> Result<Vec<Recipe>, InstallError> {
        let resolver = DependencyResolver::new(self.fetcher).with_depth(options.resolution);
        let mut ordered = Vec::new();

        for recipe in requested {
            let resolution =
                resolver
                    .resolve(&recipe, manifest, cancel)
                    .map_err(|source| match source {
                        ResolveError::Cancelled => InstallError::Cancelled,
                        source => InstallError::Resolve {
                            recipe: recipe.name.clone(),
                            source,
                        },
                    })?;

            for skipped in &resolution.skipped {
                self.status.dependency_skipped(skipped);
                report.warnings.push(format!(
                    "skipped dependency {} of {}: {}",
                    skipped.dependency, skipped.recipe, skipped.reason
                ));
            }
            ordered.extend(resolution.recipes);
            ordered.push(recipe);
        }

        Ok(dependencies_first(deduplicate(ordered)))
    }

    fn install_recipe(
        &self,
        recipe: &Recipe,
        license_key: &str,
        cancel: &CancellationToken,
    ) -> Result<(), InstallError> {
        let mut variables = resolve_input_variables(recipe, self.prompter, cancel)?;
        variables.set(LICENSE_KEY_VARIABLE, license_key);

        check_cancelled(cancel)?;
        let request = ExecutionRequest {
            recipe: recipe.name.clone(),
            install_steps: recipe.install.clone(),
            variables,
        };
        self.executor
            .run(&request, cancel)
            .map_err(|source| match source {
                ExecutionError::Cancelled => InstallError::Cancelled,
                source => InstallError::Execution {
                    recipe: recipe.name.clone(),
                    source,
                },
            })
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), InstallError> {
    if cancel.is_cancelled() {
        return Err(InstallError::Cancelled);
    }
    Ok(())
}
