//! Directory-backed recipe source.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::recipe::{RECIPE_EXTENSIONS, Recipe, parse_recipe};
use crate::types::DiscoveryManifest;

use super::{FetchError, RecipeFetcher, ensure_not_cancelled};

/// Serves every recipe document found under a directory tree.
///
/// Files that cannot be read or normalized are logged and skipped, so one
/// bad document never hides the rest of the tree.
#[derive(Debug, Clone)]
pub struct LocalRecipeFetcher {
    path: PathBuf,
}

impl LocalRecipeFetcher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all recipes under the root, in file-name order.
    pub fn load_all(&self, cancel: &CancellationToken) -> Result<Vec<Recipe>, FetchError> {
        if self.path.as_os_str().is_empty() {
            return Err(FetchError::EmptyPath);
        }
        if !self.path.is_dir() {
            return Err(FetchError::Read {
                path: self.path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "recipe directory does not exist",
                ),
            });
        }

        let mut recipes = Vec::new();
        for entry in WalkDir::new(&self.path).sort_by_file_name() {
            ensure_not_cancelled(cancel)?;

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry in recipe directory");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_recipe_file(entry.path()) {
                continue;
            }

            match load_file(entry.path()) {
                Ok(recipe) => {
                    debug!(recipe = %recipe.name, path = %entry.path().display(), "loaded recipe");
                    recipes.push(recipe);
                }
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "skipping invalid recipe file");
                }
            }
        }

        Ok(recipes)
    }
}

impl RecipeFetcher for LocalRecipeFetcher {
    fn fetch_recipes(
        &self,
        _manifest: &DiscoveryManifest,
        cancel: &CancellationToken,
    ) -> Result<Vec<Recipe>, FetchError> {
        self.load_all(cancel)
    }
}

fn is_recipe_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| RECIPE_EXTENSIONS.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}

pub(super) fn load_file(path: &Path) -> Result<Recipe, FetchError> {
    let content = std::fs::read_to_string(path).map_err(|source| FetchError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_recipe(&content).map_err(|source| FetchError::Invalid {
        location: path.display().to_string(),
        source,
    })
}
