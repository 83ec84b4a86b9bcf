//! Installation progress observer.

use crate::recipe::Recipe;
use crate::resolve::SkippedDependency;

use super::InstallError;

/// Receives progress events from the installer. Every method defaults to a
/// no-op so implementations pick the events they care about.
pub trait InstallStatus {
    /// The full ordered list the run will work through.
    fn recipes_available(&self, _recipes: &[Recipe]) {}

    /// The subset that will actually be executed.
    fn recipes_selected(&self, _recipes: &[Recipe]) {}

    fn dependency_skipped(&self, _skipped: &SkippedDependency) {}

    fn recipe_installing(&self, _recipe: &Recipe) {}

    fn recipe_installed(&self, _recipe: &Recipe) {}

    fn recipe_failed(&self, _recipe: &Recipe, _error: &InstallError) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatus;

impl InstallStatus for NoopStatus {}
