//! Human-readable rendering of recipes and install progress.

use console::style;
use larder_core::install::{InstallError, InstallReport, InstallStatus};
use larder_core::recipe::Recipe;
use larder_core::resolve::SkippedDependency;

/// Prints install progress to stdout.
pub struct ConsoleStatus;

impl InstallStatus for ConsoleStatus {
    fn recipes_selected(&self, recipes: &[Recipe]) {
        if recipes.is_empty() {
            return;
        }
        println!("{}", style("Installing:").bold());
        for recipe in recipes {
            println!("  • {}", recipe.label());
        }
        println!();
    }

    fn dependency_skipped(&self, skipped: &SkippedDependency) {
        println!(
            "  {} dependency '{}' of '{}' skipped: {}",
            style("⚠").yellow(),
            skipped.dependency,
            skipped.recipe,
            skipped.reason
        );
    }

    fn recipe_installing(&self, recipe: &Recipe) {
        println!("{} {}", style("→").cyan(), style(recipe.label()).bold());
        if let Some(message) = recipe.pre_install_message() {
            println!("{}", message.trim_end());
        }
    }

    fn recipe_installed(&self, recipe: &Recipe) {
        println!("{} Installed {}", style("✓").green(), recipe.label());
        if let Some(message) = recipe.post_install_message() {
            println!("{}", message.trim_end());
        }
    }

    fn recipe_failed(&self, recipe: &Recipe, error: &InstallError) {
        println!("{} {} failed: {}", style("✗").red(), recipe.label(), error);
    }
}

pub fn print_report(report: &InstallReport) {
    for warning in &report.warnings {
        println!("  {} {}", style("⚠").yellow(), warning);
    }
    if report.selected.is_empty() {
        println!("No recipes to install.");
        return;
    }

    let installed = report.installed().count();
    let failed: Vec<_> = report.failed().collect();
    println!();
    let failed_count = style(failed.len());
    let failed_count = if failed.is_empty() {
        failed_count.dim()
    } else {
        failed_count.red()
    };
    println!("{} installed, {} failed", style(installed).green(), failed_count);
    for (name, reason) in failed {
        println!("  {} {}: {}", style("✗").red(), name, reason);
    }
}

pub fn print_recipe_table(recipes: &[Recipe]) {
    if recipes.is_empty() {
        println!("No recipes found.");
        return;
    }

    let width = recipes
        .iter()
        .map(|r| r.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());
    let header = format!("{:<width$}  DESCRIPTION", "NAME");
    println!("{}", style(header).bold());
    for recipe in recipes {
        println!("{:<width$}  {}", recipe.name, recipe.description.lines().next().unwrap_or(""));
    }
}

pub fn print_recipe_details(recipe: &Recipe) {
    println!("{}", style(recipe.label()).bold().cyan());
    field("Name", &recipe.name);
    field("Description", recipe.description.trim());
    field("Repository", &recipe.repository);
    if let Some(stability) = recipe.stability {
        field("Stability", &stability.to_string());
    }
    field("Keywords", &recipe.keywords.join(", "));
    field("Dependencies", &recipe.dependencies.join(", "));

    if !recipe.install_targets.is_empty() {
        println!("  {}", style("Targets:").bold());
        for target in &recipe.install_targets {
            let parts: Vec<_> = [
                ("os", &target.os),
                ("platform", &target.platform),
                ("family", &target.platform_family),
                ("version", &target.platform_version),
                ("arch", &target.kernel_arch),
                ("kernel", &target.kernel_version),
            ]
            .into_iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
            let parts = if parts.is_empty() {
                "any".to_string()
            } else {
                parts.join(" ")
            };
            println!("    - {}", parts);
        }
    }

    if !recipe.input_vars.is_empty() {
        println!("  {}", style("Inputs:").bold());
        for input in &recipe.input_vars {
            let default = if input.default.is_empty() {
                String::new()
            } else {
                format!(" (default: {})", input.default)
            };
            println!("    - {}{}", input.name, default);
        }
    }
}

fn field(label: &str, value: &str) {
    if !value.is_empty() {
        println!("  {:<13} {}", format!("{}:", label), value);
    }
}
