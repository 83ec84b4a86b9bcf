//! Host targeting policy for recipes.
//!
//! A recipe with no install targets applies everywhere. Otherwise at least one
//! target must match the discovery manifest; within a target every populated
//! field must match and empty fields are wildcards.

use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use tracing::debug;

use crate::types::DiscoveryManifest;

use super::schema::{InstallTarget, Recipe};

/// Check whether a recipe can be installed on the described host.
pub fn matches(recipe: &Recipe, manifest: &DiscoveryManifest) -> bool {
    if recipe.install_targets.is_empty() {
        return true;
    }
    recipe.install_targets.iter().any(|t| t.matches(manifest))
}

/// Keep only the recipes compatible with the manifest, preserving order.
pub fn constrain_recipes(recipes: Vec<Recipe>, manifest: &DiscoveryManifest) -> Vec<Recipe> {
    recipes
        .into_iter()
        .filter(|r| {
            let keep = matches(r, manifest);
            if !keep {
                debug!(recipe = %r.name, "recipe does not target this host");
            }
            keep
        })
        .collect()
}

impl InstallTarget {
    /// Check every populated field against the manifest.
    ///
    /// The target `type` describes the kind of environment and is not compared.
    pub fn matches(&self, manifest: &DiscoveryManifest) -> bool {
        text_matches(&self.os, &manifest.os)
            && text_matches(&self.platform, &manifest.platform)
            && text_matches(&self.platform_family, &manifest.platform_family)
            && text_matches(&self.kernel_arch, &manifest.kernel_arch)
            && version_matches(&self.platform_version, &manifest.platform_version)
            && version_matches(&self.kernel_version, &manifest.kernel_version)
    }
}

fn text_matches(wanted: &str, actual: &str) -> bool {
    let wanted = wanted.trim();
    wanted.is_empty() || wanted.eq_ignore_ascii_case(actual.trim())
}

/// Exact comparison, or a constraint when the value starts with an operator.
fn version_matches(wanted: &str, actual: &str) -> bool {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return true;
    }
    if !wanted.starts_with(['>', '<', '=', '^', '~']) {
        return wanted == actual.trim();
    }

    let (Some(req), Some(version)) = (parse_constraint(wanted), lenient_version(actual)) else {
        debug!(constraint = wanted, version = actual, "unable to evaluate version constraint");
        return false;
    };
    req.matches(&version)
}

/// Parse comma-separated comparators such as `>=16.04, <22.04`.
fn parse_constraint(constraint: &str) -> Option<VersionReq> {
    let comparators = constraint
        .split(',')
        .map(|part| parse_comparator(part.trim()))
        .collect::<Option<Vec<_>>>()?;
    Some(VersionReq { comparators })
}

fn parse_comparator(part: &str) -> Option<Comparator> {
    let (op, rest) = [
        (">=", Op::GreaterEq),
        ("<=", Op::LessEq),
        (">", Op::Greater),
        ("<", Op::Less),
        ("=", Op::Exact),
        ("^", Op::Caret),
        ("~", Op::Tilde),
    ]
    .into_iter()
    .find_map(|(prefix, op)| part.strip_prefix(prefix).map(|rest| (op, rest)))?;

    let version = lenient_version(rest)?;
    Some(Comparator {
        op,
        major: version.major,
        minor: Some(version.minor),
        patch: Some(version.patch),
        pre: Prerelease::EMPTY,
    })
}

/// Read the leading `major[.minor[.patch]]` of a loosely formatted version.
///
/// `20.04` becomes 20.4.0 and `5.4.0-1045-aws` becomes 5.4.0.
fn lenient_version(raw: &str) -> Option<Version> {
    let raw = raw.trim().trim_start_matches(['v', 'V']);
    let end = raw
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(raw.len());

    let mut parts = raw[..end]
        .split('.')
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u64>());

    let major = parts.next()?.ok()?;
    let minor = parts.next().transpose().ok()?.unwrap_or(0);
    let patch = parts.next().transpose().ok()?.unwrap_or(0);
    Some(Version::new(major, minor, patch))
}
