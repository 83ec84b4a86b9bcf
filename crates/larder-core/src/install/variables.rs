//! Per-run execution variables.

use std::collections::BTreeMap;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::recipe::{InputVariable, Recipe};

use super::InstallError;
use super::prompt::{PromptRequest, Prompter};

/// Reserved variable carrying the license key into every recipe run.
pub const LICENSE_KEY_VARIABLE: &str = "NR_LICENSE_KEY";

/// Name/value pairs handed to the executor for one recipe.
///
/// Built fresh for each recipe and never shared between runs. Iteration is
/// in name order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    values: BTreeMap<String, String>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value, replacing any earlier one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.set(k, v);
        }
        set
    }
}

/// Resolve every declared input of a recipe.
///
/// A non-empty environment variable of the same name wins. Otherwise the user
/// is prompted once; an empty answer falls back to the declared default.
pub fn resolve_input_variables(
    recipe: &Recipe,
    prompter: &dyn Prompter,
    cancel: &CancellationToken,
) -> Result<VariableSet, InstallError> {
    let mut vars = VariableSet::new();
    for input in &recipe.input_vars {
        let value = resolve_one(recipe, input, prompter, cancel)?;
        vars.set(input.name.clone(), value);
    }
    Ok(vars)
}

fn resolve_one(
    recipe: &Recipe,
    input: &InputVariable,
    prompter: &dyn Prompter,
    cancel: &CancellationToken,
) -> Result<String, InstallError> {
    if let Some(value) = std::env::var(&input.name).ok().filter(|v| !v.is_empty()) {
        debug!(recipe = %recipe.name, variable = %input.name, "using value from environment");
        return Ok(value);
    }
    if cancel.is_cancelled() {
        return Err(InstallError::Cancelled);
    }

    let message = if input.prompt.is_empty() {
        format!("value for {} required", input.name)
    } else {
        input.prompt.clone()
    };
    let default = (!input.default.is_empty()).then_some(input.default.as_str());

    let request = PromptRequest {
        variable: &input.name,
        message: &message,
        default,
        secret: input.secret,
    };
    let missing = |reason: String| InstallError::MissingRequiredInput {
        recipe: recipe.name.clone(),
        variable: input.name.clone(),
        reason,
    };

    let answer = prompter.prompt(&request).map_err(|e| missing(e.to_string()))?;
    if !answer.is_empty() {
        return Ok(answer);
    }
    default
        .map(str::to_string)
        .ok_or_else(|| missing("no value provided".to_string()))
}
