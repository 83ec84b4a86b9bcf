//! Recipe document normalization
//!
//! A document is checked in a fixed order:
//!
//! 1. it must be YAML with a mapping at the root
//! 2. `install` must be present and not `null`
//! 3. every field deserializes under the lenient rules of [`Recipe`]; the
//!    first bad field, including a malformed element of `installTargets`,
//!    `inputVars` or `logMatch`, fails the whole document
//! 4. `name` must not be empty

use serde::Deserialize;
use serde_yaml::Value;
use thiserror::Error;

use super::schema::Recipe;

/// Errors produced while normalizing a recipe document.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The text is not valid YAML.
    #[error("failed to parse recipe document: {0}")]
    Parse(#[source] serde_yaml::Error),

    /// The document root is not a mapping.
    #[error("recipe document must be a mapping, found {found}")]
    NotAMapping { found: &'static str },

    /// The required `install` section is absent or null.
    #[error("recipe {recipe:?} is missing the 'install' section")]
    MissingInstallSection { recipe: String },

    /// The `name` field is absent or empty.
    #[error("recipe document has no name")]
    MissingName,

    /// A field has the wrong shape or an unacceptable value.
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

impl NormalizeError {
    pub fn is_missing_install_section(&self) -> bool {
        matches!(self, Self::MissingInstallSection { .. })
    }
}

/// Parse and normalize a recipe from YAML text.
///
/// Field errors carry the path of the offending value, e.g.
/// `installTargets[1].os`.
pub fn parse_recipe(content: &str) -> Result<Recipe, NormalizeError> {
    let document: Value = serde_yaml::from_str(content).map_err(NormalizeError::Parse)?;
    check_shape(&document)?;
    let recipe = serde_yaml::from_str(content).map_err(invalid_field)?;
    check_name(recipe)
}

/// Normalize an already-parsed document.
///
/// Field errors from an in-memory tree carry no path and report the field
/// as `.`.
pub fn normalize(document: &Value) -> Result<Recipe, NormalizeError> {
    check_shape(document)?;
    let recipe = Recipe::deserialize(document).map_err(invalid_field)?;
    check_name(recipe)
}

fn check_shape(document: &Value) -> Result<(), NormalizeError> {
    let Value::Mapping(map) = document else {
        return Err(NormalizeError::NotAMapping {
            found: kind(document),
        });
    };
    match map.get("install") {
        None | Some(Value::Null) => Err(NormalizeError::MissingInstallSection {
            recipe: map
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        }),
        Some(_) => Ok(()),
    }
}

fn check_name(recipe: Recipe) -> Result<Recipe, NormalizeError> {
    if recipe.name.trim().is_empty() {
        return Err(NormalizeError::MissingName);
    }
    Ok(recipe)
}

/// Split a deserialization error into the field path and the reason.
///
/// serde_yaml renders these as `path: reason at line L column C`, with no
/// path for errors at the document root.
fn invalid_field(err: serde_yaml::Error) -> NormalizeError {
    let rendered = err.to_string();
    let message = match err.location() {
        Some(_) => rendered
            .rsplit_once(" at line ")
            .map_or(rendered.as_str(), |(message, _)| message),
        None => rendered.as_str(),
    };

    let (field, reason) = match message.split_once(": ") {
        Some((path, reason)) if !path.is_empty() && !path.contains(char::is_whitespace) => {
            (path, reason)
        }
        _ => (".", message),
    };
    NormalizeError::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
