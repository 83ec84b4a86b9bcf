//! larder.toml parsing with source-annotated errors

use std::path::Path;

use anyhow::{Context, Result};

use super::schema::LarderConfig;

/// Read, parse, and validate a config file.
pub fn parse_config_file(path: &Path) -> Result<LarderConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

pub fn parse_config_str(content: &str) -> Result<LarderConfig> {
    let config: LarderConfig =
        toml::from_str(content).map_err(|e| annotate_toml_error(e, content))?;
    config.validate()?;
    Ok(config)
}

pub fn to_toml(config: &LarderConfig) -> Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize configuration to TOML")
}

/// Attach the offending lines of the document to a parse error.
fn annotate_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();
    let Some(span) = error.span() else {
        return anyhow::anyhow!("Invalid TOML: {}", message);
    };

    let line = content[..span.start.min(content.len())]
        .bytes()
        .filter(|b| *b == b'\n')
        .count()
        + 1;
    anyhow::anyhow!(
        "Invalid TOML at line {}: {}\n{}",
        line,
        message,
        excerpt(content, line)
    )
}

/// One line either side of `line` (1-based), with the line itself marked.
fn excerpt(content: &str, line: usize) -> String {
    let first = line.saturating_sub(1).max(1);
    content
        .lines()
        .enumerate()
        .map(|(i, text)| (i + 1, text))
        .skip(first - 1)
        .take_while(|(n, _)| *n <= line + 1)
        .map(|(n, text)| {
            let marker = if n == line { ">" } else { " " };
            format!("{} {:>4} | {}", marker, n, text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
