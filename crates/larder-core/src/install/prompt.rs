//! User prompting seam.

/// One question put to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptRequest<'a> {
    /// Variable being resolved
    pub variable: &'a str,
    pub message: &'a str,
    pub default: Option<&'a str>,
    /// Input must not be echoed
    pub secret: bool,
}

/// Asks the user for a value.
pub trait Prompter {
    fn prompt(&self, request: &PromptRequest<'_>) -> anyhow::Result<String>;
}

/// Prompter for unattended runs: answers with the default or fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonInteractivePrompter;

impl Prompter for NonInteractivePrompter {
    fn prompt(&self, request: &PromptRequest<'_>) -> anyhow::Result<String> {
        match request.default {
            Some(default) => Ok(default.to_string()),
            None => anyhow::bail!(
                "{} is required but prompting is disabled; set it in the environment",
                request.variable
            ),
        }
    }
}
