//! Terminal prompts for recipe input variables.

use dialoguer::{Input, Password, theme::ColorfulTheme};
use larder_core::install::{PromptRequest, Prompter};

/// Prompts on the controlling terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn prompt(&self, request: &PromptRequest<'_>) -> anyhow::Result<String> {
        if request.secret {
            let value = Password::with_theme(&self.theme)
                .with_prompt(request.message)
                .allow_empty_password(request.default.is_some())
                .interact()?;
            return Ok(value);
        }

        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(request.message)
            .allow_empty(true);
        if let Some(default) = request.default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }
}
