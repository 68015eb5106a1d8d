//! Interactive prompts for the sync pass
//!
//! Uses dialoguer for terminal-based interactive selection.

use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use rulesync_core::{Error, Prompter};

/// Asks on the controlling terminal.
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

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn select(&mut self, prompt: &str, options: &[String]) -> rulesync_core::Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(options)
            .default(0)
            .interact()
            .map_err(|e| Error::Prompt {
                message: e.to_string(),
            })
    }
}
