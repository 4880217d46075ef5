//! Terminal prompter for installs and server selection.
//!
//! Uses dialoguer for input and console for styling.

use std::io::{self, Write};
use std::sync::Mutex;

use anyhow::Result;
use console::style;
use dialoguer::{Input, theme::ColorfulTheme};

use mcpsync_core::mcp::Prompter;

/// [`Prompter`] backed by the terminal.
pub struct TerminalPrompter<W: Write + Send = io::Stdout> {
    /// Output writer (for testing)
    writer: Mutex<W>,
    /// Theme for dialoguer prompts
    theme: ColorfulTheme,
}

impl TerminalPrompter<io::Stdout> {
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(io::stdout()),
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> TerminalPrompter<W> {
    /// Create a prompter with a custom writer (for testing).
    #[cfg(test)]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            theme: ColorfulTheme::default(),
        }
    }

    #[cfg(test)]
    pub fn into_writer(self) -> W {
        self.writer.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Prompter for TerminalPrompter<W> {
    fn ask(&self, prompt: &str, default: Option<&str>) -> Result<String> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default {
            input = input.default(default.to_string());
        }
        Ok(input.interact_text()?)
    }

    fn say(&self, line: &str) {
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };
        let _ = writeln!(writer, "{}", styled(line));
    }
}

/// Color status lines by their leading marker.
pub fn styled(line: &str) -> String {
    let trimmed = line.trim_start();
    if trimmed.starts_with('✓') {
        style(line).green().to_string()
    } else if trimmed.starts_with('✗') || trimmed.starts_with("Error:") {
        style(line).red().to_string()
    } else if trimmed.starts_with('⚠') {
        style(line).yellow().to_string()
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn say_writes_one_line() {
        console::set_colors_enabled(false);
        let prompter = TerminalPrompter::with_writer(Vec::new());
        prompter.say("Select servers to add:");
        prompter.say("✓ Successfully installed 'memory' to claude");

        let output = String::from_utf8(prompter.into_writer()).unwrap();
        assert_eq!(
            output,
            "Select servers to add:\n✓ Successfully installed 'memory' to claude\n"
        );
    }

    #[test]
    fn plain_lines_are_not_styled() {
        assert_eq!(styled("Installing 'memory'..."), "Installing 'memory'...");
    }
}
