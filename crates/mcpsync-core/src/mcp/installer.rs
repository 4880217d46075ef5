//! Registry-driven server installation.
//!
//! Resolves a registry schema into a concrete [`ServerConfig`] and hands it to
//! a client adapter, prompting for anything the environment does not supply.

use std::collections::BTreeMap;

use crate::client::{ClientRegistry, McpClient};
use crate::error::McpError;
use crate::mcp::spec::{RemoteServerConfig, ServerConfig, StdioServerConfig};
use crate::registry::{InstallationMethod, LocalRegistry, ServerSchema};
use crate::types::Scope;

/// Command used when a method declares none.
pub const DEFAULT_COMMAND: &str = "echo";

/// Line-oriented user interaction.
pub trait Prompter: Send + Sync {
    /// Ask a question. An empty answer yields `default` when one is given.
    fn ask(&self, prompt: &str, default: Option<&str>) -> anyhow::Result<String>;

    /// Show an informational line.
    fn say(&self, line: &str);
}

/// Prompter that never asks; every answer is the default or empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn ask(&self, _prompt: &str, default: Option<&str>) -> anyhow::Result<String> {
        Ok(default.unwrap_or_default().to_string())
    }

    fn say(&self, _line: &str) {}
}

/// Environment lookup used to resolve schema arguments.
pub type EnvLookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// How an install request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    /// Already present; nothing was written.
    AlreadyInstalled,
    /// The adapter ran but could not write the entry.
    Failed,
}

impl InstallOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, InstallOutcome::Failed)
    }
}

/// Options for one install call.
#[derive(Debug, Clone, Default)]
pub struct InstallRequest {
    pub server: String,
    pub client: String,
    pub method: Option<String>,
    pub force: bool,
    pub scope: Scope,
    pub interactive: bool,
}

/// Installs registry servers into client configs.
pub struct InstallationManager<'a> {
    registry: &'a LocalRegistry,
    clients: &'a ClientRegistry,
    prompter: &'a dyn Prompter,
    env: EnvLookup,
}

impl<'a> InstallationManager<'a> {
    pub fn new(
        registry: &'a LocalRegistry,
        clients: &'a ClientRegistry,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            registry,
            clients,
            prompter,
            env: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// Replace the process environment lookup (for testing).
    pub fn with_env(mut self, env: EnvLookup) -> Self {
        self.env = env;
        self
    }

    /// Install one registry server into one client.
    ///
    /// `force` only matters for registry writes and is accepted for parity
    /// with the CLI surface.
    pub fn install(&self, request: &InstallRequest) -> anyhow::Result<InstallOutcome> {
        let schema = self
            .registry
            .get(&request.server)
            .ok_or_else(|| McpError::ServerNotFound(request.server.clone()))?;

        let client: std::sync::Arc<dyn McpClient> = self
            .clients
            .get(&request.client)
            .ok_or_else(|| McpError::ClientUnsupported(request.client.clone()))?;

        let Some(method) =
            self.select_method(&schema, request.method.as_deref(), request.interactive)?
        else {
            anyhow::bail!(
                "No valid installation method found for '{}'",
                request.server
            );
        };

        if client.is_installed(&schema.name)? {
            self.prompter.say(&format!(
                "Server '{}' is already installed for {}.",
                schema.name,
                client.id()
            ));
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let Some(config) = self.configure_server(&schema, &method)? else {
            anyhow::bail!("Failed to configure server '{}'", schema.name);
        };

        if client.add_server_with_config(&config, request.scope)? {
            tracing::info!("Installed '{}' to {}", schema.name, client.id());
            Ok(InstallOutcome::Installed)
        } else {
            tracing::warn!("Failed to install '{}' to {}", schema.name, client.id());
            Ok(InstallOutcome::Failed)
        }
    }

    /// Pick the installation method to use.
    ///
    /// An explicit name wins; otherwise a lone method, the first method when
    /// not interactive, or a numbered menu that repeats until answered.
    pub fn select_method(
        &self,
        schema: &ServerSchema,
        explicit: Option<&str>,
        interactive: bool,
    ) -> anyhow::Result<Option<InstallationMethod>> {
        if let Some(name) = explicit {
            return Ok(schema.installations.get(name).cloned());
        }

        if schema.installations.len() <= 1 || !interactive {
            return Ok(schema.installations.first().map(|(_, method)| method.clone()));
        }

        self.prompter
            .say(&format!("Available installation methods for '{}':", schema.name));
        let entries: Vec<(&str, &InstallationMethod)> = schema.installations.iter().collect();
        for (index, (name, method)) in entries.iter().enumerate() {
            self.prompter.say(&method_line(index + 1, name, method));
        }

        loop {
            let answer = self.prompter.ask("Select installation method", Some("1"))?;
            match answer.trim().parse::<usize>() {
                Ok(choice) if (1..=entries.len()).contains(&choice) => {
                    return Ok(Some(entries[choice - 1].1.clone()));
                }
                _ => self.prompter.say(&format!(
                    "Invalid choice '{}'. Enter a number between 1 and {}.",
                    answer.trim(),
                    entries.len()
                )),
            }
        }
    }

    /// Build the concrete config for `method`.
    ///
    /// Returns `None` when a required argument is still missing after
    /// prompting.
    pub fn configure_server(
        &self,
        schema: &ServerSchema,
        method: &InstallationMethod,
    ) -> anyhow::Result<Option<ServerConfig>> {
        if method.is_http()
            && let Some(url) = method.url.as_deref()
        {
            return Ok(Some(ServerConfig::Remote(RemoteServerConfig {
                name: schema.name.clone(),
                url: url.to_string(),
                headers: method.headers.clone(),
            })));
        }

        let declared = StdioServerConfig::new(&schema.name, "", Vec::new())
            .with_env(method.env.clone())
            .resolved_env(|var| (self.env)(var));
        let mut env: BTreeMap<String, String> = declared
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .collect();
        for (arg, spec) in schema.arguments.iter() {
            if let Some(value) = (self.env)(arg).filter(|value| !value.is_empty()) {
                env.insert(arg.to_string(), value);
                continue;
            }
            if !spec.required || env.contains_key(arg) {
                continue;
            }

            if !spec.description.is_empty() {
                self.prompter.say(&spec.description);
            }
            let example = spec.example.as_deref().unwrap_or_default();
            let value = self.prompter.ask(&format!("{} [{}]", arg, example), None)?;
            let value = value.trim();
            if value.is_empty() {
                self.prompter
                    .say(&format!("Required argument '{}' not provided.", arg));
                return Ok(None);
            }
            env.insert(arg.to_string(), value.to_string());
        }

        let command = method
            .command
            .clone()
            .filter(|command| !command.is_empty())
            .unwrap_or_else(|| DEFAULT_COMMAND.to_string());
        Ok(Some(ServerConfig::Stdio(
            StdioServerConfig::new(&schema.name, command, method.args.clone()).with_env(env),
        )))
    }
}

fn method_line(index: usize, name: &str, method: &InstallationMethod) -> String {
    let mut line = format!("  {}. {} ({})", index, name, method.method_type);
    if let Some(description) = method.description.as_deref().filter(|d| !d.is_empty()) {
        line.push_str(&format!(" - {}", description));
    }
    if method.recommended {
        line.push_str(" [recommended]");
    }
    line
}
