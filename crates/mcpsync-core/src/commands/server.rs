//! Registry-backed `server` commands.
//!
//! Each operation fans a list of servers out over a list of clients and
//! reports one line per pair; frontends decide how to render them.

use crate::client::ServerListing;
use crate::error::McpError;
use crate::mcp::installer::{InstallOutcome, InstallRequest, InstallationManager, Prompter};
use crate::orchestration::{Manager, ManagerFactory};
use crate::registry::{LocalRegistry, ServerSchema};
use crate::types::Scope;

/// Options shared by add, remove and update.
#[derive(Debug, Clone, Default)]
pub struct ServerOptions {
    /// Comma-separated server names; ignored when `interactive` is set.
    pub servers: String,
    /// Comma-separated client ids, or `all`.
    pub clients: String,
    pub method: Option<String>,
    pub force: bool,
    pub scope: Scope,
    pub interactive: bool,
}

impl ServerOptions {
    pub fn new(servers: impl Into<String>, clients: impl Into<String>) -> Self {
        Self {
            servers: servers.into(),
            clients: clients.into(),
            ..Default::default()
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }
}

/// Result for one server on one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOutcome {
    pub server: String,
    pub client: Option<String>,
    pub success: bool,
    pub message: String,
}

/// Outcomes of one `server` command.
#[derive(Debug, Clone, Default)]
pub struct ServerReport {
    pub outcomes: Vec<ServerOutcome>,
}

impl ServerReport {
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.success)
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.outcomes.iter().map(|outcome| outcome.message.as_str())
    }

    fn push(&mut self, server: &str, client: Option<&str>, success: bool, message: String) {
        self.outcomes.push(ServerOutcome {
            server: server.to_string(),
            client: client.map(str::to_string),
            success,
            message,
        });
    }
}

/// What a client reports for `server list --client`.
#[derive(Debug, Clone)]
pub struct ClientListing {
    pub client: String,
    pub listing: Result<ServerListing, String>,
}

/// Orchestrates the `server` subcommands.
pub struct ServerCommand<'a> {
    registry: &'a LocalRegistry,
    factory: &'a ManagerFactory,
    prompter: &'a dyn Prompter,
}

impl<'a> ServerCommand<'a> {
    pub fn new(
        registry: &'a LocalRegistry,
        factory: &'a ManagerFactory,
        prompter: &'a dyn Prompter,
    ) -> Self {
        Self {
            registry,
            factory,
            prompter,
        }
    }

    /// Install servers into every requested client.
    pub fn add(&self, options: &ServerOptions) -> anyhow::Result<ServerReport> {
        let Some(servers) = self.servers_for(options, "add")? else {
            return Ok(ServerReport::default());
        };
        let manager = (self.factory)()?;
        let clients = self.resolve_clients(&manager, &options.clients)?;
        let installer = InstallationManager::new(self.registry, manager.registry(), self.prompter);

        let mut report = ServerReport::default();
        for server in &servers {
            if self.registry.get(server).is_none() {
                report.push(server, None, false, not_found(server));
                continue;
            }
            for client in &clients {
                self.prompter.say(&format!(
                    "Installing '{}' to {} (scope: {})...",
                    server, client, options.scope
                ));
                let request = InstallRequest {
                    server: server.clone(),
                    client: client.clone(),
                    method: options.method.clone(),
                    force: options.force,
                    scope: options.scope,
                    interactive: options.interactive,
                };
                let (success, message) = match installer.install(&request) {
                    Ok(InstallOutcome::Installed) => (
                        true,
                        format!("✓ Successfully installed '{}' to {}", server, client),
                    ),
                    Ok(InstallOutcome::AlreadyInstalled) => (
                        true,
                        format!("✓ '{}' is already installed for {}", server, client),
                    ),
                    Ok(InstallOutcome::Failed) => (
                        false,
                        format!("✗ Failed to install '{}' to {}", server, client),
                    ),
                    Err(err) => (
                        false,
                        format!("✗ Failed to install '{}' to {}: {}", server, client, err),
                    ),
                };
                report.push(server, Some(client), success, message);
            }
        }
        Ok(report)
    }

    /// Remove servers from every requested client.
    pub fn remove(&self, options: &ServerOptions) -> anyhow::Result<ServerReport> {
        let Some(servers) = self.servers_for(options, "remove")? else {
            return Ok(ServerReport::default());
        };
        let manager = (self.factory)()?;
        let clients = self.resolve_clients(&manager, &options.clients)?;

        let mut report = ServerReport::default();
        for server in &servers {
            for client in &clients {
                self.prompter.say(&format!(
                    "Removing '{}' from {} (scope: {})...",
                    server, client, options.scope
                ));
                let result = manager
                    .require_client(client)
                    .and_then(|adapter| adapter.remove_server(server, options.scope));
                let (success, message) = match result {
                    Ok(true) => (
                        true,
                        format!("✓ Successfully removed '{}' from {}", server, client),
                    ),
                    Ok(false) => (
                        false,
                        format!("✗ Failed to remove '{}' from {}", server, client),
                    ),
                    Err(err) => (
                        false,
                        format!("✗ Failed to remove '{}' from {}: {}", server, client, err),
                    ),
                };
                report.push(server, Some(client), success, message);
            }
        }
        Ok(report)
    }

    /// Remove then reinstall servers with their default method.
    pub fn update(&self, options: &ServerOptions) -> anyhow::Result<ServerReport> {
        let Some(servers) = self.servers_for(options, "update")? else {
            return Ok(ServerReport::default());
        };
        let manager = (self.factory)()?;
        let clients = self.resolve_clients(&manager, &options.clients)?;
        let installer = InstallationManager::new(self.registry, manager.registry(), self.prompter);

        let mut report = ServerReport::default();
        for server in &servers {
            if self.registry.get(server).is_none() {
                report.push(server, None, false, not_found(server));
                continue;
            }
            for client in &clients {
                self.prompter.say(&format!(
                    "Updating '{}' for {} (scope: {})...",
                    server, client, options.scope
                ));
                let removed = manager
                    .require_client(client)
                    .and_then(|adapter| adapter.remove_server(server, options.scope));
                match removed {
                    Ok(true) => self.prompter.say(&format!("  ✓ Removed existing '{}'", server)),
                    _ => self.prompter.say(&format!(
                        "  ⚠ Could not remove '{}' (might not have been installed)",
                        server
                    )),
                }

                let request = InstallRequest {
                    server: server.clone(),
                    client: client.clone(),
                    scope: options.scope,
                    ..Default::default()
                };
                let (success, message) = match installer.install(&request) {
                    Ok(outcome) if outcome.is_success() => (
                        true,
                        format!("✓ Successfully updated '{}' for {}", server, client),
                    ),
                    Ok(_) => (
                        false,
                        format!("✗ Failed to update '{}' for {}", server, client),
                    ),
                    Err(err) => (
                        false,
                        format!("✗ Failed to update '{}' for {}: {}", server, client, err),
                    ),
                };
                report.push(server, Some(client), success, message);
            }
        }
        Ok(report)
    }

    /// Registry schemas sorted by name.
    pub fn list(&self) -> anyhow::Result<Vec<ServerSchema>> {
        self.registry.list()
    }

    /// What each requested client has configured.
    pub fn list_installed(&self, clients: &str) -> anyhow::Result<Vec<ClientListing>> {
        let manager = (self.factory)()?;
        let clients = self.resolve_clients(&manager, clients)?;
        Ok(clients
            .into_iter()
            .map(|client| {
                let listing = manager
                    .list_servers(&client)
                    .map_err(|err| format!("{:#}", err));
                ClientListing { client, listing }
            })
            .collect())
    }

    pub fn search(&self, query: &str) -> anyhow::Result<Vec<ServerSchema>> {
        self.registry.search(query)
    }

    pub fn show(&self, name: &str) -> anyhow::Result<ServerSchema> {
        self.registry
            .get(name)
            .ok_or_else(|| McpError::ServerNotFound(name.to_string()).into())
    }

    /// Turn `c1,c2` or `all` into supported client ids.
    ///
    /// Unknown ids are reported and skipped; an empty result is an error.
    pub fn resolve_clients(&self, manager: &Manager, spec: &str) -> anyhow::Result<Vec<String>> {
        let requested: Vec<String> = if spec.trim().eq_ignore_ascii_case("all") {
            manager.tools().to_vec()
        } else {
            split_list(spec)
        };

        let mut valid = Vec::new();
        for client in requested {
            if manager.get_client(&client).is_some() {
                valid.push(client);
            } else {
                self.prompter
                    .say(&format!("Error: {}", McpError::ClientUnsupported(client)));
            }
        }
        if valid.is_empty() {
            anyhow::bail!("No valid clients specified");
        }
        Ok(valid)
    }

    /// Numbered registry menu accepting `all` or comma-separated indices.
    ///
    /// Returns an empty list when the registry is empty.
    pub fn select_servers(&self, action: &str) -> anyhow::Result<Vec<String>> {
        let schemas = self.registry.list()?;
        if schemas.is_empty() {
            self.prompter.say("No MCP servers found in the local registry.");
            return Ok(Vec::new());
        }

        self.prompter.say(&format!("Select servers to {}:", action));
        for (index, schema) in schemas.iter().enumerate() {
            self.prompter.say(&format!(
                "  {}. {} ({}) - {}",
                index + 1,
                schema.title(),
                schema.name,
                schema.description
            ));
        }

        loop {
            let answer = self
                .prompter
                .ask("Enter server numbers (comma-separated) or 'all'", None)?;
            if answer.trim().eq_ignore_ascii_case("all") {
                return Ok(schemas.into_iter().map(|schema| schema.name).collect());
            }
            match parse_indices(&answer, schemas.len()) {
                Ok(indices) => {
                    return Ok(indices
                        .into_iter()
                        .map(|index| schemas[index].name.clone())
                        .collect());
                }
                Err(message) => self.prompter.say(&message),
            }
        }
    }

    fn servers_for(&self, options: &ServerOptions, action: &str) -> anyhow::Result<Option<Vec<String>>> {
        if options.interactive {
            let selected = self.select_servers(action)?;
            return Ok((!selected.is_empty()).then_some(selected));
        }
        let servers = split_list(&options.servers);
        if servers.is_empty() {
            anyhow::bail!("No server names given");
        }
        Ok(Some(servers))
    }
}

/// Human-readable description of a schema for `server show`.
pub fn schema_details(schema: &ServerSchema) -> Vec<String> {
    let mut lines = vec![
        format!("{} ({})", schema.title(), schema.name),
        schema.description.clone(),
        String::new(),
    ];

    if let Some(repository) = schema.repository_url() {
        lines.push(format!("Repository: {}", repository));
    }
    if let Some(license) = schema.license.as_deref() {
        lines.push(format!("License: {}", license));
    }
    if let Some(author) = schema.author_name() {
        let url = schema
            .author
            .as_ref()
            .and_then(|author| author.get("url"))
            .and_then(|url| url.as_str());
        lines.push(match url {
            Some(url) => format!("Author: {} ({})", author, url),
            None => format!("Author: {}", author),
        });
    }

    lines.push(String::new());
    lines.push("Installation Methods:".to_string());
    lines.extend(method_lines(schema));

    if !schema.categories.is_empty() {
        lines.push(String::new());
        lines.push(format!("Categories: {}", schema.categories.join(", ")));
    }
    if !schema.tags.is_empty() {
        lines.push(format!("Tags: {}", schema.tags.join(", ")));
    }

    let tools = schema.tool_names();
    if !tools.is_empty() {
        lines.push(String::new());
        lines.push(format!("Available Tools: {}", tools.join(", ")));
    }
    let resources = schema.resource_names();
    if !resources.is_empty() {
        lines.push(format!("Resources: {}", resources.join(", ")));
    }
    let prompts = schema.prompt_names();
    if !prompts.is_empty() {
        lines.push(format!("Prompts: {}", prompts.join(", ")));
    }

    if !schema.examples.is_empty() {
        lines.push(String::new());
        lines.push("Usage Examples:".to_string());
        for (index, example) in schema.examples.iter().enumerate() {
            let title = example
                .get("title")
                .cloned()
                .unwrap_or_else(|| format!("Example {}", index + 1));
            let description = example.get("description").map(String::as_str).unwrap_or_default();
            lines.push(format!("  {}: {}", title, description));
            if let Some(prompt) = example.get("prompt").filter(|prompt| !prompt.is_empty()) {
                lines.push(format!("  Try: \"{}\"", prompt));
            }
        }
    }
    lines
}

/// One or two lines per installation method, recommended ones marked.
pub fn method_lines(schema: &ServerSchema) -> Vec<String> {
    let mut lines = Vec::new();
    for (name, method) in schema.installations.iter() {
        let recommended = if method.recommended { " (recommended)" } else { "" };
        lines.push(format!(
            "  • {}: {}{}",
            name,
            method.description.as_deref().unwrap_or(&method.method_type),
            recommended
        ));
        if let Some(command) = method.command.as_deref() {
            lines.push(format!("    {} {}", command, method.args.join(" ")).trim_end().to_string());
        } else if let Some(url) = method.url.as_deref() {
            lines.push(format!("    {}", url));
        }
    }
    lines
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_indices(answer: &str, len: usize) -> Result<Vec<usize>, String> {
    let mut indices = Vec::new();
    for part in answer.split(',') {
        let Ok(number) = part.trim().parse::<usize>() else {
            return Err("Invalid input. Please enter numbers separated by commas or 'all'".to_string());
        };
        if number == 0 || number > len {
            return Err(format!("Invalid selection: {}", number));
        }
        indices.push(number - 1);
    }
    Ok(indices)
}

fn not_found(server: &str) -> String {
    format!("✗ {} in the local registry", McpError::ServerNotFound(server.to_string()))
}
