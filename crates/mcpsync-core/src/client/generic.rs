//! The single rule-driven client adapter.
//!
//! Install and remove first try the tool's own CLI, verify the result by
//! reading the tool's files, and fall back to editing those files directly
//! when the CLI is missing, fails, or silently does nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::client::format::{entry_from_config, entry_from_declaration};
use crate::client::rules::{ContainerPolicy, ToolRule};
use crate::client::runner::{CommandRunner, ShellRunner};
use crate::client::{ClientContext, ListedServer, McpClient, ServerListing};
use crate::config::client_config::{
    AddResult, ConfigFormat, LoadedConfig, add_server, load_config, remove_server, save_config,
    server_exists, servers_in,
};
use crate::error::McpError;
use crate::mcp::catalog::ServerCatalog;
use crate::mcp::spec::ServerConfig;
use crate::mcp::tool_config::{ToolCommands, ToolConfig, list_command, remove_command};
use crate::types::Scope;

#[derive(Debug, Clone)]
pub struct GenericClient {
    rule: &'static ToolRule,
    ctx: ClientContext,
    catalog: Option<Arc<dyn ServerCatalog>>,
    runner: Arc<dyn CommandRunner>,
}

impl GenericClient {
    pub fn new(
        rule: &'static ToolRule,
        ctx: ClientContext,
        catalog: Option<Arc<dyn ServerCatalog>>,
    ) -> Self {
        Self {
            rule,
            ctx,
            catalog,
            runner: Arc::new(ShellRunner),
        }
    }

    /// Replace the command runner (used by tests to script CLI behavior).
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn rule(&self) -> &'static ToolRule {
        self.rule
    }

    fn catalog(&self) -> anyhow::Result<&dyn ServerCatalog> {
        self.catalog.as_deref().ok_or_else(|| {
            McpError::ConfigNotFound(format!("no server catalog available for {}", self.rule.id))
                .into()
        })
    }

    fn tool_config(&self, scope: Scope) -> anyhow::Result<ToolConfig> {
        self.catalog()?.tool_config(self.rule.id, scope)
    }

    /// Parsed contents of `path`; missing and malformed files yield `None`.
    fn read_file(&self, path: &Path) -> anyhow::Result<Option<Map<String, Value>>> {
        tracing::debug!("Reading {}", path.display());
        Ok(match load_config(path)? {
            LoadedConfig::Parsed(map) => Some(map),
            LoadedConfig::Missing | LoadedConfig::Malformed(_) => None,
        })
    }

    fn installed_in_files(&self, server: &str, scope: Scope) -> anyhow::Result<bool> {
        for path in self.config_paths(scope) {
            if let Some(map) = self.read_file(&path)?
                && server_exists(&map, server)
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn installed_per_cli(&self, server: &str) -> bool {
        if !self.rule.uses_cli() {
            return false;
        }
        let command = list_command(self.rule.id);
        match self.runner.run(&command) {
            Ok(output) if output.is_success() => output
                .stdout
                .to_lowercase()
                .contains(&server.to_lowercase()),
            Ok(output) => {
                tracing::debug!("{}", output.to_error(&command));
                false
            }
            Err(err) => {
                tracing::debug!("Could not run `{}`: {:#}", command, err);
                false
            }
        }
    }

    /// Run a CLI command; true only when it exits zero.
    fn run_cli(&self, command: &str) -> bool {
        match self.runner.run(command) {
            Ok(output) if output.is_success() => true,
            Ok(output) => {
                tracing::warn!("{}", output.to_error(command));
                false
            }
            Err(err) => {
                tracing::warn!("Could not run `{}`: {:#}", command, err);
                false
            }
        }
    }

    fn install_chain(&self, server: &str, scope: Scope, cmds: &ToolCommands) -> anyhow::Result<bool> {
        if self.is_installed(server)? {
            tracing::info!("{} is already installed for {}", server, self.rule.id);
            return Ok(true);
        }

        if self.rule.uses_cli() {
            if self.run_cli(&cmds.add_cmd) {
                if self.is_installed(server)? {
                    tracing::info!("Installed {} for {}", server, self.rule.id);
                    return Ok(true);
                }
                tracing::warn!(
                    "Add command succeeded but {} is still not installed for {}; editing config directly",
                    server,
                    self.rule.id
                );
            } else {
                tracing::warn!("Add command failed for {} on {}; editing config directly", server, self.rule.id);
            }
        }

        self.fallback_add(server, scope)
    }

    fn fallback_add(&self, server: &str, scope: Scope) -> anyhow::Result<bool> {
        let Some(decl) = self.catalog()?.declaration(server)? else {
            return Err(McpError::ServerNotFound(server.to_string()).into());
        };
        let Some(entry) = entry_from_declaration(self.rule, &decl) else {
            tracing::warn!("{} has nothing to launch for {}", server, self.rule.id);
            return Ok(false);
        };
        let written = self.write_entry(server, entry, scope)?;
        if !written {
            tracing::warn!(
                "{}",
                McpError::FallbackFailure {
                    server: server.to_string(),
                    tool: self.rule.id.to_string(),
                }
            );
        }
        Ok(written)
    }

    fn remove_chain(&self, server: &str, scope: Scope, remove_cmd: &str) -> anyhow::Result<bool> {
        if self.rule.uses_cli() && self.run_cli(remove_cmd) {
            if !self.installed_in_files(server, scope)? {
                tracing::info!("Removed {} from {}", server, self.rule.id);
                return Ok(true);
            }
            tracing::warn!(
                "Remove command succeeded but {} is still configured for {}; editing config directly",
                server,
                self.rule.id
            );
        }
        self.fallback_remove(server, scope)
    }

    /// Write `entry` into the first usable file of `scope`.
    fn write_entry(&self, server: &str, entry: Value, scope: Scope) -> anyhow::Result<bool> {
        let fixed_key = match self.rule.container {
            ContainerPolicy::Fixed(key) => Some(key),
            ContainerPolicy::Detect => None,
        };

        for path in self.config_paths(scope) {
            let Some(mut map) = load_config(&path)?.into_editable() else {
                continue;
            };
            let default_key = ConfigFormat::for_path(&path).default_container();
            match add_server(&mut map, server, entry.clone(), fixed_key, default_key) {
                AddResult::Added => {
                    if let Some(schema_url) = self.rule.schema_url
                        && !map.contains_key("$schema")
                    {
                        map.insert("$schema".to_string(), json!(schema_url));
                    }
                    save_config(&path, &map)?;
                    tracing::info!("Added {} to {}", server, path.display());
                    return Ok(true);
                }
                AddResult::Unchanged => {
                    tracing::debug!("{} already present in {}", server, path.display());
                    return Ok(true);
                }
                AddResult::Conflict => {
                    tracing::warn!(
                        "{} already exists in {} with a different configuration; leaving it unchanged",
                        server,
                        path.display()
                    );
                    return Ok(false);
                }
            }
        }
        Ok(false)
    }

    /// Remove `server` from every file of `scope`.
    fn fallback_remove(&self, server: &str, scope: Scope) -> anyhow::Result<bool> {
        let mut removed = false;
        for path in self.config_paths(scope) {
            let Some(mut map) = self.read_file(&path)? else {
                continue;
            };
            if remove_server(&mut map, server) {
                save_config(&path, &map)?;
                tracing::info!("Removed {} from {}", server, path.display());
                removed = true;
            }
        }
        Ok(removed)
    }

    fn project_section_servers(&self) -> anyhow::Result<Vec<ListedServer>> {
        let mut listed = Vec::new();
        let project_key = self.ctx.project_root.to_string_lossy().to_string();
        for path in self.rule.paths(&self.ctx, Scope::User) {
            let Some(map) = self.read_file(&path)? else {
                continue;
            };
            if let Some(Value::Object(servers)) = map
                .get("projects")
                .and_then(|projects| projects.get(&project_key))
                .and_then(|project| project.get("mcpServers"))
            {
                listed.extend(servers.iter().map(|(name, entry)| ListedServer {
                    name: name.clone(),
                    source: path.clone(),
                    entry: entry.clone(),
                }));
            }
        }
        Ok(listed)
    }

    /// Run `op` for every server, treating errors as failures.
    fn each_server<F>(&self, config: &ToolConfig, action: &str, mut op: F) -> bool
    where
        F: FnMut(&str, &ToolCommands) -> anyhow::Result<bool>,
    {
        if config.is_empty() {
            tracing::warn!("No MCP server configurations found for {}", self.rule.id);
            return false;
        }
        let mut all_ok = true;
        for (server, cmds) in config {
            match op(server, cmds) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("Failed to {} {} for {}", action, server, self.rule.id);
                    all_ok = false;
                }
                Err(err) => {
                    tracing::warn!("Failed to {} {} for {}: {:#}", action, server, self.rule.id, err);
                    all_ok = false;
                }
            }
        }
        all_ok
    }
}

impl McpClient for GenericClient {
    fn id(&self) -> &'static str {
        self.rule.id
    }

    fn config_paths(&self, scope: Scope) -> Vec<PathBuf> {
        self.rule.paths(&self.ctx, scope)
    }

    fn is_installed(&self, server: &str) -> anyhow::Result<bool> {
        if self.installed_in_files(server, Scope::All)? {
            return Ok(true);
        }
        Ok(self.installed_per_cli(server))
    }

    fn add_server(&self, server: &str, scope: Scope) -> anyhow::Result<bool> {
        let config = self.tool_config(scope)?;
        let cmds = config
            .get(server)
            .ok_or_else(|| McpError::ServerNotFound(server.to_string()))?;
        self.install_chain(server, scope, cmds)
    }

    fn remove_server(&self, server: &str, scope: Scope) -> anyhow::Result<bool> {
        if !self.is_installed(server)? {
            tracing::info!("{} is not configured for {}", server, self.rule.id);
            return Ok(false);
        }
        self.remove_chain(server, scope, &remove_command(self.rule.id, server))
    }

    fn list_servers(&self, scope: Scope) -> anyhow::Result<ServerListing> {
        let mut listing = ServerListing::default();
        for path in self.config_paths(scope) {
            let Some(map) = self.read_file(&path)? else {
                continue;
            };
            listing
                .servers
                .extend(servers_in(&map).into_iter().map(|(name, entry)| ListedServer {
                    name,
                    source: path.clone(),
                    entry,
                }));
        }
        if self.rule.project_section && scope != Scope::User {
            listing.servers.extend(self.project_section_servers()?);
        }

        if listing.servers.is_empty() && self.rule.uses_cli() {
            let command = list_command(self.rule.id);
            match self.runner.run(&command) {
                Ok(output) if output.is_success() && !output.stdout.trim().is_empty() => {
                    listing.cli_output = Some(output.stdout);
                }
                Ok(output) if !output.is_success() => {
                    tracing::debug!("{}", output.to_error(&command));
                }
                Ok(_) => {}
                Err(err) => tracing::debug!("Could not run `{}`: {:#}", command, err),
            }
        }
        Ok(listing)
    }

    fn add_all_servers(&self, scope: Scope) -> anyhow::Result<bool> {
        let config = self.tool_config(scope)?;
        Ok(self.each_server(&config, "install", |server, cmds| {
            self.install_chain(server, scope, cmds)
        }))
    }

    fn remove_all_servers(&self) -> anyhow::Result<bool> {
        let config = self.tool_config(Scope::All)?;
        Ok(self.each_server(&config, "remove", |server, cmds| {
            if !self.is_installed(server)? {
                return Ok(false);
            }
            self.remove_chain(server, Scope::All, &cmds.remove_cmd)
        }))
    }

    fn refresh_servers(&self) -> anyhow::Result<bool> {
        let config = self.tool_config(Scope::User)?;
        Ok(self.each_server(&config, "refresh", |server, cmds| {
            let removed = if self.is_installed(server)? {
                self.remove_chain(server, Scope::All, &cmds.remove_cmd)?
            } else {
                true
            };
            if !removed {
                return Ok(false);
            }
            self.install_chain(server, Scope::User, cmds)
        }))
    }

    fn add_server_with_config(&self, config: &ServerConfig, scope: Scope) -> anyhow::Result<bool> {
        let entry = entry_from_config(self.rule, config);
        self.write_entry(config.name(), entry, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::client::rules::rule_for;
    use crate::client::runner::CommandOutput;
    use crate::config::global::GlobalConfig;
    use crate::mcp::spec::StdioServerConfig;
    use tempfile::TempDir;

    /// Runner that fails every command and records what it was asked to run.
    #[derive(Debug, Default)]
    struct FailingRunner {
        calls: Mutex<Vec<String>>,
    }

    impl CommandRunner for FailingRunner {
        fn run(&self, command_line: &str) -> anyhow::Result<CommandOutput> {
            self.calls.lock().unwrap().push(command_line.to_string());
            Ok(CommandOutput::failure(127, "command not found"))
        }
    }

    fn catalog() -> Arc<dyn ServerCatalog> {
        Arc::new(
            GlobalConfig::parse_str(
                r#"{
                    "global": {"tools_with_scope": ["claude"], "all_tools": ["claude", "codex", "droid"]},
                    "servers": {"memory": {"package": "@modelcontextprotocol/server-memory"}}
                }"#,
            )
            .expect("parse"),
        )
    }

    fn client(temp: &TempDir, tool: &str, runner: Arc<dyn CommandRunner>) -> GenericClient {
        let ctx = ClientContext::new(temp.path().join("home"), temp.path().join("project"));
        GenericClient::new(rule_for(tool).unwrap(), ctx, Some(catalog())).with_runner(runner)
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("json")
    }

    // ===========================================
    // Install Tests
    // ===========================================

    #[test]
    fn failing_cli_falls_back_to_file_write() {
        let temp = TempDir::new().expect("create temp dir");
        let runner = Arc::new(FailingRunner::default());
        let claude = client(&temp, "claude", runner.clone());

        assert!(claude.add_server("memory", Scope::User).unwrap());

        let config = read_json(&temp.path().join("home/.claude.json"));
        assert_eq!(config["mcpServers"]["memory"]["command"], json!("npx"));
        let calls = runner.calls.lock().unwrap();
        assert!(calls.iter().any(|c| c.starts_with("claude mcp add memory --scope user")));
    }

    #[test]
    fn unknown_server_is_server_not_found() {
        let temp = TempDir::new().expect("create temp dir");
        let claude = client(&temp, "claude", Arc::new(FailingRunner::default()));
        let err = claude.add_server("ghost", Scope::User).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<McpError>(),
            Some(McpError::ServerNotFound(name)) if name == "ghost"
        ));
    }

    #[test]
    fn file_only_tool_never_runs_cli() {
        let temp = TempDir::new().expect("create temp dir");
        let runner = Arc::new(FailingRunner::default());
        let droid = client(&temp, "droid", runner.clone());

        assert!(droid.add_server("memory", Scope::User).unwrap());
        assert!(runner.calls.lock().unwrap().is_empty());
        let config = read_json(&temp.path().join("home/.factory/mcp.json"));
        assert_eq!(config["mcpServers"]["memory"]["disabled"], json!(false));
    }

    #[test]
    fn malformed_file_is_left_alone() {
        let temp = TempDir::new().expect("create temp dir");
        let path = temp.path().join("home/.claude.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ broken").unwrap();
        let claude = client(&temp, "claude", Arc::new(FailingRunner::default()));

        assert!(!claude.add_server("memory", Scope::User).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ broken");
    }

    #[test]
    fn conflicting_entry_is_rejected() {
        let temp = TempDir::new().expect("create temp dir");
        let claude = client(&temp, "claude", Arc::new(FailingRunner::default()));
        let first = ServerConfig::Stdio(StdioServerConfig::new("m", "a", Vec::new()));
        let second = ServerConfig::Stdio(StdioServerConfig::new("m", "b", Vec::new()));

        assert!(claude.add_server_with_config(&first, Scope::User).unwrap());
        assert!(claude.add_server_with_config(&first, Scope::User).unwrap());
        assert!(!claude.add_server_with_config(&second, Scope::User).unwrap());

        let config = read_json(&temp.path().join("home/.claude.json"));
        assert_eq!(config["mcpServers"]["m"]["command"], json!("a"));
    }

    #[test]
    fn crush_gets_schema_and_fixed_container() {
        let temp = TempDir::new().expect("create temp dir");
        let crush = client(&temp, "crush", Arc::new(FailingRunner::default()));
        let config = ServerConfig::Stdio(StdioServerConfig::new("m", "x", Vec::new()));

        assert!(crush.add_server_with_config(&config, Scope::Project).unwrap());
        let written = read_json(&temp.path().join("home/.config/crush/crush.json"));
        assert_eq!(written["$schema"], json!("https://charm.land/crush.json"));
        assert!(written["mcp"]["m"].is_object());
    }

    // ===========================================
    // Remove / List Tests
    // ===========================================

    #[test]
    fn remove_uses_fallback_when_cli_fails() {
        let temp = TempDir::new().expect("create temp dir");
        let claude = client(&temp, "claude", Arc::new(FailingRunner::default()));
        claude.add_server("memory", Scope::User).unwrap();

        assert!(claude.remove_server("memory", Scope::User).unwrap());
        assert!(!claude.is_installed("memory").unwrap());
    }

    #[test]
    fn listing_reads_files_then_cli() {
        let temp = TempDir::new().expect("create temp dir");
        let claude = client(&temp, "claude", Arc::new(FailingRunner::default()));
        assert!(claude.list_servers(Scope::All).unwrap().is_empty());

        claude.add_server("memory", Scope::Project).unwrap();
        let listing = claude.list_servers(Scope::All).unwrap();
        assert_eq!(listing.servers.len(), 1);
        assert_eq!(listing.servers[0].source, temp.path().join("project/.mcp.json"));
        assert_eq!(
            listing.servers[0].launch(),
            "npx -y @modelcontextprotocol/server-memory"
        );
    }

    #[test]
    fn listing_includes_claude_project_section() {
        let temp = TempDir::new().expect("create temp dir");
        let project = temp.path().join("project");
        let home = temp.path().join("home");
        std::fs::create_dir_all(&home).unwrap();
        let mut projects = Map::new();
        projects.insert(
            project.to_string_lossy().to_string(),
            json!({"mcpServers": {"local-only": {"command": "x"}}}),
        );
        std::fs::write(
            home.join(".claude.json"),
            serde_json::to_string(&json!({"projects": projects})).unwrap(),
        )
        .unwrap();
        let claude = client(&temp, "claude", Arc::new(FailingRunner::default()));

        let listing = claude.list_servers(Scope::All).unwrap();
        assert_eq!(listing.servers.len(), 1);
        assert_eq!(listing.servers[0].name, "local-only");
        assert!(matches!(
            listing.servers[0].config(),
            ServerConfig::Stdio(ref stdio) if stdio.command == "x" && stdio.args.is_empty()
        ));
    }

    #[test]
    fn missing_catalog_is_config_not_found() {
        let temp = TempDir::new().expect("create temp dir");
        let ctx = ClientContext::new(temp.path().join("home"), temp.path().join("project"));
        let client = GenericClient::new(rule_for("qwen").unwrap(), ctx, None)
            .with_runner(Arc::new(FailingRunner::default()));
        let err = client.add_all_servers(Scope::User).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<McpError>(),
            Some(McpError::ConfigNotFound(_))
        ));
    }
}
