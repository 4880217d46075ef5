//! Server catalogs an adapter can draw declarations from.
//!
//! Two sources exist: the legacy global `mcp.json` and the local registry. Both
//! expose the same view so adapters do not care where a server came from.

use crate::config::global::{GlobalConfig, ServerDeclaration};
use crate::mcp::tool_config::{ToolCommands, ToolConfig, cli_scope, list_command, remove_command};
use crate::registry::{InstallationMethod, LocalRegistry, ServerSchema};
use crate::types::Scope;

/// Read-only source of server declarations.
pub trait ServerCatalog: Send + Sync + std::fmt::Debug {
    /// Command lines for every server this catalog can install on `tool`.
    fn tool_config(&self, tool: &str, scope: Scope) -> anyhow::Result<ToolConfig>;

    /// The declaration behind `server`, if the catalog knows it.
    fn declaration(&self, server: &str) -> anyhow::Result<Option<ServerDeclaration>>;
}

impl ServerCatalog for GlobalConfig {
    fn tool_config(&self, tool: &str, scope: Scope) -> anyhow::Result<ToolConfig> {
        Ok(GlobalConfig::tool_config(self, tool, scope))
    }

    fn declaration(&self, server: &str) -> anyhow::Result<Option<ServerDeclaration>> {
        Ok(self.servers.get(server).cloned())
    }
}

/// Catalog backed by registry schemas, using each schema's first method.
#[derive(Debug, Clone)]
pub struct RegistryCatalog {
    registry: LocalRegistry,
}

impl RegistryCatalog {
    pub fn new(registry: LocalRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &LocalRegistry {
        &self.registry
    }
}

impl ServerCatalog for RegistryCatalog {
    fn tool_config(&self, tool: &str, scope: Scope) -> anyhow::Result<ToolConfig> {
        Ok(self
            .registry
            .list()?
            .iter()
            .filter_map(|schema| {
                commands_from_schema(tool, schema, scope).map(|cmds| (schema.name.clone(), cmds))
            })
            .collect())
    }

    fn declaration(&self, server: &str) -> anyhow::Result<Option<ServerDeclaration>> {
        Ok(self.registry.get(server).and_then(|schema| declaration_from_schema(&schema)))
    }
}

/// Flatten a schema's first installation method into a declaration.
pub fn declaration_from_schema(schema: &ServerSchema) -> Option<ServerDeclaration> {
    let (_, method) = schema.installations.first()?;
    Some(ServerDeclaration {
        package: method.package.clone(),
        command: method.command.clone(),
        args: (!method.args.is_empty()).then(|| method.args.clone()),
        env: method.env.clone(),
        url: method.url.clone(),
        headers: method.headers.clone(),
        ..Default::default()
    })
}

/// Command lines derived from a schema's first installation method.
pub fn commands_from_schema(tool: &str, schema: &ServerSchema, scope: Scope) -> Option<ToolCommands> {
    let (_, method) = schema.installations.first()?;
    let target = method_target(method)?;
    Some(ToolCommands {
        add_cmd: format!(
            "{} mcp add {} --scope {} -- {}",
            tool,
            schema.name,
            cli_scope(scope),
            target
        ),
        remove_cmd: remove_command(tool, &schema.name),
        list_cmd: list_command(tool),
    })
}

fn method_target(method: &InstallationMethod) -> Option<String> {
    match method.method_type.as_str() {
        "npm" => match (&method.package, &method.command) {
            (Some(package), _) => Some(format!("npx -y {}", package)),
            (None, Some(command)) => Some(command.clone()),
            (None, None) => None,
        },
        "uvx" | "python" | "docker" | "cli" | "custom" => {
            let mut line = method.command.clone().unwrap_or_default();
            if !method.args.is_empty() {
                line.push(' ');
                line.push_str(&method.args.join(" "));
            }
            Some(line)
        }
        "http" => method.url.clone(),
        _ => None,
    }
}
