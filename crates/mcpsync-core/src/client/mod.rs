//! Client adapter layer.
//!
//! Every supported assistant is driven by one [`GenericClient`] configured
//! with a row of the declarative rule table in [`rules`]. The [`McpClient`]
//! trait is the contract the manager and the installer program against.

pub mod format;
pub mod generic;
pub mod registry;
pub mod rules;
pub mod runner;

use std::path::PathBuf;

use serde_json::Value;

use crate::mcp::spec::ServerConfig;
use crate::types::Scope;

pub use generic::GenericClient;
pub use registry::ClientRegistry;
pub use rules::{CliSupport, ContainerPolicy, EntryStyle, ScopeMode, TOOL_RULES, ToolRule, rule_for};
pub use runner::{CommandOutput, CommandRunner, ShellRunner};

/// Filesystem roots a client resolves its config paths against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContext {
    pub home_dir: PathBuf,
    pub project_root: PathBuf,
}

impl ClientContext {
    pub fn new(home_dir: PathBuf, project_root: PathBuf) -> Self {
        Self {
            home_dir,
            project_root,
        }
    }
}

/// One server found in a client file.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedServer {
    pub name: String,
    /// File the entry was read from.
    pub source: PathBuf,
    pub entry: Value,
}

impl ListedServer {
    /// The raw entry read back as a typed config.
    pub fn config(&self) -> ServerConfig {
        format::config_from_entry(&self.name, &self.entry)
    }

    /// How the server is launched: a command line, a url, or empty.
    pub fn launch(&self) -> String {
        match self.config() {
            ServerConfig::Stdio(stdio) => format::joined_command(&stdio),
            ServerConfig::Remote(remote) => remote.url,
            ServerConfig::Custom(_) => String::new(),
        }
    }
}

/// What a client reports as configured.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerListing {
    pub servers: Vec<ListedServer>,
    /// Output of the tool's own list command, when files held nothing.
    pub cli_output: Option<String>,
}

impl ServerListing {
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty() && self.cli_output.is_none()
    }
}

/// Contract for installing and removing servers on one assistant.
///
/// Single-server operations return `Ok(true)` on success and `Ok(false)` when
/// the operation ran but did not achieve its goal. Unknown servers surface as
/// [`crate::error::McpError::ServerNotFound`].
pub trait McpClient: Send + Sync + std::fmt::Debug {
    /// Tool identifier, e.g. `claude`.
    fn id(&self) -> &'static str;

    /// Config files for `scope`, in write-preference order.
    fn config_paths(&self, scope: Scope) -> Vec<PathBuf>;

    /// Whether `server` is registered anywhere this tool looks.
    fn is_installed(&self, server: &str) -> anyhow::Result<bool>;

    /// Install a catalog server through the CLI, falling back to a file write.
    fn add_server(&self, server: &str, scope: Scope) -> anyhow::Result<bool>;

    /// Remove a server through the CLI, falling back to a file edit.
    fn remove_server(&self, server: &str, scope: Scope) -> anyhow::Result<bool>;

    fn list_servers(&self, scope: Scope) -> anyhow::Result<ServerListing>;

    /// Install every catalog server; true only if all succeeded.
    fn add_all_servers(&self, scope: Scope) -> anyhow::Result<bool>;

    /// Remove every catalog server from all scopes; true only if all succeeded.
    fn remove_all_servers(&self) -> anyhow::Result<bool>;

    /// Remove and re-add every catalog server.
    fn refresh_servers(&self) -> anyhow::Result<bool>;

    /// Write a resolved config straight into the scope's files.
    fn add_server_with_config(&self, config: &ServerConfig, scope: Scope) -> anyhow::Result<bool>;
}
