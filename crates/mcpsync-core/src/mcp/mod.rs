//! MCP server definitions and installation.

pub mod catalog;
pub mod installer;
pub mod spec;
pub mod tool_config;

pub use catalog::{RegistryCatalog, ServerCatalog};
pub use installer::{
    InstallOutcome, InstallRequest, InstallationManager, NoPrompt, Prompter,
};
pub use spec::{CustomServerConfig, RemoteServerConfig, ServerConfig, StdioServerConfig};
pub use tool_config::{ToolCommands, ToolConfig};
