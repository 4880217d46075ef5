//! mcpsync core library
//!
//! Keeps MCP server registrations in sync across AI coding assistants,
//! driving each assistant's own CLI and falling back to editing its config
//! files directly.

pub mod client;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod mcp;
pub mod orchestration;
pub mod registry;
pub mod types;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{GlobalConfig, ServerDeclaration};
    pub use crate::context::AppContext;
    pub use crate::error::McpError;
    pub use crate::types::Scope;

    // Clients
    pub use crate::client::{ClientContext, ClientRegistry, GenericClient, McpClient, ServerListing};

    // MCP
    pub use crate::mcp::{
        InstallationManager, Prompter, RegistryCatalog, ServerCatalog, ServerConfig,
    };

    // Orchestration
    pub use crate::orchestration::{BatchReport, Manager, ManagerFactory};

    // Registry
    pub use crate::registry::{LocalRegistry, ServerSchema};
}
