//! Error taxonomy for server synchronization.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("MCP configuration not found: {0}")]
    ConfigNotFound(String),

    #[error("Config file {} cannot be parsed and will not be modified: {reason}", path.display())]
    ConfigMalformed { path: PathBuf, reason: String },

    #[error("Server '{0}' not found")]
    ServerNotFound(String),

    #[error("Client '{0}' is not supported")]
    ClientUnsupported(String),

    #[error("Command `{command}` failed ({status}): {stderr}")]
    CommandExecutionFailure {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Could not write '{server}' into any {tool} config file")]
    FallbackFailure { server: String, tool: String },

    #[error("{failed} of {total} items failed")]
    PartialBatchFailure { failed: usize, total: usize },
}

impl McpError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        McpError::ConfigMalformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
