//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::client::ClientContext;
use crate::registry::LocalRegistry;

/// Directory name under the platform config dir.
pub const APP_DIR_NAME: &str = "mcpsync";

/// Unified application context for dependency injection.
///
/// Provides the filesystem roots every service resolves against.
/// Frontends create this once and pass it to commands.
#[derive(Debug, Clone)]
pub struct AppContext {
    home_dir: PathBuf,
    project_root: PathBuf,
    config_dir: PathBuf,
}

impl AppContext {
    /// Context for the current user and working directory.
    pub fn new() -> anyhow::Result<Self> {
        let home_dir = dirs::home_dir().context("Could not determine home directory")?;
        let project_root = std::env::current_dir().context("Could not read current directory")?;
        let config_dir = dirs::config_dir()
            .map(|p| p.join(APP_DIR_NAME))
            .unwrap_or_else(|| home_dir.join(".config").join(APP_DIR_NAME));

        Ok(Self {
            home_dir,
            project_root,
            config_dir,
        })
    }

    /// Create a context with explicit paths (for testing).
    pub fn with_paths(home_dir: PathBuf, project_root: PathBuf, config_dir: PathBuf) -> Self {
        Self {
            home_dir,
            project_root,
            config_dir,
        }
    }

    pub fn home_dir(&self) -> &Path {
        &self.home_dir
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Root of the local server registry.
    pub fn registry_dir(&self) -> PathBuf {
        self.config_dir.join("registry")
    }

    /// Get a ClientContext for adapter calls.
    pub fn client_context(&self) -> ClientContext {
        ClientContext::new(self.home_dir.clone(), self.project_root.clone())
    }

    /// Open the local registry, creating its directory if needed.
    pub fn local_registry(&self) -> anyhow::Result<LocalRegistry> {
        LocalRegistry::open(self.registry_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn registry_lives_under_config_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = AppContext::with_paths(
            temp.path().join("home"),
            temp.path().join("work"),
            temp.path().join("cfg"),
        );
        assert_eq!(ctx.registry_dir(), temp.path().join("cfg").join("registry"));

        let registry = ctx.local_registry().unwrap();
        assert!(registry.servers_dir().is_dir());
    }

    #[test]
    fn client_context_carries_roots() {
        let ctx = AppContext::with_paths("/h".into(), "/p".into(), "/c".into());
        let client = ctx.client_context();
        assert_eq!(client.home_dir, PathBuf::from("/h"));
        assert_eq!(client.project_root, PathBuf::from("/p"));
    }
}
