//! Batch orchestration across every configured tool.
//!
//! Batch operations run one scoped worker per tool and join all of them; a
//! failing or panicking tool never stops the others. Refresh runs in order on
//! the calling thread.

use std::sync::Arc;

use crate::client::{ClientContext, ClientRegistry, McpClient, ServerListing, TOOL_RULES};
use crate::config::global::GlobalConfig;
use crate::context::AppContext;
use crate::error::McpError;
use crate::mcp::catalog::{RegistryCatalog, ServerCatalog};
use crate::registry::LocalRegistry;
use crate::types::Scope;

/// Builds a [`Manager`] on demand; injected by callers so tests can swap it.
pub type ManagerFactory = Box<dyn Fn() -> anyhow::Result<Manager> + Send + Sync>;

/// Result of one tool in a batch.
#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub tool: String,
    pub success: bool,
    /// Status text after the tool name, e.g. `✓ Successfully installed`.
    pub status: String,
    pub listing: Option<ServerListing>,
}

impl ToolOutcome {
    /// Status line such as `  CLAUDE: ✓ Successfully installed`.
    pub fn line(&self) -> String {
        format!("  {}: {}", self.tool.to_uppercase(), self.status)
    }
}

/// Per-tool results of a batch operation.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<ToolOutcome>,
}

impl BatchReport {
    /// True only when every tool succeeded.
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|outcome| outcome.success)
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| !outcome.success).count()
    }

    pub fn lines(&self) -> Vec<String> {
        self.outcomes.iter().map(ToolOutcome::line).collect()
    }

    pub fn outcome(&self, tool: &str) -> Option<&ToolOutcome> {
        self.outcomes
            .iter()
            .find(|outcome| outcome.tool.eq_ignore_ascii_case(tool))
    }

    /// `Err(PartialBatchFailure)` when any tool failed.
    pub fn into_result(self) -> Result<Self, McpError> {
        let failed = self.failed_count();
        if failed == 0 {
            Ok(self)
        } else {
            Err(McpError::PartialBatchFailure {
                failed,
                total: self.outcomes.len(),
            })
        }
    }
}

/// Holds every adapter and the tools batch operations target.
#[derive(Debug)]
pub struct Manager {
    registry: ClientRegistry,
    tools: Vec<String>,
}

impl Manager {
    pub fn new(registry: ClientRegistry, tools: Vec<String>) -> Self {
        Self { registry, tools }
    }

    /// Manager over the discovered global config, targeting its declared tools.
    pub fn from_context(ctx: &AppContext) -> anyhow::Result<Self> {
        let config = GlobalConfig::discover(ctx)?;
        let tools = config.available_tools();
        let catalog: Arc<dyn ServerCatalog> = Arc::new(config);
        let client_ctx: ClientContext = ctx.client_context();
        let registry = ClientRegistry::with_default_clients(&client_ctx, Some(catalog));
        Ok(Self::new(registry, tools))
    }

    /// Manager whose adapters draw servers from the local registry.
    ///
    /// Targets the global config's tools when one is found, every known tool
    /// otherwise.
    pub fn for_registry(ctx: &AppContext, registry: LocalRegistry) -> Self {
        let tools = match GlobalConfig::discover(ctx) {
            Ok(config) => config.available_tools(),
            Err(err) => {
                tracing::debug!("No global config, targeting every tool: {:#}", err);
                TOOL_RULES.iter().map(|rule| rule.id.to_string()).collect()
            }
        };
        let catalog: Arc<dyn ServerCatalog> = Arc::new(RegistryCatalog::new(registry));
        let clients = ClientRegistry::with_default_clients(&ctx.client_context(), Some(catalog));
        Self::new(clients, tools)
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// Adapter for `name`, ignoring case.
    pub fn get_client(&self, name: &str) -> Option<Arc<dyn McpClient>> {
        self.registry.get(name)
    }

    pub fn require_client(&self, name: &str) -> anyhow::Result<Arc<dyn McpClient>> {
        self.get_client(name)
            .ok_or_else(|| McpError::ClientUnsupported(name.to_string()).into())
    }

    pub fn add_server(&self, tool: &str, server: &str, scope: Scope) -> anyhow::Result<bool> {
        self.require_client(tool)?.add_server(server, scope)
    }

    pub fn remove_server(&self, tool: &str, server: &str) -> anyhow::Result<bool> {
        self.require_client(tool)?.remove_server(server, Scope::All)
    }

    pub fn list_servers(&self, tool: &str) -> anyhow::Result<ServerListing> {
        self.require_client(tool)?.list_servers(Scope::All)
    }

    pub fn add_all_servers(&self, scope: Scope) -> BatchReport {
        self.fan_out("install", "installed", |client| {
            client.add_all_servers(scope).map(|ok| (ok, None))
        })
    }

    pub fn remove_all_servers(&self) -> BatchReport {
        self.fan_out("remove", "removed", |client| {
            client.remove_all_servers().map(|ok| (ok, None))
        })
    }

    pub fn list_all_servers(&self) -> BatchReport {
        self.fan_out("list", "listed", |client| {
            client.list_servers(Scope::All).map(|listing| (true, Some(listing)))
        })
    }

    /// Refresh every tool in order on the calling thread.
    pub fn refresh_all_servers(&self) -> BatchReport {
        let outcomes = self
            .tools
            .iter()
            .map(|tool| {
                let result = self
                    .require_client(tool)
                    .and_then(|client| client.refresh_servers().map(|ok| (ok, None)));
                outcome_for(tool, "refresh", "refreshed", Some(result))
            })
            .collect();
        BatchReport { outcomes }
    }

    fn fan_out<F>(&self, verb: &str, past: &str, op: F) -> BatchReport
    where
        F: Fn(&dyn McpClient) -> anyhow::Result<(bool, Option<ServerListing>)> + Sync,
    {
        let op = &op;
        let outcomes = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .tools
                .iter()
                .map(|tool| {
                    let client = self.require_client(tool);
                    let handle = scope.spawn(move || client.and_then(|client| op(client.as_ref())));
                    (tool, handle)
                })
                .collect();

            handles
                .into_iter()
                .map(|(tool, handle)| outcome_for(tool, verb, past, handle.join().ok()))
                .collect()
        });
        BatchReport { outcomes }
    }
}

/// `None` means the worker panicked.
fn outcome_for(
    tool: &str,
    verb: &str,
    past: &str,
    result: Option<anyhow::Result<(bool, Option<ServerListing>)>>,
) -> ToolOutcome {
    let (success, status, listing) = match result {
        Some(Ok((true, listing))) => (true, format!("✓ Successfully {}", past), listing),
        Some(Ok((false, listing))) => (false, format!("✗ Failed to {}", verb), listing),
        Some(Err(err)) => {
            tracing::warn!("{}: {:#}", tool, err);
            (false, format!("✗ Error: {}", err), None)
        }
        None => {
            tracing::warn!("{}: worker panicked", tool);
            (false, format!("✗ Error: {} worker panicked", verb), None)
        }
    };
    ToolOutcome {
        tool: tool.to_string(),
        success,
        status,
        listing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::mcp::spec::ServerConfig;

    #[derive(Debug)]
    struct StubClient {
        id: &'static str,
        outcome: Option<bool>,
    }

    impl McpClient for StubClient {
        fn id(&self) -> &'static str {
            self.id
        }
        fn config_paths(&self, _scope: Scope) -> Vec<PathBuf> {
            Vec::new()
        }
        fn is_installed(&self, _server: &str) -> anyhow::Result<bool> {
            Ok(false)
        }
        fn add_server(&self, _server: &str, _scope: Scope) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn remove_server(&self, _server: &str, _scope: Scope) -> anyhow::Result<bool> {
            Ok(true)
        }
        fn list_servers(&self, _scope: Scope) -> anyhow::Result<ServerListing> {
            Ok(ServerListing::default())
        }
        fn add_all_servers(&self, _scope: Scope) -> anyhow::Result<bool> {
            match self.outcome {
                Some(ok) => Ok(ok),
                None => panic!("boom"),
            }
        }
        fn remove_all_servers(&self) -> anyhow::Result<bool> {
            anyhow::bail!("disk on fire")
        }
        fn refresh_servers(&self) -> anyhow::Result<bool> {
            Ok(self.outcome.unwrap_or(false))
        }
        fn add_server_with_config(&self, _c: &ServerConfig, _s: Scope) -> anyhow::Result<bool> {
            Ok(true)
        }
    }

    fn manager(stubs: Vec<StubClient>) -> Manager {
        let mut registry = ClientRegistry::new();
        let tools = stubs.iter().map(|stub| stub.id.to_string()).collect();
        for stub in stubs {
            registry.register(Arc::new(stub));
        }
        Manager::new(registry, tools)
    }

    #[test]
    fn batch_lines_and_aggregate() {
        let manager = manager(vec![
            StubClient {
                id: "claude",
                outcome: Some(true),
            },
            StubClient {
                id: "gemini",
                outcome: Some(false),
            },
        ]);

        let report = manager.add_all_servers(Scope::User);
        assert!(!report.success());
        assert_eq!(
            report.lines(),
            vec![
                "  CLAUDE: ✓ Successfully installed",
                "  GEMINI: ✗ Failed to install"
            ]
        );
    }

    #[test]
    fn panicking_worker_is_a_failure_not_a_crash() {
        let manager = manager(vec![
            StubClient {
                id: "claude",
                outcome: None,
            },
            StubClient {
                id: "qwen",
                outcome: Some(true),
            },
        ]);

        let report = manager.add_all_servers(Scope::User);
        assert!(!report.outcome("claude").unwrap().success);
        assert!(report.outcome("qwen").unwrap().success);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn errors_become_status_lines() {
        let manager = manager(vec![StubClient {
            id: "codex",
            outcome: Some(true),
        }]);
        let report = manager.remove_all_servers();
        assert_eq!(report.lines(), vec!["  CODEX: ✗ Error: disk on fire"]);
        assert!(matches!(
            report.into_result(),
            Err(McpError::PartialBatchFailure { failed: 1, total: 1 })
        ));
    }

    #[test]
    fn unknown_tool_is_reported_as_unsupported() {
        let manager = Manager::new(ClientRegistry::new(), vec!["vim".to_string()]);
        let report = manager.refresh_all_servers();
        assert_eq!(report.lines(), vec!["  VIM: ✗ Error: Client 'vim' is not supported"]);
        assert!(manager.add_server("vim", "memory", Scope::User).is_err());
    }

    #[test]
    fn get_client_ignores_case() {
        let manager = manager(vec![StubClient {
            id: "claude",
            outcome: Some(true),
        }]);
        assert!(manager.get_client("CLAUDE").is_some());
    }

    #[test]
    fn registry_manager_targets_every_tool_without_global_config() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = AppContext::with_paths(
            temp.path().join("home"),
            temp.path().join("work"),
            temp.path().join("cfg"),
        );
        let registry = LocalRegistry::open(ctx.registry_dir()).unwrap();
        let manager = Manager::for_registry(&ctx, registry);
        assert_eq!(manager.tools().len(), TOOL_RULES.len());
        assert!(manager.get_client("crush").is_some());
    }

    #[test]
    fn factory_closure_builds_manager() {
        let factory: ManagerFactory = Box::new(|| {
            Ok(Manager::new(ClientRegistry::new(), Vec::new()))
        });
        let manager = factory().expect("factory");
        assert!(manager.add_all_servers(Scope::User).success());
    }
}
