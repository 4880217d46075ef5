//! Client registry for looking up adapters by tool name.

use std::sync::Arc;

use crate::client::generic::GenericClient;
use crate::client::rules::TOOL_RULES;
use crate::client::runner::CommandRunner;
use crate::client::{ClientContext, McpClient};
use crate::mcp::catalog::ServerCatalog;

/// Registry of available client adapters.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Vec<Arc<dyn McpClient>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with one adapter per known tool.
    pub fn with_default_clients(
        ctx: &ClientContext,
        catalog: Option<Arc<dyn ServerCatalog>>,
    ) -> Self {
        let clients = TOOL_RULES
            .iter()
            .map(|rule| {
                Arc::new(GenericClient::new(rule, ctx.clone(), catalog.clone())) as Arc<dyn McpClient>
            })
            .collect();
        Self { clients }
    }

    /// Same as [`ClientRegistry::with_default_clients`] with a shared runner.
    pub fn with_runner(
        ctx: &ClientContext,
        catalog: Option<Arc<dyn ServerCatalog>>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let clients = TOOL_RULES
            .iter()
            .map(|rule| {
                Arc::new(
                    GenericClient::new(rule, ctx.clone(), catalog.clone()).with_runner(runner.clone()),
                ) as Arc<dyn McpClient>
            })
            .collect();
        Self { clients }
    }

    /// Register a client adapter, replacing any with the same id.
    pub fn register(&mut self, client: Arc<dyn McpClient>) {
        self.clients.retain(|existing| existing.id() != client.id());
        self.clients.push(client);
    }

    /// Get all registered clients.
    pub fn all(&self) -> &[Arc<dyn McpClient>] {
        &self.clients
    }

    /// Get a client by id, ignoring case.
    pub fn get(&self, id: &str) -> Option<Arc<dyn McpClient>> {
        self.clients
            .iter()
            .find(|client| client.id().eq_ignore_ascii_case(id))
            .cloned()
    }

    /// Registered ids in registration order.
    pub fn client_ids(&self) -> Vec<&'static str> {
        self.clients.iter().map(|client| client.id()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn ctx() -> ClientContext {
        ClientContext::new(PathBuf::from("/home/u"), PathBuf::from("/work"))
    }

    #[test]
    fn default_registry_has_all_tools() {
        let registry = ClientRegistry::with_default_clients(&ctx(), None);
        assert_eq!(registry.all().len(), TOOL_RULES.len());
        assert!(registry.client_ids().contains(&"cursor-agent"));
    }

    #[test]
    fn get_is_case_insensitive() {
        let registry = ClientRegistry::with_default_clients(&ctx(), None);
        assert_eq!(registry.get("Gemini").map(|c| c.id()), Some("gemini"));
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn register_replaces_same_id() {
        let mut registry = ClientRegistry::with_default_clients(&ctx(), None);
        let before = registry.all().len();
        let replacement = registry.get("claude").unwrap();
        registry.register(replacement);
        assert_eq!(registry.all().len(), before);
    }
}
