//! Concrete server configurations produced for a client.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A process launched over stdin/stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl StdioServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Env with `${VAR}` values replaced through `lookup`.
    ///
    /// A reference to an unset variable becomes an empty string.
    pub fn resolved_env<F>(&self, lookup: F) -> BTreeMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.env
            .iter()
            .map(|(key, value)| {
                let resolved = match value
                    .strip_prefix("${")
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    Some(var) => lookup(var).unwrap_or_default(),
                    None => value.clone(),
                };
                (key.clone(), resolved)
            })
            .collect()
    }
}

/// A server reached over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteServerConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl RemoteServerConfig {
    /// Bridge the remote server through `uvx mcp-proxy` for stdio-only clients.
    pub fn to_mcp_proxy_stdio(&self) -> StdioServerConfig {
        let mut args = vec!["mcp-proxy".to_string(), self.url.clone()];
        if !self.headers.is_empty() {
            args.push("--headers".to_string());
            for (key, value) in &self.headers {
                args.push(key.clone());
                args.push(value.clone());
            }
        }
        StdioServerConfig::new(self.name.clone(), "uvx", args)
    }
}

/// A client entry that fits neither shape, kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomServerConfig {
    pub name: String,
    pub raw: Map<String, Value>,
}

/// Server configuration ready to be written into a client file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ServerConfig {
    Stdio(StdioServerConfig),
    Remote(RemoteServerConfig),
    Custom(CustomServerConfig),
}

impl ServerConfig {
    pub fn name(&self) -> &str {
        match self {
            ServerConfig::Stdio(config) => &config.name,
            ServerConfig::Remote(config) => &config.name,
            ServerConfig::Custom(config) => &config.name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_conversion_includes_headers() {
        let remote = RemoteServerConfig {
            name: "api".to_string(),
            url: "https://mcp.example.com".to_string(),
            headers: BTreeMap::from([("Authorization".to_string(), "Bearer x".to_string())]),
        };
        let stdio = remote.to_mcp_proxy_stdio();

        assert_eq!(stdio.name, "api");
        assert_eq!(stdio.command, "uvx");
        assert_eq!(
            stdio.args,
            vec![
                "mcp-proxy",
                "https://mcp.example.com",
                "--headers",
                "Authorization",
                "Bearer x"
            ]
        );
    }

    #[test]
    fn proxy_conversion_without_headers() {
        let remote = RemoteServerConfig {
            name: "api".to_string(),
            url: "https://mcp.example.com".to_string(),
            headers: BTreeMap::new(),
        };
        assert_eq!(
            remote.to_mcp_proxy_stdio().args,
            vec!["mcp-proxy", "https://mcp.example.com"]
        );
    }

    #[test]
    fn resolved_env_expands_references() {
        let config = StdioServerConfig::new("s", "cmd", Vec::new()).with_env(BTreeMap::from([
            ("TOKEN".to_string(), "${GH_TOKEN}".to_string()),
            ("MISSING".to_string(), "${NOPE}".to_string()),
            ("PLAIN".to_string(), "literal".to_string()),
        ]));

        let env = config.resolved_env(|var| (var == "GH_TOKEN").then(|| "secret".to_string()));
        assert_eq!(env["TOKEN"], "secret");
        assert_eq!(env["MISSING"], "");
        assert_eq!(env["PLAIN"], "literal");
    }

    #[test]
    fn name_reads_every_variant() {
        let custom = ServerConfig::Custom(CustomServerConfig {
            name: "c".to_string(),
            raw: Map::new(),
        });
        assert_eq!(custom.name(), "c");
    }
}
