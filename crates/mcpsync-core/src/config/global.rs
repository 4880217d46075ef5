//! Global declarative server configuration (`mcp.json`).
//!
//! The legacy mode reads one JSON document with a `global` section of per-tool
//! flag sets and a `servers` section of server declarations, then synthesizes
//! CLI command strings per tool from it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::error::McpError;
use crate::mcp::tool_config::{FlagSets, ToolConfig, build_commands};
use crate::types::Scope;

/// File name of the global declarative config.
pub const GLOBAL_CONFIG_FILE: &str = "mcp.json";

/// Environment variable naming an extra directory to search for `mcp.json`.
pub const GLOBAL_CONFIG_DIR_ENV: &str = "MCPSYNC_DIR";

/// Per-tool flag sets from the `global` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default)]
    pub tools_with_scope: Vec<String>,
    /// Deprecated alias of `tools_with_scope`, used only when that is empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_with_user_scope: Vec<String>,
    /// Older key, consulted only for tool discovery.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_with_scope_flag: Vec<String>,
    #[serde(default)]
    pub tools_with_tls_flag: Vec<String>,
    #[serde(default)]
    pub tools_with_cli_separator: Vec<String>,
    #[serde(default)]
    pub all_tools: Vec<String>,
}

impl GlobalSettings {
    pub fn scope_tools(&self) -> &[String] {
        if self.tools_with_scope.is_empty() {
            &self.tools_with_user_scope
        } else {
            &self.tools_with_scope
        }
    }

    pub fn flag_sets(&self) -> FlagSets<'_> {
        FlagSets {
            scope: self.scope_tools(),
            tls: &self.tools_with_tls_flag,
            cli_separator: &self.tools_with_cli_separator,
        }
    }
}

/// One server declaration from the `servers` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerDeclaration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codex_extra: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub quote_package_for: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl ServerDeclaration {
    pub fn package(package: impl Into<String>) -> Self {
        Self {
            package: Some(package.into()),
            ..Default::default()
        }
    }

    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: Some(command.into()),
            ..Default::default()
        }
    }
}

/// Parsed global declarative config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub global: GlobalSettings,
    #[serde(default)]
    pub servers: BTreeMap<String, ServerDeclaration>,
}

impl GlobalConfig {
    /// Locate and parse `mcp.json`.
    pub fn discover(ctx: &AppContext) -> Result<Self> {
        let path = find_global_config(ctx)?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|err| enhance_json_error(err, content))
    }

    /// Tools this config targets, sorted and de-duplicated.
    pub fn available_tools(&self) -> Vec<String> {
        let tools: BTreeSet<&String> = if self.global.all_tools.is_empty() {
            self.global
                .tools_with_scope_flag
                .iter()
                .chain(self.global.tools_with_tls_flag.iter())
                .collect()
        } else {
            self.global.all_tools.iter().collect()
        };
        tools.into_iter().cloned().collect()
    }

    /// Synthesized add/remove/list commands for every server, for one tool.
    pub fn tool_config(&self, tool: &str, scope: Scope) -> ToolConfig {
        let flags = self.global.flag_sets();
        self.servers
            .iter()
            .filter_map(|(name, decl)| {
                build_commands(tool, name, decl, &flags, scope).map(|cmds| (name.clone(), cmds))
            })
            .collect()
    }
}

/// Search order: working directory, `$MCPSYNC_DIR`, then the app config dir.
pub fn global_config_candidates(ctx: &AppContext) -> Vec<PathBuf> {
    let mut candidates = vec![ctx.project_root().join(GLOBAL_CONFIG_FILE)];
    if let Some(dir) = std::env::var_os(GLOBAL_CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        candidates.push(PathBuf::from(dir).join(GLOBAL_CONFIG_FILE));
    }
    candidates.push(ctx.config_dir().join(GLOBAL_CONFIG_FILE));
    candidates
}

pub fn find_global_config(ctx: &AppContext) -> Result<PathBuf> {
    let candidates = global_config_candidates(ctx);
    if let Some(found) = candidates.iter().find(|path| path.is_file()) {
        return Ok(found.clone());
    }
    let searched = candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(McpError::ConfigNotFound(format!("{} not found (searched {})", GLOBAL_CONFIG_FILE, searched)).into())
}

/// Attach the offending line to a JSON parse error.
fn enhance_json_error(error: serde_json::Error, content: &str) -> anyhow::Error {
    let line_num = error.line();
    if line_num == 0 {
        return anyhow::anyhow!("JSON parsing error: {}", error);
    }
    anyhow::anyhow!(
        "JSON parsing error at line {}, column {}:\n{}\n\nError: {}",
        line_num,
        error.column(),
        get_line_context(content, line_num),
        error
    )
}

fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());
    if start >= end {
        return String::new();
    }

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
  "global": {
    "tools_with_scope": ["claude", "gemini"],
    "tools_with_tls_flag": ["claude"],
    "tools_with_cli_separator": ["claude"],
    "all_tools": ["gemini", "claude", "codex", "claude"]
  },
  "servers": {
    "memory": {"package": "@modelcontextprotocol/server-memory"},
    "fetch": {"command": "uvx mcp-server-fetch", "codex_extra": "--ignore-robots-txt"},
    "empty": {}
  }
}"#;

    #[test]
    fn parse_sample_config() {
        let config = GlobalConfig::parse_str(SAMPLE).expect("parse");
        assert_eq!(config.servers.len(), 3);
        assert_eq!(
            config.servers["fetch"].codex_extra.as_deref(),
            Some("--ignore-robots-txt")
        );
    }

    #[test]
    fn available_tools_sorted_and_unique() {
        let config = GlobalConfig::parse_str(SAMPLE).expect("parse");
        assert_eq!(config.available_tools(), vec!["claude", "codex", "gemini"]);
    }

    #[test]
    fn available_tools_falls_back_to_flag_sets() {
        let config = GlobalConfig::parse_str(
            r#"{"global": {"tools_with_scope_flag": ["qwen", "claude"], "tools_with_tls_flag": ["codex", "claude"]}, "servers": {}}"#,
        )
        .expect("parse");
        assert_eq!(config.available_tools(), vec!["claude", "codex", "qwen"]);
    }

    #[test]
    fn deprecated_user_scope_alias_used_when_scope_empty() {
        let config = GlobalConfig::parse_str(
            r#"{"global": {"tools_with_user_scope": ["claude"]}, "servers": {}}"#,
        )
        .expect("parse");
        assert_eq!(config.global.scope_tools(), ["claude".to_string()]);

        let config = GlobalConfig::parse_str(
            r#"{"global": {"tools_with_scope": ["gemini"], "tools_with_user_scope": ["claude"]}, "servers": {}}"#,
        )
        .expect("parse");
        assert_eq!(config.global.scope_tools(), ["gemini".to_string()]);
    }

    #[test]
    fn tool_config_skips_servers_without_package_or_command() {
        let config = GlobalConfig::parse_str(SAMPLE).expect("parse");
        let tool_config = config.tool_config("claude", Scope::User);
        assert!(tool_config.contains_key("memory"));
        assert!(tool_config.contains_key("fetch"));
        assert!(!tool_config.contains_key("empty"));
    }

    #[test]
    fn parse_error_points_at_line() {
        let err = GlobalConfig::parse_str("{\n  \"global\": {,\n}").unwrap_err();
        let message = format!("{err}");
        assert!(message.contains("line 2"), "{message}");
        assert!(message.contains(">>>"), "{message}");
    }

    #[test]
    fn discover_prefers_project_root() {
        let temp = TempDir::new().expect("create temp dir");
        let project = temp.path().join("project");
        let config_dir = temp.path().join("config");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(project.join(GLOBAL_CONFIG_FILE), SAMPLE).unwrap();
        std::fs::write(config_dir.join(GLOBAL_CONFIG_FILE), r#"{"servers": {}}"#).unwrap();

        let ctx = AppContext::with_paths(temp.path().join("home"), project.clone(), config_dir);
        let found = find_global_config(&ctx).expect("find");
        assert_eq!(found, project.join(GLOBAL_CONFIG_FILE));
    }

    #[test]
    fn discover_missing_is_config_not_found() {
        let temp = TempDir::new().expect("create temp dir");
        let ctx = AppContext::with_paths(
            temp.path().join("home"),
            temp.path().join("project"),
            temp.path().join("config"),
        );
        let err = GlobalConfig::discover(&ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<McpError>(),
            Some(McpError::ConfigNotFound(_))
        ));
    }
}
