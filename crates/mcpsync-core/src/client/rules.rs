//! Declarative per-tool rules.
//!
//! Every supported assistant is described by one [`ToolRule`]. The generic
//! adapter reads nothing but this table, so adding a tool means adding a row.

use std::path::PathBuf;

use crate::client::ClientContext;
use crate::types::Scope;

/// Where server entries go when a file has no container yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerPolicy {
    /// Use the file's existing container, or the format default.
    Detect,
    /// Always write under this key.
    Fixed(&'static str),
}

/// Shape of a single server entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStyle {
    /// `{"type": "stdio", "command", "args", "env"}`
    Stdio,
    /// `{"type": "local", "command", "args", "tools": ["*"]}`
    CopilotLocal,
    /// `{"command": "npx -y pkg"}` as one string.
    CommandString,
}

/// Whether the tool's own CLI is tried before editing files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliSupport {
    Command,
    FileOnly,
}

/// How user and project scopes map onto files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMode {
    /// Separate user and project files.
    PerScope,
    /// One file serves every scope.
    SingleFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolRule {
    pub id: &'static str,
    /// Relative to the home directory.
    pub user_paths: &'static [&'static str],
    /// Relative to the project root.
    pub project_paths: &'static [&'static str],
    pub container: ContainerPolicy,
    pub entry_style: EntryStyle,
    /// Entries carry `NODE_TLS_REJECT_UNAUTHORIZED=0`.
    pub tls_env: bool,
    /// Command servers get `codex_extra` appended.
    pub codex_extra: bool,
    /// Entries carry `"disabled": false`.
    pub disabled_flag: bool,
    pub cli: CliSupport,
    pub scope_mode: ScopeMode,
    /// Inserted as `$schema` when absent.
    pub schema_url: Option<&'static str>,
    /// Listing also reads `projects[<root>].mcpServers` from the user file.
    pub project_section: bool,
}

const BASE: ToolRule = ToolRule {
    id: "",
    user_paths: &[],
    project_paths: &[],
    container: ContainerPolicy::Detect,
    entry_style: EntryStyle::Stdio,
    tls_env: false,
    codex_extra: false,
    disabled_flag: false,
    cli: CliSupport::Command,
    scope_mode: ScopeMode::PerScope,
    schema_url: None,
    project_section: false,
};

pub const TOOL_RULES: &[ToolRule] = &[
    ToolRule {
        id: "claude",
        user_paths: &[".claude.json"],
        project_paths: &[".mcp.json"],
        tls_env: true,
        project_section: true,
        ..BASE
    },
    ToolRule {
        id: "codex",
        user_paths: &[".codex/config.toml"],
        tls_env: true,
        codex_extra: true,
        scope_mode: ScopeMode::SingleFile,
        ..BASE
    },
    ToolRule {
        id: "gemini",
        user_paths: &[".gemini/settings.json"],
        project_paths: &[".gemini/settings.json"],
        ..BASE
    },
    ToolRule {
        id: "qwen",
        user_paths: &[".qwen/settings.json"],
        scope_mode: ScopeMode::SingleFile,
        ..BASE
    },
    ToolRule {
        id: "copilot",
        user_paths: &[".copilot/mcp-config.json"],
        project_paths: &[".mcp.json"],
        entry_style: EntryStyle::CopilotLocal,
        cli: CliSupport::FileOnly,
        ..BASE
    },
    ToolRule {
        id: "codebuddy",
        user_paths: &[".codebuddy.json"],
        project_paths: &[".codebuddy/mcp.json"],
        container: ContainerPolicy::Fixed("mcpServers"),
        entry_style: EntryStyle::CommandString,
        ..BASE
    },
    ToolRule {
        id: "droid",
        user_paths: &[".factory/mcp.json"],
        container: ContainerPolicy::Fixed("mcpServers"),
        disabled_flag: true,
        cli: CliSupport::FileOnly,
        scope_mode: ScopeMode::SingleFile,
        ..BASE
    },
    ToolRule {
        id: "iflow",
        user_paths: &[".iflow/settings.json"],
        project_paths: &[".iflow/settings.json"],
        ..BASE
    },
    ToolRule {
        id: "zed",
        user_paths: &[".config/Zed/mcp.json"],
        project_paths: &[".mcp.json"],
        ..BASE
    },
    ToolRule {
        id: "qodercli",
        user_paths: &[".config/Qodercli/mcp.json"],
        project_paths: &[".mcp.json"],
        ..BASE
    },
    ToolRule {
        id: "neovate",
        user_paths: &[".config/Neovate/mcp.json"],
        project_paths: &[".mcp.json"],
        ..BASE
    },
    ToolRule {
        id: "crush",
        user_paths: &[".config/crush/crush.json"],
        container: ContainerPolicy::Fixed("mcp"),
        scope_mode: ScopeMode::SingleFile,
        schema_url: Some("https://charm.land/crush.json"),
        ..BASE
    },
    ToolRule {
        id: "cursor-agent",
        user_paths: &[".cursor/mcp.json"],
        project_paths: &[".cursor/mcp.json", ".cursor/mcp.local.json"],
        ..BASE
    },
];

/// Look a rule up by tool id, ignoring case.
pub fn rule_for(id: &str) -> Option<&'static ToolRule> {
    TOOL_RULES
        .iter()
        .find(|rule| rule.id.eq_ignore_ascii_case(id))
}

impl ToolRule {
    /// Config files for `scope`, in write-preference order.
    pub fn paths(&self, ctx: &ClientContext, scope: Scope) -> Vec<PathBuf> {
        let user = || {
            self.user_paths
                .iter()
                .map(|rel| ctx.home_dir.join(rel))
                .collect::<Vec<_>>()
        };
        let project = || {
            self.project_paths
                .iter()
                .map(|rel| ctx.project_root.join(rel))
                .collect::<Vec<_>>()
        };

        if self.scope_mode == ScopeMode::SingleFile {
            return user();
        }
        match scope {
            Scope::User => user(),
            Scope::Project => project(),
            Scope::All => {
                let mut all = user();
                for path in project() {
                    if !all.contains(&path) {
                        all.push(path);
                    }
                }
                all
            }
        }
    }

    pub fn uses_cli(&self) -> bool {
        self.cli == CliSupport::Command
    }
}
