//! Per-tool CLI command synthesis.
//!
//! A [`ToolConfig`] maps each server name to the three command lines a tool's
//! CLI understands. Commands are derived purely from the server declaration and
//! the tool flag sets, so the same inputs always produce the same strings.

use std::collections::BTreeMap;

use crate::config::global::ServerDeclaration;
use crate::types::Scope;

/// Env flag passed to tools that need TLS verification relaxed.
pub const TLS_ENV_FLAG: &str = "--env NODE_TLS_REJECT_UNAUTHORIZED='0'";

/// Add, remove and list command lines for one server on one tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommands {
    pub add_cmd: String,
    pub remove_cmd: String,
    pub list_cmd: String,
}

/// Server name to command lines, for a single tool.
pub type ToolConfig = BTreeMap<String, ToolCommands>;

/// Tool name lists that switch optional CLI flags on.
#[derive(Debug, Clone, Copy)]
pub struct FlagSets<'a> {
    pub scope: &'a [String],
    pub tls: &'a [String],
    pub cli_separator: &'a [String],
}

impl FlagSets<'_> {
    fn has(list: &[String], tool: &str) -> bool {
        list.iter().any(|entry| entry == tool)
    }
}

pub fn remove_command(tool: &str, server: &str) -> String {
    format!("{} mcp remove {}", tool, server)
}

pub fn list_command(tool: &str) -> String {
    format!("{} mcp list", tool)
}

/// Value passed to `--scope`; `all` is not a valid CLI scope.
pub fn cli_scope(scope: Scope) -> &'static str {
    match scope {
        Scope::Project => "project",
        Scope::User | Scope::All => "user",
    }
}

/// Build the command triple for a legacy server declaration.
///
/// Returns `None` when the declaration has neither a package nor a command.
pub fn build_commands(
    tool: &str,
    server: &str,
    decl: &ServerDeclaration,
    flags: &FlagSets<'_>,
    scope: Scope,
) -> Option<ToolCommands> {
    let mut parts = vec![format!("{} mcp add {}", tool, server)];
    if FlagSets::has(flags.scope, tool) {
        parts.push(format!("--scope {}", cli_scope(scope)));
    }

    let target = if let Some(package) = decl.package.as_deref() {
        if FlagSets::has(flags.tls, tool) {
            parts.push(TLS_ENV_FLAG.to_string());
        }
        let quoted = decl.quote_package_for.iter().any(|entry| entry == tool);
        if quoted {
            format!("npx -y \"{}\"", package)
        } else {
            format!("npx -y {}", package)
        }
    } else if let Some(command) = decl.command.as_deref() {
        match decl.codex_extra.as_deref() {
            Some(extra) if tool == "codex" && !extra.is_empty() => format!("{} {}", command, extra),
            _ => command.to_string(),
        }
    } else {
        return None;
    };

    if FlagSets::has(flags.cli_separator, tool) {
        parts.push("--".to_string());
    }
    parts.push(target);

    Some(ToolCommands {
        add_cmd: parts.join(" "),
        remove_cmd: remove_command(tool, server),
        list_cmd: list_command(tool),
    })
}
