//! Server entry rendering for each entry style.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::client::rules::{EntryStyle, ToolRule};
use crate::config::global::ServerDeclaration;
use crate::mcp::spec::{RemoteServerConfig, ServerConfig, StdioServerConfig};

pub const TLS_ENV_VAR: &str = "NODE_TLS_REJECT_UNAUTHORIZED";

/// Render a catalog declaration as a client entry.
///
/// Returns `None` when the declaration has nothing to launch.
pub fn entry_from_declaration(rule: &ToolRule, decl: &ServerDeclaration) -> Option<Value> {
    if decl.package.is_none()
        && decl.command.is_none()
        && let Some(url) = decl.url.as_deref()
    {
        return Some(remote_entry(url, &decl.headers));
    }

    if rule.entry_style == EntryStyle::CommandString {
        return command_string_entry(rule, decl);
    }

    let (command, args) = launch_parts(rule, decl)?;
    let mut env = decl.env.clone();
    if rule.tls_env {
        env.insert(TLS_ENV_VAR.to_string(), "0".to_string());
    }

    let entry = match rule.entry_style {
        EntryStyle::CopilotLocal => copilot_entry(&command, &args, &env),
        _ => json!({
            "type": "stdio",
            "command": command,
            "args": args,
            "env": env,
        }),
    };
    Some(with_disabled_flag(rule, entry))
}

/// Render a resolved server config as a client entry.
pub fn entry_from_config(rule: &ToolRule, config: &ServerConfig) -> Value {
    let entry = match config {
        ServerConfig::Remote(remote) => remote_entry(&remote.url, &remote.headers),
        ServerConfig::Custom(custom) => Value::Object(custom.raw.clone()),
        ServerConfig::Stdio(stdio) => match rule.entry_style {
            EntryStyle::CopilotLocal => copilot_entry(&stdio.command, &stdio.args, &stdio.env),
            EntryStyle::CommandString => json!({ "command": joined_command(stdio) }),
            EntryStyle::Stdio => stdio_entry(stdio),
        },
    };
    with_disabled_flag(rule, entry)
}

/// Read an entry from a client file back into a server config.
pub fn config_from_entry(name: &str, entry: &Value) -> ServerConfig {
    let custom = || {
        ServerConfig::Custom(crate::mcp::spec::CustomServerConfig {
            name: name.to_string(),
            raw: entry.as_object().cloned().unwrap_or_default(),
        })
    };
    let Some(fields) = entry.as_object() else {
        return custom();
    };

    if let Some(url) = fields.get("url").and_then(Value::as_str) {
        return ServerConfig::Remote(RemoteServerConfig {
            name: name.to_string(),
            url: url.to_string(),
            headers: string_map(fields.get("headers")),
        });
    }
    match fields.get("command").and_then(Value::as_str) {
        Some(command) => {
            let args = fields
                .get("args")
                .and_then(Value::as_array)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            ServerConfig::Stdio(
                StdioServerConfig::new(name, command, args).with_env(string_map(fields.get("env"))),
            )
        }
        None => custom(),
    }
}

fn launch_parts(rule: &ToolRule, decl: &ServerDeclaration) -> Option<(String, Vec<String>)> {
    if let Some(package) = decl.package.as_deref() {
        return Some(("npx".to_string(), vec!["-y".to_string(), package.to_string()]));
    }
    let command = command_line(rule, decl)?;
    let mut parts = shlex::split(&command)
        .unwrap_or_else(|| command.split_whitespace().map(str::to_string).collect());
    if parts.is_empty() {
        return None;
    }
    let program = parts.remove(0);
    let args = decl.args.clone().unwrap_or(parts);
    Some((program, args))
}

fn command_line(rule: &ToolRule, decl: &ServerDeclaration) -> Option<String> {
    let command = decl.command.as_deref()?;
    Some(match decl.codex_extra.as_deref() {
        Some(extra) if rule.codex_extra && !extra.is_empty() => format!("{} {}", command, extra),
        _ => command.to_string(),
    })
}

fn command_string_entry(rule: &ToolRule, decl: &ServerDeclaration) -> Option<Value> {
    let command = match decl.package.as_deref() {
        Some(package) => format!("npx -y {}", package),
        None => command_line(rule, decl)?,
    };
    Some(json!({ "command": command }))
}

fn remote_entry(url: &str, headers: &BTreeMap<String, String>) -> Value {
    let mut entry = Map::new();
    entry.insert("type".to_string(), json!("http"));
    entry.insert("url".to_string(), json!(url));
    if !headers.is_empty() {
        entry.insert("headers".to_string(), json!(headers));
    }
    Value::Object(entry)
}

fn stdio_entry(stdio: &StdioServerConfig) -> Value {
    let mut entry = Map::new();
    entry.insert("type".to_string(), json!("stdio"));
    entry.insert("command".to_string(), json!(stdio.command));
    entry.insert("args".to_string(), json!(stdio.args));
    if !stdio.env.is_empty() {
        entry.insert("env".to_string(), json!(stdio.env));
    }
    Value::Object(entry)
}

fn copilot_entry(command: &str, args: &[String], env: &BTreeMap<String, String>) -> Value {
    let mut entry = Map::new();
    entry.insert("type".to_string(), json!("local"));
    entry.insert("command".to_string(), json!(command));
    entry.insert("args".to_string(), json!(args));
    entry.insert("tools".to_string(), json!(["*"]));
    if !env.is_empty() {
        entry.insert("env".to_string(), json!(env));
    }
    Value::Object(entry)
}

pub(crate) fn joined_command(stdio: &StdioServerConfig) -> String {
    let words = std::iter::once(stdio.command.as_str()).chain(stdio.args.iter().map(String::as_str));
    shlex::try_join(words).unwrap_or_else(|_| {
        std::iter::once(stdio.command.clone())
            .chain(stdio.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    })
}

fn with_disabled_flag(rule: &ToolRule, mut entry: Value) -> Value {
    if rule.disabled_flag
        && let Value::Object(fields) = &mut entry
    {
        fields.insert("disabled".to_string(), json!(false));
    }
    entry
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|fields| {
            fields
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|text| (key.clone(), text.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::rules::rule_for;

    fn rule(id: &str) -> &'static ToolRule {
        rule_for(id).expect("known tool")
    }

    // ===========================================
    // Declaration Tests
    // ===========================================

    #[test]
    fn package_declaration_for_claude_gets_tls_env() {
        let decl = ServerDeclaration::package("@modelcontextprotocol/server-memory");
        let entry = entry_from_declaration(rule("claude"), &decl).unwrap();
        assert_eq!(
            entry,
            json!({
                "type": "stdio",
                "command": "npx",
                "args": ["-y", "@modelcontextprotocol/server-memory"],
                "env": {"NODE_TLS_REJECT_UNAUTHORIZED": "0"}
            })
        );
    }

    #[test]
    fn command_declaration_is_split_and_codex_extra_applied() {
        let mut decl = ServerDeclaration::command("uvx mcp-server-fetch");
        decl.codex_extra = Some("--ignore-robots-txt".to_string());

        let codex = entry_from_declaration(rule("codex"), &decl).unwrap();
        assert_eq!(codex["command"], json!("uvx"));
        assert_eq!(codex["args"], json!(["mcp-server-fetch", "--ignore-robots-txt"]));

        let gemini = entry_from_declaration(rule("gemini"), &decl).unwrap();
        assert_eq!(gemini["args"], json!(["mcp-server-fetch"]));
        assert_eq!(gemini["env"], json!({}));
    }

    #[test]
    fn explicit_args_override_split_args() {
        let mut decl = ServerDeclaration::command("node server.js --flag");
        decl.args = Some(vec!["other.js".to_string()]);
        let entry = entry_from_declaration(rule("qwen"), &decl).unwrap();
        assert_eq!(entry["command"], json!("node"));
        assert_eq!(entry["args"], json!(["other.js"]));
    }

    #[test]
    fn quoted_command_is_split_like_a_shell() {
        let decl = ServerDeclaration::command("python -m server --name 'my server'");
        let entry = entry_from_declaration(rule("iflow"), &decl).unwrap();
        assert_eq!(entry["args"], json!(["-m", "server", "--name", "my server"]));
    }

    #[test]
    fn codebuddy_uses_single_command_string() {
        let entry =
            entry_from_declaration(rule("codebuddy"), &ServerDeclaration::package("pkg")).unwrap();
        assert_eq!(entry, json!({"command": "npx -y pkg"}));
    }

    #[test]
    fn copilot_entry_is_local_with_all_tools() {
        let entry =
            entry_from_declaration(rule("copilot"), &ServerDeclaration::package("pkg")).unwrap();
        assert_eq!(
            entry,
            json!({"type": "local", "command": "npx", "args": ["-y", "pkg"], "tools": ["*"]})
        );
    }

    #[test]
    fn droid_entry_is_enabled() {
        let entry =
            entry_from_declaration(rule("droid"), &ServerDeclaration::package("pkg")).unwrap();
        assert_eq!(entry["disabled"], json!(false));
    }

    #[test]
    fn url_declaration_is_remote() {
        let decl = ServerDeclaration {
            url: Some("https://mcp.example.com".to_string()),
            ..Default::default()
        };
        assert_eq!(
            entry_from_declaration(rule("claude"), &decl).unwrap(),
            json!({"type": "http", "url": "https://mcp.example.com"})
        );
    }

    #[test]
    fn empty_declaration_has_no_entry() {
        assert!(entry_from_declaration(rule("claude"), &ServerDeclaration::default()).is_none());
    }

    // ===========================================
    // Server Config Tests
    // ===========================================

    #[test]
    fn stdio_config_omits_empty_env() {
        let config = ServerConfig::Stdio(StdioServerConfig::new(
            "memory",
            "npx",
            vec!["-y".to_string(), "pkg".to_string()],
        ));
        assert_eq!(
            entry_from_config(rule("gemini"), &config),
            json!({"type": "stdio", "command": "npx", "args": ["-y", "pkg"]})
        );
    }

    #[test]
    fn remote_config_includes_headers_when_present() {
        let config = ServerConfig::Remote(RemoteServerConfig {
            name: "api".to_string(),
            url: "https://mcp.example.com".to_string(),
            headers: BTreeMap::from([("X-Key".to_string(), "k".to_string())]),
        });
        assert_eq!(
            entry_from_config(rule("claude"), &config),
            json!({"type": "http", "url": "https://mcp.example.com", "headers": {"X-Key": "k"}})
        );
    }

    #[test]
    fn command_string_config_quotes_arguments() {
        let config = ServerConfig::Stdio(StdioServerConfig::new(
            "s",
            "node",
            vec!["my server.js".to_string()],
        ));
        assert_eq!(
            entry_from_config(rule("codebuddy"), &config),
            json!({"command": "node 'my server.js'"})
        );
    }

    #[test]
    fn entry_reads_back_as_config() {
        let entry = json!({"type": "stdio", "command": "npx", "args": ["-y", "pkg"], "env": {"A": "1"}});
        match config_from_entry("m", &entry) {
            ServerConfig::Stdio(stdio) => {
                assert_eq!(stdio.command, "npx");
                assert_eq!(stdio.env["A"], "1");
            }
            other => panic!("unexpected config: {other:?}"),
        }
        assert!(matches!(
            config_from_entry("r", &json!({"url": "https://x"})),
            ServerConfig::Remote(_)
        ));
        assert!(matches!(
            config_from_entry("c", &json!({"disabled": true})),
            ServerConfig::Custom(_)
        ));
    }
}
