#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use mcpsync_core::client::rules::rule_for;
use mcpsync_core::client::{ClientContext, CommandOutput, CommandRunner, GenericClient};
use mcpsync_core::config::GlobalConfig;
use mcpsync_core::mcp::ServerCatalog;
use tempfile::TempDir;

pub const GLOBAL_CONFIG: &str = r#"{
  "global": {
    "tools_with_scope": ["claude", "gemini", "qwen"],
    "tools_with_tls_flag": ["claude", "codex"],
    "tools_with_cli_separator": ["claude"],
    "all_tools": ["claude", "codex", "gemini", "qwen"]
  },
  "servers": {
    "memory": {"package": "@modelcontextprotocol/server-memory"},
    "fetch": {"command": "uvx mcp-server-fetch", "codex_extra": "--ignore-robots-txt"}
  }
}"#;

/// CLI stand-in: either fails every command or exits zero without doing anything.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    succeed: bool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Exits zero but never touches a config file.
    pub fn silent_success() -> Arc<Self> {
        Arc::new(Self {
            succeed: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, command_line: &str) -> anyhow::Result<CommandOutput> {
        self.calls.lock().unwrap().push(command_line.to_string());
        if self.succeed {
            Ok(CommandOutput::success(""))
        } else {
            Ok(CommandOutput::failure(127, "command not found"))
        }
    }
}

/// Fake home directory and project root.
pub struct Sandbox {
    pub temp: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        std::fs::create_dir_all(temp.path().join("home")).expect("create home");
        std::fs::create_dir_all(temp.path().join("project")).expect("create project");
        Self { temp }
    }

    pub fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    pub fn project(&self) -> PathBuf {
        self.temp.path().join("project")
    }

    pub fn ctx(&self) -> ClientContext {
        ClientContext::new(self.home(), self.project())
    }

    pub fn write(&self, path: &PathBuf, content: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, content).expect("write file");
    }

    pub fn client(&self, id: &str, runner: Arc<ScriptedRunner>) -> GenericClient {
        let rule = rule_for(id).expect("known tool");
        GenericClient::new(rule, self.ctx(), Some(catalog())).with_runner(runner)
    }
}

pub fn global_config() -> GlobalConfig {
    GlobalConfig::parse_str(GLOBAL_CONFIG).expect("parse global config")
}

pub fn catalog() -> Arc<dyn ServerCatalog> {
    Arc::new(global_config())
}

pub fn read_json(path: &PathBuf) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("read config");
    serde_json::from_str(&content).expect("parse config")
}
