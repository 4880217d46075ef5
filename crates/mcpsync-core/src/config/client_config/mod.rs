//! Client configuration file access.
//!
//! This module reads and writes third-party client configuration files
//! (e.g. `~/.claude.json`, `~/.codex/config.toml`) in either JSON or TOML.
//! All formats normalize to `serde_json::Map<String, Value>` so the container
//! logic in [`container`] works the same for every client.

pub mod container;
mod json;
mod toml;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use crate::error::McpError;

pub use container::{
    AddResult, CONTAINER_KEYS, Container, add_server, container_key_for, existing_container,
    remove_server, server_exists, servers_in,
};
pub use json::JsonSerializer;
pub use toml::TomlSerializer;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `.toml` is JSON.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Json,
        }
    }

    /// Container key used when a file has no server container yet.
    pub fn default_container(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "mcpServers",
            ConfigFormat::Toml => "mcp_servers",
        }
    }
}

/// Trait for serializing/deserializing client configuration files.
///
/// All implementations normalize to `serde_json::Map<String, Value>` as the
/// intermediate representation.
pub trait ConfigSerializer: Send + Sync {
    /// Parse file content into a JSON-compatible map.
    fn parse(&self, content: &str) -> Result<Map<String, Value>>;

    /// Render a JSON-compatible map into file content.
    fn render(&self, map: &Map<String, Value>) -> Result<String>;

    /// Get the format this serializer handles.
    fn format(&self) -> ConfigFormat;
}

/// Create a serializer for the given format.
pub fn serializer_for_format(format: ConfigFormat) -> Box<dyn ConfigSerializer> {
    match format {
        ConfigFormat::Json => Box::new(JsonSerializer),
        ConfigFormat::Toml => Box::new(TomlSerializer),
    }
}

/// State of a config file on disk.
#[derive(Debug)]
pub enum LoadedConfig {
    /// The file does not exist; callers treat this as an empty config.
    Missing,
    /// The file parsed successfully.
    Parsed(Map<String, Value>),
    /// The file exists but cannot be parsed. It must not be overwritten.
    Malformed(McpError),
}

impl LoadedConfig {
    /// Contents to edit, or `None` when the file must be left alone.
    pub fn into_editable(self) -> Option<Map<String, Value>> {
        match self {
            LoadedConfig::Missing => Some(Map::new()),
            LoadedConfig::Parsed(map) => Some(map),
            LoadedConfig::Malformed(_) => None,
        }
    }
}

/// Load a config file, choosing the format from its extension.
///
/// I/O failures other than "not found" are returned as errors; parse failures
/// are reported as [`LoadedConfig::Malformed`].
pub fn load_config(path: &Path) -> Result<LoadedConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LoadedConfig::Missing);
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Failed to read config file: {}", path.display()));
        }
    };

    let serializer = serializer_for_format(ConfigFormat::for_path(path));
    match serializer.parse(&content) {
        Ok(map) => Ok(LoadedConfig::Parsed(map)),
        Err(err) => {
            let error = McpError::malformed(path, format!("{err:#}"));
            tracing::warn!("{}", error);
            Ok(LoadedConfig::Malformed(error))
        }
    }
}

/// Save a config file, choosing the format from its extension.
///
/// Creates parent directories, writes a sibling temp file and renames it over
/// the target so an interrupted write never leaves a truncated config.
pub fn save_config(path: &Path, map: &Map<String, Value>) -> Result<()> {
    let serializer = serializer_for_format(ConfigFormat::for_path(path));
    let content = serializer.render(map)?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    let temp_path = temp_path_for(path);
    std::fs::write(&temp_path, content)
        .with_context(|| format!("Failed to write config file: {}", temp_path.display()))?;
    if let Err(err) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err)
            .with_context(|| format!("Failed to replace config file: {}", path.display()));
    }
    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "config".to_string());
    path.with_file_name(format!(".{}.mcpsync-tmp", file_name))
}
