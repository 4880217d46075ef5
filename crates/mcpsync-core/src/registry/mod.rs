//! Local server registry.
//!
//! Stores one [`ServerSchema`] per JSON file under `<registry_dir>/servers/`.
//! Corrupt files are logged and skipped rather than failing the whole registry.

pub mod schema;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::{ArgumentSpec, InstallationMethod, OrderedMap, ServerSchema};

const SERVERS_DIR: &str = "servers";

/// File-backed store of server schemas.
#[derive(Debug, Clone)]
pub struct LocalRegistry {
    root: PathBuf,
}

impl LocalRegistry {
    /// Open a registry rooted at `root`, creating its directories.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let registry = Self { root: root.into() };
        registry.ensure_dirs()?;
        Ok(registry)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn servers_dir(&self) -> PathBuf {
        self.root.join(SERVERS_DIR)
    }

    /// File for `name`, refusing names that would leave `servers/`.
    fn schema_path(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.servers_dir().join(format!("{}.json", name)))
    }

    fn ensure_dirs(&self) -> Result<()> {
        let dir = self.servers_dir();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create registry directory: {}", dir.display()))
    }

    /// Write a schema. Fails when it already exists unless `force` is set.
    pub fn add(&self, schema: &ServerSchema, force: bool) -> Result<()> {
        let path = self.schema_path(&schema.name)?;
        if path.exists() && !force {
            anyhow::bail!(
                "Server schema '{}' already exists. Use --force to overwrite.",
                schema.name
            );
        }
        self.ensure_dirs()?;
        let mut content =
            serde_json::to_string_pretty(schema).context("Failed to serialize server schema")?;
        content.push('\n');
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write server schema: {}", path.display()))?;
        tracing::info!("Saved server schema '{}'", schema.name);
        Ok(())
    }

    /// Look up a schema; a missing or corrupt file yields `None`.
    pub fn get(&self, name: &str) -> Option<ServerSchema> {
        let path = match self.schema_path(name) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!("{:#}", err);
                return None;
            }
        };
        if !path.is_file() {
            return None;
        }
        read_schema(&path)
    }

    /// All readable schemas, sorted by name.
    pub fn list(&self) -> Result<Vec<ServerSchema>> {
        let dir = self.servers_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read registry directory: {}", dir.display()));
            }
        };

        let mut schemas: Vec<ServerSchema> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| read_schema(&path))
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schemas)
    }

    /// Delete a schema file. Fails when it does not exist.
    pub fn remove(&self, name: &str) -> Result<()> {
        let path = self.schema_path(name)?;
        if !path.is_file() {
            anyhow::bail!("Server schema '{}' not found", name);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to remove server schema: {}", path.display()))?;
        tracing::info!("Removed server schema '{}'", name);
        Ok(())
    }

    /// Schemas matching `query`; an empty query returns everything.
    pub fn search(&self, query: &str) -> Result<Vec<ServerSchema>> {
        let all = self.list()?;
        if query.trim().is_empty() {
            return Ok(all);
        }
        Ok(all.into_iter().filter(|schema| schema.matches(query)).collect())
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Server schema has an empty name");
    }
    if name.contains(['/', '\\', '\0']) || name.contains("..") {
        anyhow::bail!("Invalid server name '{}'", name.escape_default());
    }
    Ok(())
}

fn read_schema(path: &Path) -> Option<ServerSchema> {
    let parsed = std::fs::read_to_string(path)
        .map_err(anyhow::Error::from)
        .and_then(|content| serde_json::from_str::<ServerSchema>(&content).map_err(Into::into));
    match parsed {
        Ok(schema) => Some(schema),
        Err(err) => {
            tracing::warn!("Skipping unreadable server schema {}: {}", path.display(), err);
            None
        }
    }
}
