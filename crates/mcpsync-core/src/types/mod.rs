//! Shared core types used across client adapters and commands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where a registration lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// User-global configuration under the home directory.
    #[default]
    User,
    /// Project-local configuration under the project root.
    Project,
    /// Every location the client knows about (read paths only).
    All,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Project => "project",
            Scope::All => "all",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" | "global" | "u" => Ok(Scope::User),
            "project" | "p" => Ok(Scope::Project),
            "all" => Ok(Scope::All),
            _ => anyhow::bail!("Invalid scope: '{}'. Use 'user', 'project' or 'all'", s),
        }
    }
}
