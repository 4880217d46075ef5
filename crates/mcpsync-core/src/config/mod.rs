//! Configuration handling.
//!
//! - [`global`]: the `mcp.json` catalog of servers and tool flag lists
//! - [`client_config`]: reading and editing each tool's own config file
//! - [`hash`]: content hashes used to detect no-op writes

pub mod client_config;
pub mod global;
pub mod hash;

pub use client_config::{
    AddResult, ConfigFormat, LoadedConfig, load_config, save_config, serializer_for_format,
};
pub use global::{
    GLOBAL_CONFIG_DIR_ENV, GLOBAL_CONFIG_FILE, GlobalConfig, GlobalSettings, ServerDeclaration,
    find_global_config, global_config_candidates,
};
pub use hash::{hash_file, hash_json};
