//! Server container detection and editing.
//!
//! Client files nest server entries under one of several keys, or put them
//! directly at the top level. Lookups and removals consider every shape at
//! once; additions go into the single preferred container.

use serde_json::{Map, Value};

use crate::config::hash::hash_json;

/// Known container keys in detection priority order.
pub const CONTAINER_KEYS: [&str; 4] = ["mcpServers", "servers", "mcp_servers", "mcp"];

/// Top-level keys that are never server entries.
const RESERVED_KEYS: [&str; 2] = ["$schema", "version"];

/// Fields that mark an object as a server entry.
const SERVER_MARKERS: [&str; 3] = ["type", "command", "url"];

/// Where server entries live inside a config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Container {
    /// Entries live under a named key such as `mcpServers`.
    Key(String),
    /// Entries are top-level keys of the file.
    Direct,
}

impl Container {
    pub fn key(key: &str) -> Self {
        Container::Key(key.to_string())
    }
}

/// Outcome of adding a server entry to a config map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddResult {
    /// The entry was inserted.
    Added,
    /// An identical entry already exists; nothing changed.
    Unchanged,
    /// A different entry with the same name exists; nothing changed.
    Conflict,
}

/// The container a file already uses, if any.
pub fn existing_container(map: &Map<String, Value>) -> Option<Container> {
    for key in CONTAINER_KEYS {
        if matches!(map.get(key), Some(Value::Object(_))) {
            return Some(Container::key(key));
        }
    }
    let has_direct = map
        .iter()
        .any(|(key, value)| !is_reserved(key) && looks_like_server(value));
    has_direct.then_some(Container::Direct)
}

/// The container new entries should go into, defaulting to `mcpServers`.
pub fn container_key_for(map: &Map<String, Value>) -> Container {
    existing_container(map).unwrap_or_else(|| Container::key(CONTAINER_KEYS[0]))
}

/// Whether `name` is registered under any container or as a direct entry.
pub fn server_exists(map: &Map<String, Value>, name: &str) -> bool {
    find_entry(map, name).is_some()
}

/// Remove `name` from every container and from the direct shape.
///
/// Returns `true` if at least one entry was removed.
pub fn remove_server(map: &mut Map<String, Value>, name: &str) -> bool {
    let mut removed = false;
    for key in CONTAINER_KEYS {
        if let Some(Value::Object(servers)) = map.get_mut(key) {
            removed |= servers.remove(name).is_some();
        }
    }
    if direct_entry(map, name).is_some() {
        map.remove(name);
        removed = true;
    }
    removed
}

/// Add `entry` under `name`.
///
/// `fixed_key` pins the container for clients with a documented key; otherwise
/// the file's existing container is used, or `default_key` for a file that has
/// none yet.
pub fn add_server(
    map: &mut Map<String, Value>,
    name: &str,
    entry: Value,
    fixed_key: Option<&str>,
    default_key: &str,
) -> AddResult {
    if let Some(existing) = find_entry(map, name) {
        return if hash_json(existing) == hash_json(&entry) {
            AddResult::Unchanged
        } else {
            AddResult::Conflict
        };
    }

    let container = match fixed_key {
        Some(key) => Container::key(key),
        None => existing_container(map).unwrap_or_else(|| Container::key(default_key)),
    };

    match container {
        Container::Direct => {
            map.insert(name.to_string(), entry);
        }
        Container::Key(key) => {
            let slot = map
                .entry(key)
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(servers) = slot {
                servers.insert(name.to_string(), entry);
            }
        }
    }
    AddResult::Added
}

/// Server entries visible through the file's preferred container.
pub fn servers_in(map: &Map<String, Value>) -> Map<String, Value> {
    match existing_container(map) {
        Some(Container::Key(key)) => match map.get(&key) {
            Some(Value::Object(servers)) => servers.clone(),
            _ => Map::new(),
        },
        Some(Container::Direct) => map
            .iter()
            .filter(|(key, value)| !is_reserved(key) && looks_like_server(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        None => Map::new(),
    }
}

fn find_entry<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    for key in CONTAINER_KEYS {
        if let Some(Value::Object(servers)) = map.get(key)
            && let Some(entry) = servers.get(name)
        {
            return Some(entry);
        }
    }
    direct_entry(map, name)
}

/// A top-level entry only counts when it carries a server marker, so
/// sections like Claude's `projects` are never mistaken for servers.
fn direct_entry<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    if is_reserved(name) {
        return None;
    }
    map.get(name).filter(|value| looks_like_server(value))
}

fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key) || CONTAINER_KEYS.contains(&key)
}

fn looks_like_server(value: &Value) -> bool {
    match value {
        Value::Object(fields) => SERVER_MARKERS.iter().any(|marker| fields.contains_key(*marker)),
        _ => false,
    }
}
