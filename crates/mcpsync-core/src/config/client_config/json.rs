//! JSON serializer for client configuration files.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

use super::{ConfigFormat, ConfigSerializer};

/// JSON configuration file serializer.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl ConfigSerializer for JsonSerializer {
    fn parse(&self, content: &str) -> Result<Map<String, Value>> {
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        let value: Value = serde_json::from_str(content).context("Failed to parse JSON config")?;
        match value {
            Value::Object(map) => Ok(map),
            other => anyhow::bail!("Expected JSON object at root, found {}", kind_of(&other)),
        }
    }

    fn render(&self, map: &Map<String, Value>) -> Result<String> {
        let mut content =
            serde_json::to_string_pretty(map).context("Failed to serialize JSON config")?;
        content.push('\n');
        Ok(content)
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Json
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
