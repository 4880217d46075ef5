//! TOML side of client config IO (codex `config.toml`).
//!
//! Values JSON cannot carry, datetimes and non-finite floats, are wrapped in
//! a single-key `{"$toml": "<literal>"}` object on parse and written back as
//! native TOML on render. Nulls have no TOML form and are dropped.

use anyhow::{Context, Result};
use serde_json::{Map, Number, Value};
use toml::{Table, Value as Toml};

use super::{ConfigFormat, ConfigSerializer};

/// Key of the object that carries a raw TOML literal through the JSON map.
const TOML_LITERAL_KEY: &str = "$toml";

#[derive(Debug, Default, Clone, Copy)]
pub struct TomlSerializer;

impl ConfigSerializer for TomlSerializer {
    fn parse(&self, content: &str) -> Result<Map<String, Value>> {
        let table: Table = content.parse().context("Failed to parse TOML config")?;
        Ok(table
            .into_iter()
            .map(|(key, value)| (key, to_json(value)))
            .collect())
    }

    fn render(&self, map: &Map<String, Value>) -> Result<String> {
        let table = to_table(map)?;
        toml::to_string_pretty(&table).context("Failed to serialize TOML config")
    }

    fn format(&self) -> ConfigFormat {
        ConfigFormat::Toml
    }
}

fn to_json(value: Toml) -> Value {
    match value {
        Toml::String(text) => Value::String(text),
        Toml::Integer(number) => Value::from(number),
        Toml::Boolean(flag) => Value::Bool(flag),
        Toml::Float(number) => match Number::from_f64(number) {
            Some(number) => Value::Number(number),
            None => literal(Toml::Float(number).to_string()),
        },
        Toml::Datetime(datetime) => literal(datetime.to_string()),
        Toml::Array(items) => items.into_iter().map(to_json).collect(),
        Toml::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, to_json(value)))
                .collect(),
        ),
    }
}

fn literal(text: String) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(TOML_LITERAL_KEY.to_string(), Value::String(text));
    Value::Object(wrapper)
}

fn to_table(map: &Map<String, Value>) -> Result<Table> {
    let mut table = Table::new();
    for (key, value) in map {
        if let Some(value) = to_toml(value).with_context(|| format!("Invalid value for '{}'", key))? {
            table.insert(key.clone(), value);
        }
    }
    Ok(table)
}

/// `None` for nulls, which are skipped by the caller.
fn to_toml(value: &Value) -> Result<Option<Toml>> {
    Ok(Some(match value {
        Value::Null => return Ok(None),
        Value::Bool(flag) => Toml::Boolean(*flag),
        Value::String(text) => Toml::String(text.clone()),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(integer), _) => Toml::Integer(integer),
            (None, Some(float)) => Toml::Float(float),
            _ => anyhow::bail!("{} does not fit a TOML number", number),
        },
        Value::Array(items) => {
            let mut converted = Vec::with_capacity(items.len());
            for item in items {
                converted.extend(to_toml(item)?);
            }
            Toml::Array(converted)
        }
        Value::Object(fields) => match unwrap_literal(fields) {
            Some(text) => parse_literal(text)?,
            None => Toml::Table(to_table(fields)?),
        },
    }))
}

fn unwrap_literal(fields: &Map<String, Value>) -> Option<&str> {
    if fields.len() != 1 {
        return None;
    }
    fields.get(TOML_LITERAL_KEY).and_then(Value::as_str)
}

fn parse_literal(text: &str) -> Result<Toml> {
    let mut holder: Table = format!("v = {}", text)
        .parse()
        .with_context(|| format!("Invalid TOML literal: {}", text))?;
    holder
        .remove("v")
        .with_context(|| format!("Invalid TOML literal: {}", text))
}
