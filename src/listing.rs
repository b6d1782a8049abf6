//! Leaf listing of a compiled config.
//!
//! Every scalar leaf is reported under the same path syntax the overwrite
//! engine accepts (`servers[0].parameters.memory_limit`), so a listed path can
//! be fed straight back as an overwrite.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::RigfileError;

/// All scalar leaves of a config as `(path, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigListing {
    pub entries: Vec<(String, String)>,
}

impl ConfigListing {
    pub fn get(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == path)
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for ConfigListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{key} = {value}")?;
        }
        Ok(())
    }
}

/// List every scalar leaf of `config`. Empty maps and lists contribute nothing.
pub fn list_leaves<S: Serialize>(config: &S) -> Result<ConfigListing, RigfileError> {
    let value = serde_json::to_value(config)?;
    let mut entries = Vec::new();
    flatten_into("", &value, &mut entries);
    Ok(ConfigListing { entries })
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(&path, child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&format!("{prefix}[{index}]"), child, out);
            }
        }
        Value::String(s) => out.push((prefix.to_string(), s.clone())),
        other => out.push((prefix.to_string(), other.to_string())),
    }
}
