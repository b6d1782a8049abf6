//! Field directive parsing.
//!
//! Every schema field carries a tag string of the form
//! `name[,key[=value]]*`. The first segment is the field's document name
//! unless it contains `=`. A bare `key` means `key=true`.
//!
//! ```text
//! "timeout,default=600000"      → name=timeout, default=600000
//! "servers,loadable"            → name=servers, loadable=true
//! "sandbox,enum=local|docker"   → name=sandbox, enum=local|docker
//! ```
//!
//! Unknown keys are schema bugs and fail the parse outright.

use std::collections::BTreeMap;

use crate::error::RigfileError;

/// Recognized directive keys.
pub const DIRECTIVES: &[&str] = &[
    "name", "default", "factory", "enum", "keys", "loadable", "path", "string",
];

/// The validated directive set of one field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    params: BTreeMap<String, String>,
}

/// Parse a raw tag string into its directives.
pub fn parse_tag(tag: &str) -> Result<Directives, RigfileError> {
    let mut params = BTreeMap::new();
    for (i, segment) in tag.split(',').enumerate() {
        if i == 0 && !segment.contains('=') {
            if !segment.is_empty() {
                params.insert("name".to_string(), segment.to_string());
            }
            continue;
        }
        let (key, value) = segment.split_once('=').unwrap_or((segment, "true"));
        if !DIRECTIVES.contains(&key) {
            return Err(RigfileError::InvalidParameterKey(key.to_string()));
        }
        params.insert(key.to_string(), value.to_string());
    }
    Ok(Directives { params })
}

impl Directives {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get("name")
    }

    pub fn default_value(&self) -> Option<&str> {
        self.get("default")
    }

    pub fn factory(&self) -> Option<&str> {
        self.get("factory")
    }

    /// Sub-field that a bare string is redirected into.
    pub fn string(&self) -> Option<&str> {
        self.get("string")
    }

    pub fn enum_values(&self) -> Option<Vec<&str>> {
        self.get("enum").map(|v| v.split('|').collect())
    }

    pub fn keys(&self) -> Option<Vec<&str>> {
        self.get("keys").map(|v| v.split('|').collect())
    }

    pub fn is_loadable(&self) -> bool {
        self.get("loadable") == Some("true")
    }

    pub fn is_path(&self) -> bool {
        self.get("path") == Some("true")
    }
}
