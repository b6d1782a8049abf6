//! The generic struct walker: maps untyped documents onto registered types.
//!
//! For every declared field of the target struct the walker looks up the
//! field's document name in the input map and then, in order of precedence:
//!
//! 1. hands the value to the named **factory** (`factory=`), which owns the
//!    whole field;
//! 2. expands a bare string into `{<sub>: string}` (`string=`), for the field
//!    itself or for every entry of a map of structs;
//! 3. globs and loads other documents (`loadable`) when the value is a
//!    string pattern;
//! 4. checks the value against an allowed set (`enum=`);
//! 5. requires at least one of a set of keys (`keys=`);
//! 6. resolves a filesystem path relative to the current document (`path`);
//! 7. assigns the value structurally.
//!
//! A field that is absent (or `null`) takes its `default=` directive, or the
//! zero value when it has none.
//!
//! The first error aborts the walk. It is wrapped once, at the deepest point
//! reached, with the current document path and the [`Location`] string.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::error::RigfileError;
use crate::factory::Factories;
use crate::loader::{Fs, Loader};
use crate::location::Location;
use crate::schema::{MapNode, Node, NodeMut, ScalarMut, SliceNode, StructNode};
use crate::tag::{self, Directives};

/// Structural nesting limit.
pub const MAX_DEPTH: usize = 128;

pub struct Walker<'a> {
    loader: &'a dyn Loader,
    fs: &'a dyn Fs,
    factories: &'a Factories,
    location: Location,
    path: PathBuf,
    strict: bool,
    depth: usize,
}

impl<'a> Walker<'a> {
    pub fn new(loader: &'a dyn Loader, fs: &'a dyn Fs, factories: &'a Factories) -> Self {
        Self {
            loader,
            fs,
            factories,
            location: Location::new(),
            path: PathBuf::new(),
            strict: false,
            depth: 0,
        }
    }

    /// Reject input keys that match no field.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn location_mut(&mut self) -> &mut Location {
        &mut self.location
    }

    /// Path of the document currently being walked.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Populate `target` from the top-level document `data` read from `path`.
    pub fn parse_config(
        &mut self,
        data: &Value,
        target: &mut dyn StructNode,
        path: &Path,
    ) -> Result<(), RigfileError> {
        self.path = path.to_path_buf();
        self.location = Location::new();
        self.depth = 0;
        let map = data
            .as_object()
            .ok_or_else(|| self.locate(RigfileError::ExpectedMap(value_kind(data))))?;
        debug!(path = %path.display(), "parsing config");
        self.assign_struct(map, target)
    }

    /// Walk every field of `target`, embedded parents included, against `data`.
    pub fn parse_struct(
        &mut self,
        data: &Map<String, Value>,
        target: &mut dyn StructNode,
    ) -> Result<(), RigfileError> {
        if self.strict {
            self.check_unknown_keys(data, target)?;
        }
        self.parse_fields(data, target)
    }

    fn parse_fields(
        &mut self,
        data: &Map<String, Value>,
        target: &mut dyn StructNode,
    ) -> Result<(), RigfileError> {
        let owner = target.struct_name();
        for field in target.fields() {
            let params = tag::parse_tag(field.tag).map_err(|e| self.locate(e))?;
            let name = params.name().unwrap_or(field.ident);
            self.location.set_field(name);
            trace!(location = %self.location, "walking field");

            let slot = target
                .field_mut(field.ident)
                .ok_or_else(|| RigfileError::MissingField {
                    owner,
                    field: field.ident.to_string(),
                })
                .map_err(|e| self.locate(e))?;
            let result = match data.get(name) {
                Some(value) if !value.is_null() => self.parse_field(value, slot, &params),
                _ => match params.default_value() {
                    Some(raw) => assign_default(slot, raw),
                    None => {
                        slot.reset();
                        Ok(())
                    }
                },
            };
            result.map_err(|e| self.locate(e))?;
        }
        if let Some(parent) = target.embedded_mut() {
            self.parse_fields(data, parent)?;
        }
        Ok(())
    }

    fn check_unknown_keys(
        &mut self,
        data: &Map<String, Value>,
        target: &mut dyn StructNode,
    ) -> Result<(), RigfileError> {
        let mut known = Vec::new();
        collect_field_names(target, &mut known).map_err(|e| self.locate(e))?;
        if let Some(key) = data.keys().find(|k| !known.contains(*k)) {
            self.location.set_field(key);
            return Err(self.locate(RigfileError::UnknownKey(key.clone())));
        }
        Ok(())
    }

    /// Populate one field according to its directives.
    pub fn parse_field(
        &mut self,
        data: &Value,
        target: &mut dyn Node,
        params: &Directives,
    ) -> Result<(), RigfileError> {
        if let Some(name) = params.factory() {
            let factory = self
                .factories
                .get(name)
                .ok_or_else(|| RigfileError::FactoryNotFound(name.to_string()))?;
            return self.descend(|w| factory(w, data, target));
        }

        if let Some(sub) = params.string() {
            match data {
                Value::String(text) => {
                    if let NodeMut::Struct(st) = target.node_mut() {
                        let shorthand = Map::from_iter([(sub.to_string(), Value::String(text.clone()))]);
                        return self.assign_struct(&shorthand, st);
                    }
                }
                Value::Object(entries) if is_map_of_structs(target) => {
                    let expanded = entries
                        .iter()
                        .map(|(key, value)| {
                            let value = match value {
                                Value::String(text) => Value::Object(Map::from_iter([(
                                    sub.to_string(),
                                    Value::String(text.clone()),
                                )])),
                                other => other.clone(),
                            };
                            (key.clone(), value)
                        })
                        .collect();
                    return self.parse_value(&Value::Object(expanded), target, params);
                }
                _ => {}
            }
        }

        self.parse_value(data, target, params)
    }

    fn parse_value(
        &mut self,
        data: &Value,
        target: &mut dyn Node,
        params: &Directives,
    ) -> Result<(), RigfileError> {
        if params.is_loadable()
            && let Value::String(pattern) = data
        {
            return self.assign_loaded(pattern, target);
        }

        if let Some(allowed) = params.enum_values() {
            let value = data.as_str().ok_or_else(|| mismatch("string", data))?;
            if !allowed.contains(&value) {
                return Err(RigfileError::InvalidEnumValue {
                    value: value.to_string(),
                    allowed: allowed.iter().map(|v| v.to_string()).collect(),
                });
            }
        }

        if let Some(keys) = params.keys() {
            let map = data.as_object().ok_or_else(|| mismatch("map", data))?;
            if !keys.iter().any(|key| map.contains_key(*key)) {
                return Err(RigfileError::MissingKeys {
                    keys: keys.iter().map(|k| k.to_string()).collect(),
                });
            }
        }

        if params.is_path() {
            let raw = data.as_str().ok_or_else(|| mismatch("string", data))?;
            let resolved = self.resolve_path(raw)?;
            return match target.node_mut() {
                NodeMut::Scalar(ScalarMut::String(slot)) => {
                    *slot = resolved;
                    Ok(())
                }
                other => Err(RigfileError::TypeMismatch {
                    expected: other.kind(),
                    found: "string",
                }),
            };
        }

        self.assign(data, target)
    }

    /// Assign `data` to `target` by shape alone, ignoring directives of the
    /// target itself. Struct targets still honor their own field directives.
    pub fn assign(&mut self, data: &Value, target: &mut dyn Node) -> Result<(), RigfileError> {
        self.descend(|w| {
            if data.is_null() {
                target.reset();
                return Ok(());
            }
            match target.node_mut() {
                NodeMut::Struct(st) => match data {
                    Value::Object(map) => w.assign_struct(map, st),
                    other => Err(mismatch("map", other)),
                },
                NodeMut::Map(map) => w.assign_map(data, map),
                NodeMut::Slice(slice) => w.assign_slice(data, slice),
                NodeMut::Scalar(scalar) => assign_scalar(data, scalar),
            }
        })
    }

    /// Run `f` one nesting level deeper. Structural assignment and factory
    /// dispatch both count, so recursion through factories is bounded too.
    pub(crate) fn descend<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, RigfileError>,
    ) -> Result<R, RigfileError> {
        if self.depth >= MAX_DEPTH {
            return Err(RigfileError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn assign_struct(
        &mut self,
        data: &Map<String, Value>,
        target: &mut dyn StructNode,
    ) -> Result<(), RigfileError> {
        self.location.start_object();
        self.parse_struct(data, target)?;
        self.location.end_object();
        Ok(())
    }

    fn assign_map(&mut self, data: &Value, target: &mut dyn MapNode) -> Result<(), RigfileError> {
        let entries = data.as_object().ok_or_else(|| mismatch("map", data))?;
        target.clear_entries();
        self.location.start_object();
        for (key, value) in entries {
            self.location.set_field(key);
            let slot = target.entry_or_default(key);
            self.assign(value, slot)?;
        }
        self.location.end_object();
        Ok(())
    }

    fn assign_slice(
        &mut self,
        data: &Value,
        target: &mut dyn SliceNode,
    ) -> Result<(), RigfileError> {
        let items = data.as_array().ok_or_else(|| mismatch("list", data))?;
        target.clear_elements();
        self.location.start_array();
        for (index, item) in items.iter().enumerate() {
            self.location.set_index(index);
            let slot = target.push_default();
            self.assign(item, slot)?;
        }
        self.location.end_array();
        Ok(())
    }

    /// Expand a glob relative to the current document and walk every match
    /// into a list (in path order) or a map (keyed by file stem).
    fn assign_loaded(&mut self, pattern: &str, target: &mut dyn Node) -> Result<(), RigfileError> {
        let docs = self.loader.glob_configs(pattern, &self.base_dir())?;
        debug!(pattern, matched = docs.len(), "loaded documents for field");
        match target.node_mut() {
            NodeMut::Slice(slice) => {
                slice.clear_elements();
                self.location.start_array();
                for (index, doc) in docs.iter().enumerate() {
                    self.location.set_index(index);
                    let slot = slice.push_default();
                    let value = Value::Object(doc.data().clone());
                    self.with_path(doc.path(), |w| w.assign(&value, slot))?;
                }
                self.location.end_array();
            }
            NodeMut::Map(map) => {
                map.clear_entries();
                self.location.start_object();
                for doc in &docs {
                    let key = doc.name();
                    self.location.set_field(&key);
                    let slot = map.entry_or_default(&key);
                    let value = Value::Object(doc.data().clone());
                    self.with_path(doc.path(), |w| w.assign(&value, slot))?;
                }
                self.location.end_object();
            }
            other => return Err(RigfileError::UnsupportedLoadable(other.kind())),
        }
        Ok(())
    }

    /// Run `f` with `path` as the current document. Errors raised inside are
    /// located against `path` before the previous document is restored.
    fn with_path<R>(
        &mut self,
        path: &Path,
        f: impl FnOnce(&mut Self) -> Result<R, RigfileError>,
    ) -> Result<R, RigfileError> {
        let previous = std::mem::replace(&mut self.path, path.to_path_buf());
        let result = f(self).map_err(|e| self.locate(e));
        self.path = previous;
        result
    }

    fn resolve_path(&self, raw: &str) -> Result<String, RigfileError> {
        let candidate = Path::new(raw);
        let resolved = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.base_dir().join(candidate)
        };
        if !self.fs.exists(&resolved) {
            return Err(RigfileError::PathNotFound(resolved));
        }
        Ok(resolved.to_string_lossy().into_owned())
    }

    fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Wrap `err` with the current document path and location, unless it is
    /// already located.
    pub fn locate(&self, err: RigfileError) -> RigfileError {
        match err {
            located @ RigfileError::Located { .. } => located,
            other => RigfileError::Located {
                path: self.path.clone(),
                location: self.location.to_string(),
                source: Box::new(other),
            },
        }
    }
}

fn collect_field_names(
    target: &mut dyn StructNode,
    names: &mut Vec<String>,
) -> Result<(), RigfileError> {
    for field in target.fields() {
        let params = tag::parse_tag(field.tag)?;
        names.push(params.name().unwrap_or(field.ident).to_string());
    }
    if let Some(parent) = target.embedded_mut() {
        collect_field_names(parent, names)?;
    }
    Ok(())
}

fn is_map_of_structs(target: &mut dyn Node) -> bool {
    match target.node_mut() {
        NodeMut::Map(map) => map.value_is_struct(),
        _ => false,
    }
}

fn assign_scalar(data: &Value, scalar: ScalarMut<'_>) -> Result<(), RigfileError> {
    match scalar {
        ScalarMut::Bool(slot) => {
            *slot = data.as_bool().ok_or_else(|| mismatch("bool", data))?;
        }
        ScalarMut::Int(slot) => {
            let kind = slot.kind();
            let value = match data {
                Value::Number(n) => n
                    .as_i64()
                    .map(i128::from)
                    .or_else(|| n.as_u64().map(i128::from)),
                _ => None,
            }
            .ok_or_else(|| mismatch(kind, data))?;
            if !slot.store(value) {
                return Err(RigfileError::Overflow {
                    value: value.to_string(),
                    kind,
                });
            }
        }
        ScalarMut::Float(slot) => {
            let kind = slot.kind();
            let value = data.as_f64().ok_or_else(|| mismatch(kind, data))?;
            if !slot.store(value) {
                return Err(RigfileError::Overflow {
                    value: value.to_string(),
                    kind,
                });
            }
        }
        ScalarMut::String(slot) => {
            *slot = data.as_str().ok_or_else(|| mismatch("string", data))?.to_string();
        }
    }
    Ok(())
}

/// Coerce a `default=` directive. Only integers, booleans and strings have
/// defaults.
fn assign_default(target: &mut dyn Node, raw: &str) -> Result<(), RigfileError> {
    let invalid = |kind: &'static str, reason: String| RigfileError::InvalidDefault {
        value: raw.to_string(),
        kind,
        reason,
    };
    match target.node_mut() {
        NodeMut::Scalar(ScalarMut::Bool(slot)) => {
            *slot = raw
                .parse()
                .map_err(|e: std::str::ParseBoolError| invalid("bool", e.to_string()))?;
        }
        NodeMut::Scalar(ScalarMut::Int(slot)) => {
            let kind = slot.kind();
            let value: i128 = raw
                .parse()
                .map_err(|e: std::num::ParseIntError| invalid(kind, e.to_string()))?;
            if !slot.store(value) {
                return Err(invalid(kind, "out of range".to_string()));
            }
        }
        NodeMut::Scalar(ScalarMut::String(slot)) => *slot = raw.to_string(),
        other => return Err(RigfileError::UnsupportedDefault(other.kind())),
    }
    Ok(())
}

/// Type name of an untyped value, as used in diagnostics.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

pub(crate) fn mismatch(expected: &'static str, found: &Value) -> RigfileError {
    RigfileError::TypeMismatch {
        expected,
        found: value_kind(found),
    }
}
