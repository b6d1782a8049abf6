//! Path-addressed overwrites of an already compiled config.
//!
//! A path is a dot-separated list of segments, each `name` or `name[index]`:
//!
//! ```text
//! spec.instances[0].actions[2].timeout = 20000
//! sandboxes.docker.image.tag          = 8.3-fpm
//! servers[1].parameters.memory_limit  = 256M
//! ```
//!
//! Struct segments match a field's document name, embedded parents included.
//! List fields must be indexed and nothing else may be. A map entry named by
//! the final segment is created when missing; deeper paths need the entry to
//! exist. Only integer, float and string leaves can be overwritten, and whole
//! objects never can.

use std::collections::HashMap;
use std::num::{IntErrorKind, ParseFloatError, ParseIntError};

use tracing::debug;

use crate::error::RigfileError;
use crate::schema::{MapNode, Node, NodeMut, ScalarMut, SliceNode, StructNode};
use crate::tag::parse_tag;
use crate::types::Config;

/// Apply every overwrite to `config`. Application order follows the map's
/// iteration order and is unspecified, so overlapping paths give undefined
/// results. The first failure stops the run; earlier overwrites stay applied.
pub fn overwrite(config: &mut Config, overwrites: &HashMap<String, String>) -> Result<(), RigfileError> {
    for (path, value) in overwrites {
        debug!(path = path.as_str(), value = value.as_str(), "applying overwrite");
        overwrite_node(config, path, value)?;
    }
    Ok(())
}

/// Set the scalar at `path` below `target` from its string form.
pub fn overwrite_node(
    target: &mut dyn StructNode,
    path: &str,
    value: &str,
) -> Result<(), RigfileError> {
    apply(target, path, value).map_err(|source| RigfileError::Overwrite {
        path: path.to_string(),
        value: value.to_string(),
        source: Box::new(source),
    })
}

fn apply(target: &mut dyn StructNode, path: &str, value: &str) -> Result<(), RigfileError> {
    let segments = if path.is_empty() {
        Vec::new()
    } else {
        path.split('.')
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()?
    };
    overwrite_struct(target, &segments, value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment<'p> {
    name: &'p str,
    index: Option<usize>,
}

impl<'p> Segment<'p> {
    fn parse(raw: &'p str) -> Result<Self, RigfileError> {
        let invalid = || RigfileError::InvalidSegment(raw.to_string());
        let (name, index) = match raw.split_once('[') {
            None => (raw, None),
            Some((name, rest)) => {
                let digits = rest.strip_suffix(']').ok_or_else(invalid)?;
                let index = digits.parse::<usize>().map_err(|_| invalid())?;
                (name, Some(index))
            }
        };
        if name.is_empty() || name.contains(']') {
            return Err(invalid());
        }
        Ok(Self { name, index })
    }
}

fn overwrite_struct(
    target: &mut dyn StructNode,
    segments: &[Segment<'_>],
    value: &str,
) -> Result<(), RigfileError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err(RigfileError::ObjectOverwrite);
    };
    let field = find_field(target, segment.name)?
        .ok_or_else(|| RigfileError::FieldNotFound(segment.name.to_string()))?;
    descend(field, segment, rest, value)
}

/// Field whose document name is `name`, searching embedded parents too.
fn find_field<'t>(
    target: &'t mut dyn StructNode,
    name: &str,
) -> Result<Option<&'t mut dyn Node>, RigfileError> {
    let mut ident = None;
    for field in target.fields() {
        let params = parse_tag(field.tag)?;
        if params.name().unwrap_or(field.ident) == name {
            ident = Some(field.ident);
            break;
        }
    }
    if let Some(ident) = ident {
        return Ok(target.field_mut(ident));
    }
    match target.embedded_mut() {
        Some(parent) => find_field(parent, name),
        None => Ok(None),
    }
}

/// Apply `segment`'s index to `node` if it has one, then continue with `rest`.
fn descend(
    node: &mut dyn Node,
    segment: &Segment<'_>,
    rest: &[Segment<'_>],
    value: &str,
) -> Result<(), RigfileError> {
    match (node.node_mut(), segment.index) {
        (NodeMut::Slice(slice), Some(index)) => overwrite_element(slice, index, rest, value),
        (NodeMut::Slice(_), None) => Err(RigfileError::IndexRequired(segment.name.to_string())),
        (_, Some(_)) => Err(RigfileError::IndexNotAllowed(segment.name.to_string())),
        (node, None) => overwrite_kind(node, rest, value),
    }
}

fn overwrite_kind(
    node: NodeMut<'_>,
    segments: &[Segment<'_>],
    value: &str,
) -> Result<(), RigfileError> {
    match node {
        NodeMut::Struct(st) => overwrite_struct(st, segments, value),
        NodeMut::Map(map) => overwrite_map(map, segments, value),
        NodeMut::Slice(_) => Err(RigfileError::NestedArrays),
        NodeMut::Scalar(scalar) => match segments.first() {
            None => set_scalar(scalar, value),
            Some(segment) => Err(RigfileError::NotNestable {
                kind: scalar.kind(),
                segment: segment.name.to_string(),
            }),
        },
    }
}

fn overwrite_map(
    map: &mut dyn MapNode,
    segments: &[Segment<'_>],
    value: &str,
) -> Result<(), RigfileError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Err(RigfileError::ObjectOverwrite);
    };
    if rest.is_empty() && segment.index.is_none() {
        return map.set_entry(segment.name, &mut |entry| descend(entry, segment, &[], value));
    }
    let entry = map
        .entry_mut(segment.name)
        .ok_or_else(|| RigfileError::KeyNotFound(segment.name.to_string()))?;
    descend(entry, segment, rest, value)
}

fn overwrite_element(
    slice: &mut dyn SliceNode,
    index: usize,
    rest: &[Segment<'_>],
    value: &str,
) -> Result<(), RigfileError> {
    let len = slice.element_count();
    let element = slice
        .element_mut(index)
        .ok_or(RigfileError::IndexOutOfRange { index, len })?;
    overwrite_kind(element.node_mut(), rest, value)
}

fn set_scalar(scalar: ScalarMut<'_>, value: &str) -> Result<(), RigfileError> {
    match scalar {
        ScalarMut::Int(slot) => {
            let kind = slot.kind();
            let parsed: i64 = value.parse().map_err(|e: ParseIntError| match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => RigfileError::Overflow {
                    value: value.to_string(),
                    kind,
                },
                _ => RigfileError::InvalidNumber {
                    value: value.to_string(),
                    kind,
                    reason: e.to_string(),
                },
            })?;
            if !slot.store(i128::from(parsed)) {
                return Err(RigfileError::Overflow {
                    value: value.to_string(),
                    kind,
                });
            }
        }
        ScalarMut::Float(slot) => {
            let kind = slot.kind();
            let parsed: f64 = value
                .parse()
                .map_err(|e: ParseFloatError| RigfileError::InvalidNumber {
                    value: value.to_string(),
                    kind,
                    reason: e.to_string(),
                })?;
            if !slot.store(parsed) {
                return Err(RigfileError::Overflow {
                    value: value.to_string(),
                    kind,
                });
            }
        }
        ScalarMut::String(slot) => *slot = value.to_string(),
        ScalarMut::Bool(_) => return Err(RigfileError::UnsupportedKind("bool")),
    }
    Ok(())
}
