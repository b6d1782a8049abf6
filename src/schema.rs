//! Schema description for typed config trees.
//!
//! The walker and the overwrite engine never see concrete config types. They
//! work on a small set of views:
//!
//! - [`Node`] is implemented by every value that can appear in a config tree
//!   and hands out a [`NodeMut`] describing what kind of value it is.
//! - [`StructNode`] lists a struct's fields with their tag strings and gives
//!   mutable access to each one by identifier. A struct may embed a parent
//!   struct whose fields are promoted (a Docker sandbox is a container
//!   sandbox is a local sandbox).
//! - [`MapNode`] and [`SliceNode`] cover `BTreeMap<String, V>` and `Vec<T>`.
//! - [`ScalarMut`] is a settable handle to a leaf.
//!
//! Structs register themselves with [`schema!`]:
//!
//! ```ignore
//! schema! {
//!     ContainerSandbox {
//!         ..local,
//!         image => "image",
//!         registry => "registry",
//!     }
//! }
//! ```
//!
//! Sum types whose variants each wrap one registered struct use
//! [`variants!`]; they present the active variant's struct.

use std::any::Any;
use std::collections::BTreeMap;

use crate::error::RigfileError;

/// One declared struct field: its Rust identifier and its raw tag string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub ident: &'static str,
    pub tag: &'static str,
}

/// Any value that can live in a config tree.
pub trait Node: Any {
    fn node_mut(&mut self) -> NodeMut<'_>;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Reset to the zero value.
    fn reset(&mut self);

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The kind view of a [`Node`].
pub enum NodeMut<'a> {
    Struct(&'a mut dyn StructNode),
    Map(&'a mut dyn MapNode),
    Slice(&'a mut dyn SliceNode),
    Scalar(ScalarMut<'a>),
}

impl NodeMut<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            NodeMut::Struct(_) => "struct",
            NodeMut::Map(_) => "map",
            NodeMut::Slice(_) => "list",
            NodeMut::Scalar(scalar) => scalar.kind(),
        }
    }
}

pub trait StructNode {
    fn struct_name(&self) -> &'static str;

    fn fields(&self) -> &'static [Field];

    fn field_mut(&mut self, ident: &str) -> Option<&mut dyn Node>;

    /// The embedded parent struct, if this struct refines another one.
    fn embedded_mut(&mut self) -> Option<&mut dyn StructNode> {
        None
    }
}

pub trait MapNode {
    fn entry_count(&self) -> usize;

    fn clear_entries(&mut self);

    fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Node>;

    fn entry_or_default(&mut self, key: &str) -> &mut dyn Node;

    /// Run `apply` on the entry under `key`. A missing entry is created from
    /// the zero value and only inserted if `apply` succeeds.
    fn set_entry(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(&mut dyn Node) -> Result<(), RigfileError>,
    ) -> Result<(), RigfileError>;

    fn value_is_struct(&self) -> bool;
}

pub trait SliceNode {
    fn element_count(&self) -> usize;

    fn clear_elements(&mut self);

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Node>;

    fn push_default(&mut self) -> &mut dyn Node;
}

/// A settable scalar leaf.
pub enum ScalarMut<'a> {
    Bool(&'a mut bool),
    Int(IntMut<'a>),
    Float(FloatMut<'a>),
    String(&'a mut String),
}

impl ScalarMut<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            ScalarMut::Bool(_) => "bool",
            ScalarMut::Int(int) => int.kind(),
            ScalarMut::Float(float) => float.kind(),
            ScalarMut::String(_) => "string",
        }
    }
}

pub enum IntMut<'a> {
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
}

impl IntMut<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            IntMut::I8(_) => "i8",
            IntMut::I16(_) => "i16",
            IntMut::I32(_) => "i32",
            IntMut::I64(_) => "i64",
            IntMut::U8(_) => "u8",
            IntMut::U16(_) => "u16",
            IntMut::U32(_) => "u32",
            IntMut::U64(_) => "u64",
        }
    }

    /// Store `value` if it fits the destination width. Returns `false`
    /// without writing anything otherwise.
    pub fn store(self, value: i128) -> bool {
        macro_rules! store {
            ($slot:expr) => {
                match value.try_into() {
                    Ok(v) => {
                        *$slot = v;
                        true
                    }
                    Err(_) => false,
                }
            };
        }
        match self {
            IntMut::I8(slot) => store!(slot),
            IntMut::I16(slot) => store!(slot),
            IntMut::I32(slot) => store!(slot),
            IntMut::I64(slot) => store!(slot),
            IntMut::U8(slot) => store!(slot),
            IntMut::U16(slot) => store!(slot),
            IntMut::U32(slot) => store!(slot),
            IntMut::U64(slot) => store!(slot),
        }
    }
}

pub enum FloatMut<'a> {
    F32(&'a mut f32),
    F64(&'a mut f64),
}

impl FloatMut<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            FloatMut::F32(_) => "f32",
            FloatMut::F64(_) => "f64",
        }
    }

    /// Store `value` if it fits the destination width. Returns `false`
    /// without writing anything otherwise.
    pub fn store(self, value: f64) -> bool {
        match self {
            FloatMut::F32(slot) => {
                if value.is_finite() && value.abs() > f64::from(f32::MAX) {
                    return false;
                }
                *slot = value as f32;
                true
            }
            FloatMut::F64(slot) => {
                *slot = value;
                true
            }
        }
    }
}

macro_rules! scalar_node {
    ($($ty:ty => |$v:ident| $scalar:expr;)*) => {
        $(
            impl Node for $ty {
                fn node_mut(&mut self) -> NodeMut<'_> {
                    let $v = self;
                    NodeMut::Scalar($scalar)
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }

                fn reset(&mut self) {
                    *self = <$ty>::default();
                }
            }
        )*
    };
}

scalar_node! {
    bool => |v| ScalarMut::Bool(v);
    i8 => |v| ScalarMut::Int(IntMut::I8(v));
    i16 => |v| ScalarMut::Int(IntMut::I16(v));
    i32 => |v| ScalarMut::Int(IntMut::I32(v));
    i64 => |v| ScalarMut::Int(IntMut::I64(v));
    u8 => |v| ScalarMut::Int(IntMut::U8(v));
    u16 => |v| ScalarMut::Int(IntMut::U16(v));
    u32 => |v| ScalarMut::Int(IntMut::U32(v));
    u64 => |v| ScalarMut::Int(IntMut::U64(v));
    f32 => |v| ScalarMut::Float(FloatMut::F32(v));
    f64 => |v| ScalarMut::Float(FloatMut::F64(v));
    String => |v| ScalarMut::String(v);
}

impl<V: Node + Default> MapNode for BTreeMap<String, V> {
    fn entry_count(&self) -> usize {
        self.len()
    }

    fn clear_entries(&mut self) {
        self.clear();
    }

    fn entry_mut(&mut self, key: &str) -> Option<&mut dyn Node> {
        self.get_mut(key).map(|v| v as &mut dyn Node)
    }

    fn entry_or_default(&mut self, key: &str) -> &mut dyn Node {
        self.entry(key.to_string()).or_default()
    }

    fn set_entry(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(&mut dyn Node) -> Result<(), RigfileError>,
    ) -> Result<(), RigfileError> {
        if let Some(existing) = self.get_mut(key) {
            return apply(existing);
        }
        let mut value = V::default();
        apply(&mut value)?;
        self.insert(key.to_string(), value);
        Ok(())
    }

    fn value_is_struct(&self) -> bool {
        let mut probe = V::default();
        matches!(probe.node_mut(), NodeMut::Struct(_))
    }
}

impl<V: Node + Default> Node for BTreeMap<String, V> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Map(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: Node + Default> SliceNode for Vec<T> {
    fn element_count(&self) -> usize {
        self.len()
    }

    fn clear_elements(&mut self) {
        self.clear();
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn Node> {
        self.as_mut_slice()
            .get_mut(index)
            .map(|v| v as &mut dyn Node)
    }

    fn push_default(&mut self) -> &mut dyn Node {
        self.push(T::default());
        let last = self.len() - 1;
        &mut self[last]
    }
}

impl<T: Node + Default> Node for Vec<T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Slice(self)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reset(&mut self) {
        self.clear();
    }
}

impl<T: Node + Default> Node for Box<T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        (**self).node_mut()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn reset(&mut self) {
        **self = T::default();
    }
}

/// Register a struct's fields and their tags.
///
/// An optional leading `..field,` names an embedded parent struct whose
/// fields are promoted into this one.
macro_rules! schema {
    (@embedded) => {};
    (@embedded $embed:ident) => {
        fn embedded_mut(&mut self) -> Option<&mut dyn $crate::schema::StructNode> {
            Some(&mut self.$embed)
        }
    };
    ($ty:ident { $(..$embed:ident,)? $($field:ident => $tag:expr),* $(,)? }) => {
        impl $crate::schema::StructNode for $ty {
            fn struct_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn fields(&self) -> &'static [$crate::schema::Field] {
                const FIELDS: &[$crate::schema::Field] = &[
                    $($crate::schema::Field { ident: stringify!($field), tag: $tag },)*
                ];
                FIELDS
            }

            #[allow(unused_variables)]
            fn field_mut(&mut self, ident: &str) -> Option<&mut dyn $crate::schema::Node> {
                match ident {
                    $(stringify!($field) => Some(&mut self.$field as &mut dyn $crate::schema::Node),)*
                    _ => None,
                }
            }

            $crate::schema::schema!(@embedded $($embed)?);
        }

        impl $crate::schema::Node for $ty {
            fn node_mut(&mut self) -> $crate::schema::NodeMut<'_> {
                $crate::schema::NodeMut::Struct(self)
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn reset(&mut self) {
                *self = Self::default();
            }
        }
    };
}

/// Register a sum type whose variants each wrap a [`schema!`] struct.
macro_rules! variants {
    ($ty:ident { $($variant:ident),* $(,)? }) => {
        impl $crate::schema::Node for $ty {
            fn node_mut(&mut self) -> $crate::schema::NodeMut<'_> {
                match self {
                    $($ty::$variant(inner) => $crate::schema::NodeMut::Struct(inner),)*
                }
            }

            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }

            fn reset(&mut self) {
                *self = Self::default();
            }
        }
    };
}

pub(crate) use schema;
pub(crate) use variants;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Numbers, RefinedFixture};

    #[test]
    fn struct_lists_fields_in_declaration_order() {
        let numbers = Numbers::default();
        let idents: Vec<&str> = numbers.fields().iter().map(|f| f.ident).collect();
        assert_eq!(idents, ["small", "count", "ratio", "flag", "label", "grid"]);
    }

    #[test]
    fn field_mut_reaches_the_field() {
        let mut numbers = Numbers::default();
        match numbers.field_mut("small").unwrap().node_mut() {
            NodeMut::Scalar(ScalarMut::Int(int)) => assert!(int.store(-5)),
            _ => panic!("expected int scalar"),
        }
        assert_eq!(numbers.small, -5);
        assert!(numbers.field_mut("missing").is_none());
    }

    #[test]
    fn embedded_parent_is_exposed() {
        let mut refined = RefinedFixture::default();
        let parent = refined.embedded_mut().unwrap();
        assert_eq!(parent.struct_name(), "BaseFixture");
        assert!(parent.field_mut("base_name").is_some());
    }

    #[test]
    fn int_store_checks_width() {
        let mut small = 0i8;
        assert!(IntMut::I8(&mut small).store(127));
        assert!(!IntMut::I8(&mut small).store(128));
        assert_eq!(small, 127);
        let mut unsigned = 0u16;
        assert!(!IntMut::U16(&mut unsigned).store(-1));
        assert_eq!(unsigned, 0);
    }

    #[test]
    fn f32_store_checks_range() {
        let mut ratio = 0f32;
        assert!(FloatMut::F32(&mut ratio).store(1.5));
        assert!(!FloatMut::F32(&mut ratio).store(1e300));
        assert_eq!(ratio, 1.5);
    }

    #[test]
    fn map_set_entry_inserts_only_on_success() {
        let mut map: BTreeMap<String, i32> = BTreeMap::new();
        let err = map.set_entry("a", &mut |_| Err(RigfileError::ObjectOverwrite));
        assert!(err.is_err());
        assert!(map.is_empty());
        map.set_entry("a", &mut |node| match node.node_mut() {
            NodeMut::Scalar(ScalarMut::Int(int)) => {
                int.store(7);
                Ok(())
            }
            _ => Err(RigfileError::ObjectOverwrite),
        })
        .unwrap();
        assert_eq!(map["a"], 7);
    }

    #[test]
    fn map_value_kind_probe() {
        let structs: BTreeMap<String, Numbers> = BTreeMap::new();
        let strings: BTreeMap<String, String> = BTreeMap::new();
        assert!(structs.value_is_struct());
        assert!(!strings.value_is_struct());
    }

    #[test]
    fn slice_push_default_returns_new_element() {
        let mut items: Vec<String> = vec!["a".into()];
        if let NodeMut::Scalar(ScalarMut::String(s)) = items.push_default().node_mut() {
            s.push_str("b");
        }
        assert_eq!(items, ["a", "b"]);
        assert!(items.element_mut(2).is_none());
    }

    #[test]
    fn boxed_node_delegates() {
        let mut boxed: Box<Numbers> = Box::default();
        assert!(matches!(boxed.node_mut(), NodeMut::Struct(_)));
        boxed.small = 3;
        boxed.reset();
        assert_eq!(boxed.small, 0);
    }
}
