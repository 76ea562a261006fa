//! The recursive, type-directed converter.
//!
//! The converter walks a [`ValueNode`] tree and a [`TypeDescriptor`] tree in
//! lockstep. Each descriptor is classified before its value is looked at, and
//! the pairing of child values to child descriptors is positional only: field
//! name for records, index for tuples, the single element type for lists and
//! sets. The first failure aborts the whole call; the error carries the path
//! from the root to the failing value.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use tracing::trace;

use crate::classify::{classify_with_depth, Shape, DEFAULT_MAX_ALIAS_DEPTH};
use crate::descriptor::{Literal, PrimitiveKind, TypeDescriptor};
use crate::error::{ConversionError, ErrorKind, PathStep};
use crate::instance::Instance;
use crate::schema::{Allocator, FieldSchema, TypeAliasResolver};
use crate::value::{NodeKind, ValueNode};

/// Bounds applied during a single conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Deepest nesting of values accepted below the root.
    pub max_depth: usize,
    /// Longest alias chain followed before it is treated as a cycle.
    pub max_alias_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_alias_depth: DEFAULT_MAX_ALIAS_DEPTH,
        }
    }
}

/// Converts value trees using borrowed collaborators.
///
/// Holds no state between calls, so one converter may serve any number of
/// independent conversions. Converters are cheap to copy; threads sharing a
/// `Sync` registry each build their own.
#[derive(Clone, Copy)]
pub struct Converter<'s> {
    fields: &'s dyn FieldSchema,
    allocator: &'s dyn Allocator,
    aliases: &'s dyn TypeAliasResolver,
    limits: Limits,
}

impl<'s> Converter<'s> {
    /// Use one value as all three collaborators (e.g. a `Registry`).
    pub fn new<C>(collaborators: &'s C) -> Self
    where
        C: FieldSchema + Allocator + TypeAliasResolver,
    {
        Self::from_parts(collaborators, collaborators, collaborators)
    }

    pub fn from_parts(
        fields: &'s dyn FieldSchema,
        allocator: &'s dyn Allocator,
        aliases: &'s dyn TypeAliasResolver,
    ) -> Self {
        Self {
            fields,
            allocator,
            aliases,
            limits: Limits::default(),
        }
    }

    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Convert `node` into an instance shaped like `target`.
    pub fn convert(&self, node: &ValueNode, target: &TypeDescriptor) -> Result<Instance, ConversionError> {
        self.convert_at(node, target, 0)
    }

    fn convert_at(
        &self,
        node: &ValueNode,
        ty: &TypeDescriptor,
        depth: usize,
    ) -> Result<Instance, ConversionError> {
        if depth > self.limits.max_depth {
            return Err(ErrorKind::DepthLimitExceeded(self.limits.max_depth).into());
        }

        let shape = classify_with_depth(ty, self.aliases, self.limits.max_alias_depth)?;
        trace!(shape = %shape.kind(), node = %node.kind(), depth, "convert");

        match shape {
            Shape::Primitive(kind) => convert_primitive(kind, node).map_err(Into::into),
            Shape::Literal(allowed) => convert_literal(allowed, node).map_err(Into::into),
            Shape::List(element) => {
                let items = self.convert_elements(expect_seq(node)?, element, depth)?;
                Ok(Instance::List(items))
            }
            Shape::Set(element) => {
                let items = expect_seq(node)?;
                let mut set = BTreeSet::new();
                for (i, item) in items.iter().enumerate() {
                    let converted = self
                        .convert_at(item, element, depth + 1)
                        .map_err(|e| e.within(PathStep::Index(i)))?;
                    set.insert(converted);
                }
                Ok(Instance::Set(set))
            }
            Shape::Dict { key, value } => self.convert_dict(node, key, value, depth),
            Shape::VariadicTuple(element) => {
                let items = self.convert_elements(expect_seq(node)?, element, depth)?;
                Ok(Instance::Tuple(items))
            }
            Shape::FixedTuple(elements) => {
                let items = expect_seq(node)?;
                if items.len() != elements.len() {
                    return Err(ErrorKind::ArityMismatch {
                        expected: elements.len(),
                        actual: items.len(),
                    }
                    .into());
                }
                let converted = items
                    .iter()
                    .zip(elements)
                    .enumerate()
                    .map(|(i, (item, element))| {
                        self.convert_at(item, element, depth + 1)
                            .map_err(|e| e.within(PathStep::Index(i)))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Instance::Tuple(converted))
            }
            Shape::Record(type_id) => self.convert_record(node, type_id, depth),
        }
    }

    fn convert_elements(
        &self,
        items: &[ValueNode],
        element: &TypeDescriptor,
        depth: usize,
    ) -> Result<Vec<Instance>, ConversionError> {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                self.convert_at(item, element, depth + 1)
                    .map_err(|e| e.within(PathStep::Index(i)))
            })
            .collect()
    }

    fn convert_dict(
        &self,
        node: &ValueNode,
        key_ty: &TypeDescriptor,
        value_ty: &TypeDescriptor,
        depth: usize,
    ) -> Result<Instance, ConversionError> {
        let entries = expect_map(node)?;
        let mut dict = BTreeMap::new();
        for (key, value) in entries {
            let converted_key = self
                .convert_at(&ValueNode::Str(key.clone()), key_ty, depth + 1)
                .map_err(|e| e.within(PathStep::MapKey(key.clone())))?;
            let converted_value = self
                .convert_at(value, value_ty, depth + 1)
                .map_err(|e| e.within(PathStep::MapValue(key.clone())))?;
            // Later entries overwrite earlier ones that convert to the same key.
            dict.insert(converted_key, converted_value);
        }
        Ok(Instance::Dict(dict))
    }

    fn convert_record(
        &self,
        node: &ValueNode,
        type_id: &str,
        depth: usize,
    ) -> Result<Instance, ConversionError> {
        expect_map(node)?;
        let mut builder = self.allocator.empty_instance(type_id);
        let fields = self
            .fields
            .fields_of(type_id)
            .ok_or_else(|| ErrorKind::UnknownType(String::from(type_id)))?;

        for field in fields {
            let value = node
                .get(&field.name)
                .ok_or_else(|| ConversionError::missing_field(field.name.as_str()))?;
            let converted = self
                .convert_at(value, &field.ty, depth + 1)
                .map_err(|e| e.within(PathStep::field(field.name.as_str())))?;
            builder.set(field.name.as_str(), converted);
        }

        Ok(Instance::Record(builder.finish()))
    }
}

fn expect_seq(node: &ValueNode) -> Result<&[ValueNode], ConversionError> {
    match node {
        ValueNode::Seq(items) => Ok(items),
        other => Err(ErrorKind::StructuralMismatch {
            expected: NodeKind::Seq,
            actual: other.kind(),
        }
        .into()),
    }
}

fn expect_map(node: &ValueNode) -> Result<&[(String, ValueNode)], ConversionError> {
    match node {
        ValueNode::Map(entries) => Ok(entries),
        other => Err(ErrorKind::StructuralMismatch {
            expected: NodeKind::Map,
            actual: other.kind(),
        }
        .into()),
    }
}

fn convert_primitive(kind: PrimitiveKind, node: &ValueNode) -> Result<Instance, ErrorKind> {
    match (kind, node) {
        (PrimitiveKind::String, ValueNode::Str(s)) => Ok(Instance::Str(s.clone())),
        (PrimitiveKind::Integer, ValueNode::Int(i)) => Ok(Instance::Int(*i)),
        (PrimitiveKind::Float, ValueNode::Float(f)) => Ok(Instance::float(*f)),
        (PrimitiveKind::Boolean, ValueNode::Bool(b)) => Ok(Instance::Bool(*b)),
        (PrimitiveKind::None, ValueNode::Null) => Ok(Instance::Null),
        (expected, other) => Err(ErrorKind::TypeMismatch {
            expected,
            actual: other.kind(),
        }),
    }
}

fn convert_literal(allowed: &[Literal], node: &ValueNode) -> Result<Instance, ErrorKind> {
    let matched = node.is_scalar() && allowed.iter().any(|literal| literal.matches(node));
    match (matched, node) {
        (true, ValueNode::Null) => Ok(Instance::Null),
        (true, ValueNode::Bool(b)) => Ok(Instance::Bool(*b)),
        (true, ValueNode::Int(i)) => Ok(Instance::Int(*i)),
        (true, ValueNode::Str(s)) => Ok(Instance::Str(s.clone())),
        _ => Err(ErrorKind::InvalidLiteral {
            value: node.clone(),
            allowed: allowed.to_vec(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Path;
    use crate::schema::{Field, Registry};
    use alloc::vec;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_record("test", vec![Field::new("c", TypeDescriptor::string())])
            .expect("test");
        registry
            .register_record(
                "nested",
                vec![
                    Field::new("a", TypeDescriptor::integer()),
                    Field::new("b", TypeDescriptor::record("test")),
                ],
            )
            .expect("nested");
        registry
    }

    #[test]
    fn primitives_convert_to_themselves() {
        let registry = Registry::new();
        let converter = Converter::new(&registry);
        let cases = [
            (ValueNode::Int(1), TypeDescriptor::integer(), Instance::Int(1)),
            (ValueNode::from("xyz"), TypeDescriptor::string(), Instance::from("xyz")),
            (ValueNode::Float(3.0), TypeDescriptor::float(), Instance::float(3.0)),
            (ValueNode::Bool(true), TypeDescriptor::boolean(), Instance::Bool(true)),
            (ValueNode::Null, TypeDescriptor::none(), Instance::Null),
        ];
        for (node, ty, expected) in cases {
            assert_eq!(converter.convert(&node, &ty), Ok(expected));
        }
    }

    #[test]
    fn no_coercion_between_scalar_kinds() {
        let registry = Registry::new();
        let converter = Converter::new(&registry);

        let err = converter
            .convert(&ValueNode::Int(1), &TypeDescriptor::boolean())
            .expect_err("int is not bool");
        assert_eq!(
            err.kind,
            ErrorKind::TypeMismatch {
                expected: PrimitiveKind::Boolean,
                actual: NodeKind::Int
            }
        );

        let err = converter
            .convert(&ValueNode::Bool(true), &TypeDescriptor::integer())
            .expect_err("bool is not int");
        assert!(matches!(err.kind, ErrorKind::TypeMismatch { .. }));

        assert!(converter.convert(&ValueNode::Int(1), &TypeDescriptor::float()).is_err());
        assert!(converter.convert(&ValueNode::Float(1.0), &TypeDescriptor::integer()).is_err());
    }

    #[test]
    fn nested_record_is_rebuilt() {
        let registry = registry();
        let node = ValueNode::map([
            ("a", ValueNode::Int(1)),
            ("b", ValueNode::map([("c", ValueNode::from("xyz"))])),
        ]);
        let result = Converter::new(&registry)
            .convert(&node, &TypeDescriptor::record("nested"))
            .expect("convert");

        assert_eq!(result.field("a"), Some(&Instance::Int(1)));
        assert_eq!(
            result.field("b").and_then(|b| b.field("c")),
            Some(&Instance::from("xyz"))
        );
        assert_eq!(result.as_record().map(|r| r.type_id()), Some("nested"));
    }

    #[test]
    fn failures_carry_the_path() {
        let registry = registry();
        let node = ValueNode::map([
            ("a", ValueNode::Int(1)),
            ("b", ValueNode::map([("c", ValueNode::Int(5))])),
        ]);
        let err = Converter::new(&registry)
            .convert(&node, &TypeDescriptor::record("nested"))
            .expect_err("c is not a string");
        assert_eq!(
            err.path,
            Path::from(vec![PathStep::field("b"), PathStep::field("c")])
        );
    }

    #[test]
    fn depth_limit_stops_runaway_nesting() {
        let mut registry = Registry::new();
        registry
            .register_record("node", vec![Field::new("next", TypeDescriptor::list(TypeDescriptor::record("node")))])
            .expect("node");

        let mut node = ValueNode::map([("next", ValueNode::Seq(vec![]))]);
        for _ in 0..10 {
            node = ValueNode::map([("next", ValueNode::Seq(vec![node]))]);
        }

        let converter = Converter::new(&registry).with_limits(Limits {
            max_depth: 8,
            ..Limits::default()
        });
        assert_eq!(converter.limits().max_depth, 8);
        assert_eq!(converter.limits().max_alias_depth, DEFAULT_MAX_ALIAS_DEPTH);
        let err = converter
            .convert(&node, &TypeDescriptor::record("node"))
            .expect_err("too deep");
        assert_eq!(err.kind, ErrorKind::DepthLimitExceeded(8));

        let relaxed = Converter::new(&registry);
        relaxed
            .convert(&node, &TypeDescriptor::record("node"))
            .expect("within default limit");
    }

    #[test]
    fn unknown_record_type_is_reported() {
        let registry = Registry::new();
        let err = Converter::new(&registry)
            .convert(&ValueNode::map(Vec::<(&str, ValueNode)>::new()), &TypeDescriptor::record("ghost"))
            .expect_err("unknown");
        assert_eq!(err.kind, ErrorKind::UnknownType("ghost".into()));
    }
}
