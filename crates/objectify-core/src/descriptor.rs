//! Type descriptors
//!
//! A [`TypeDescriptor`] describes the shape a value must have, independent of
//! any runtime value. Descriptors form a tree; records are referenced by id so
//! a record may mention itself without the descriptor itself being cyclic.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::{self, Write};

use crate::value::ValueNode;

/// The five scalar kinds a primitive descriptor may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveKind {
    String,
    Integer,
    Float,
    Boolean,
    None,
}

impl PrimitiveKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::String => "string",
            PrimitiveKind::Integer => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Boolean => "bool",
            PrimitiveKind::None => "none",
        }
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A permitted value of a literal descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
}

impl Literal {
    /// Strict equality against a value node: tags must agree, so `true` never
    /// matches `1`.
    pub fn matches(&self, node: &ValueNode) -> bool {
        match (self, node) {
            (Literal::Null, ValueNode::Null) => true,
            (Literal::Bool(a), ValueNode::Bool(b)) => a == b,
            (Literal::Int(a), ValueNode::Int(b)) => a == b,
            (Literal::Str(a), ValueNode::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("none"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Str(s) => write_quoted(f, s),
        }
    }
}

/// Quote a string using the schema language's escapes: `\"`, `\\`, `\n`,
/// `\t`, `\r`, `\0` and `\u{..}` for any other control character.
fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('"')?;
    for ch in s.chars() {
        match ch {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            c if c.is_control() => write!(f, "\\u{{{:x}}}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('"')
}

/// The two tuple forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TupleDescriptor {
    /// One repeated element type, any length (including zero).
    Variadic(Box<TypeDescriptor>),
    /// Exactly one element per listed type.
    Fixed(Vec<TypeDescriptor>),
}

/// Structural description of an expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TypeDescriptor {
    Primitive(PrimitiveKind),
    Literal(Vec<Literal>),
    List(Box<TypeDescriptor>),
    Set(Box<TypeDescriptor>),
    Dict {
        key: Box<TypeDescriptor>,
        value: Box<TypeDescriptor>,
    },
    Tuple(TupleDescriptor),
    /// A structured type whose fields come from a `FieldSchema`.
    Record(String),
    /// A named alias, resolved one layer at a time by a `TypeAliasResolver`.
    Alias(String),
    /// A sum of alternative shapes. Never convertible.
    Union(Vec<TypeDescriptor>),
}

impl TypeDescriptor {
    pub fn string() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::String)
    }

    pub fn integer() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Integer)
    }

    pub fn float() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Float)
    }

    pub fn boolean() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::Boolean)
    }

    pub fn none() -> Self {
        TypeDescriptor::Primitive(PrimitiveKind::None)
    }

    pub fn literal<I: IntoIterator<Item = Literal>>(allowed: I) -> Self {
        TypeDescriptor::Literal(allowed.into_iter().collect())
    }

    pub fn list(element: TypeDescriptor) -> Self {
        TypeDescriptor::List(Box::new(element))
    }

    pub fn set(element: TypeDescriptor) -> Self {
        TypeDescriptor::Set(Box::new(element))
    }

    pub fn dict(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Dict {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn variadic_tuple(element: TypeDescriptor) -> Self {
        TypeDescriptor::Tuple(TupleDescriptor::Variadic(Box::new(element)))
    }

    pub fn fixed_tuple<I: IntoIterator<Item = TypeDescriptor>>(elements: I) -> Self {
        TypeDescriptor::Tuple(TupleDescriptor::Fixed(elements.into_iter().collect()))
    }

    pub fn record(type_id: impl Into<String>) -> Self {
        TypeDescriptor::Record(type_id.into())
    }

    pub fn alias(name: impl Into<String>) -> Self {
        TypeDescriptor::Alias(name.into())
    }

    pub fn union<I: IntoIterator<Item = TypeDescriptor>>(alternatives: I) -> Self {
        TypeDescriptor::Union(alternatives.into_iter().collect())
    }

    /// `optional<T>` is a union with `none`, so it is equally unsupported.
    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Union(alloc::vec![inner, TypeDescriptor::none()])
    }

    /// Visit every named reference (`Record` and `Alias`) in this descriptor.
    pub fn for_each_reference<F: FnMut(&TypeDescriptor)>(&self, f: &mut F) {
        match self {
            TypeDescriptor::Primitive(_) | TypeDescriptor::Literal(_) => {}
            TypeDescriptor::List(inner) | TypeDescriptor::Set(inner) => inner.for_each_reference(f),
            TypeDescriptor::Dict { key, value } => {
                key.for_each_reference(f);
                value.for_each_reference(f);
            }
            TypeDescriptor::Tuple(TupleDescriptor::Variadic(inner)) => inner.for_each_reference(f),
            TypeDescriptor::Tuple(TupleDescriptor::Fixed(items)) | TypeDescriptor::Union(items) => {
                for item in items {
                    item.for_each_reference(f);
                }
            }
            TypeDescriptor::Record(_) | TypeDescriptor::Alias(_) => f(self),
        }
    }
}

impl From<PrimitiveKind> for TypeDescriptor {
    fn from(kind: PrimitiveKind) -> Self {
        TypeDescriptor::Primitive(kind)
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Renders descriptors in the schema language's syntax.
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Primitive(kind) => write!(f, "{kind}"),
            TypeDescriptor::Literal(values) => {
                f.write_str("literal<")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(">")
            }
            TypeDescriptor::List(inner) => write!(f, "list<{inner}>"),
            TypeDescriptor::Set(inner) => write!(f, "set<{inner}>"),
            TypeDescriptor::Dict { key, value } => write!(f, "dict<{key}, {value}>"),
            TypeDescriptor::Tuple(TupleDescriptor::Variadic(inner)) => {
                write!(f, "tuple<{inner}, ...>")
            }
            TypeDescriptor::Tuple(TupleDescriptor::Fixed(items)) => {
                f.write_str("tuple<")?;
                write_joined(f, items)?;
                f.write_str(">")
            }
            TypeDescriptor::Record(id) => f.write_str(id),
            TypeDescriptor::Alias(name) => f.write_str(name),
            TypeDescriptor::Union(items) => {
                f.write_str("union<")?;
                write_joined(f, items)?;
                f.write_str(">")
            }
        }
    }
}
