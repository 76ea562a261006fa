//! Shape classification
//!
//! Decides which conversion strategy applies to a descriptor and hands back
//! the descriptor's type arguments. Aliases are peeled first, one layer per
//! resolver call, retrying while the result is still an alias.

use core::fmt;

use crate::descriptor::{Literal, PrimitiveKind, TupleDescriptor, TypeDescriptor};
use crate::error::ErrorKind;
use crate::schema::TypeAliasResolver;

/// Default bound on alias chains before they are treated as cyclic.
pub const DEFAULT_MAX_ALIAS_DEPTH: usize = 32;

/// The conversion strategy of a descriptor, without its type arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Primitive,
    Literal,
    List,
    Set,
    Dict,
    Tuple,
    Record,
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShapeKind::Primitive => "primitive",
            ShapeKind::Literal => "literal",
            ShapeKind::List => "list",
            ShapeKind::Set => "set",
            ShapeKind::Dict => "dict",
            ShapeKind::Tuple => "tuple",
            ShapeKind::Record => "record",
        };
        f.write_str(name)
    }
}

/// A classified descriptor together with its type arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape<'a> {
    Primitive(PrimitiveKind),
    Literal(&'a [Literal]),
    List(&'a TypeDescriptor),
    Set(&'a TypeDescriptor),
    Dict {
        key: &'a TypeDescriptor,
        value: &'a TypeDescriptor,
    },
    VariadicTuple(&'a TypeDescriptor),
    FixedTuple(&'a [TypeDescriptor]),
    Record(&'a str),
}

impl Shape<'_> {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Primitive(_) => ShapeKind::Primitive,
            Shape::Literal(_) => ShapeKind::Literal,
            Shape::List(_) => ShapeKind::List,
            Shape::Set(_) => ShapeKind::Set,
            Shape::Dict { .. } => ShapeKind::Dict,
            Shape::VariadicTuple(_) | Shape::FixedTuple(_) => ShapeKind::Tuple,
            Shape::Record(_) => ShapeKind::Record,
        }
    }
}

/// Classify with the default alias depth.
pub fn classify<'a, R>(descriptor: &'a TypeDescriptor, aliases: &'a R) -> Result<Shape<'a>, ErrorKind>
where
    R: TypeAliasResolver + ?Sized,
{
    classify_with_depth(descriptor, aliases, DEFAULT_MAX_ALIAS_DEPTH)
}

pub fn classify_with_depth<'a, R>(
    descriptor: &'a TypeDescriptor,
    aliases: &'a R,
    max_alias_depth: usize,
) -> Result<Shape<'a>, ErrorKind>
where
    R: TypeAliasResolver + ?Sized,
{
    let mut current = descriptor;
    for _ in 0..=max_alias_depth {
        let resolved = aliases
            .resolve(current)
            .ok_or_else(|| ErrorKind::UnknownAlias(alias_name(current)))?;
        if let TypeDescriptor::Alias(_) = resolved {
            current = resolved;
            continue;
        }
        return shape_of(resolved);
    }
    Err(ErrorKind::AliasCycle(alias_name(descriptor)))
}

fn alias_name(descriptor: &TypeDescriptor) -> alloc::string::String {
    match descriptor {
        TypeDescriptor::Alias(name) => name.clone(),
        other => alloc::format!("{other}"),
    }
}

fn shape_of(descriptor: &TypeDescriptor) -> Result<Shape<'_>, ErrorKind> {
    match descriptor {
        TypeDescriptor::Literal(allowed) => Ok(Shape::Literal(allowed)),
        TypeDescriptor::List(element) => Ok(Shape::List(element)),
        TypeDescriptor::Set(element) => Ok(Shape::Set(element)),
        TypeDescriptor::Tuple(TupleDescriptor::Variadic(element)) => Ok(Shape::VariadicTuple(element)),
        TypeDescriptor::Tuple(TupleDescriptor::Fixed(elements)) => Ok(Shape::FixedTuple(elements)),
        TypeDescriptor::Dict { key, value } => Ok(Shape::Dict { key, value }),
        TypeDescriptor::Union(_) => Err(ErrorKind::UnsupportedShape(descriptor.clone())),
        TypeDescriptor::Primitive(kind) => Ok(Shape::Primitive(*kind)),
        TypeDescriptor::Record(type_id) => Ok(Shape::Record(type_id)),
        // The resolver already returned a non-alias; reaching here means it
        // handed back an alias it claims to have resolved.
        TypeDescriptor::Alias(name) => Err(ErrorKind::UnknownAlias(name.clone())),
    }
}
