//! Type-directed conversion of untyped value trees.
//!
//! A [`ValueNode`] tree (what a JSON parser produces) is converted into an
//! [`Instance`] shaped by a [`TypeDescriptor`]. Record layouts, empty record
//! allocation and alias resolution come from injected collaborators
//! ([`FieldSchema`], [`Allocator`], [`TypeAliasResolver`]); [`Registry`]
//! implements all three.
//!
//! ```
//! use objectify_core::{convert, Field, Instance, Registry, TypeDescriptor, ValueNode};
//!
//! let mut registry = Registry::new();
//! registry
//!     .register_record("point", vec![
//!         Field::new("x", TypeDescriptor::integer()),
//!         Field::new("y", TypeDescriptor::integer()),
//!     ])
//!     .unwrap();
//!
//! let node = ValueNode::map([("x", ValueNode::Int(1)), ("y", ValueNode::Int(2))]);
//! let point = convert(&node, &TypeDescriptor::record("point"), &registry).unwrap();
//! assert_eq!(point.field("y"), Some(&Instance::Int(2)));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod classify;
pub mod convert;
pub mod descriptor;
pub mod error;
pub mod hash;
pub mod instance;
pub mod schema;
pub mod typed;
pub mod value;

pub use classify::{classify, Shape, ShapeKind};
pub use convert::{Converter, Limits};
pub use descriptor::{Literal, PrimitiveKind, TupleDescriptor, TypeDescriptor};
pub use error::{ConversionError, ErrorKind, Path, PathStep};
pub use hash::{fingerprint, TypeHash};
pub use instance::{Instance, InstanceKind, RecordBuilder, RecordInstance};
pub use schema::{Allocator, Field, FieldSchema, Registry, RegistryError, TypeAliasResolver};
pub use typed::{from_node, Describe, FromInstance};
pub use value::{NodeKind, ValueNode};

#[cfg(feature = "derive")]
pub use objectify_derive::Objectify;

/// Convert `node` into an instance of `target` with default [`Limits`].
pub fn convert<C>(node: &ValueNode, target: &TypeDescriptor, collaborators: &C) -> Result<Instance, ConversionError>
where
    C: FieldSchema + Allocator + TypeAliasResolver,
{
    Converter::new(collaborators).convert(node, target)
}

#[doc(hidden)]
pub mod __private {
    pub use alloc::string::String;
    pub use alloc::vec;
    pub use alloc::vec::Vec;
    pub use core::any::type_name;
    pub use core::result::Result::{self, Err, Ok};

    pub use crate::typed::{expect_record, expect_tuple, take_field, take_item};
}
