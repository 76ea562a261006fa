//! objectify: type-directed conversion of JSON-like data into typed instances
//!
//! The engine lives in `objectify_core`; this crate adds the pieces that need
//! `std`:
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  objectify (front end)                       │
//! │                                              │
//! │  json    - serde_json <-> ValueNode/Instance │
//! │  schema  - record/alias definition language  │
//! │  error   - crate-level error type            │
//! │                                              │
//! ├──────────────────────────────────────────────┤
//! │  objectify_core (no_std engine)              │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ```
//! use objectify::{convert_json, parse_schema, parse_type};
//!
//! let schema = parse_schema("record test { c: string } record nested { a: int, b: test }").unwrap();
//! let target = parse_type("nested", &schema).unwrap();
//! let registry = schema.into_registry().unwrap();
//!
//! let input = serde_json::json!({"a": 1, "b": {"c": "xyz"}});
//! let instance = convert_json(&input, &target, &registry).unwrap();
//! assert_eq!(instance.field("a").and_then(|a| a.as_int()), Some(1));
//! ```

pub mod error;
pub mod json;
pub mod schema;

pub use error::{Error, Result};
pub use json::{convert_json, from_json_str, instance_to_json, node_from_json, read_json_file};
pub use schema::{load_schema, parse_schema, parse_type, Definition, ParseError, Schema, MAX_TYPE_NESTING};

pub use objectify_core::{
    convert, fingerprint, from_node, ConversionError, Converter, Describe, ErrorKind, Field, FromInstance,
    Instance, Limits, Objectify, Path, PathStep, Registry, RegistryError, TypeDescriptor, TypeHash, ValueNode,
};
