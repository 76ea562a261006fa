//! Converted output values
//!
//! An [`Instance`] is owned entirely by the caller once conversion returns.
//! Instances are totally ordered so that converted set elements and dict keys
//! deduplicate by value; floats take part through [`OrderedFloat`], which
//! makes `-0.0 == 0.0` and all NaNs equal.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use ordered_float::OrderedFloat;

/// A strongly shaped value produced by conversion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Instance {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
    List(Vec<Instance>),
    Set(BTreeSet<Instance>),
    Dict(BTreeMap<Instance, Instance>),
    Tuple(Vec<Instance>),
    Record(RecordInstance),
}

/// The tag of an [`Instance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Set,
    Dict,
    Tuple,
    Record,
}

impl fmt::Display for InstanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstanceKind::Null => "null",
            InstanceKind::Bool => "bool",
            InstanceKind::Int => "int",
            InstanceKind::Float => "float",
            InstanceKind::Str => "str",
            InstanceKind::List => "list",
            InstanceKind::Set => "set",
            InstanceKind::Dict => "dict",
            InstanceKind::Tuple => "tuple",
            InstanceKind::Record => "record",
        };
        f.write_str(name)
    }
}

impl Instance {
    pub fn float(v: f64) -> Self {
        Instance::Float(OrderedFloat(v))
    }

    pub fn kind(&self) -> InstanceKind {
        match self {
            Instance::Null => InstanceKind::Null,
            Instance::Bool(_) => InstanceKind::Bool,
            Instance::Int(_) => InstanceKind::Int,
            Instance::Float(_) => InstanceKind::Float,
            Instance::Str(_) => InstanceKind::Str,
            Instance::List(_) => InstanceKind::List,
            Instance::Set(_) => InstanceKind::Set,
            Instance::Dict(_) => InstanceKind::Dict,
            Instance::Tuple(_) => InstanceKind::Tuple,
            Instance::Record(_) => InstanceKind::Record,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Instance::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Instance::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Instance::Float(f) => Some(f.0),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Instance::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Elements of a list or a tuple.
    pub fn as_slice(&self) -> Option<&[Instance]> {
        match self {
            Instance::List(items) | Instance::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&BTreeSet<Instance>> {
        match self {
            Instance::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&BTreeMap<Instance, Instance>> {
        match self {
            Instance::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordInstance> {
        match self {
            Instance::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Shorthand for reading a field of a record instance.
    pub fn field(&self, name: &str) -> Option<&Instance> {
        self.as_record().and_then(|record| record.get(name))
    }
}

impl From<bool> for Instance {
    fn from(v: bool) -> Self {
        Instance::Bool(v)
    }
}

impl From<i64> for Instance {
    fn from(v: i64) -> Self {
        Instance::Int(v)
    }
}

impl From<f64> for Instance {
    fn from(v: f64) -> Self {
        Instance::float(v)
    }
}

impl From<&str> for Instance {
    fn from(v: &str) -> Self {
        Instance::Str(String::from(v))
    }
}

impl From<String> for Instance {
    fn from(v: String) -> Self {
        Instance::Str(v)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A record value: its type id plus field values in schema-declared order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordInstance {
    type_id: String,
    fields: Vec<(String, Instance)>,
}

impl RecordInstance {
    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn fields(&self) -> &[(String, Instance)] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Move a field's value out, leaving the rest in place.
    pub fn take(&mut self, name: &str) -> Option<Instance> {
        let position = self.fields.iter().position(|(field, _)| field == name)?;
        Some(self.fields.remove(position).1)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// An empty record waiting for its fields.
///
/// Handed out by an `Allocator`; fields are assigned by name and the builder
/// is finalized into an immutable [`RecordInstance`]. No user-level
/// initialization runs at any point.
#[derive(Debug)]
pub struct RecordBuilder {
    type_id: String,
    fields: Vec<(String, Instance)>,
}

impl RecordBuilder {
    pub fn new(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_capacity(type_id: impl Into<String>, capacity: usize) -> Self {
        Self {
            type_id: type_id.into(),
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Assign a field. Assigning the same name twice keeps the later value.
    pub fn set(&mut self, name: impl Into<String>, value: Instance) {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn finish(self) -> RecordInstance {
        RecordInstance {
            type_id: self.type_id,
            fields: self.fields,
        }
    }
}
