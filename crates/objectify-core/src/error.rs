//! Conversion errors and the path trace attached to them.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use thiserror::Error;

use crate::descriptor::{Literal, PrimitiveKind, TypeDescriptor};
use crate::instance::InstanceKind;
use crate::schema::RegistryError;
use crate::value::{NodeKind, ValueNode};

/// One step from a parent value into a child.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// A record field.
    Field(String),
    /// A list, set, or tuple element.
    Index(usize),
    /// The key of a dict entry itself.
    MapKey(String),
    /// The value stored under a dict key.
    MapValue(String),
}

impl PathStep {
    pub fn field(name: impl Into<String>) -> Self {
        PathStep::Field(name.into())
    }
}

/// Root-first sequence of steps locating a failure inside the input tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    steps: Vec<PathStep>,
}

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    pub fn is_root(&self) -> bool {
        self.steps.is_empty()
    }

    pub(crate) fn prepend(&mut self, step: PathStep) {
        self.steps.insert(0, step);
    }
}

impl From<Vec<PathStep>> for Path {
    fn from(steps: Vec<PathStep>) -> Self {
        Self { steps }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("$")?;
        for step in &self.steps {
            match step {
                PathStep::Field(name) => write!(f, ".{name}")?,
                PathStep::Index(i) => write!(f, "[{i}]")?,
                PathStep::MapKey(key) => write!(f, "[key {key:?}]")?,
                PathStep::MapValue(key) => write!(f, "[{key:?}]")?,
            }
        }
        Ok(())
    }
}

struct Allowed<'a>(&'a [Literal]);

impl fmt::Display for Allowed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, literal) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{literal}")?;
        }
        f.write_str("}")
    }
}

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: PrimitiveKind,
        actual: NodeKind,
    },

    #[error("invalid literal {value:?}: expected one of {}", Allowed(.allowed))]
    InvalidLiteral {
        value: ValueNode,
        allowed: Vec<Literal>,
    },

    #[error("arity mismatch: expected {expected} elements, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("unsupported shape: {0} (unions and optionals cannot be converted)")]
    UnsupportedShape(TypeDescriptor),

    #[error("structural mismatch: expected {expected}, got {actual}")]
    StructuralMismatch { expected: NodeKind, actual: NodeKind },

    #[error("unknown record type: {0}")]
    UnknownType(String),

    #[error("unknown type alias: {0}")]
    UnknownAlias(String),

    #[error("type alias chain starting at {0} does not terminate")]
    AliasCycle(String),

    #[error("nesting exceeds the depth limit of {0}")]
    DepthLimitExceeded(usize),

    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("value {value} does not fit in {target}")]
    FloatOutOfRange { value: f64, target: &'static str },

    #[error("invalid type registration: {0}")]
    Registry(RegistryError),

    #[error("unexpected instance: expected {expected}, got {actual}")]
    UnexpectedInstance {
        expected: &'static str,
        actual: InstanceKind,
    },
}

/// A terminal conversion failure: the first error met during the descent,
/// with the path from the root to where it happened.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} (at {path})")]
pub struct ConversionError {
    pub path: Path,
    pub kind: ErrorKind,
}

impl ConversionError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            path: Path::root(),
            kind,
        }
    }

    pub fn missing_field(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingField(name.into()))
    }

    /// Record that this error happened beneath `step`.
    pub fn within(mut self, step: PathStep) -> Self {
        self.path.prepend(step);
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl From<RegistryError> for ConversionError {
    fn from(err: RegistryError) -> Self {
        Self::new(ErrorKind::Registry(err))
    }
}

impl From<ErrorKind> for ConversionError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;

    #[test]
    fn path_renders_root_first() {
        let err = ConversionError::missing_field("c")
            .within(PathStep::Index(2))
            .within(PathStep::field("b"));
        assert_eq!(err.path.to_string(), "$.b[2]");
        assert_eq!(err.to_string(), "missing field: c (at $.b[2])");
    }

    #[test]
    fn map_steps_are_quoted() {
        let path = Path::from(vec![PathStep::MapValue("k".into()), PathStep::MapKey("x".into())]);
        assert_eq!(path.to_string(), "$[\"k\"][key \"x\"]");
    }

    #[test]
    fn invalid_literal_lists_allowed_values() {
        let kind = ErrorKind::InvalidLiteral {
            value: ValueNode::Str("c".into()),
            allowed: vec![Literal::Str("a".into()), Literal::Int(1)],
        };
        assert_eq!(
            kind.to_string(),
            "invalid literal Str(\"c\"): expected one of {\"a\", 1}"
        );
    }
}
