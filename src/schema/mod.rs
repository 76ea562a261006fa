//! A small schema language for records and type aliases.
//!
//! ```text
//! // records may refer to each other in any order
//! record nested { a: int, b: test }
//! record test { c: string }
//!
//! type ids = list<int>
//! type mode = literal<"fast", "slow", 3, true, none>
//! type row = tuple<int, float, ...>
//! ```
//!
//! Named references are resolved once the whole source is parsed: alias names
//! become `Alias` descriptors, record names become `Record` descriptors.

mod parser;

use std::path::Path;

use objectify_core::{Field, Registry, RegistryError, TypeDescriptor};
use thiserror::Error;
use tracing::debug;

pub use parser::{parse_schema, parse_type, MAX_TYPE_NESTING};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unexpected token on line {line}: {token}")]
    UnexpectedToken { token: String, line: usize },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unterminated string starting on line {0}")]
    UnterminatedString(usize),

    #[error("invalid integer literal: {0}")]
    InvalidInteger(String),

    #[error("unknown type: {0}")]
    UnknownType(String),

    #[error("'{0}' is defined more than once")]
    DuplicateDefinition(String),

    #[error("'{0}' is a reserved type name")]
    ReservedName(String),

    #[error("type arguments nested deeper than {0} levels")]
    NestingTooDeep(usize),

    #[error("invalid escape sequence in string on line {0}")]
    InvalidEscape(usize),
}

/// One top-level definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Record { name: String, fields: Vec<Field> },
    Alias { name: String, target: TypeDescriptor },
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Record { name, .. } | Definition::Alias { name, .. } => name,
        }
    }
}

/// A parsed and name-resolved schema, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    definitions: Vec<Definition>,
}

impl Schema {
    pub(crate) fn new(definitions: Vec<Definition>) -> Self {
        Self { definitions }
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.iter().find(|def| def.name() == name)
    }

    pub fn is_record(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Definition::Record { .. }))
    }

    pub fn is_alias(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Definition::Alias { .. }))
    }

    /// Build a registry holding every definition.
    pub fn into_registry(self) -> Result<Registry, RegistryError> {
        let mut registry = Registry::new();
        for definition in self.definitions {
            match definition {
                Definition::Record { name, fields } => registry.register_record(name, fields)?,
                Definition::Alias { name, target } => registry.register_alias(name, target)?,
            }
        }
        registry.validate()?;
        Ok(registry)
    }
}

/// Read and parse a schema file.
pub fn load_schema(path: &Path) -> crate::Result<Schema> {
    let src = std::fs::read_to_string(path)?;
    let schema = parse_schema(&src)?;
    debug!(
        path = %path.display(),
        definitions = schema.definitions().len(),
        "loaded schema"
    );
    Ok(schema)
}
