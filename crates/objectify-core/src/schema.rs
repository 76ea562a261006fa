//! Injected collaborators and the in-memory registry implementing them.
//!
//! The converter never discovers fields on its own. It asks a [`FieldSchema`]
//! for a record's fields, an [`Allocator`] for an empty record to fill, and a
//! [`TypeAliasResolver`] to peel aliases. [`Registry`] provides all three.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

use crate::descriptor::TypeDescriptor;
use crate::instance::RecordBuilder;

/// A declared record field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Field {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Provides the ordered field list of a record type.
///
/// Must answer identically for a given `type_id` for the whole duration of a
/// conversion.
pub trait FieldSchema {
    fn fields_of(&self, type_id: &str) -> Option<&[Field]>;
}

/// Produces empty record instances ready for field assignment.
pub trait Allocator {
    fn empty_instance(&self, type_id: &str) -> RecordBuilder;
}

/// Resolves one layer of alias indirection.
pub trait TypeAliasResolver {
    /// Returns `descriptor` itself when it is not an alias, the alias target
    /// when it is a known alias, and `None` for an unknown alias.
    fn resolve<'a>(&'a self, descriptor: &'a TypeDescriptor) -> Option<&'a TypeDescriptor>;
}

/// Errors raised while populating or validating a [`Registry`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("record '{record}' declares field '{field}' more than once")]
    DuplicateField { record: String, field: String },

    #[error("'{0}' is already defined differently")]
    ConflictingDefinition(String),

    #[error("'{from}' references undefined type '{name}'")]
    UnresolvedReference { from: String, name: String },
}

/// Record and alias definitions keyed by name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    records: HashMap<String, Vec<Field>>,
    aliases: HashMap<String, TypeDescriptor>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record definition, checking field names are unique.
    ///
    /// Registering the exact same definition twice is accepted.
    pub fn register_record(
        &mut self,
        type_id: impl Into<String>,
        fields: Vec<Field>,
    ) -> Result<(), RegistryError> {
        let type_id = type_id.into();

        {
            let mut seen = HashSet::new();
            for field in &fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(RegistryError::DuplicateField {
                        record: type_id,
                        field: field.name.clone(),
                    });
                }
            }
        }

        if self.aliases.contains_key(&type_id) {
            return Err(RegistryError::ConflictingDefinition(type_id));
        }
        if let Some(existing) = self.records.get(&type_id) {
            if *existing != fields {
                return Err(RegistryError::ConflictingDefinition(type_id));
            }
            return Ok(());
        }

        debug!(record = %type_id, fields = fields.len(), "registered record");
        self.records.insert(type_id, fields);
        Ok(())
    }

    pub fn register_alias(
        &mut self,
        name: impl Into<String>,
        target: TypeDescriptor,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.records.contains_key(&name) {
            return Err(RegistryError::ConflictingDefinition(name));
        }
        if let Some(existing) = self.aliases.get(&name) {
            if *existing != target {
                return Err(RegistryError::ConflictingDefinition(name));
            }
            return Ok(());
        }

        debug!(alias = %name, resolves_to = %target, "registered alias");
        self.aliases.insert(name, target);
        Ok(())
    }

    pub fn contains_record(&self, type_id: &str) -> bool {
        self.records.contains_key(type_id)
    }

    pub fn contains_alias(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn alias_target(&self, name: &str) -> Option<&TypeDescriptor> {
        self.aliases.get(name)
    }

    /// A record's stored id together with its fields.
    pub fn record_entry(&self, type_id: &str) -> Option<(&str, &[Field])> {
        self.records
            .get_key_value(type_id)
            .map(|(id, fields)| (id.as_str(), fields.as_slice()))
    }

    pub fn alias_entry(&self, name: &str) -> Option<(&str, &TypeDescriptor)> {
        self.aliases
            .get_key_value(name)
            .map(|(name, target)| (name.as_str(), target))
    }

    /// Record ids in sorted order.
    pub fn record_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.records.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Alias names in sorted order.
    pub fn alias_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.aliases.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Check that every `Record` and `Alias` reference made by any
    /// definition names something defined here.
    ///
    /// Forward references are legal while building; this is where they must
    /// finally resolve, before any conversion starts.
    pub fn validate(&self) -> Result<(), RegistryError> {
        for type_id in self.record_ids() {
            for field in &self.records[type_id] {
                self.check_references(type_id, &field.ty)?;
            }
        }
        for name in self.alias_names() {
            self.check_references(name, &self.aliases[name])?;
        }
        Ok(())
    }

    /// Check the references of a descriptor that is not itself registered,
    /// such as a conversion target.
    pub fn validate_descriptor(&self, descriptor: &TypeDescriptor) -> Result<(), RegistryError> {
        self.check_references("<target>", descriptor)
    }

    fn check_references(&self, from: &str, descriptor: &TypeDescriptor) -> Result<(), RegistryError> {
        let mut missing = None;
        descriptor.for_each_reference(&mut |reference| {
            if missing.is_some() {
                return;
            }
            let defined = match reference {
                TypeDescriptor::Record(id) => self.records.contains_key(id),
                TypeDescriptor::Alias(name) => self.aliases.contains_key(name),
                _ => true,
            };
            if !defined {
                missing = Some(reference.to_string());
            }
        });
        match missing {
            Some(name) => Err(RegistryError::UnresolvedReference {
                from: from.to_string(),
                name,
            }),
            None => Ok(()),
        }
    }
}

impl FieldSchema for Registry {
    fn fields_of(&self, type_id: &str) -> Option<&[Field]> {
        self.records.get(type_id).map(Vec::as_slice)
    }
}

impl Allocator for Registry {
    fn empty_instance(&self, type_id: &str) -> RecordBuilder {
        let capacity = self.records.get(type_id).map_or(0, Vec::len);
        RecordBuilder::with_capacity(type_id, capacity)
    }
}

impl TypeAliasResolver for Registry {
    fn resolve<'a>(&'a self, descriptor: &'a TypeDescriptor) -> Option<&'a TypeDescriptor> {
        match descriptor {
            TypeDescriptor::Alias(name) => self.aliases.get(name),
            other => Some(other),
        }
    }
}
