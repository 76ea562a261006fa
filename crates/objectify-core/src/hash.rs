//! Structural fingerprints for type descriptors.
//!
//! A fingerprint is a SHA-256 Merkle hash over a descriptor's shape:
//!
//! - primitives have fixed hashes
//! - compound descriptors hash a tag plus their children: `hash(list<T>) = H(list, hash(T))`
//! - records hash their fields, names included, sorted by name
//! - record type ids and alias names are NOT included, so `point` and `vec2`
//!   with the same fields share a fingerprint
//! - aliases are transparent: `type ids = list<int>` hashes like `list<int>`
//!
//! Two descriptors with equal fingerprints accept exactly the same value trees
//! and produce instances of the same shape.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use sha2::{Digest, Sha256};

use crate::descriptor::{Literal, PrimitiveKind, TupleDescriptor, TypeDescriptor};
use crate::schema::Registry;

/// A 256-bit structural hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeHash([u8; 32]);

impl TypeHash {
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        use core::fmt::Write;
        let mut out = String::with_capacity(64);
        for byte in self.0 {
            // Writing into a String cannot fail.
            let _ = write!(out, "{byte:02x}");
        }
        out
    }

    /// The first eight bytes in hex, enough to tell fingerprints apart in listings.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(16);
        hex
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

const fn primitive_hash(id: u8) -> TypeHash {
    let mut bytes = [0u8; 32];
    bytes[1] = id;
    TypeHash::from_bytes(bytes)
}

// ============================================================================
// Primitive Hashes
// ============================================================================

pub const HASH_STRING: TypeHash = primitive_hash(0x01);
pub const HASH_INT: TypeHash = primitive_hash(0x02);
pub const HASH_FLOAT: TypeHash = primitive_hash(0x03);
pub const HASH_BOOL: TypeHash = primitive_hash(0x04);
pub const HASH_NONE: TypeHash = primitive_hash(0x05);

/// Stands in for a reference back to a record or alias that is already being
/// hashed further up, so recursive types get a finite fingerprint.
pub const HASH_SELF_REF: TypeHash = TypeHash::from_bytes([
    0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
]);

pub fn primitive(kind: PrimitiveKind) -> TypeHash {
    match kind {
        PrimitiveKind::String => HASH_STRING,
        PrimitiveKind::Integer => HASH_INT,
        PrimitiveKind::Float => HASH_FLOAT,
        PrimitiveKind::Boolean => HASH_BOOL,
        PrimitiveKind::None => HASH_NONE,
    }
}

// ============================================================================
// Hash Builder
// ============================================================================

/// Incremental builder feeding tagged, length-prefixed parts into SHA-256.
pub struct TypeHasher {
    hasher: Sha256,
}

impl TypeHasher {
    pub fn new() -> Self {
        Self {
            hasher: Sha256::new(),
        }
    }

    pub fn tag(mut self, tag: u8) -> Self {
        self.hasher.update([tag]);
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        self.hasher.update((s.len() as u32).to_le_bytes());
        self.hasher.update(s.as_bytes());
        self
    }

    pub fn child(mut self, hash: &TypeHash) -> Self {
        self.hasher.update(hash.as_bytes());
        self
    }

    pub fn count(mut self, n: usize) -> Self {
        self.hasher.update((n as u32).to_le_bytes());
        self
    }

    pub fn literal(self, literal: &Literal) -> Self {
        match literal {
            Literal::Null => self.tag(0),
            Literal::Bool(b) => self.tag(1).tag(u8::from(*b)),
            Literal::Int(i) => {
                let mut this = self.tag(2);
                this.hasher.update(i.to_le_bytes());
                this
            }
            Literal::Str(s) => self.tag(3).string(s),
        }
    }

    pub fn finish(self) -> TypeHash {
        let result = self.hasher.finalize();
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&result);
        TypeHash(bytes)
    }
}

impl Default for TypeHasher {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Descriptor Hashing
// ============================================================================

const TAG_LIST: u8 = 0x10;
const TAG_SET: u8 = 0x11;
const TAG_DICT: u8 = 0x12;
const TAG_TUPLE: u8 = 0x13;
const TAG_VARIADIC: u8 = 0x14;
const TAG_LITERAL: u8 = 0x15;
const TAG_RECORD: u8 = 0x16;
const TAG_UNION: u8 = 0x17;
const TAG_UNRESOLVED: u8 = 0x18;

/// Fingerprint `descriptor`, looking up records and aliases in `registry`.
///
/// References the registry cannot resolve hash by name under their own tag,
/// so an incomplete registry still yields a stable (but distinct) result.
pub fn fingerprint(descriptor: &TypeDescriptor, registry: &Registry) -> TypeHash {
    Fingerprinter {
        registry,
        in_progress: Vec::new(),
    }
    .hash(descriptor)
}

struct Fingerprinter<'r> {
    registry: &'r Registry,
    in_progress: Vec<&'r str>,
}

impl<'r> Fingerprinter<'r> {
    fn hash(&mut self, descriptor: &TypeDescriptor) -> TypeHash {
        match descriptor {
            TypeDescriptor::Primitive(kind) => primitive(*kind),
            TypeDescriptor::Literal(allowed) => {
                let mut hasher = TypeHasher::new().tag(TAG_LITERAL).count(allowed.len());
                for literal in allowed {
                    hasher = hasher.literal(literal);
                }
                hasher.finish()
            }
            TypeDescriptor::List(element) => {
                let element = self.hash(element);
                TypeHasher::new().tag(TAG_LIST).child(&element).finish()
            }
            TypeDescriptor::Set(element) => {
                let element = self.hash(element);
                TypeHasher::new().tag(TAG_SET).child(&element).finish()
            }
            TypeDescriptor::Dict { key, value } => {
                let key = self.hash(key);
                let value = self.hash(value);
                TypeHasher::new().tag(TAG_DICT).child(&key).child(&value).finish()
            }
            TypeDescriptor::Tuple(TupleDescriptor::Variadic(element)) => {
                let element = self.hash(element);
                TypeHasher::new().tag(TAG_VARIADIC).child(&element).finish()
            }
            TypeDescriptor::Tuple(TupleDescriptor::Fixed(elements)) => self.sequence(TAG_TUPLE, elements),
            TypeDescriptor::Union(alternatives) => self.sequence(TAG_UNION, alternatives),
            TypeDescriptor::Record(type_id) => self.record(type_id),
            TypeDescriptor::Alias(name) => self.alias(name),
        }
    }

    fn sequence(&mut self, tag: u8, children: &[TypeDescriptor]) -> TypeHash {
        let hashes: Vec<TypeHash> = children.iter().map(|child| self.hash(child)).collect();
        let mut hasher = TypeHasher::new().tag(tag).count(hashes.len());
        for hash in &hashes {
            hasher = hasher.child(hash);
        }
        hasher.finish()
    }

    fn record(&mut self, type_id: &str) -> TypeHash {
        if self.in_progress.iter().any(|id| *id == type_id) {
            return HASH_SELF_REF;
        }
        let Some((id, fields)) = self.registry.record_entry(type_id) else {
            return unresolved(type_id);
        };

        self.in_progress.push(id);
        let mut hashed: Vec<(&str, TypeHash)> = fields
            .iter()
            .map(|field| (field.name.as_str(), self.hash(&field.ty)))
            .collect();
        self.in_progress.pop();

        // Field order does not change which inputs a record accepts.
        hashed.sort_by(|a, b| a.0.cmp(b.0));

        let mut hasher = TypeHasher::new().tag(TAG_RECORD).count(hashed.len());
        for (name, hash) in &hashed {
            hasher = hasher.string(name).child(hash);
        }
        hasher.finish()
    }

    fn alias(&mut self, name: &str) -> TypeHash {
        if self.in_progress.iter().any(|id| *id == name) {
            return HASH_SELF_REF;
        }
        let Some((name, target)) = self.registry.alias_entry(name) else {
            return unresolved(name);
        };

        self.in_progress.push(name);
        let hash = self.hash(target);
        self.in_progress.pop();
        hash
    }
}

fn unresolved(name: &str) -> TypeHash {
    TypeHasher::new().tag(TAG_UNRESOLVED).string(name).finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use alloc::string::ToString;
    use alloc::vec;

    fn point_like(registry: &mut Registry, id: &str) {
        registry
            .register_record(
                id,
                vec![
                    Field::new("x", TypeDescriptor::integer()),
                    Field::new("y", TypeDescriptor::integer()),
                ],
            )
            .expect("record");
    }

    #[test]
    fn primitive_hashes_are_unique() {
        let primitives = [HASH_STRING, HASH_INT, HASH_FLOAT, HASH_BOOL, HASH_NONE, HASH_SELF_REF];
        for (i, a) in primitives.iter().enumerate() {
            for (j, b) in primitives.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "primitive hashes must be unique");
                }
            }
        }
    }

    #[test]
    fn collections_differ_from_their_elements() {
        let registry = Registry::new();
        let list = fingerprint(&TypeDescriptor::list(TypeDescriptor::integer()), &registry);
        let set = fingerprint(&TypeDescriptor::set(TypeDescriptor::integer()), &registry);
        let variadic = fingerprint(&TypeDescriptor::variadic_tuple(TypeDescriptor::integer()), &registry);

        assert_ne!(list, HASH_INT);
        assert_ne!(list, set);
        assert_ne!(list, variadic);
    }

    #[test]
    fn record_names_are_not_hashed() {
        let mut registry = Registry::new();
        point_like(&mut registry, "point");
        point_like(&mut registry, "vec2");

        assert_eq!(
            fingerprint(&TypeDescriptor::record("point"), &registry),
            fingerprint(&TypeDescriptor::record("vec2"), &registry),
        );
    }

    #[test]
    fn field_names_are_hashed() {
        let mut registry = Registry::new();
        point_like(&mut registry, "point");
        registry
            .register_record(
                "ab",
                vec![
                    Field::new("a", TypeDescriptor::integer()),
                    Field::new("b", TypeDescriptor::integer()),
                ],
            )
            .expect("ab");

        assert_ne!(
            fingerprint(&TypeDescriptor::record("point"), &registry),
            fingerprint(&TypeDescriptor::record("ab"), &registry),
        );
    }

    #[test]
    fn tuple_is_not_a_record() {
        let mut registry = Registry::new();
        point_like(&mut registry, "point");
        let tuple = TypeDescriptor::fixed_tuple(vec![TypeDescriptor::integer(), TypeDescriptor::integer()]);

        assert_ne!(
            fingerprint(&tuple, &registry),
            fingerprint(&TypeDescriptor::record("point"), &registry),
        );
    }

    #[test]
    fn aliases_are_transparent() {
        let mut registry = Registry::new();
        let ids = TypeDescriptor::list(TypeDescriptor::integer());
        registry.register_alias("ids", ids.clone()).expect("ids");
        registry.register_alias("more_ids", TypeDescriptor::alias("ids")).expect("more_ids");

        assert_eq!(
            fingerprint(&TypeDescriptor::alias("more_ids"), &registry),
            fingerprint(&ids, &registry),
        );
    }

    #[test]
    fn recursive_records_terminate() {
        let mut registry = Registry::new();
        registry
            .register_record(
                "tree",
                vec![
                    Field::new("label", TypeDescriptor::string()),
                    Field::new("children", TypeDescriptor::list(TypeDescriptor::record("tree"))),
                ],
            )
            .expect("tree");

        let a = fingerprint(&TypeDescriptor::record("tree"), &registry);
        let b = fingerprint(&TypeDescriptor::record("tree"), &registry);
        assert_eq!(a, b);
        assert_eq!(a.to_hex().len(), 64);
        assert_eq!(a.to_hex(), a.to_string());
        assert_eq!(a.short().len(), 16);
        assert!(a.to_hex().starts_with(&a.short()));
    }

    #[test]
    fn literal_values_matter() {
        let registry = Registry::new();
        let one = TypeDescriptor::literal(vec![Literal::Int(1)]);
        let yes = TypeDescriptor::literal(vec![Literal::Bool(true)]);
        assert_ne!(fingerprint(&one, &registry), fingerprint(&yes, &registry));
    }
}
