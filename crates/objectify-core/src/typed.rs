//! Typed extraction: from a converted [`Instance`] into plain Rust values.
//!
//! [`Describe`] says which descriptor a Rust type corresponds to and registers
//! any records it needs; [`FromInstance`] moves a converted instance into the
//! Rust value. `#[derive(Objectify)]` implements both for structs.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use crate::convert::Converter;
use crate::descriptor::TypeDescriptor;
use crate::error::{ConversionError, ErrorKind, PathStep};
use crate::instance::{Instance, RecordInstance};
use crate::schema::{Registry, RegistryError};
use crate::value::ValueNode;

/// A Rust type with a known descriptor.
pub trait Describe {
    fn descriptor() -> TypeDescriptor;

    /// Add every record this type refers to. Must be idempotent so recursive
    /// types terminate; a different record already registered under the same
    /// id is a `ConflictingDefinition`.
    fn register(_registry: &mut Registry) -> Result<(), RegistryError> {
        Ok(())
    }
}

/// Extraction of a Rust value from a converted instance.
pub trait FromInstance: Sized {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError>;
}

/// Convert `node` against `T`'s descriptor and extract a `T`.
pub fn from_node<T: Describe + FromInstance>(node: &ValueNode) -> Result<T, ConversionError> {
    let mut registry = Registry::new();
    T::register(&mut registry)?;
    let instance = Converter::new(&registry).convert(node, &T::descriptor())?;
    T::from_instance(instance)
}

fn unexpected(expected: &'static str, actual: &Instance) -> ConversionError {
    ErrorKind::UnexpectedInstance {
        expected,
        actual: actual.kind(),
    }
    .into()
}

// ============================================================================
// Helpers used by derived code
// ============================================================================

#[doc(hidden)]
pub fn expect_record(instance: Instance) -> Result<RecordInstance, ConversionError> {
    match instance {
        Instance::Record(record) => Ok(record),
        other => Err(unexpected("record", &other)),
    }
}

#[doc(hidden)]
pub fn take_field<T: FromInstance>(record: &mut RecordInstance, name: &str) -> Result<T, ConversionError> {
    let value = record
        .take(name)
        .ok_or_else(|| ConversionError::missing_field(name))?;
    T::from_instance(value).map_err(|e| e.within(PathStep::field(name)))
}

#[doc(hidden)]
pub fn expect_tuple(instance: Instance, arity: usize) -> Result<vec::IntoIter<Instance>, ConversionError> {
    match instance {
        Instance::Tuple(items) if items.len() == arity => Ok(items.into_iter()),
        Instance::Tuple(items) => Err(ErrorKind::ArityMismatch {
            expected: arity,
            actual: items.len(),
        }
        .into()),
        other => Err(unexpected("tuple", &other)),
    }
}

#[doc(hidden)]
pub fn take_item<T: FromInstance>(
    items: &mut vec::IntoIter<Instance>,
    index: usize,
) -> Result<T, ConversionError> {
    let value = items.next().ok_or(ErrorKind::ArityMismatch {
        expected: index + 1,
        actual: index,
    })?;
    T::from_instance(value).map_err(|e| e.within(PathStep::Index(index)))
}

// ============================================================================
// Scalars
// ============================================================================

impl Describe for bool {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::boolean()
    }
}

impl FromInstance for bool {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        match instance {
            Instance::Bool(b) => Ok(b),
            other => Err(unexpected("bool", &other)),
        }
    }
}

macro_rules! impl_integer {
    ($($ty:ty),*) => {
        $(
            impl Describe for $ty {
                fn descriptor() -> TypeDescriptor {
                    TypeDescriptor::integer()
                }
            }

            impl FromInstance for $ty {
                fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
                    match instance {
                        Instance::Int(value) => <$ty>::try_from(value).map_err(|_| {
                            ErrorKind::OutOfRange {
                                value,
                                target: stringify!($ty),
                            }
                            .into()
                        }),
                        other => Err(unexpected("int", &other)),
                    }
                }
            }
        )*
    };
}

impl_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Describe for f64 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::float()
    }
}

impl FromInstance for f64 {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        match instance {
            Instance::Float(f) => Ok(f.0),
            other => Err(unexpected("float", &other)),
        }
    }
}

impl Describe for f32 {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::float()
    }
}

impl FromInstance for f32 {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        let value = f64::from_instance(instance)?;
        if value.is_finite() && value.abs() > f64::from(f32::MAX) {
            return Err(ErrorKind::FloatOutOfRange { value, target: "f32" }.into());
        }
        Ok(value as f32)
    }
}

impl Describe for String {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::string()
    }
}

impl FromInstance for String {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        match instance {
            Instance::Str(s) => Ok(s),
            other => Err(unexpected("str", &other)),
        }
    }
}

impl Describe for () {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::none()
    }
}

impl FromInstance for () {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        match instance {
            Instance::Null => Ok(()),
            other => Err(unexpected("null", &other)),
        }
    }
}

impl<T: Describe> Describe for Box<T> {
    fn descriptor() -> TypeDescriptor {
        T::descriptor()
    }

    fn register(registry: &mut Registry) -> Result<(), RegistryError> {
        T::register(registry)
    }
}

impl<T: FromInstance> FromInstance for Box<T> {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        T::from_instance(instance).map(Box::new)
    }
}

// ============================================================================
// Collections
// ============================================================================

fn key_label(key: &Instance) -> String {
    match key {
        Instance::Str(s) => s.clone(),
        Instance::Int(i) => i.to_string(),
        other => other.kind().to_string(),
    }
}

impl<T: Describe> Describe for Vec<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::list(T::descriptor())
    }

    fn register(registry: &mut Registry) -> Result<(), RegistryError> {
        T::register(registry)
    }
}

impl<T: FromInstance> FromInstance for Vec<T> {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        match instance {
            Instance::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_instance(item).map_err(|e| e.within(PathStep::Index(i))))
                .collect(),
            other => Err(unexpected("list", &other)),
        }
    }
}

impl<T: Describe> Describe for BTreeSet<T> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::set(T::descriptor())
    }

    fn register(registry: &mut Registry) -> Result<(), RegistryError> {
        T::register(registry)
    }
}

impl<T: FromInstance + Ord> FromInstance for BTreeSet<T> {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        match instance {
            Instance::Set(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_instance(item).map_err(|e| e.within(PathStep::Index(i))))
                .collect(),
            other => Err(unexpected("set", &other)),
        }
    }
}

impl<K: Describe, V: Describe> Describe for BTreeMap<K, V> {
    fn descriptor() -> TypeDescriptor {
        TypeDescriptor::dict(K::descriptor(), V::descriptor())
    }

    fn register(registry: &mut Registry) -> Result<(), RegistryError> {
        K::register(registry)?;
        V::register(registry)
    }
}

impl<K: FromInstance + Ord, V: FromInstance> FromInstance for BTreeMap<K, V> {
    fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
        match instance {
            Instance::Dict(entries) => entries
                .into_iter()
                .map(|(key, value)| {
                    let label = key_label(&key);
                    let key = K::from_instance(key)
                        .map_err(|e| e.within(PathStep::MapKey(label.clone())))?;
                    let value = V::from_instance(value).map_err(|e| e.within(PathStep::MapValue(label)))?;
                    Ok((key, value))
                })
                .collect(),
            other => Err(unexpected("dict", &other)),
        }
    }
}

#[cfg(feature = "std")]
mod hashed {
    use std::collections::{HashMap, HashSet};
    use std::hash::Hash;

    use super::*;

    impl<T: Describe> Describe for HashSet<T> {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::set(T::descriptor())
        }

        fn register(registry: &mut Registry) -> Result<(), RegistryError> {
            T::register(registry)
        }
    }

    impl<T: FromInstance + Eq + Hash> FromInstance for HashSet<T> {
        fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
            match instance {
                Instance::Set(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, item)| T::from_instance(item).map_err(|e| e.within(PathStep::Index(i))))
                    .collect(),
                other => Err(unexpected("set", &other)),
            }
        }
    }

    impl<K: Describe, V: Describe> Describe for HashMap<K, V> {
        fn descriptor() -> TypeDescriptor {
            TypeDescriptor::dict(K::descriptor(), V::descriptor())
        }

        fn register(registry: &mut Registry) -> Result<(), RegistryError> {
            K::register(registry)?;
            V::register(registry)
        }
    }

    impl<K: FromInstance + Eq + Hash, V: FromInstance> FromInstance for HashMap<K, V> {
        fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
            match instance {
                Instance::Dict(entries) => entries
                    .into_iter()
                    .map(|(key, value)| {
                        let label = key_label(&key);
                        let key = K::from_instance(key)
                            .map_err(|e| e.within(PathStep::MapKey(label.clone())))?;
                        let value =
                            V::from_instance(value).map_err(|e| e.within(PathStep::MapValue(label)))?;
                        Ok((key, value))
                    })
                    .collect(),
                other => Err(unexpected("dict", &other)),
            }
        }
    }
}

// ============================================================================
// Tuples
// ============================================================================

macro_rules! impl_tuple {
    ($arity:literal; $($name:ident $index:tt),+) => {
        impl<$($name: Describe),+> Describe for ($($name,)+) {
            fn descriptor() -> TypeDescriptor {
                TypeDescriptor::fixed_tuple(vec![$($name::descriptor()),+])
            }

            fn register(registry: &mut Registry) -> Result<(), RegistryError> {
                $($name::register(registry)?;)+
                Ok(())
            }
        }

        impl<$($name: FromInstance),+> FromInstance for ($($name,)+) {
            fn from_instance(instance: Instance) -> Result<Self, ConversionError> {
                let mut items = expect_tuple(instance, $arity)?;
                Ok(($(take_item::<$name>(&mut items, $index)?,)+))
            }
        }
    };
}

impl_tuple!(1; A 0);
impl_tuple!(2; A 0, B 1);
impl_tuple!(3; A 0, B 1, C 2);
impl_tuple!(4; A 0, B 1, C 2, D 3);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_range_checked() {
        let err = u8::from_instance(Instance::Int(300)).expect_err("too big");
        assert_eq!(
            err.kind,
            ErrorKind::OutOfRange {
                value: 300,
                target: "u8"
            }
        );
        assert_eq!(i32::from_instance(Instance::Int(-5)), Ok(-5));
    }

    #[test]
    fn f32_is_range_checked() {
        assert_eq!(f32::from_instance(Instance::float(1.5)), Ok(1.5));
        assert_eq!(f32::from_instance(Instance::float(f64::INFINITY)), Ok(f32::INFINITY));

        let err = f32::from_instance(Instance::float(1e300)).expect_err("too big");
        assert_eq!(
            err.kind,
            ErrorKind::FloatOutOfRange {
                value: 1e300,
                target: "f32"
            }
        );

        let err = from_node::<Vec<f32>>(&ValueNode::seq([0.5, -1e40])).expect_err("too small");
        assert_eq!(err.path.to_string(), "$[1]");
        assert!(matches!(err.kind, ErrorKind::FloatOutOfRange { value, .. } if value == -1e40));
    }

    #[test]
    fn from_node_builds_collections() {
        let node = ValueNode::seq([1i64, 1, 2]);
        let set: BTreeSet<i64> = from_node(&node).expect("set");
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![1, 2]);

        let node = ValueNode::map([("a", ValueNode::Int(1)), ("b", ValueNode::Int(2))]);
        let map: BTreeMap<String, u32> = from_node(&node).expect("dict");
        assert_eq!(map.get("b"), Some(&2));
    }

    #[test]
    fn tuples_check_arity() {
        let node = ValueNode::seq([ValueNode::Int(1), ValueNode::from("x")]);
        let pair: (i64, String) = from_node(&node).expect("pair");
        assert_eq!(pair, (1, "x".to_string()));

        let err = from_node::<(i64, String)>(&ValueNode::seq([1i64])).expect_err("short");
        assert_eq!(
            err.kind,
            ErrorKind::ArityMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn extraction_errors_carry_paths() {
        let node = ValueNode::seq([1i64, 1000]);
        let err = from_node::<Vec<u8>>(&node).expect_err("1000 is not a u8");
        assert_eq!(err.to_string(), "value 1000 does not fit in u8 (at $[1])");
    }

    #[cfg(feature = "std")]
    #[test]
    fn hash_collections_extract() {
        use std::collections::{HashMap, HashSet};

        let set: HashSet<String> = from_node(&ValueNode::seq(["a", "b", "a"])).expect("set");
        assert_eq!(set.len(), 2);
        assert!(set.contains("b"));

        let node = ValueNode::map([("x", ValueNode::Bool(true))]);
        let map: HashMap<String, bool> = from_node(&node).expect("map");
        assert_eq!(map.get("x"), Some(&true));
    }
}
