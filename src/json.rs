//! Bridge between `serde_json` values and the core value/instance trees.

use std::path::Path;

use objectify_core::{
    from_node, Allocator, Describe, FieldSchema, FromInstance, Instance, TypeAliasResolver, TypeDescriptor,
    ValueNode,
};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::error::{Error, Result};

/// Build a value tree from parsed JSON.
///
/// Integers must fit in `i64`; larger ones are rejected rather than silently
/// turned into floats.
pub fn node_from_json(value: &Value) -> Result<ValueNode> {
    Ok(match value {
        Value::Null => ValueNode::Null,
        Value::Bool(b) => ValueNode::Bool(*b),
        Value::Number(n) => number_node(n)?,
        Value::String(s) => ValueNode::Str(s.clone()),
        Value::Array(items) => ValueNode::Seq(items.iter().map(node_from_json).collect::<Result<_>>()?),
        Value::Object(entries) => ValueNode::Map(
            entries
                .iter()
                .map(|(key, value)| Ok((key.clone(), node_from_json(value)?)))
                .collect::<Result<_>>()?,
        ),
    })
}

fn number_node(n: &Number) -> Result<ValueNode> {
    if let Some(i) = n.as_i64() {
        return Ok(ValueNode::Int(i));
    }
    if n.is_u64() {
        return Err(Error::NumberOutOfRange(n.to_string()));
    }
    n.as_f64()
        .map(ValueNode::Float)
        .ok_or_else(|| Error::NumberOutOfRange(n.to_string()))
}

/// Render an instance as JSON.
///
/// Sets and tuples become arrays, records and dicts become objects (dict keys
/// are stringified), and non-finite floats become `null`.
pub fn instance_to_json(instance: &Instance) -> Value {
    match instance {
        Instance::Null => Value::Null,
        Instance::Bool(b) => Value::Bool(*b),
        Instance::Int(i) => Value::from(*i),
        Instance::Float(f) => Number::from_f64(f.0).map_or(Value::Null, Value::Number),
        Instance::Str(s) => Value::String(s.clone()),
        Instance::List(items) | Instance::Tuple(items) => Value::Array(items.iter().map(instance_to_json).collect()),
        Instance::Set(items) => Value::Array(items.iter().map(instance_to_json).collect()),
        Instance::Dict(entries) => Value::Object(
            entries
                .iter()
                .map(|(key, value)| (key_string(key), instance_to_json(value)))
                .collect::<Map<_, _>>(),
        ),
        Instance::Record(record) => Value::Object(
            record
                .fields()
                .iter()
                .map(|(name, value)| (name.clone(), instance_to_json(value)))
                .collect::<Map<_, _>>(),
        ),
    }
}

fn key_string(key: &Instance) -> String {
    match key {
        Instance::Str(s) => s.clone(),
        other => instance_to_json(other).to_string(),
    }
}

/// Convert parsed JSON straight into an instance of `target`.
pub fn convert_json<C>(value: &Value, target: &TypeDescriptor, collaborators: &C) -> Result<Instance>
where
    C: FieldSchema + Allocator + TypeAliasResolver,
{
    let node = node_from_json(value)?;
    Ok(objectify_core::convert(&node, target, collaborators)?)
}

/// Parse a JSON document and extract a `T` from it.
pub fn from_json_str<T: Describe + FromInstance>(src: &str) -> Result<T> {
    let value: Value = serde_json::from_str(src)?;
    let node = node_from_json(&value)?;
    Ok(from_node(&node)?)
}

/// Read and parse a JSON file.
pub fn read_json_file(path: &Path) -> Result<Value> {
    let contents = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = contents.len(), "read JSON input");
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use objectify_core::{Field, Registry};
    use serde_json::json;

    #[test]
    fn json_numbers_keep_their_kind() {
        let node = node_from_json(&json!([1, -2, 2.5])).expect("node");
        assert_eq!(
            node,
            ValueNode::Seq(vec![ValueNode::Int(1), ValueNode::Int(-2), ValueNode::Float(2.5)])
        );
    }

    #[test]
    fn oversized_integers_are_rejected() {
        let err = node_from_json(&json!(u64::MAX)).expect_err("too big");
        assert!(matches!(err, Error::NumberOutOfRange(ref n) if n == "18446744073709551615"));
    }

    #[test]
    fn objects_become_maps() {
        let node = node_from_json(&json!({"a": null, "b": "x"})).expect("node");
        assert_eq!(node.get("b"), Some(&ValueNode::from("x")));
        assert_eq!(node.get("a"), Some(&ValueNode::Null));
    }

    #[test]
    fn instances_render_as_json() {
        let mut registry = Registry::new();
        registry
            .register_record("p", vec![Field::new("tags", TypeDescriptor::set(TypeDescriptor::string()))])
            .expect("p");
        let instance = convert_json(&json!({"tags": ["b", "a", "b"]}), &TypeDescriptor::record("p"), &registry)
            .expect("convert");

        assert_eq!(instance_to_json(&instance), json!({"tags": ["a", "b"]}));
    }

    #[test]
    fn dict_keys_are_stringified() {
        let mut entries = std::collections::BTreeMap::new();
        entries.insert(Instance::Int(1), Instance::Bool(true));
        entries.insert(Instance::from("k"), Instance::float(f64::INFINITY));

        assert_eq!(
            instance_to_json(&Instance::Dict(entries)),
            json!({"1": true, "k": null})
        );
    }

    #[test]
    fn typed_extraction_from_json_text() {
        let pairs: Vec<(String, i64)> = from_json_str(r#"[["a", 1], ["b", 2]]"#).expect("pairs");
        assert_eq!(pairs, vec![("a".to_string(), 1), ("b".to_string(), 2)]);

        let err = from_json_str::<Vec<i64>>("[1, true]").expect_err("bool is not int");
        match err {
            Error::Conversion(e) => assert_eq!(e.path.to_string(), "$[1]"),
            other => panic!("expected conversion error, got {other}"),
        }
    }
}
