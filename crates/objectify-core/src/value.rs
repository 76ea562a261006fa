//! Untyped input values

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// A node of the untyped value tree, mirroring JSON-like shapes.
///
/// Maps keep their insertion order. When a key appears more than once the
/// last occurrence wins on lookup, matching how a parsed JSON object behaves.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueNode {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<ValueNode>),
    Map(Vec<(String, ValueNode)>),
}

/// The runtime tag of a [`ValueNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    Seq,
    Map,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Null => "null",
            NodeKind::Bool => "bool",
            NodeKind::Int => "int",
            NodeKind::Float => "float",
            NodeKind::Str => "str",
            NodeKind::Seq => "seq",
            NodeKind::Map => "map",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValueNode {
    /// Build a map node from `(key, value)` pairs.
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ValueNode)>,
    {
        ValueNode::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Build a sequence node from anything convertible into nodes.
    pub fn seq<T, I>(items: I) -> Self
    where
        T: Into<ValueNode>,
        I: IntoIterator<Item = T>,
    {
        ValueNode::Seq(items.into_iter().map(Into::into).collect())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            ValueNode::Null => NodeKind::Null,
            ValueNode::Bool(_) => NodeKind::Bool,
            ValueNode::Int(_) => NodeKind::Int,
            ValueNode::Float(_) => NodeKind::Float,
            ValueNode::Str(_) => NodeKind::Str,
            ValueNode::Seq(_) => NodeKind::Seq,
            ValueNode::Map(_) => NodeKind::Map,
        }
    }

    /// True for everything except sequences and maps.
    pub fn is_scalar(&self) -> bool {
        !matches!(self, ValueNode::Seq(_) | ValueNode::Map(_))
    }

    /// Look up a key in a map node (last occurrence wins).
    ///
    /// Returns `None` for missing keys and for non-map nodes.
    pub fn get(&self, key: &str) -> Option<&ValueNode> {
        match self {
            ValueNode::Map(entries) => entries
                .iter()
                .rev()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for scalars
// ============================================================================

impl From<bool> for ValueNode {
    fn from(v: bool) -> Self {
        ValueNode::Bool(v)
    }
}

impl From<i32> for ValueNode {
    fn from(v: i32) -> Self {
        ValueNode::Int(i64::from(v))
    }
}

impl From<i64> for ValueNode {
    fn from(v: i64) -> Self {
        ValueNode::Int(v)
    }
}

impl From<f64> for ValueNode {
    fn from(v: f64) -> Self {
        ValueNode::Float(v)
    }
}

impl From<String> for ValueNode {
    fn from(v: String) -> Self {
        ValueNode::Str(v)
    }
}

impl From<&str> for ValueNode {
    fn from(v: &str) -> Self {
        ValueNode::Str(String::from(v))
    }
}

impl From<()> for ValueNode {
    fn from(_: ()) -> Self {
        ValueNode::Null
    }
}

impl<T: Into<ValueNode>> From<Vec<T>> for ValueNode {
    fn from(v: Vec<T>) -> Self {
        ValueNode::seq(v)
    }
}

impl<T: Into<ValueNode>> From<Option<T>> for ValueNode {
    fn from(v: Option<T>) -> Self {
        v.map_or(ValueNode::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn map_lookup_prefers_last_occurrence() {
        let node = ValueNode::map([("a", ValueNode::Int(1)), ("a", ValueNode::Int(2))]);
        assert_eq!(node.get("a"), Some(&ValueNode::Int(2)));
        assert_eq!(node.get("b"), None);
    }

    #[test]
    fn get_on_non_map_is_none() {
        assert_eq!(ValueNode::seq(vec![1, 2]).get("a"), None);
    }

    #[test]
    fn kinds_and_scalars() {
        assert_eq!(ValueNode::from(true).kind(), NodeKind::Bool);
        assert_eq!(ValueNode::from(1.5).kind(), NodeKind::Float);
        assert!(ValueNode::Null.is_scalar());
        assert!(!ValueNode::seq(Vec::<i64>::new()).is_scalar());
        assert_eq!(ValueNode::from(None::<i64>), ValueNode::Null);
    }
}
