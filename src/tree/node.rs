use std::fmt;

/// Stable handle to a node inside a [`Tree`](super::Tree) arena.
///
/// Handles are only meaningful for the tree that issued them. Two handles are
/// equal exactly when they name the same node, which is the identity used by
/// deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Type tag carried by a scalar, mirroring the YAML core schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarTag {
    Null,
    Bool,
    Int,
    Float,
    Str,
}

impl ScalarTag {
    pub fn as_str(self) -> &'static str {
        match self {
            ScalarTag::Null => "!!null",
            ScalarTag::Bool => "!!bool",
            ScalarTag::Int => "!!int",
            ScalarTag::Float => "!!float",
            ScalarTag::Str => "!!str",
        }
    }
}

impl fmt::Display for ScalarTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String-valued leaf with an optional type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scalar {
    pub value: String,
    pub tag: Option<ScalarTag>,
}

impl Scalar {
    pub fn new(value: impl Into<String>, tag: Option<ScalarTag>) -> Self {
        Self {
            value: value.into(),
            tag,
        }
    }

    pub fn plain(value: impl Into<String>) -> Self {
        Self::new(value, None)
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(value, Some(ScalarTag::Str))
    }

    pub fn int(value: i64) -> Self {
        Self::new(value.to_string(), Some(ScalarTag::Int))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(value.to_string(), Some(ScalarTag::Bool))
    }

    pub fn null() -> Self {
        Self::new("null", Some(ScalarTag::Null))
    }
}

/// One key/value pair of a mapping. Keys are scalars; values live in the arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub key: Scalar,
    pub value: NodeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Root wrapper holding at most one child.
    Document(Option<NodeId>),
    /// Ordered key/value pairs; lookup is first match in insertion order.
    Mapping(Vec<MapEntry>),
    Sequence(Vec<NodeId>),
    Scalar(Scalar),
    /// Reference to another node of the same tree.
    Alias(NodeId),
}

impl Node {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Document(_) => "document",
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Scalar(_) => "scalar",
            Node::Alias(_) => "alias",
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Node::Mapping(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Node::Sequence(_))
    }

    /// Handles of the nodes this node owns directly. Alias targets are not owned.
    pub(crate) fn children(&self) -> Vec<NodeId> {
        match self {
            Node::Document(child) => child.iter().copied().collect(),
            Node::Mapping(entries) => entries.iter().map(|entry| entry.value).collect(),
            Node::Sequence(items) => items.clone(),
            Node::Scalar(_) | Node::Alias(_) => Vec::new(),
        }
    }
}
