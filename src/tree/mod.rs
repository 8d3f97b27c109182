//! Order-preserving document tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Every slot records
//! the container that owns it, so a node can be cut out of its parent without
//! re-walking the tree from the root.

pub mod errors;
pub mod node;

pub use errors::TreeError;
pub use node::{MapEntry, Node, NodeId, Scalar, ScalarTag};

use crate::value::{format_float, Value};

#[derive(Debug, Clone)]
struct Slot {
    node: Node,
    parent: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Tree {
    slots: Vec<Slot>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding an empty document.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                node: Node::Document(None),
                parent: None,
            }],
            root: NodeId(0),
        }
    }

    /// Build a document whose single child is grafted from `value`.
    pub fn from_value(value: &Value) -> Self {
        let mut tree = Self::new();
        let child = tree.graft(value);
        tree.slots[tree.root.0].node = Node::Document(Some(child));
        tree.slots[child.0].parent = Some(tree.root);
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.slots[id.0].node
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.0].parent
    }

    /// Number of arena slots, including nodes that have been detached.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// True when the root document holds no node.
    pub fn is_empty(&self) -> bool {
        matches!(self.node(self.root), Node::Document(None))
    }

    /// The child of the root document, if any.
    pub fn document_child(&self) -> Option<NodeId> {
        match self.node(self.root) {
            Node::Document(child) => *child,
            _ => Some(self.root),
        }
    }

    /// Allocate a detached node.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.slots.len());
        self.slots.push(Slot { node, parent: None });
        id
    }

    pub fn add_scalar(&mut self, scalar: Scalar) -> NodeId {
        self.add(Node::Scalar(scalar))
    }

    pub fn add_mapping(&mut self) -> NodeId {
        self.add(Node::Mapping(Vec::new()))
    }

    pub fn add_sequence(&mut self) -> NodeId {
        self.add(Node::Sequence(Vec::new()))
    }

    pub fn add_alias(&mut self, target: NodeId) -> NodeId {
        self.add(Node::Alias(target))
    }

    pub fn attach_document(&mut self, child: NodeId) -> Result<(), TreeError> {
        self.ensure_detached(child)?;
        let root = self.root;
        match &mut self.slots[root.0].node {
            Node::Document(slot @ None) => *slot = Some(child),
            Node::Document(Some(_)) => return Err(TreeError::DocumentOccupied),
            other => {
                return Err(TreeError::WrongKind {
                    node: root,
                    expected: "document",
                    found: other.kind_name(),
                })
            }
        }
        self.slots[child.0].parent = Some(root);
        Ok(())
    }

    /// Append `key: value` to a mapping, taking ownership of `value`.
    pub fn push_entry(
        &mut self,
        map: NodeId,
        key: Scalar,
        value: NodeId,
    ) -> Result<(), TreeError> {
        self.ensure_detached(value)?;
        match &mut self.slots[map.0].node {
            Node::Mapping(entries) => entries.push(MapEntry { key, value }),
            other => {
                return Err(TreeError::WrongKind {
                    node: map,
                    expected: "mapping",
                    found: other.kind_name(),
                })
            }
        }
        self.slots[value.0].parent = Some(map);
        Ok(())
    }

    /// Append an element to a sequence, taking ownership of `item`.
    pub fn push_item(&mut self, seq: NodeId, item: NodeId) -> Result<(), TreeError> {
        self.ensure_detached(item)?;
        match &mut self.slots[seq.0].node {
            Node::Sequence(items) => items.push(item),
            other => {
                return Err(TreeError::WrongKind {
                    node: seq,
                    expected: "sequence",
                    found: other.kind_name(),
                })
            }
        }
        self.slots[item.0].parent = Some(seq);
        Ok(())
    }

    fn ensure_detached(&self, id: NodeId) -> Result<(), TreeError> {
        match self.parent(id) {
            Some(parent) => Err(TreeError::AlreadyAttached { node: id, parent }),
            None if id == self.root => Err(TreeError::AlreadyAttached {
                node: id,
                parent: self.root,
            }),
            None => Ok(()),
        }
    }

    /// First member of `map` whose key text equals `name`.
    pub fn member(&self, map: NodeId, name: &str) -> Option<NodeId> {
        match self.node(map) {
            Node::Mapping(entries) => entries
                .iter()
                .find(|entry| entry.key.value == name)
                .map(|entry| entry.value),
            _ => None,
        }
    }

    /// Text of a scalar node; `None` for every other kind.
    pub fn scalar_text(&self, id: NodeId) -> Option<&str> {
        self.node(id).as_scalar().map(|scalar| scalar.value.as_str())
    }

    /// Build a detached subtree mirroring `value`.
    pub fn graft(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Null => self.add_scalar(Scalar::null()),
            Value::Bool(b) => self.add_scalar(Scalar::bool(*b)),
            Value::Int(i) => self.add_scalar(Scalar::int(*i)),
            Value::Float(f) => {
                self.add_scalar(Scalar::new(format_float(*f), Some(ScalarTag::Float)))
            }
            Value::String(s) => self.add_scalar(Scalar::string(s.as_str())),
            Value::Mapping(entries) => {
                let map = self.add_mapping();
                let mut built = Vec::with_capacity(entries.len());
                for (key, child) in entries {
                    let child = self.graft(child);
                    self.slots[child.0].parent = Some(map);
                    built.push(MapEntry {
                        key: Scalar::string(key.as_str()),
                        value: child,
                    });
                }
                self.slots[map.0].node = Node::Mapping(built);
                map
            }
            Value::Sequence(items) => {
                let seq = self.add_sequence();
                let mut built = Vec::with_capacity(items.len());
                for item in items {
                    let child = self.graft(item);
                    self.slots[child.0].parent = Some(seq);
                    built.push(child);
                }
                self.slots[seq.0].node = Node::Sequence(built);
                seq
            }
        }
    }

    /// Replace the content of `target` with the content of the detached node
    /// `source`. `target` keeps its handle and its place in its parent; the
    /// children of `source` are re-parented under `target`.
    pub fn overwrite(&mut self, target: NodeId, source: NodeId) {
        if target == source {
            return;
        }
        let node = std::mem::replace(&mut self.slots[source.0].node, Node::Sequence(Vec::new()));
        for child in node.children() {
            self.slots[child.0].parent = Some(target);
        }
        self.slots[target.0].node = node;
    }

    /// Set the content of `target` to a scalar, dropping whatever it held.
    pub fn set_scalar(&mut self, target: NodeId, scalar: Scalar) {
        self.slots[target.0].node = Node::Scalar(scalar);
    }

    /// Mutable access to a scalar node's content.
    pub fn scalar_mut(&mut self, id: NodeId) -> Option<&mut Scalar> {
        match &mut self.slots[id.0].node {
            Node::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    /// Remove `target` from the mapping or sequence that owns it.
    ///
    /// Sibling order is preserved. Returns `false` when the node has no
    /// container to be removed from (already detached, or the document child).
    pub fn detach(&mut self, target: NodeId) -> bool {
        let Some(parent) = self.parent(target) else {
            return false;
        };
        let removed = match &mut self.slots[parent.0].node {
            Node::Mapping(entries) => match entries.iter().position(|e| e.value == target) {
                Some(pos) => {
                    entries.remove(pos);
                    true
                }
                None => false,
            },
            Node::Sequence(items) => match items.iter().position(|item| *item == target) {
                Some(pos) => {
                    items.remove(pos);
                    true
                }
                None => false,
            },
            Node::Document(_) | Node::Scalar(_) | Node::Alias(_) => false,
        };
        if removed {
            self.slots[target.0].parent = None;
        }
        removed
    }
}
