use crate::tree::NodeId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {node} is a {found}, expected {expected}")]
    WrongKind {
        node: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("node {node} is already attached to {parent}")]
    AlreadyAttached { node: NodeId, parent: NodeId },

    #[error("document already has a root node")]
    DocumentOccupied,
}
