use crate::tree::NodeId;
use thiserror::Error;

/// A path expression (or an embedded regex) could not be compiled.
///
/// `fragment` is the offending segment or selector text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid path '{input}' at '{fragment}': {message}")]
pub struct ParseError {
    pub input: String,
    pub fragment: String,
    pub message: String,
}

impl ParseError {
    pub(crate) fn new(
        input: impl Into<String>,
        fragment: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            input: input.into(),
            fragment: fragment.into(),
            message: message.into(),
        }
    }
}

/// Resolution of an address against a tree failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error("empty document")]
    EmptyDocument,

    #[error("field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{field}' not found")]
    NotFound { field: String },

    #[error("index {index} out of range for '{field}' (len: {len})")]
    OutOfRange {
        field: String,
        index: i64,
        len: usize,
    },

    #[error("no elements of '{field}' match condition [{condition}]")]
    NoMatch { field: String, condition: String },

    #[error("alias cycle detected at node {node}")]
    Cycle { node: NodeId },
}
