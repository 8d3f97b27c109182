use crate::tree::{NodeId, TreeError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported mapping key of kind {kind}")]
    UnsupportedKey { kind: &'static str },

    #[error("alias cycle through node {node}")]
    AliasCycle { node: NodeId },

    #[error("expected exactly one document, found {count}")]
    DocumentCount { count: usize },

    #[error("float '{value}' has no JSON representation")]
    NonFiniteFloat { value: String },

    #[error(transparent)]
    Tree(#[from] TreeError),
}
