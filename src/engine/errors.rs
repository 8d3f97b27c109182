use crate::path::{NavError, ParseError};
use crate::rules::Action;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("parse path: {0}")]
    Parse(#[from] ParseError),

    #[error("find nodes: {0}")]
    Navigation(#[from] NavError),

    #[error("no nodes found for '{path}'")]
    NoNodesFound { path: String },

    #[error("invalid value for {action}: {message}")]
    ValueType { action: Action, message: String },

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl EngineError {
    /// True for failures that mean "the target is not in this document", which
    /// callers may choose to skip via `continue_on_not_found`.
    pub fn is_not_found(&self) -> bool {
        match self {
            EngineError::NoNodesFound { .. } => true,
            EngineError::Navigation(err) => matches!(
                err,
                NavError::NotFound { .. }
                    | NavError::OutOfRange { .. }
                    | NavError::NoMatch { .. }
                    | NavError::EmptyDocument
            ),
            _ => false,
        }
    }
}
