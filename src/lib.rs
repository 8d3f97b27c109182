//! YAML Patcher: rule-driven structural edits of YAML and JSON documents
//!
//! Documents are parsed into an order-preserving [`Tree`] whose nodes are
//! addressed by stable [`NodeId`] handles. Rules name their targets with a
//! small path language (`spec.containers[name=nginx].image`) and mutate the
//! matched nodes in place, so everything that was not targeted keeps its
//! position.
//!
//! # Architecture
//!
//! - [`path`] compiles path expressions and resolves them against a tree.
//! - [`engine`] applies one rule (`replace`, `set`, `delete`,
//!   `regex_replace`) to one tree.
//! - [`rules`] loads and validates rule files (TOML or YAML).
//! - [`codec`] converts YAML and JSON text to and from trees.
//! - [`processor`] runs a rule set over files and directories with atomic
//!   writes, backups and dry runs.
//!
//! # Example
//!
//! ```
//! use yaml_patcher::{apply, codec, Action, Rule};
//!
//! let mut tree = codec::parse_yaml_document("spec:\n  replicas: 1\n").unwrap();
//! let rule = Rule::new(Action::Set, "spec.replicas").with_value(3);
//! assert_eq!(apply(&mut tree, &rule).unwrap(), 1);
//! assert_eq!(
//!     codec::render_yaml_document(&tree).unwrap(),
//!     "spec:\n  replicas: 3\n"
//! );
//! ```

pub mod cache;
pub mod codec;
pub mod engine;
pub mod path;
pub mod processor;
pub mod rules;
pub mod tree;
pub mod value;

// Re-exports
pub use codec::{CodecError, Format, Stream};
pub use engine::{apply, EngineError};
pub use path::{compile, find, find_with_where, Address, NavError, ParseError, WhereClause};
pub use processor::{
    BatchReport, FileReport, ProcessError, ProcessOptions, Processor, RuleFailure, RuleOutcome,
};
pub use rules::{
    load_from_path, load_from_str, Action, ConfigError, Rule, RuleFormat, RuleSet,
    ValidationError, WhereSpec,
};
pub use tree::{Node, NodeId, Scalar, ScalarTag, Tree, TreeError};
pub use value::Value;
