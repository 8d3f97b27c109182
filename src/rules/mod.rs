pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError, RuleFormat};
pub use schema::{
    Action, Metadata, Rule, RuleSet, ValidationError, ValidationIssue, WhereSpec,
};
