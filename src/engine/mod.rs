//! Rule application.
//!
//! A rule's path is compiled, resolved against the current state of the
//! tree, and the matched nodes are rewritten in place. Zero-match handling
//! differs per action: `delete` treats it as a no-op, every other action
//! reports [`EngineError::NoNodesFound`].

pub mod errors;
pub mod operations;

pub use errors::EngineError;
pub use operations::{delete, regex_replace, replace, set};

use crate::cache::get_or_compile_regex;
use crate::path::compile;
use crate::rules::{Action, Rule};
use crate::tree::Tree;
use crate::value::Value;
use log::debug;

/// Apply one rule to `tree`, returning the number of nodes changed.
pub fn apply(tree: &mut Tree, rule: &Rule) -> Result<usize, EngineError> {
    let address = compile(&rule.path)?;

    let changed = match rule.action {
        Action::Replace => replace(tree, &address, required_value(rule)?)?,
        Action::Set => set(tree, &address, required_value(rule)?)?,
        Action::Delete => {
            let where_clause = rule.compiled_where()?;
            delete(tree, &address, where_clause.as_ref())?
        }
        Action::RegexReplace => {
            let pattern = match rule.pattern.as_deref() {
                Some(pattern) if !pattern.is_empty() => pattern,
                _ => {
                    return Err(EngineError::ValueType {
                        action: rule.action,
                        message: "pattern is required".to_string(),
                    })
                }
            };
            let replacement = match required_value(rule)? {
                Value::String(s) => s,
                other => {
                    return Err(EngineError::ValueType {
                        action: rule.action,
                        message: format!("replacement must be a string, found {}", other.type_name()),
                    })
                }
            };
            let re = get_or_compile_regex(pattern).map_err(|err| EngineError::InvalidPattern {
                pattern: pattern.to_string(),
                message: err.to_string(),
            })?;
            regex_replace(tree, &address, &re, replacement)?
        }
    };

    debug!("{} '{}': {} node(s) changed", rule.action, address, changed);
    Ok(changed)
}

fn required_value(rule: &Rule) -> Result<&Value, EngineError> {
    rule.value.as_ref().ok_or_else(|| EngineError::ValueType {
        action: rule.action,
        message: "value is required".to_string(),
    })
}
