//! The four mutation actions.
//!
//! Every action mutates nodes in place through their handles, so matched
//! nodes keep their position inside the parent container.

use crate::engine::errors::EngineError;
use crate::path::{find, find_with_where, Address, WhereClause};
use crate::tree::{NodeId, Scalar, Tree};
use crate::value::Value;
use log::debug;
use regex::Regex;

/// Overwrite every matched node with a structure built from `value`.
pub fn replace(tree: &mut Tree, address: &Address, value: &Value) -> Result<usize, EngineError> {
    let nodes = require_nodes(tree, address)?;
    for id in &nodes {
        let replacement = tree.graft(value);
        tree.overwrite(*id, replacement);
    }
    Ok(nodes.len())
}

/// Like [`replace`], but strings, integers and booleans become explicitly
/// tagged scalars regardless of what the node held before.
pub fn set(tree: &mut Tree, address: &Address, value: &Value) -> Result<usize, EngineError> {
    let nodes = require_nodes(tree, address)?;
    for id in &nodes {
        match value {
            Value::String(s) => tree.set_scalar(*id, Scalar::string(s.as_str())),
            Value::Int(i) => tree.set_scalar(*id, Scalar::int(*i)),
            Value::Bool(b) => tree.set_scalar(*id, Scalar::bool(*b)),
            other => {
                let replacement = tree.graft(other);
                tree.overwrite(*id, replacement);
            }
        }
    }
    Ok(nodes.len())
}

/// Remove every matched node (optionally filtered) from its container.
///
/// Resolving to zero candidates is a successful no-op.
pub fn delete(
    tree: &mut Tree,
    address: &Address,
    where_clause: Option<&WhereClause>,
) -> Result<usize, EngineError> {
    let targets = find_with_where(tree, address, where_clause)?;
    if targets.is_empty() {
        debug!("delete '{address}': nothing to remove");
        return Ok(0);
    }
    Ok(targets.into_iter().filter(|id| tree.detach(*id)).count())
}

/// Substitute `pattern` with `replacement` in every matched scalar.
///
/// Non-scalar matches are skipped. `replacement` may use `$1` / `${name}`
/// capture references.
pub fn regex_replace(
    tree: &mut Tree,
    address: &Address,
    pattern: &Regex,
    replacement: &str,
) -> Result<usize, EngineError> {
    let nodes = require_nodes(tree, address)?;
    let mut rewritten = 0;
    for id in nodes {
        let Some(scalar) = tree.scalar_mut(id) else {
            continue;
        };
        let text = pattern.replace_all(&scalar.value, replacement).into_owned();
        if text != scalar.value {
            scalar.value = text;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

fn require_nodes(tree: &Tree, address: &Address) -> Result<Vec<NodeId>, EngineError> {
    let nodes = find(tree, address)?;
    if nodes.is_empty() {
        return Err(EngineError::NoNodesFound {
            path: address.to_string(),
        });
    }
    Ok(nodes)
}
