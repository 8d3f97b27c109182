//! Element-level predicates: selector conditions and delete where-clauses.

use crate::cache::get_or_compile_regex;
use crate::path::ast::{Condition, Operator};
use crate::path::errors::{NavError, ParseError};
use crate::path::navigator::resolve;
use crate::tree::{NodeId, Tree};
use regex::Regex;

/// Member that where-clauses inspect.
pub const NAME_FIELD: &str = "name";

/// Evaluate `condition` against one sequence element.
///
/// The element must be a mapping holding `condition.field` with a scalar
/// value; anything else is "no match". Comparison is textual, so `3` and
/// `"3"` are equal.
pub fn matches_condition(
    tree: &Tree,
    element: NodeId,
    condition: &Condition,
) -> Result<bool, NavError> {
    let Some(text) = member_text(tree, element, &condition.field)? else {
        return Ok(false);
    };

    Ok(match &condition.operator {
        Operator::Equal(value) => text == value,
        Operator::NotEqual(value) => text != value,
        Operator::RegexMatch(re) => re.is_match(text),
    })
}

/// Scalar text of `element.field`, looking through aliases.
fn member_text<'t>(
    tree: &'t Tree,
    element: NodeId,
    field: &str,
) -> Result<Option<&'t str>, NavError> {
    let element = resolve(tree, element)?;
    let Some(value) = tree.member(element, field) else {
        return Ok(None);
    };
    let value = resolve(tree, value)?;
    Ok(tree.scalar_text(value))
}

/// Delete-only post-filter over the `name` member of each candidate.
///
/// All configured checks must pass. Empty include/exclude lists count as
/// unset.
#[derive(Debug, Clone, Default)]
pub struct WhereClause {
    name_regex: Option<Regex>,
    name_in: Vec<String>,
    name_not_in: Vec<String>,
}

impl WhereClause {
    pub fn new(
        name_regex: Option<&str>,
        name_in: Vec<String>,
        name_not_in: Vec<String>,
    ) -> Result<Self, ParseError> {
        let name_regex = match name_regex.filter(|pattern| !pattern.is_empty()) {
            Some(pattern) => Some(get_or_compile_regex(pattern).map_err(|err| {
                ParseError::new(pattern, pattern, format!("invalid name_regex: {err}"))
            })?),
            None => None,
        };
        Ok(Self {
            name_regex,
            name_in,
            name_not_in,
        })
    }

    /// Candidates without a non-empty `name` are rejected outright.
    pub fn matches(&self, tree: &Tree, candidate: NodeId) -> Result<bool, NavError> {
        let name = match member_text(tree, candidate, NAME_FIELD)? {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(false),
        };

        if let Some(re) = &self.name_regex {
            if !re.is_match(name) {
                return Ok(false);
            }
        }

        if self.name_not_in.iter().any(|excluded| excluded == name) {
            return Ok(false);
        }

        if !self.name_in.is_empty() && !self.name_in.iter().any(|included| included == name) {
            return Ok(false);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{Node, Scalar};
    use crate::value::Value;

    fn tree(yaml: &str) -> Tree {
        Tree::from_value(&serde_yaml::from_str::<Value>(yaml).unwrap())
    }

    fn condition(field: &str, operator: Operator) -> Condition {
        Condition {
            field: field.to_string(),
            operator,
        }
    }

    #[test]
    fn equality_is_textual() {
        let tree = tree("port: 3\n");
        let element = tree.document_child().unwrap();
        assert!(matches_condition(&tree, element, &condition("port", Operator::Equal("3".into()))).unwrap());
        assert!(!matches_condition(&tree, element, &condition("port", Operator::NotEqual("3".into()))).unwrap());
    }

    #[test]
    fn absent_field_never_matches() {
        let tree = tree("name: a\n");
        let element = tree.document_child().unwrap();
        assert!(!matches_condition(&tree, element, &condition("other", Operator::NotEqual("x".into()))).unwrap());
    }

    #[test]
    fn regex_operator() {
        let tree = tree("name: SW_AGENT\n");
        let element = tree.document_child().unwrap();
        let re = get_or_compile_regex("^SW_").unwrap();
        assert!(matches_condition(&tree, element, &condition("name", Operator::RegexMatch(re))).unwrap());
    }

    #[test]
    fn non_mapping_element_never_matches() {
        let mut tree = Tree::new();
        let scalar = tree.add_scalar(Scalar::string("name"));
        tree.attach_document(scalar).unwrap();
        assert!(!matches_condition(&tree, scalar, &condition("name", Operator::Equal("name".into()))).unwrap());
    }

    #[test]
    fn alias_element_is_followed() {
        let mut tree = tree("name: web\n");
        let target = tree.document_child().unwrap();
        let alias = tree.add(Node::Alias(target));
        assert!(matches_condition(&tree, alias, &condition("name", Operator::Equal("web".into()))).unwrap());
    }

    #[test]
    fn where_clause_checks_are_conjunctive() {
        let tree = tree("name: foo3\n");
        let candidate = tree.document_child().unwrap();

        let clause = WhereClause::new(Some("^foo"), vec![], vec!["foo1".into()]).unwrap();
        assert!(clause.matches(&tree, candidate).unwrap());

        let clause = WhereClause::new(Some("^foo"), vec!["foo1".into()], vec![]).unwrap();
        assert!(!clause.matches(&tree, candidate).unwrap());

        let clause = WhereClause::new(Some("^bar"), vec![], vec![]).unwrap();
        assert!(!clause.matches(&tree, candidate).unwrap());
    }

    #[test]
    fn where_clause_rejects_nameless_candidates() {
        let tree = tree("image: nginx\n");
        let candidate = tree.document_child().unwrap();
        let clause = WhereClause::default();
        assert!(!clause.matches(&tree, candidate).unwrap());
    }

    #[test]
    fn where_clause_validates_regex_up_front() {
        let err = WhereClause::new(Some("(oops"), vec![], vec![]).unwrap_err();
        assert!(err.message.contains("invalid name_regex"));
    }
}
