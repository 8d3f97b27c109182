use crate::path::ast::{Address, Segment, Selector};
use crate::path::errors::NavError;
use crate::path::matcher::{matches_condition, WhereClause};
use crate::tree::{Node, NodeId, Tree};

/// Resolve `address` against `tree`, returning matches in document order.
///
/// The node reached by the last segment is returned as is; documents and
/// aliases are only looked through on the way down.
pub fn find(tree: &Tree, address: &Address) -> Result<Vec<NodeId>, NavError> {
    find_from(tree, tree.root(), address.segments())
}

/// [`find`], then keep only candidates accepted by `where_clause`.
pub fn find_with_where(
    tree: &Tree,
    address: &Address,
    where_clause: Option<&WhereClause>,
) -> Result<Vec<NodeId>, NavError> {
    let candidates = find(tree, address)?;

    let Some(clause) = where_clause else {
        return Ok(candidates);
    };

    let mut results = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if clause.matches(tree, candidate)? {
            results.push(candidate);
        }
    }
    Ok(results)
}

/// Look through documents and aliases until a content node is reached.
pub(crate) fn resolve(tree: &Tree, mut id: NodeId) -> Result<NodeId, NavError> {
    let mut seen = Vec::new();
    loop {
        let next = match tree.node(id) {
            Node::Document(Some(child)) => *child,
            Node::Document(None) => return Err(NavError::EmptyDocument),
            Node::Alias(target) => *target,
            _ => return Ok(id),
        };
        if seen.contains(&id) {
            return Err(NavError::Cycle { node: id });
        }
        seen.push(id);
        id = next;
    }
}

fn find_from(tree: &Tree, node: NodeId, segments: &[Segment]) -> Result<Vec<NodeId>, NavError> {
    let Some((segment, rest)) = segments.split_first() else {
        return Ok(vec![node]);
    };

    let node = resolve(tree, node)?;

    match segment {
        Segment::Field(field) => {
            let value = member_of(tree, node, field)?;
            find_from(tree, value, rest)
        }
        Segment::ArrayAccess { field, selector } => {
            let value = member_of(tree, node, field)?;
            let seq = resolve(tree, value)?;
            let items = match tree.node(seq) {
                Node::Sequence(items) => items,
                other => {
                    return Err(NavError::TypeMismatch {
                        field: field.clone(),
                        expected: "sequence",
                        found: other.kind_name(),
                    })
                }
            };

            match selector {
                Selector::Wildcard => {
                    let mut results = Vec::new();
                    for item in items {
                        collect_lenient(tree, *item, rest, &mut results)?;
                    }
                    Ok(results)
                }
                Selector::Index(index) => {
                    let item = usize::try_from(*index)
                        .ok()
                        .and_then(|idx| items.get(idx))
                        .ok_or_else(|| NavError::OutOfRange {
                            field: field.clone(),
                            index: *index,
                            len: items.len(),
                        })?;
                    find_from(tree, *item, rest)
                }
                Selector::Condition(condition) => {
                    let mut results = Vec::new();
                    for item in items {
                        if matches_condition(tree, *item, condition)? {
                            collect_lenient(tree, *item, rest, &mut results)?;
                        }
                    }
                    // Unlike a wildcard, a condition with no survivors fails the lookup.
                    if results.is_empty() {
                        return Err(NavError::NoMatch {
                            field: field.clone(),
                            condition: condition.to_string(),
                        });
                    }
                    Ok(results)
                }
            }
        }
    }
}

/// Resolve the remaining segments under one element; elements that do not
/// resolve are skipped. Alias cycles still abort.
fn collect_lenient(
    tree: &Tree,
    item: NodeId,
    rest: &[Segment],
    results: &mut Vec<NodeId>,
) -> Result<(), NavError> {
    match find_from(tree, item, rest) {
        Ok(found) => results.extend(found),
        Err(err @ NavError::Cycle { .. }) => return Err(err),
        Err(_) => {}
    }
    Ok(())
}

fn member_of(tree: &Tree, node: NodeId, field: &str) -> Result<NodeId, NavError> {
    match tree.node(node) {
        Node::Mapping(_) => tree.member(node, field).ok_or_else(|| NavError::NotFound {
            field: field.to_string(),
        }),
        other => Err(NavError::TypeMismatch {
            field: field.to_string(),
            expected: "mapping",
            found: other.kind_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::compile;
    use crate::tree::Scalar;
    use crate::value::Value;

    fn tree(yaml: &str) -> Tree {
        Tree::from_value(&serde_yaml::from_str::<Value>(yaml).unwrap())
    }

    fn texts(tree: &Tree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| tree.scalar_text(*id).unwrap_or("<non-scalar>").to_string())
            .collect()
    }

    const POD: &str = r#"
spec:
  containers:
    - name: nginx
      image: old
    - name: other
      image: x
"#;

    #[test]
    fn condition_selects_single_scalar() {
        let tree = tree(POD);
        let found = find(&tree, &compile("spec.containers[name=nginx].image").unwrap()).unwrap();
        assert_eq!(texts(&tree, &found), vec!["old"]);
    }

    #[test]
    fn wildcard_keeps_sequence_order_and_skips_misses() {
        let tree = tree(
            r#"
items:
  - value: a
  - other: b
  - value: c
"#,
        );
        let found = find(&tree, &compile("items[*].value").unwrap()).unwrap();
        assert_eq!(texts(&tree, &found), vec!["a", "c"]);

        let found = find(&tree, &compile("items[*].missing").unwrap()).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn condition_with_no_survivors_is_an_error() {
        let tree = tree(POD);
        let err = find(&tree, &compile("spec.containers[name=redis].image").unwrap()).unwrap_err();
        assert!(matches!(err, NavError::NoMatch { .. }));

        // matching element whose remainder does not resolve
        let err = find(&tree, &compile("spec.containers[name=nginx].ports").unwrap()).unwrap_err();
        assert!(matches!(err, NavError::NoMatch { .. }));
    }

    #[test]
    fn index_bounds() {
        let tree = tree(POD);
        for idx in 0..2 {
            let path = format!("spec.containers[{idx}].name");
            assert_eq!(find(&tree, &compile(&path).unwrap()).unwrap().len(), 1);
        }
        for idx in [-1, 2] {
            let path = format!("spec.containers[{idx}].name");
            let err = find(&tree, &compile(&path).unwrap()).unwrap_err();
            assert!(matches!(err, NavError::OutOfRange { index, len: 2, .. } if index == idx));
        }
    }

    #[test]
    fn type_mismatch_and_not_found() {
        let tree = tree(POD);
        let err = find(&tree, &compile("spec.containers.name").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            NavError::TypeMismatch {
                expected: "mapping",
                found: "sequence",
                ..
            }
        ));

        let err = find(&tree, &compile("spec.volumes[0]").unwrap()).unwrap_err();
        assert!(matches!(err, NavError::NotFound { ref field } if field == "volumes"));

        let err = find(&tree, &compile("spec.missing").unwrap()).unwrap_err();
        assert_eq!(
            err,
            NavError::NotFound {
                field: "missing".to_string()
            }
        );
    }

    #[test]
    fn field_must_be_sequence_for_selector() {
        let tree = tree("spec:\n  name: x\n");
        let err = find(&tree, &compile("spec.name[0]").unwrap()).unwrap_err();
        assert!(matches!(
            err,
            NavError::TypeMismatch {
                expected: "sequence",
                ..
            }
        ));
    }

    #[test]
    fn empty_document_fails() {
        let tree = Tree::new();
        let err = find(&tree, &compile("a").unwrap()).unwrap_err();
        assert_eq!(err, NavError::EmptyDocument);
    }

    #[test]
    fn aliases_are_transparent_on_the_way_down() {
        let mut tree = tree("base:\n  image: nginx\n");
        let root = tree.document_child().unwrap();
        let base = tree.member(root, "base").unwrap();
        let alias = tree.add_alias(base);
        tree.push_entry(root, Scalar::plain("copy"), alias).unwrap();

        let found = find(&tree, &compile("copy.image").unwrap()).unwrap();
        assert_eq!(found, find(&tree, &compile("base.image").unwrap()).unwrap());

        // the final node is not unwrapped
        assert_eq!(find(&tree, &compile("copy").unwrap()).unwrap(), vec![alias]);
    }

    #[test]
    fn alias_cycle_is_reported() {
        let mut tree = tree("a: 1\n");
        let root = tree.document_child().unwrap();
        let first = tree.add_alias(root);
        let second = tree.add_alias(first);
        // point the first alias at the second to close the loop
        let looped = tree.add(Node::Alias(second));
        tree.overwrite(first, looped);
        tree.push_entry(root, Scalar::plain("loop"), first).unwrap();

        let err = find(&tree, &compile("loop.a").unwrap()).unwrap_err();
        assert!(matches!(err, NavError::Cycle { .. }));
    }

    #[test]
    fn where_clause_filters_candidates() {
        let tree = tree(
            r#"
env:
  - name: foo1
  - name: foo2
  - name: foo3
  - name: foo4
"#,
        );
        let clause = WhereClause::new(None, vec![], vec!["foo1".into(), "foo2".into()]).unwrap();
        let found = find_with_where(&tree, &compile("env[?]").unwrap(), Some(&clause)).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|id| tree.scalar_text(tree.member(*id, "name").unwrap()).unwrap())
            .collect();
        assert_eq!(names, vec!["foo3", "foo4"]);

        let all = find_with_where(&tree, &compile("env[*]").unwrap(), None).unwrap();
        assert_eq!(all.len(), 4);
    }
}
