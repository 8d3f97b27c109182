use super::{emit, is_blank, CodecError, Sink};
use crate::cache::get_or_compile_regex;
use crate::tree::{Node, NodeId, Scalar, ScalarTag, Tree};
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;

// Plain-scalar resolution of the YAML core schema.
const NULL_TEXT: &str = r"^(~|null|Null|NULL|)$";
const BOOL_TEXT: &str = r"^(true|True|TRUE|false|False|FALSE)$";
const INT_TEXT: &str = r"^[-+]?([0-9]+|0x[0-9a-fA-F]+|0o[0-7]+|0b[01]+)$";
const FLOAT_TEXT: &str =
    r"^([-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?|[-+]?\.(inf|Inf|INF)|\.(nan|NaN|NAN))$";

/// Two passes over the same stream: the first resolves structure and scalar
/// types, the second collects every scalar's text as written.
pub(super) fn parse(text: &str) -> Result<Vec<Tree>, CodecError> {
    if is_blank(text) {
        return Ok(vec![Tree::new()]);
    }

    let mut shapes = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        let shape = Value::deserialize(document)?;
        check_keys(&shape)?;
        shapes.push(shape);
    }

    let mut documents = Vec::with_capacity(shapes.len());
    for (document, shape) in serde_yaml::Deserializer::from_str(text).zip(&shapes) {
        let mut tree = Tree::new();
        let child = Shaped {
            shape,
            tree: &mut tree,
        }
        .deserialize(document)?;
        tree.attach_document(child)?;
        documents.push(tree);
    }
    if documents.is_empty() {
        documents.push(Tree::new());
    }
    Ok(documents)
}

fn check_keys(value: &Value) -> Result<(), CodecError> {
    match value {
        Value::Mapping(map) => {
            for (key, child) in map {
                if tag_of(key).is_none() {
                    return Err(CodecError::UnsupportedKey {
                        kind: kind_name(key),
                    });
                }
                check_keys(child)?;
            }
            Ok(())
        }
        Value::Sequence(items) => items.iter().try_for_each(check_keys),
        Value::Tagged(tagged) => check_keys(&tagged.value),
        _ => Ok(()),
    }
}

/// Resolved type of a scalar shape; `None` for collections.
fn tag_of(value: &Value) -> Option<ScalarTag> {
    match value {
        Value::Null => Some(ScalarTag::Null),
        Value::Bool(_) => Some(ScalarTag::Bool),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(ScalarTag::Int),
        Value::Number(_) => Some(ScalarTag::Float),
        Value::String(_) => Some(ScalarTag::Str),
        // Custom tags (`!Ref x`) are dropped; the tagged value is kept.
        Value::Tagged(tagged) => tag_of(&tagged.value),
        Value::Sequence(_) | Value::Mapping(_) => None,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged",
    }
}

/// Builds the node for one value, following the shape from the first pass.
struct Shaped<'s, 't> {
    shape: &'s Value,
    tree: &'t mut Tree,
}

impl<'de> DeserializeSeed<'de> for Shaped<'_, '_> {
    type Value = NodeId;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<NodeId, D::Error> {
        match self.shape {
            Value::Tagged(tagged) => Shaped {
                shape: &tagged.value,
                tree: self.tree,
            }
            .deserialize(deserializer),
            Value::Mapping(_) => deserializer.deserialize_map(self),
            Value::Sequence(_) => deserializer.deserialize_seq(self),
            shape => {
                let scalar = SourceText { shape }.deserialize(deserializer)?;
                Ok(self.tree.add_scalar(scalar))
            }
        }
    }
}

impl<'de> Visitor<'de> for Shaped<'_, '_> {
    type Value = NodeId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a mapping or sequence")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<NodeId, A::Error> {
        let Value::Mapping(entries) = self.shape else {
            return Err(de::Error::custom("unexpected mapping"));
        };
        let tree = self.tree;
        let id = tree.add_mapping();
        for (key_shape, value_shape) in entries {
            let key = access
                .next_key_seed(SourceText { shape: key_shape })?
                .ok_or_else(|| de::Error::custom("mapping ended early"))?;
            let child = access.next_value_seed(Shaped {
                shape: value_shape,
                tree: &mut *tree,
            })?;
            tree.push_entry(id, key, child).map_err(de::Error::custom)?;
        }
        Ok(id)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<NodeId, A::Error> {
        let Value::Sequence(items) = self.shape else {
            return Err(de::Error::custom("unexpected sequence"));
        };
        let tree = self.tree;
        let id = tree.add_sequence();
        for item_shape in items {
            let child = access
                .next_element_seed(Shaped {
                    shape: item_shape,
                    tree: &mut *tree,
                })?
                .ok_or_else(|| de::Error::custom("sequence ended early"))?;
            tree.push_item(id, child).map_err(de::Error::custom)?;
        }
        Ok(id)
    }
}

/// A scalar's text as written, tagged with the type resolved by the first pass.
struct SourceText<'s> {
    shape: &'s Value,
}

impl<'de> DeserializeSeed<'de> for SourceText<'_> {
    type Value = Scalar;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Scalar, D::Error> {
        let tag = tag_of(self.shape).ok_or_else(|| de::Error::custom("expected a scalar"))?;
        let text = deserializer.deserialize_str(TextVisitor)?;
        Ok(Scalar::new(text, Some(tag)))
    }
}

struct TextVisitor;

impl<'de> Visitor<'de> for TextVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a scalar")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
        Ok(value.to_owned())
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
        Ok(value)
    }
}

/// Block-style output: nested mappings indent by two, sequences sit at the
/// indentation of their key.
pub(super) fn render(tree: &Tree, id: NodeId) -> Result<String, CodecError> {
    if matches!(tree.node(id), Node::Document(None)) {
        return Ok(String::new());
    }
    let block = emit(tree, id, &mut YamlSink)?;
    let mut out = String::new();
    match &block {
        Block::Scalar(text) if text.is_empty() => out.push_str("null\n"),
        Block::Scalar(text) => {
            out.push_str(text);
            out.push('\n');
        }
        Block::Mapping(entries) if entries.is_empty() => out.push_str("{}\n"),
        Block::Sequence(items) if items.is_empty() => out.push_str("[]\n"),
        Block::Mapping(entries) => write_mapping(entries, 0, false, &mut out),
        Block::Sequence(items) => write_sequence(items, 0, false, &mut out),
    }
    Ok(out)
}

/// Rendered node with scalars already in their final textual form.
enum Block {
    Scalar(String),
    Sequence(Vec<Block>),
    Mapping(Vec<(String, Block)>),
}

struct YamlSink;

impl Sink for YamlSink {
    type Output = Block;

    fn empty(&mut self) -> Block {
        Block::Scalar(String::new())
    }

    fn scalar(&mut self, scalar: &Scalar) -> Result<Block, CodecError> {
        scalar_text(scalar).map(Block::Scalar)
    }

    fn sequence(&mut self, items: Vec<Block>) -> Block {
        Block::Sequence(items)
    }

    fn mapping(&mut self, entries: Vec<(&Scalar, Block)>) -> Result<Block, CodecError> {
        let mut out = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            out.push((scalar_text(key)?, value));
        }
        Ok(Block::Mapping(out))
    }
}

/// Typed scalars are written as-is while their text still reads as their
/// tag; everything else is written as a (possibly quoted) string.
fn scalar_text(scalar: &Scalar) -> Result<String, CodecError> {
    match scalar.tag {
        Some(tag) if tag != ScalarTag::Str && reads_as(tag, &scalar.value) => {
            Ok(scalar.value.clone())
        }
        _ => quote(&scalar.value),
    }
}

fn reads_as(tag: ScalarTag, text: &str) -> bool {
    let pattern = match tag {
        ScalarTag::Null => NULL_TEXT,
        ScalarTag::Bool => BOOL_TEXT,
        ScalarTag::Int => INT_TEXT,
        ScalarTag::Float => FLOAT_TEXT,
        ScalarTag::Str => return false,
    };
    get_or_compile_regex(pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// String scalar as a single line, quoted only when plain text would read
/// as something else.
fn quote(text: &str) -> Result<String, CodecError> {
    let rendered = serde_yaml::to_string(text)?;
    let rendered = rendered.strip_suffix('\n').unwrap_or(&rendered);
    if rendered.contains('\n') {
        // block and folded styles depend on indentation; JSON strings are
        // valid double-quoted YAML
        return Ok(serde_json::to_string(text)?);
    }
    Ok(rendered.to_string())
}

fn pad(indent: usize, out: &mut String) {
    out.extend(std::iter::repeat(' ').take(indent));
}

fn write_mapping(entries: &[(String, Block)], indent: usize, inline_first: bool, out: &mut String) {
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 || !inline_first {
            pad(indent, out);
        }
        out.push_str(key);
        out.push(':');
        match value {
            Block::Scalar(text) if text.is_empty() => out.push('\n'),
            Block::Scalar(text) => {
                out.push(' ');
                out.push_str(text);
                out.push('\n');
            }
            Block::Mapping(children) if children.is_empty() => out.push_str(" {}\n"),
            Block::Sequence(items) if items.is_empty() => out.push_str(" []\n"),
            Block::Mapping(children) => {
                out.push('\n');
                write_mapping(children, indent + 2, false, out);
            }
            Block::Sequence(items) => {
                out.push('\n');
                write_sequence(items, indent, false, out);
            }
        }
    }
}

fn write_sequence(items: &[Block], indent: usize, inline_first: bool, out: &mut String) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 || !inline_first {
            pad(indent, out);
        }
        out.push('-');
        match item {
            Block::Scalar(text) if text.is_empty() => out.push('\n'),
            Block::Scalar(text) => {
                out.push(' ');
                out.push_str(text);
                out.push('\n');
            }
            Block::Mapping(children) if children.is_empty() => out.push_str(" {}\n"),
            Block::Sequence(children) if children.is_empty() => out.push_str(" []\n"),
            Block::Mapping(children) => {
                out.push(' ');
                write_mapping(children, indent + 2, true, out);
            }
            Block::Sequence(children) => {
                out.push(' ');
                write_sequence(children, indent + 2, true, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::{compile, find};

    fn round_trip(text: &str) -> String {
        let trees = parse(text).unwrap();
        render(&trees[0], trees[0].root()).unwrap()
    }

    #[test]
    fn int_tag_renders_unquoted() {
        let mut tree = Tree::new();
        let map = tree.add_mapping();
        tree.attach_document(map).unwrap();
        let n = tree.add_scalar(Scalar::int(3));
        tree.push_entry(map, Scalar::plain("replicas"), n).unwrap();
        let s = tree.add_scalar(Scalar::string("3"));
        tree.push_entry(map, Scalar::plain("label"), s).unwrap();

        assert_eq!(render(&tree, tree.root()).unwrap(), "replicas: 3\nlabel: '3'\n");
    }

    #[test]
    fn untouched_numbers_keep_their_text() {
        let text = "a: 1.10\nb: 0x1F\nc: 1e3\nd: ~\ne: -0.50\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn numeric_scalars_store_source_text() {
        let trees = parse("version: 1.10\n1.10: key\n").unwrap();
        let tree = &trees[0];
        let map = tree.document_child().unwrap();
        let version = tree.member(map, "version").unwrap();
        assert_eq!(
            tree.node(version),
            &Node::Scalar(Scalar::new("1.10", Some(ScalarTag::Float)))
        );
        assert!(tree.member(map, "1.10").is_some());
    }

    #[test]
    fn conditions_compare_source_text() {
        let trees =
            parse("items:\n- version: 1.10\n  tag: a\n- version: 0x1F\n  tag: b\n").unwrap();
        let tree = &trees[0];

        let found = find(tree, &compile("items[version=1.10].tag").unwrap()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(tree.scalar_text(found[0]), Some("a"));

        let found = find(tree, &compile("items[version=0x1F].tag").unwrap()).unwrap();
        assert_eq!(tree.scalar_text(found[0]), Some("b"));
    }

    #[test]
    fn typed_text_that_no_longer_reads_as_its_tag_is_quoted() {
        let scalar = Scalar::new("", Some(ScalarTag::Int));
        assert_eq!(scalar_text(&scalar).unwrap(), "''");
        let inf = Scalar::new(".inf", Some(ScalarTag::Float));
        assert_eq!(scalar_text(&inf).unwrap(), ".inf");
    }

    #[test]
    fn multi_line_strings_stay_on_one_line() {
        let mut tree = Tree::new();
        let map = tree.add_mapping();
        tree.attach_document(map).unwrap();
        let s = tree.add_scalar(Scalar::string("first\nsecond"));
        tree.push_entry(map, Scalar::plain("note"), s).unwrap();

        assert_eq!(
            render(&tree, tree.root()).unwrap(),
            "note: \"first\\nsecond\"\n"
        );
    }

    #[test]
    fn nested_layout() {
        let text = "a:\n  b:\n  - x: 1\n    y: []\n  - - p\n    - q\n  c: {}\n  d:\n";
        assert_eq!(round_trip(text), text);
    }

    #[test]
    fn sequence_key_is_rejected() {
        let err = parse("? [a, b]\n: c\n").unwrap_err();
        assert!(matches!(err, CodecError::UnsupportedKey { kind: "sequence" }));
    }

    #[test]
    fn anchors_are_resolved_by_the_parser() {
        assert_eq!(
            round_trip("base: &b {x: 1}\ncopy: *b\n"),
            "base:\n  x: 1\ncopy:\n  x: 1\n"
        );
    }

    #[test]
    fn comments_are_not_carried_over() {
        assert_eq!(round_trip("# header\na: 1 # trailing\n"), "a: 1\n");
    }
}
