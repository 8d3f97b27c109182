use super::{emit, is_blank, parse_float, CodecError, Sink};
use crate::tree::{Node, NodeId, Scalar, ScalarTag, Tree};
use serde_json::{Map, Number, Value};

pub(super) fn parse(text: &str) -> Result<Tree, CodecError> {
    let mut tree = Tree::new();
    if is_blank(text) {
        return Ok(tree);
    }
    let value: Value = serde_json::from_str(text)?;
    let child = build(&mut tree, &value)?;
    tree.attach_document(child)?;
    Ok(tree)
}

fn build(tree: &mut Tree, value: &Value) -> Result<NodeId, CodecError> {
    let id = match value {
        Value::Null => tree.add_scalar(Scalar::null()),
        Value::Bool(b) => tree.add_scalar(Scalar::bool(*b)),
        Value::Number(n) => {
            // arbitrary_precision keeps the digits as written
            let text = n.to_string();
            let tag = if text.contains(['.', 'e', 'E']) {
                ScalarTag::Float
            } else {
                ScalarTag::Int
            };
            tree.add_scalar(Scalar::new(text, Some(tag)))
        }
        Value::String(s) => tree.add_scalar(Scalar::string(s.as_str())),
        Value::Array(items) => {
            let id = tree.add_sequence();
            for item in items {
                let child = build(tree, item)?;
                tree.push_item(id, child)?;
            }
            id
        }
        Value::Object(map) => {
            let id = tree.add_mapping();
            for (key, child) in map {
                let child = build(tree, child)?;
                tree.push_entry(id, Scalar::string(key.as_str()), child)?;
            }
            id
        }
    };
    Ok(id)
}

/// Pretty-printed with two-space indentation and a trailing newline.
pub(super) fn render(tree: &Tree, id: NodeId) -> Result<String, CodecError> {
    if matches!(tree.node(id), Node::Document(None)) {
        return Ok(String::new());
    }
    let value = emit(tree, id, &mut JsonSink)?;
    let mut out = serde_json::to_string_pretty(&value)?;
    out.push('\n');
    Ok(out)
}

struct JsonSink;

impl Sink for JsonSink {
    type Output = Value;

    fn empty(&mut self) -> Value {
        Value::Null
    }

    fn scalar(&mut self, scalar: &Scalar) -> Result<Value, CodecError> {
        let text = scalar.value.as_str();
        let value = match scalar.tag {
            Some(ScalarTag::Null) => Value::Null,
            Some(ScalarTag::Bool) => match text.parse() {
                Ok(b) => Value::Bool(b),
                Err(_) => Value::String(scalar.value.clone()),
            },
            Some(ScalarTag::Int) | Some(ScalarTag::Float) => number(scalar)?,
            Some(ScalarTag::Str) | None => Value::String(scalar.value.clone()),
        };
        Ok(value)
    }

    fn sequence(&mut self, items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    fn mapping(&mut self, entries: Vec<(&Scalar, Value)>) -> Result<Value, CodecError> {
        let mut map = Map::with_capacity(entries.len());
        for (key, value) in entries {
            map.insert(key.value.clone(), value);
        }
        Ok(Value::Object(map))
    }
}

/// Numeric text that is already valid JSON is written verbatim; YAML-only
/// spellings (`0x1F`, `+1`, `.5`) are converted, and text that no longer
/// parses falls back to a string.
fn number(scalar: &Scalar) -> Result<Value, CodecError> {
    let text = scalar.value.as_str();
    if let Ok(n) = serde_json::from_str::<Number>(text) {
        return Ok(Value::Number(n));
    }
    if let Some(i) = radix_int(text) {
        return Ok(Value::from(i));
    }
    match parse_float(text) {
        Some(f) => Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| CodecError::NonFiniteFloat {
                value: scalar.value.clone(),
            }),
        None => Ok(Value::String(scalar.value.clone())),
    }
}

fn radix_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}
