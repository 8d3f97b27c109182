//! Text <-> [`Tree`] conversion for YAML and JSON documents.
//!
//! Parsing keeps mapping order and the textual form of scalars, tagging each
//! scalar with the type the parser resolved. Rendering expands aliases and
//! turns tagged scalars back into typed values, so an integer written by
//! `set` comes out unquoted.

pub mod errors;
mod json;
mod yaml;

pub use errors::CodecError;

use crate::tree::{Node, NodeId, Scalar, Tree};
use std::path::Path;

const BOM: &str = "\u{feff}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Json,
}

impl Format {
    /// `.yaml`/`.yml` and `.json`; `None` for anything else.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Some(Format::Yaml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

/// Every document of one source text, plus what is needed to write it back.
#[derive(Debug, Clone)]
pub struct Stream {
    pub format: Format,
    pub bom: bool,
    pub documents: Vec<Tree>,
}

impl Stream {
    pub fn parse(text: &str, format: Format) -> Result<Self, CodecError> {
        let (bom, body) = match text.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let documents = match format {
            Format::Yaml => yaml::parse(body)?,
            Format::Json => vec![json::parse(body)?],
        };
        Ok(Self {
            format,
            bom,
            documents,
        })
    }

    pub fn render(&self) -> Result<String, CodecError> {
        let mut out = String::new();
        if self.bom {
            out.push_str(BOM);
        }
        match self.format {
            Format::Yaml => {
                for (i, tree) in self.documents.iter().enumerate() {
                    if i > 0 {
                        out.push_str("---\n");
                    }
                    out.push_str(&yaml::render(tree, tree.root())?);
                }
            }
            Format::Json => match self.documents.as_slice() {
                [tree] => out.push_str(&json::render(tree, tree.root())?),
                other => return Err(CodecError::DocumentCount { count: other.len() }),
            },
        }
        Ok(out)
    }
}

/// Parse text that must hold exactly one YAML document.
pub fn parse_yaml_document(text: &str) -> Result<Tree, CodecError> {
    let mut stream = Stream::parse(text, Format::Yaml)?;
    match stream.documents.len() {
        1 => Ok(stream.documents.remove(0)),
        count => Err(CodecError::DocumentCount { count }),
    }
}

pub fn render_yaml_document(tree: &Tree) -> Result<String, CodecError> {
    yaml::render(tree, tree.root())
}

/// Render the subtree rooted at `id` in `format`.
pub fn render_node(tree: &Tree, id: NodeId, format: Format) -> Result<String, CodecError> {
    match format {
        Format::Yaml => yaml::render(tree, id),
        Format::Json => json::render(tree, id),
    }
}

/// Target-specific construction of rendered values.
trait Sink {
    type Output;

    fn empty(&mut self) -> Self::Output;
    fn scalar(&mut self, scalar: &Scalar) -> Result<Self::Output, CodecError>;
    fn sequence(&mut self, items: Vec<Self::Output>) -> Self::Output;
    fn mapping(&mut self, entries: Vec<(&Scalar, Self::Output)>)
        -> Result<Self::Output, CodecError>;
}

fn emit<S: Sink>(tree: &Tree, id: NodeId, sink: &mut S) -> Result<S::Output, CodecError> {
    let mut active = Vec::new();
    emit_node(tree, id, sink, &mut active)
}

// `active` holds the aliases currently being expanded.
fn emit_node<S: Sink>(
    tree: &Tree,
    id: NodeId,
    sink: &mut S,
    active: &mut Vec<NodeId>,
) -> Result<S::Output, CodecError> {
    match tree.node(id) {
        Node::Document(None) => Ok(sink.empty()),
        Node::Document(Some(child)) => emit_node(tree, *child, sink, active),
        Node::Scalar(scalar) => sink.scalar(scalar),
        Node::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(emit_node(tree, *item, sink, active)?);
            }
            Ok(sink.sequence(out))
        }
        Node::Mapping(entries) => {
            let mut out = Vec::with_capacity(entries.len());
            for entry in entries {
                out.push((&entry.key, emit_node(tree, entry.value, sink, active)?));
            }
            sink.mapping(out)
        }
        Node::Alias(target) => {
            if active.contains(&id) {
                return Err(CodecError::AliasCycle { node: id });
            }
            active.push(id);
            let out = emit_node(tree, *target, sink, active);
            active.pop();
            out
        }
    }
}

/// Float text as written by YAML (`.inf`, `-.inf`, `.nan`) or Rust.
fn parse_float(text: &str) -> Option<f64> {
    match text {
        ".inf" | "+.inf" | ".Inf" | ".INF" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" | "-.INF" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

fn is_blank(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}
