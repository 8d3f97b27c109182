//! Compiled path expressions.

use regex::Regex;
use std::fmt;

/// Ordered, non-empty list of segments produced by [`compile`](super::compile).
#[derive(Debug, Clone, PartialEq)]
pub struct Address {
    segments: Vec<Segment>,
}

impl Address {
    /// `segments` must not be empty; the parser guarantees it.
    pub(crate) fn new(segments: Vec<Segment>) -> Self {
        debug_assert!(!segments.is_empty());
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            if idx > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Plain member access: `spec`
    Field(String),
    /// Member access into a sequence, filtered: `containers[name=nginx]`
    ArrayAccess { field: String, selector: Selector },
}

impl Segment {
    pub fn field(&self) -> &str {
        match self {
            Segment::Field(field) => field,
            Segment::ArrayAccess { field, .. } => field,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Field(field) => f.write_str(field),
            Segment::ArrayAccess { field, selector } => write!(f, "{field}[{selector}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// `[*]` or `[?]`
    Wildcard,
    /// `[3]`; negative values parse but never resolve
    Index(i64),
    /// `[field=value]`, `[field!=value]`, `[field=@regex@]`
    Condition(Condition),
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Wildcard => f.write_str("*"),
            Selector::Index(index) => write!(f, "{index}"),
            Selector::Condition(condition) => write!(f, "{condition}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operator {
            Operator::Equal(value) => write!(f, "{}={}", self.field, value),
            Operator::NotEqual(value) => write!(f, "{}!={}", self.field, value),
            Operator::RegexMatch(re) => write!(f, "{}=@{}@", self.field, re.as_str()),
        }
    }
}

/// Comparison applied to the stringified scalar value of a condition field.
#[derive(Debug, Clone)]
pub enum Operator {
    Equal(String),
    NotEqual(String),
    /// Compiled when the path is compiled, never at match time.
    RegexMatch(Regex),
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Operator::Equal(a), Operator::Equal(b)) => a == b,
            (Operator::NotEqual(a), Operator::NotEqual(b)) => a == b,
            (Operator::RegexMatch(a), Operator::RegexMatch(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}
