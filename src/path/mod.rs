pub mod ast;
pub mod errors;
pub mod matcher;
pub mod navigator;
pub mod parser;

pub use ast::{Address, Condition, Operator, Segment, Selector};
pub use errors::{NavError, ParseError};
pub use matcher::{matches_condition, WhereClause, NAME_FIELD};
pub use navigator::{find, find_with_where};
pub use parser::compile;
