use crate::cache::get_or_compile_regex;
use crate::path::{compile, ParseError, WhereClause};
use crate::value::Value;
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct RuleSet {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Check every rule, collecting all problems before failing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.rules.is_empty() {
            issues.push(ValidationIssue::EmptyRuleList);
        }

        for (index, rule) in self.rules.iter().enumerate() {
            rule.collect_issues(index, &mut issues);
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Replace,
    Set,
    Delete,
    RegexReplace,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Replace => "replace",
            Action::Set => "set",
            Action::Delete => "delete",
            Action::RegexReplace => "regex_replace",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declarative edit.
#[derive(Debug, Deserialize, Clone)]
pub struct Rule {
    pub action: Action,
    pub path: String,
    /// Payload for replace/set; replacement string for regex_replace
    #[serde(default)]
    pub value: Option<Value>,
    /// Pattern for regex_replace
    #[serde(default)]
    pub pattern: Option<String>,
    /// Delete-only filter on the `name` member of each candidate
    #[serde(default, rename = "where")]
    pub where_clause: Option<WhereSpec>,
    /// Skip this rule instead of failing the document when its target is missing
    #[serde(default)]
    pub continue_on_not_found: bool,
}

impl Rule {
    pub fn new(action: Action, path: impl Into<String>) -> Self {
        Self {
            action,
            path: path.into(),
            value: None,
            pattern: None,
            where_clause: None,
            continue_on_not_found: false,
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_where(mut self, where_clause: WhereSpec) -> Self {
        self.where_clause = Some(where_clause);
        self
    }

    pub fn continue_on_not_found(mut self, enabled: bool) -> Self {
        self.continue_on_not_found = enabled;
        self
    }

    /// Compile the where-clause, if any.
    pub fn compiled_where(&self) -> Result<Option<WhereClause>, ParseError> {
        self.where_clause
            .as_ref()
            .map(WhereSpec::compile)
            .transpose()
    }

    fn collect_issues(&self, index: usize, issues: &mut Vec<ValidationIssue>) {
        if self.path.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                rule: index,
                field: "path",
            });
        } else if let Err(err) = compile(&self.path) {
            issues.push(ValidationIssue::InvalidPath {
                rule: index,
                message: err.to_string(),
            });
        }

        match self.action {
            Action::Replace | Action::Set => {
                if self.value.is_none() {
                    issues.push(ValidationIssue::MissingField {
                        rule: index,
                        field: "value",
                    });
                }
            }
            Action::RegexReplace => {
                match self.pattern.as_deref() {
                    None | Some("") => issues.push(ValidationIssue::MissingField {
                        rule: index,
                        field: "pattern",
                    }),
                    Some(pattern) => {
                        if let Err(err) = get_or_compile_regex(pattern) {
                            issues.push(ValidationIssue::InvalidCombo {
                                rule: index,
                                message: format!("invalid pattern: {err}"),
                            });
                        }
                    }
                }
                match &self.value {
                    None => issues.push(ValidationIssue::MissingField {
                        rule: index,
                        field: "value",
                    }),
                    Some(Value::String(_)) => {}
                    Some(other) => issues.push(ValidationIssue::InvalidCombo {
                        rule: index,
                        message: format!(
                            "value must be a string for regex_replace, found {}",
                            other.type_name()
                        ),
                    }),
                }
            }
            Action::Delete => {}
        }

        if let Some(where_clause) = &self.where_clause {
            if self.action != Action::Delete {
                issues.push(ValidationIssue::InvalidCombo {
                    rule: index,
                    message: format!("where is only supported for delete, not {}", self.action),
                });
            }
            if let Err(err) = where_clause.compile() {
                issues.push(ValidationIssue::InvalidCombo {
                    rule: index,
                    message: err.message,
                });
            }
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct WhereSpec {
    #[serde(default)]
    pub name_regex: Option<String>,
    #[serde(default)]
    pub name_in: Vec<String>,
    #[serde(default)]
    pub name_not_in: Vec<String>,
}

impl WhereSpec {
    pub fn compile(&self) -> Result<WhereClause, ParseError> {
        WhereClause::new(
            self.name_regex.as_deref(),
            self.name_in.clone(),
            self.name_not_in.clone(),
        )
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleList,
    MissingField { rule: usize, field: &'static str },
    InvalidPath { rule: usize, message: String },
    InvalidCombo { rule: usize, message: String },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleList => write!(f, "rule file contains no rules"),
            ValidationIssue::MissingField { rule, field } => {
                write!(f, "rule #{} missing required field '{field}'", rule + 1)
            }
            ValidationIssue::InvalidPath { rule, message } => {
                write!(f, "rule #{} has an invalid path: {message}", rule + 1)
            }
            ValidationIssue::InvalidCombo { rule, message } => {
                write!(f, "rule #{} has invalid configuration: {message}", rule + 1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issues(rules: Vec<Rule>) -> Vec<ValidationIssue> {
        RuleSet {
            meta: Metadata::default(),
            rules,
        }
        .validate()
        .err()
        .map(|err| err.issues)
        .unwrap_or_default()
    }

    #[test]
    fn empty_rule_list_is_rejected() {
        assert_eq!(issues(vec![]), vec![ValidationIssue::EmptyRuleList]);
    }

    #[test]
    fn replace_requires_value() {
        let found = issues(vec![Rule::new(Action::Replace, "a.b")]);
        assert_eq!(
            found,
            vec![ValidationIssue::MissingField {
                rule: 0,
                field: "value"
            }]
        );
    }

    #[test]
    fn regex_replace_requires_string_value_and_pattern() {
        let found = issues(vec![Rule::new(Action::RegexReplace, "a").with_value(3)]);
        assert_eq!(found.len(), 2);
        assert!(found.contains(&ValidationIssue::MissingField {
            rule: 0,
            field: "pattern"
        }));
        assert!(found[1].to_string().contains("value must be a string"));
    }

    #[test]
    fn invalid_path_is_reported_with_index() {
        let found = issues(vec![
            Rule::new(Action::Delete, "ok.path"),
            Rule::new(Action::Delete, "bad[path"),
        ]);
        assert_eq!(found.len(), 1);
        assert!(matches!(found[0], ValidationIssue::InvalidPath { rule: 1, .. }));
    }

    #[test]
    fn where_only_on_delete() {
        let found = issues(vec![Rule::new(Action::Set, "a")
            .with_value("x")
            .with_where(WhereSpec::default())]);
        assert_eq!(found.len(), 1);
        assert!(found[0].to_string().contains("only supported for delete"));
    }

    #[test]
    fn all_issues_are_collected() {
        let found = issues(vec![
            Rule::new(Action::Replace, ""),
            Rule::new(Action::RegexReplace, "a")
                .with_pattern("(")
                .with_value("x"),
        ]);
        assert_eq!(found.len(), 3);
    }
}
