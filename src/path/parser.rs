use crate::cache::get_or_compile_regex;
use crate::path::ast::{Address, Condition, Operator, Segment, Selector};
use crate::path::errors::ParseError;

/// Compile a path expression into an [`Address`].
///
/// Supported syntax:
///   - `spec.template.spec`
///   - `containers[*]`, `env[?]` (wildcard)
///   - `containers[0]`
///   - `containers[name=foo]`, `containers[name!=foo]`
///   - `env[name=@^SW_.*$@]` (regex; dots and `]` inside `@...@` are literal)
pub fn compile(input: &str) -> Result<Address, ParseError> {
    if input.is_empty() {
        return Err(ParseError::new(input, "", "empty path"));
    }

    let segments = split_path(input)?
        .into_iter()
        .map(|part| parse_segment(input, part))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Address::new(segments))
}

/// Split on top-level dots: "spec.containers[name=a.b].env" -> ["spec", "containers[name=a.b]", "env"]
fn split_path(input: &str) -> Result<Vec<&str>, ParseError> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_bracket = false;
    let mut in_regex = false;
    let mut closed = false;

    for (idx, ch) in input.char_indices() {
        if closed && ch != '.' {
            return Err(ParseError::new(
                input,
                &input[start..],
                "unexpected characters after ']'",
            ));
        }

        match ch {
            '[' if !in_bracket => in_bracket = true,
            ']' if in_bracket && !in_regex => {
                in_bracket = false;
                closed = true;
            }
            ']' if !in_bracket => {
                return Err(ParseError::new(input, &input[start..=idx], "unmatched ']'"));
            }
            '@' if in_bracket => in_regex = !in_regex,
            '.' if !in_bracket => {
                let part = &input[start..idx];
                if part.is_empty() {
                    return Err(ParseError::new(
                        input,
                        input,
                        format!("empty segment at offset {idx}"),
                    ));
                }
                parts.push(part);
                start = idx + 1;
                closed = false;
            }
            _ => {}
        }
    }

    if in_bracket {
        let message = if in_regex {
            "unterminated regex literal"
        } else {
            "unmatched '['"
        };
        return Err(ParseError::new(input, &input[start..], message));
    }

    let last = &input[start..];
    if last.is_empty() {
        return Err(ParseError::new(input, input, "path ends with '.'"));
    }
    parts.push(last);

    Ok(parts)
}

fn parse_segment(input: &str, part: &str) -> Result<Segment, ParseError> {
    let Some(open) = part.find('[') else {
        return Ok(Segment::Field(part.to_string()));
    };

    let field = &part[..open];
    if field.is_empty() {
        return Err(ParseError::new(input, part, "missing field name before '['"));
    }

    // split_path only yields bracketed parts that end with their closing ']'
    let selector = parse_selector(input, &part[open + 1..part.len() - 1])?;

    Ok(Segment::ArrayAccess {
        field: field.to_string(),
        selector,
    })
}

fn parse_selector(input: &str, text: &str) -> Result<Selector, ParseError> {
    if text == "*" || text == "?" {
        return Ok(Selector::Wildcard);
    }

    if let Ok(index) = text.parse::<i64>() {
        return Ok(Selector::Index(index));
    }

    if let Some((field, value)) = text.split_once('=') {
        let (field, negated) = match field.strip_suffix('!') {
            Some(field) => (field, true),
            None => (field, false),
        };

        if field.is_empty() {
            return Err(ParseError::new(input, text, "field name cannot be empty"));
        }

        if let Some(pattern) = regex_literal(value) {
            if negated {
                return Err(ParseError::new(
                    input,
                    text,
                    "negated regex conditions are not supported",
                ));
            }
            if pattern.is_empty() {
                return Err(ParseError::new(input, text, "regex pattern cannot be empty"));
            }
            let re = get_or_compile_regex(pattern).map_err(|err| {
                ParseError::new(input, text, format!("invalid regex pattern: {err}"))
            })?;
            return Ok(Selector::Condition(Condition {
                field: field.to_string(),
                operator: Operator::RegexMatch(re),
            }));
        }

        let operator = if negated {
            Operator::NotEqual(value.to_string())
        } else {
            Operator::Equal(value.to_string())
        };
        return Ok(Selector::Condition(Condition {
            field: field.to_string(),
            operator,
        }));
    }

    if text.is_empty() {
        return Err(ParseError::new(input, text, "empty selector"));
    }

    Err(ParseError::new(
        input,
        text,
        format!("unknown selector syntax: {text}"),
    ))
}

fn regex_literal(value: &str) -> Option<&str> {
    if value == "@" {
        return Some("");
    }
    if value.len() >= 2 && value.starts_with('@') && value.ends_with('@') {
        return Some(&value[1..value.len() - 1]);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn field(name: &str) -> Segment {
        Segment::Field(name.to_string())
    }

    #[test]
    fn compile_plain_fields() {
        let address = compile("spec.template.spec").unwrap();
        assert_eq!(
            address.segments(),
            &[field("spec"), field("template"), field("spec")]
        );
    }

    #[test]
    fn compile_selectors() {
        let address = compile("spec.containers[name=nginx].env[*].value").unwrap();
        assert_eq!(address.len(), 4);
        assert_eq!(
            address.segments()[1],
            Segment::ArrayAccess {
                field: "containers".to_string(),
                selector: Selector::Condition(Condition {
                    field: "name".to_string(),
                    operator: Operator::Equal("nginx".to_string()),
                }),
            }
        );
        assert_eq!(
            address.segments()[2],
            Segment::ArrayAccess {
                field: "env".to_string(),
                selector: Selector::Wildcard,
            }
        );
    }

    #[test]
    fn question_mark_is_wildcard() {
        let address = compile("env[?]").unwrap();
        assert!(matches!(
            address.segments()[0],
            Segment::ArrayAccess {
                selector: Selector::Wildcard,
                ..
            }
        ));
    }

    #[test]
    fn negative_index_parses() {
        let address = compile("items[-1]").unwrap();
        assert!(matches!(
            address.segments()[0],
            Segment::ArrayAccess {
                selector: Selector::Index(-1),
                ..
            }
        ));
    }

    #[test]
    fn regex_literal_keeps_dots_and_brackets() {
        let address = compile("env[name=@^x.*\\]$@].value").unwrap();
        assert_eq!(address.len(), 2);
        match &address.segments()[0] {
            Segment::ArrayAccess {
                selector: Selector::Condition(condition),
                ..
            } => match &condition.operator {
                Operator::RegexMatch(re) => assert_eq!(re.as_str(), "^x.*\\]$"),
                other => panic!("unexpected operator {other:?}"),
            },
            other => panic!("unexpected segment {other:?}"),
        }
    }

    #[test]
    fn literal_value_splits_on_first_equals() {
        let address = compile("args[value=a=b]").unwrap();
        match &address.segments()[0] {
            Segment::ArrayAccess {
                selector: Selector::Condition(condition),
                ..
            } => {
                assert_eq!(condition.field, "value");
                assert_eq!(condition.operator, Operator::Equal("a=b".to_string()));
            }
            other => panic!("unexpected segment {other:?}"),
        }
    }

    #[test]
    fn not_equal_condition() {
        let address = compile("containers[name!=sidecar]").unwrap();
        match &address.segments()[0] {
            Segment::ArrayAccess {
                selector: Selector::Condition(condition),
                ..
            } => assert_eq!(condition.operator, Operator::NotEqual("sidecar".to_string())),
            other => panic!("unexpected segment {other:?}"),
        }
    }

    #[test]
    fn display_round_trips() {
        for text in [
            "spec.containers[name=nginx].image",
            "a[*].b[0].c",
            "env[name=@^SW_.*$@]",
            "x[k!=v]",
        ] {
            let address = compile(text).unwrap();
            assert_eq!(address.to_string(), text);
            assert_eq!(compile(&address.to_string()).unwrap(), address);
        }
    }

    #[test]
    fn rejects_malformed_paths() {
        let cases = [
            ("", "empty path"),
            ("a..b", "empty segment"),
            (".a", "empty segment"),
            ("a.", "ends with"),
            ("a[0", "unmatched '['"),
            ("a]0", "unmatched ']'"),
            ("a[0]b", "after ']'"),
            ("a[0][1]", "after ']'"),
            ("[0]", "missing field name"),
            ("a[=x]", "field name cannot be empty"),
            ("a[name=@@]", "regex pattern cannot be empty"),
            ("a[name=@(unclosed@]", "invalid regex pattern"),
            ("a[name=@abc]", "unterminated regex"),
            ("a[name!=@x@]", "negated regex"),
            ("a[]", "empty selector"),
            ("a[foo]", "unknown selector syntax"),
        ];
        for (input, expected) in cases {
            let err = compile(input).unwrap_err();
            assert!(
                err.message.contains(expected),
                "{input:?}: expected '{expected}' in '{}'",
                err.message
            );
            assert_eq!(err.input, input);
        }
    }

    #[test]
    fn error_carries_offending_selector() {
        let err = compile("spec.containers[bogus]").unwrap_err();
        assert_eq!(err.fragment, "bogus");
    }

    #[test]
    fn lookaround_is_rejected_at_compile_time() {
        // `regex` has no lookahead, lookbehind or backreferences
        for input in ["items[name=@^(?=web)@]", "items[name=@(?<!x)y@]", "items[name=@(a)\\1@]"] {
            let err = compile(input).unwrap_err();
            assert!(err.message.starts_with("invalid regex pattern"), "{input}: {}", err.message);
        }
    }

    proptest! {
        #[test]
        fn segment_count_matches_components(
            parts in prop::collection::vec(
                prop_oneof![
                    "[a-z][a-z0-9_-]{0,8}",
                    "[a-z]{1,6}\\[[0-9]{1,3}\\]",
                    "[a-z]{1,6}\\[\\*\\]",
                    "[a-z]{1,6}\\[[a-z]{1,4}=[a-z.]{1,6}\\]",
                    "[a-z]{1,6}\\[[a-z]{1,4}=@\\^[a-z.]{1,6}@\\]",
                ],
                1..6,
            )
        ) {
            let text = parts.join(".");
            let address = compile(&text).unwrap();
            prop_assert_eq!(address.len(), parts.len());
        }
    }
}
