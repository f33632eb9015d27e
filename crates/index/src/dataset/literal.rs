//! Parsing of Python-literal fields.
//!
//! Raw movie rows embed structured values as Python reprs, e.g.
//! `[{'id': 16, 'name': 'Animation'}]` or `{'id': 10194, 'name': 'Toy Story Collection'}`.
//! These are parsed as data: `None`/`True`/`False` outside string literals are
//! rewritten to their JSON spellings and the result is read with `json5`,
//! which already accepts single-quoted strings. Nothing is ever evaluated.

use serde_json::Value;

/// Parse a Python literal into a JSON value.
pub fn parse_literal(input: &str) -> Result<Value, String> {
    json5::from_str(&rewrite_keywords(input)).map_err(|e| e.to_string())
}

/// Names from a list of `{'name': ...}` objects. Non-object items are ignored.
pub fn names(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(name).collect(),
        _ => Vec::new(),
    }
}

/// The `name` field of an object.
pub fn name(value: &Value) -> Option<String> {
    value
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn rewrite_keywords(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if c == '\'' || c == '"' {
            quote = Some(c);
            out.push(c);
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut word = String::from(c);
            while let Some(&next) = chars.peek() {
                if next.is_ascii_alphanumeric() || next == '_' {
                    word.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            out.push_str(match word.as_str() {
                "None" => "null",
                "True" => "true",
                "False" => "false",
                other => other,
            });
        } else {
            out.push(c);
        }
    }
    out
}
