//! Attribute block parsing
//!
//! `{#id .class key="value" key='value' flag count=3 :data='{"a":1}'}`

use mdc_ast::Attrs;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum AttributeError {
    #[error("Attribute block must be wrapped in braces")]
    MissingBraces,

    #[error("Unterminated quoted value for `{0}`")]
    UnterminatedQuote(String),

    #[error("Missing attribute name before `=`")]
    MissingName,
}

/// Parse an attribute block including its braces
pub fn parse_attributes(block: &str) -> Result<Attrs, AttributeError> {
    let inner = block
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or(AttributeError::MissingBraces)?;

    let mut attrs = Attrs::new();
    let mut classes: Vec<String> = Vec::new();
    let mut rest = inner.trim_start();

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('#') {
            let (id, tail) = take_bare(after);
            if !id.is_empty() {
                attrs.insert("id".to_string(), Value::String(id.to_string()));
            }
            rest = tail;
        } else if let Some(after) = rest.strip_prefix('.') {
            let (class, tail) = take_bare(after);
            if !class.is_empty() {
                classes.push(class.to_string());
            }
            rest = tail;
        } else {
            let end = rest
                .find(|c: char| c.is_whitespace() || c == '=')
                .unwrap_or(rest.len());
            let key = &rest[..end];
            let tail = &rest[end..];
            if key.is_empty() {
                return Err(AttributeError::MissingName);
            }

            if let Some(value_src) = tail.strip_prefix('=') {
                let (value, tail) = take_value(key, value_src)?;
                insert_value(&mut attrs, key, value);
                rest = tail;
            } else {
                attrs.insert(key.to_string(), Value::Bool(true));
                rest = tail;
            }
        }
        rest = rest.trim_start();
    }

    if !classes.is_empty() {
        let joined = match attrs.get("class").and_then(Value::as_str) {
            Some(existing) => format!("{} {}", existing, classes.join(" ")),
            None => classes.join(" "),
        };
        attrs.insert("class".to_string(), Value::String(joined));
    }

    Ok(attrs)
}

/// Byte offset just past the `}` closing an attribute block that starts at
/// the beginning of `text`, skipping braces inside quotes
pub fn attribute_block_end(text: &str) -> Option<usize> {
    if !text.starts_with('{') {
        return None;
    }
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            '\n' => return None,
            _ => {}
        }
    }
    None
}

/// A raw value as written; quoted values stay strings
enum RawValue<'a> {
    Quoted(String),
    Bare(&'a str),
}

fn take_bare(s: &str) -> (&str, &str) {
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    (&s[..end], &s[end..])
}

fn take_value<'a>(key: &str, s: &'a str) -> Result<(RawValue<'a>, &'a str), AttributeError> {
    let Some(quote) = s.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        let (bare, tail) = take_bare(s);
        return Ok((RawValue::Bare(bare), tail));
    };

    let mut value = String::new();
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        if escaped {
            if c != quote && c != '\\' {
                value.push('\\');
            }
            value.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Ok((RawValue::Quoted(value), &s[i + c.len_utf8()..]));
        } else {
            value.push(c);
        }
    }
    Err(AttributeError::UnterminatedQuote(key.to_string()))
}

fn insert_value(attrs: &mut Attrs, key: &str, raw: RawValue<'_>) {
    // `:key` carries a JSON value
    if let Some(name) = key.strip_prefix(':') {
        let text = match &raw {
            RawValue::Quoted(s) => s.as_str(),
            RawValue::Bare(s) => s,
        };
        let value = serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
        attrs.insert(name.to_string(), value);
        return;
    }

    let value = match raw {
        RawValue::Quoted(s) => Value::String(s),
        RawValue::Bare(s) => bare_value(s),
    };
    attrs.insert(key.to_string(), value);
}

fn bare_value(s: &str) -> Value {
    match s {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }
    if let Ok(n) = s.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(f) = s.parse::<f64>()
        && let Some(n) = serde_json::Number::from_f64(f)
        && s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Value::Number(n);
    }
    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(s: &str) -> Value {
        Value::Object(parse_attributes(s).unwrap())
    }

    #[test]
    fn test_id_and_classes() {
        assert_eq!(
            parse("{#intro .note .wide}"),
            json!({"id": "intro", "class": "note wide"})
        );
    }

    #[test]
    fn test_quoted_values() {
        assert_eq!(
            parse(r#"{type="info" title='Say "hi"' label="a \"b\""}"#),
            json!({"type": "info", "title": "Say \"hi\"", "label": "a \"b\""})
        );
    }

    #[test]
    fn test_bare_values_are_typed() {
        assert_eq!(
            parse("{count=3 ratio=0.5 open=false name=demo flag}"),
            json!({"count": 3, "ratio": 0.5, "open": false, "name": "demo", "flag": true})
        );
    }

    #[test]
    fn test_json_prefixed_values() {
        assert_eq!(
            parse(r#"{:items='["a","b"]' :broken='{oops'}"#),
            json!({"items": ["a", "b"], "broken": "{oops"})
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let attrs = parse_attributes("{z=1 a=2 m=3}").unwrap();
        let keys: Vec<&str> = attrs.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            parse_attributes("{title=\"open}"),
            Err(AttributeError::UnterminatedQuote("title".to_string()))
        );
        assert_eq!(parse_attributes("{=x}"), Err(AttributeError::MissingName));
        assert_eq!(parse_attributes("title"), Err(AttributeError::MissingBraces));
    }

    #[test]
    fn test_block_end() {
        assert_eq!(attribute_block_end("{a=\"}\"} rest"), Some(7));
        assert_eq!(attribute_block_end("{a=1"), None);
        assert_eq!(attribute_block_end("x{}"), None);
    }
}
