//! YAML frontmatter extraction

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use tracing::warn;

fn frontmatter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)")
            .expect("valid frontmatter regex")
    })
}

/// Split a leading `---` block off the source.
///
/// Returns the YAML text (if any) and the remaining body.
pub fn split_frontmatter(source: &str) -> (Option<&str>, &str) {
    let Some(caps) = frontmatter_re().captures(source) else {
        return (None, source);
    };
    let end = caps.get(0).map_or(0, |m| m.end());
    let yaml = caps.get(1).map_or("", |m| m.as_str());
    (Some(yaml), &source[end..])
}

/// Decode frontmatter YAML.
///
/// A mapping becomes an object and an empty block becomes an empty object.
/// Anything else (a scalar, a list, or YAML that does not parse) is kept as
/// the raw string so it survives a round trip and can be reported later.
pub fn decode_frontmatter(yaml: &str) -> Value {
    if yaml.trim().is_empty() {
        return Value::Object(Map::new());
    }
    match serde_yaml::from_str::<Value>(yaml) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(Value::Null) => Value::Object(Map::new()),
        Ok(other) => {
            tracing::debug!(kind = mdc_ast::value_kind(&other), "frontmatter is not a mapping");
            Value::String(yaml.to_string())
        }
        Err(e) => {
            warn!("Failed to parse frontmatter: {}", e);
            Value::String(yaml.to_string())
        }
    }
}
