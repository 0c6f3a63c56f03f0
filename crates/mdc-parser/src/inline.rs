//! Inline MDC syntax
//!
//! Runs over the children of a closed element and rewrites text runs:
//!
//! - `{{ value || 'default' }}` becomes a `binding`
//! - `:name[label]{attrs}` and `:name{attrs}` become inline components
//! - `[label]{attrs}` becomes a `span`
//! - `{attrs}` right after an element is merged into that element

use crate::attributes::{attribute_block_end, parse_attributes};
use crate::markdown::append_node;
use mdc_ast::{Attrs, MarkupNode};
use serde_json::Value;
use std::collections::BTreeMap;
use std::ops::Range;

/// Stands in for a non-text sibling in the flattened text
const OBJECT: char = '\u{FFFC}';

/// Siblings flattened into one string, with elements kept aside by offset.
///
/// Markdown inside a label (`:badge[**New**]`) has already been parsed, so a
/// label can span several siblings.
struct Flat {
    text: String,
    objects: BTreeMap<usize, MarkupNode>,
}

impl Flat {
    fn new(children: Vec<MarkupNode>) -> Self {
        let mut text = String::new();
        let mut objects = BTreeMap::new();
        for node in children {
            match node {
                MarkupNode::Text(s) => text.push_str(&s),
                other => {
                    objects.insert(text.len(), other);
                    text.push(OBJECT);
                }
            }
        }
        Self { text, objects }
    }

    fn has_objects(&self, range: Range<usize>) -> bool {
        self.objects.range(range).next().is_some()
    }

    fn is_element_before(&self, pos: usize) -> bool {
        pos.checked_sub(OBJECT.len_utf8())
            .and_then(|offset| self.objects.get(&offset))
            .is_some_and(|node| matches!(node, MarkupNode::Element(_)))
    }

    /// Move the nodes of `range` into `out`
    fn drain_into(&mut self, range: Range<usize>, out: &mut Vec<MarkupNode>) {
        let offsets: Vec<usize> = self.objects.range(range.clone()).map(|(k, _)| *k).collect();
        let mut start = range.start;
        for offset in offsets {
            append_node(out, MarkupNode::text(&self.text[start..offset]));
            if let Some(node) = self.objects.remove(&offset) {
                out.push(node);
            }
            start = offset + OBJECT.len_utf8();
        }
        append_node(out, MarkupNode::text(&self.text[start..range.end]));
    }
}

/// Apply inline MDC syntax to a list of sibling nodes
pub fn apply(children: Vec<MarkupNode>) -> Vec<MarkupNode> {
    if !children.iter().any(MarkupNode::is_text) {
        return children;
    }

    let mut flat = Flat::new(children);
    let mut out: Vec<MarkupNode> = Vec::new();
    let mut pos = 0;
    let mut plain_start = 0;

    while pos < flat.text.len() {
        let rest = &flat.text[pos..];

        // Trailing attributes of the preceding element
        if !rest.starts_with("{{")
            && flat.is_element_before(pos)
            && let Some(end) = attribute_block_end(rest)
            && !flat.has_objects(pos..pos + end)
            && let Ok(attrs) = parse_attributes(&rest[..end])
        {
            flat.drain_into(plain_start..pos, &mut out);
            if let Some(MarkupNode::Element(prev)) = out.last_mut() {
                merge_attrs(&mut prev.attrs, attrs);
            }
            pos += end;
            plain_start = pos;
            continue;
        }

        let parsed = if rest.starts_with("{{") {
            parse_binding(rest).filter(|(_, len)| !flat.has_objects(pos..pos + len))
        } else if rest.starts_with(':') && !preceded_by_word(&flat.text, pos) {
            parse_inline_component(rest, pos, &flat)
        } else if rest.starts_with('[') {
            parse_span(rest, pos, &flat)
        } else {
            None
        };

        match parsed {
            Some((Pending { tag, attrs, label }, len)) => {
                flat.drain_into(plain_start..pos, &mut out);
                let mut label_nodes = Vec::new();
                if let Some(label) = label {
                    flat.drain_into(label, &mut label_nodes);
                }
                out.push(MarkupNode::element(tag, attrs, apply(label_nodes)));
                pos += len;
                plain_start = pos;
            }
            None => {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    let end = flat.text.len();
    flat.drain_into(plain_start..end, &mut out);
    out
}

/// A recognized construct whose label still lives in the flattened text
struct Pending {
    tag: String,
    attrs: Attrs,
    /// Absolute byte range of the label content
    label: Option<Range<usize>>,
}

fn preceded_by_word(text: &str, pos: usize) -> bool {
    text[..pos]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric())
}

fn merge_attrs(target: &mut Attrs, attrs: Attrs) {
    for (key, value) in attrs {
        if key == "class"
            && let (Some(existing), Some(added)) =
                (target.get("class").and_then(Value::as_str), value.as_str())
        {
            let joined = format!("{} {}", existing, added);
            target.insert(key, Value::String(joined));
            continue;
        }
        target.insert(key, value);
    }
}

/// `{{ value || 'default' }}`
fn parse_binding(s: &str) -> Option<(Pending, usize)> {
    let body_end = s[2..].find("}}")?;
    let body = &s[2..2 + body_end];
    if body.contains('\n') {
        return None;
    }

    let (value, default) = match body.split_once("||") {
        Some((value, default)) => (value.trim(), Some(default.trim())),
        None => (body.trim(), None),
    };
    if value.is_empty() {
        return None;
    }

    let mut attrs = Attrs::new();
    attrs.insert("value".to_string(), Value::String(value.to_string()));
    if let Some(default) = default {
        attrs.insert("defaultValue".to_string(), default_value(default));
    }
    let pending = Pending {
        tag: "binding".to_string(),
        attrs,
        label: None,
    };
    Some((pending, 2 + body_end + 2))
}

fn default_value(raw: &str) -> Value {
    for quote in ['\'', '"'] {
        if let Some(inner) = raw
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return Value::String(inner.to_string());
        }
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// `:name[label]{attrs}` or `:name{attrs}`
fn parse_inline_component(s: &str, at: usize, flat: &Flat) -> Option<(Pending, usize)> {
    let name_len = s[1..]
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(s.len() - 1);
    let name = &s[1..1 + name_len];
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut pos = 1 + name_len;
    let mut label = None;

    if s[pos..].starts_with('[')
        && let Some(end) = label_end(&s[pos..])
    {
        label = Some(at + pos + 1..at + pos + end - 1);
        pos += end;
    }

    let mut attrs = None;
    if let Some(end) = attribute_block_end(&s[pos..])
        && !flat.has_objects(at + pos..at + pos + end)
        && let Ok(parsed) = parse_attributes(&s[pos..pos + end])
    {
        attrs = Some(parsed);
        pos += end;
    }

    if label.is_none() && attrs.is_none() {
        return None;
    }
    let pending = Pending {
        tag: name.to_string(),
        attrs: attrs.unwrap_or_default(),
        label,
    };
    Some((pending, pos))
}

/// `[label]{attrs}`
fn parse_span(s: &str, at: usize, flat: &Flat) -> Option<(Pending, usize)> {
    let end = label_end(s)?;
    let attr_end = attribute_block_end(&s[end..])?;
    if flat.has_objects(at + end..at + end + attr_end) {
        return None;
    }
    let attrs = parse_attributes(&s[end..end + attr_end]).ok()?;
    let pending = Pending {
        tag: "span".to_string(),
        attrs,
        label: Some(at + 1..at + end - 1),
    };
    Some((pending, end + attr_end))
}

/// Byte offset just past the `]` matching the `[` at the start of `s`
fn label_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => depth += 1,
            ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use crate::markdown::parse_blocks;
    use mdc_ast::MarkupNode;
    use serde_json::{Value, json};

    fn wire(source: &str) -> Value {
        let nodes = parse_blocks(source);
        Value::Array(nodes.iter().map(MarkupNode::to_wire).collect())
    }

    #[test]
    fn test_inline_component() {
        assert_eq!(
            wire("Try :badge[**New**]{color=\"red\"} now"),
            json!([[
                "p",
                {},
                "Try ",
                ["badge", {"color": "red"}, ["strong", {}, "New"]],
                " now"
            ]])
        );
    }

    #[test]
    fn test_inline_component_without_label() {
        assert_eq!(
            wire(":icon{name=\"star\"}"),
            json!([["p", {}, ["icon", {"name": "star"}]]])
        );
    }

    #[test]
    fn test_colon_inside_words_and_emoji() {
        assert_eq!(
            wire("ratio a:b{c} and :smile: here"),
            json!([["p", {}, "ratio a:b{c} and :smile: here"]])
        );
    }

    #[test]
    fn test_span() {
        assert_eq!(
            wire("[hot]{.red style=\"font-weight:bold\"}"),
            json!([["p", {}, ["span", {"style": "font-weight:bold", "class": "red"}, "hot"]]])
        );
    }

    #[test]
    fn test_binding() {
        assert_eq!(
            wire("Hi {{ $doc.name || 'you' }}!"),
            json!([[
                "p",
                {},
                "Hi ",
                ["binding", {"value": "$doc.name", "defaultValue": "you"}],
                "!"
            ]])
        );
    }

    #[test]
    fn test_trailing_attributes() {
        assert_eq!(
            wire("[x](https://a.dev){target=\"_blank\"} and **b**{.hi}"),
            json!([[
                "p",
                {},
                ["a", {"href": "https://a.dev", "target": "_blank"}, "x"],
                " and ",
                ["strong", {"class": "hi"}, "b"]
            ]])
        );
    }
}
