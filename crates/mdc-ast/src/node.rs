//! Markup AST types
//!
//! The compact element tree produced by the markdown + component parser and
//! consumed by the markdown writer. On the wire an element is
//! `[tag, attrs, ...children]`, a comment is `[null, attrs, text]` and a text
//! node is a bare string.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// Ordered attribute map. Values are strings, numbers or booleans.
pub type Attrs = Map<String, Value>;

/// Errors raised while decoding the tuple wire format
#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("Expected a string, an array or an object, found {0}")]
    UnexpectedValue(String),

    #[error("Node array must start with a tag string or null")]
    MissingTag,

    #[error("Attributes of <{tag}> must be an object")]
    InvalidAttrs { tag: String },

    #[error("Comment node must carry a text payload")]
    InvalidComment,

    #[error("Markup tree must be an object with a `nodes` array")]
    InvalidTree,
}

/// A node of the markup tree
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Text(String),
    Element(Element),
    Comment(String),
}

/// An element node: tag, ordered attributes and children
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attrs: Attrs,
    pub children: Vec<MarkupNode>,
}

/// A whole parsed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupTree {
    pub nodes: Vec<MarkupNode>,
    /// Usually an object. Anything else is a frontmatter block that did not
    /// parse as a key-value mapping, kept verbatim.
    #[serde(default = "empty_object")]
    pub frontmatter: Value,
    #[serde(default)]
    pub meta: Attrs,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Default for MarkupTree {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            frontmatter: empty_object(),
            meta: Attrs::new(),
        }
    }
}

impl MarkupTree {
    pub fn new(nodes: Vec<MarkupNode>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    /// Decode a tree from its JSON wire value
    pub fn from_wire(value: Value) -> Result<Self, WireError> {
        let Value::Object(mut map) = value else {
            return Err(WireError::InvalidTree);
        };
        let nodes = match map.remove("nodes") {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(MarkupNode::from_wire)
                .collect::<Result<Vec<_>, _>>()?,
            _ => return Err(WireError::InvalidTree),
        };
        let frontmatter = map.remove("frontmatter").unwrap_or_else(empty_object);
        let meta = match map.remove("meta") {
            Some(Value::Object(meta)) => meta,
            _ => Attrs::new(),
        };
        Ok(Self {
            nodes,
            frontmatter,
            meta,
        })
    }

    /// Frontmatter as a key-value map, if it is one
    pub fn frontmatter_map(&self) -> Option<&Attrs> {
        self.frontmatter.as_object()
    }
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_children(mut self, children: Vec<MarkupNode>) -> Self {
        self.children = children;
        self
    }

    /// String value of an attribute
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    /// Concatenated text of all leaves, skipping `style` elements
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(s) => out.push_str(s),
            MarkupNode::Element(el) if el.tag == "style" => {}
            MarkupNode::Element(el) => collect_text(&el.children, out),
            MarkupNode::Comment(_) => {}
        }
    }
}

// Convenience constructors
impl MarkupNode {
    pub fn text(s: impl Into<String>) -> Self {
        MarkupNode::Text(s.into())
    }

    pub fn comment(s: impl Into<String>) -> Self {
        MarkupNode::Comment(s.into())
    }

    pub fn element(tag: impl Into<String>, attrs: Attrs, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element(Element {
            tag: tag.into(),
            attrs,
            children,
        })
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            MarkupNode::Element(el) => Some(el),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, MarkupNode::Text(_))
    }

    /// Concatenated text of this node's leaves
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(std::slice::from_ref(self), &mut out);
        out
    }

    /// Encode into the tuple wire format
    pub fn to_wire(&self) -> Value {
        match self {
            MarkupNode::Text(s) => Value::String(s.clone()),
            MarkupNode::Comment(s) => Value::Array(vec![
                Value::Null,
                Value::Object(Attrs::new()),
                Value::String(s.clone()),
            ]),
            MarkupNode::Element(el) => {
                let mut items = Vec::with_capacity(el.children.len() + 2);
                items.push(Value::String(el.tag.clone()));
                items.push(Value::Object(el.attrs.clone()));
                items.extend(el.children.iter().map(MarkupNode::to_wire));
                Value::Array(items)
            }
        }
    }

    /// Decode from the tuple wire format
    pub fn from_wire(value: Value) -> Result<Self, WireError> {
        match value {
            Value::String(s) => Ok(MarkupNode::Text(s)),
            Value::Array(items) => {
                let mut items = items.into_iter();
                let head = items.next().ok_or(WireError::MissingTag)?;
                let attrs = items.next();
                match head {
                    Value::Null => match items.next() {
                        Some(Value::String(text)) => Ok(MarkupNode::Comment(text)),
                        _ => Err(WireError::InvalidComment),
                    },
                    Value::String(tag) => {
                        let attrs = match attrs {
                            None | Some(Value::Null) => Attrs::new(),
                            Some(Value::Object(map)) => map,
                            Some(_) => return Err(WireError::InvalidAttrs { tag }),
                        };
                        let children = items
                            .map(MarkupNode::from_wire)
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(MarkupNode::element(tag, attrs, children))
                    }
                    _ => Err(WireError::MissingTag),
                }
            }
            other => Err(WireError::UnexpectedValue(value_kind(&other).to_string())),
        }
    }
}

impl From<Element> for MarkupNode {
    fn from(el: Element) -> Self {
        MarkupNode::Element(el)
    }
}

/// Short name of a JSON value's kind, for messages
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl Serialize for MarkupNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MarkupNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        MarkupNode::from_wire(value).map_err(serde::de::Error::custom)
    }
}

/// Tags that always sit inside a line of text
pub const INLINE_TAGS: &[&str] = &[
    "strong", "em", "del", "code", "a", "img", "span", "binding", "br",
];

/// Whether the node at `index` belongs to a run of inline content.
///
/// Custom components have no fixed placement: one that sits next to text or
/// another inline node is inline, otherwise it is a block.
pub fn is_inline_at(nodes: &[MarkupNode], index: usize) -> bool {
    fn fixed_inline(node: &MarkupNode) -> Option<bool> {
        match node {
            MarkupNode::Text(_) => Some(true),
            MarkupNode::Comment(_) => Some(false),
            MarkupNode::Element(el) if INLINE_TAGS.contains(&el.tag.as_str()) => Some(true),
            MarkupNode::Element(el) if is_known_block_tag(&el.tag) => Some(false),
            MarkupNode::Element(_) => None,
        }
    }

    match nodes.get(index).map(fixed_inline) {
        Some(Some(inline)) => inline,
        Some(None) => {
            let before = index
                .checked_sub(1)
                .and_then(|i| nodes.get(i))
                .and_then(fixed_inline);
            let after = nodes.get(index + 1).and_then(fixed_inline);
            before == Some(true) || after == Some(true)
        }
        None => false,
    }
}

fn is_known_block_tag(tag: &str) -> bool {
    matches!(
        tag,
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol" | "li" | "blockquote"
            | "hr" | "pre" | "template" | "style" | "html"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_element() {
        let node = MarkupNode::from_wire(json!(["p", {}, "Hello ", ["strong", {}, "world"]]))
            .unwrap();
        let MarkupNode::Element(p) = &node else {
            panic!("Expected element");
        };
        assert_eq!(p.tag, "p");
        assert_eq!(p.children.len(), 2);
        assert_eq!(node.text_content(), "Hello world");
        assert_eq!(
            node.to_wire(),
            json!(["p", {}, "Hello ", ["strong", {}, "world"]])
        );
    }

    #[test]
    fn test_wire_comment() {
        let node = MarkupNode::from_wire(json!([null, {}, " note "])).unwrap();
        assert_eq!(node, MarkupNode::comment(" note "));
        assert_eq!(node.to_wire(), json!([null, {}, " note "]));
    }

    #[test]
    fn test_wire_errors() {
        assert_eq!(
            MarkupNode::from_wire(json!([])),
            Err(WireError::MissingTag)
        );
        assert_eq!(
            MarkupNode::from_wire(json!(["p", "oops"])),
            Err(WireError::InvalidAttrs {
                tag: "p".to_string()
            })
        );
        assert!(matches!(
            MarkupNode::from_wire(json!(42)),
            Err(WireError::UnexpectedValue(_))
        ));
    }

    #[test]
    fn test_attribute_order_is_kept() {
        let node =
            MarkupNode::from_wire(json!(["a", {"href": "/x", "target": "_blank", "class": "c"}]))
                .unwrap();
        let keys: Vec<_> = node.as_element().unwrap().attrs.keys().cloned().collect();
        assert_eq!(keys, vec!["href", "target", "class"]);
    }

    #[test]
    fn test_text_content_skips_style() {
        let node = MarkupNode::from_wire(json!([
            "code",
            {},
            ["style", {}, ".x{}"],
            ["span", {"style": "color:red"}, "let"],
            " x"
        ]))
        .unwrap();
        assert_eq!(node.text_content(), "let x");
    }

    #[test]
    fn test_inline_placement() {
        let nodes = vec![
            MarkupNode::text("Hello "),
            MarkupNode::element("badge", Attrs::new(), vec![MarkupNode::text("new")]),
            MarkupNode::element("alert", Attrs::new(), vec![]),
            MarkupNode::element("hr", Attrs::new(), vec![]),
        ];
        assert!(is_inline_at(&nodes, 0));
        assert!(is_inline_at(&nodes, 1));
        assert!(!is_inline_at(&nodes, 2));
        assert!(!is_inline_at(&nodes, 3));
    }

    #[test]
    fn test_tree_serde_roundtrip() {
        let tree = MarkupTree::from_wire(json!({
            "nodes": [["h1", {"id": "title"}, "Title"], ["hr", {}]],
            "frontmatter": {"title": "Doc"},
            "meta": {}
        }))
        .unwrap();

        let text = serde_json::to_string(&tree).unwrap();
        let parsed: MarkupTree = serde_json::from_str(&text).unwrap();
        assert_eq!(tree, parsed);
        assert_eq!(
            tree.frontmatter_map().and_then(|m| m.get("title")),
            Some(&json!("Doc"))
        );
    }
}
