//! Editor document model
//!
//! The typed node tree consumed and produced by the rich-text editing
//! surface. On the wire every node is `{type, attrs?, content?, marks?,
//! text?}` and the document is `{type: "doc", content}`; the typed enum is
//! converted to and from that shape through [`RawNode`].

use crate::marks::{Mark, Marked};
use mdc_ast::Attrs;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Errors raised while decoding an editor document
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Expected a `doc` node at the root, found `{0}`")]
    NotADocument(String),

    #[error("Invalid editor document JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Sentinel recorded when the frontmatter is not a key-value mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontmatterError {
    pub message: String,
    /// The frontmatter exactly as the markup tree carried it
    pub raw: Value,
}

/// An editor document
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawNode", into = "RawNode")]
pub struct EditorDoc {
    pub content: Vec<EditorNode>,
}

/// A node of the editor document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode", into = "RawNode")]
pub enum EditorNode {
    /// Leading pseudo-node holding the document frontmatter
    Frontmatter {
        data: Attrs,
        error: Option<FrontmatterError>,
        meta: Attrs,
    },
    Paragraph {
        /// Inserted by the forward pass around bare inline content
        synthetic: bool,
        children: Vec<EditorNode>,
    },
    Heading {
        level: u8,
        id: String,
        children: Vec<EditorNode>,
    },
    BulletList {
        children: Vec<EditorNode>,
    },
    OrderedList {
        start: u64,
        children: Vec<EditorNode>,
    },
    ListItem {
        children: Vec<EditorNode>,
    },
    Blockquote {
        children: Vec<EditorNode>,
    },
    HorizontalRule,
    HardBreak {
        marks: Vec<Mark>,
    },
    Text {
        text: String,
        marks: Vec<Mark>,
    },
    /// Block component
    Element {
        tag: String,
        props: Attrs,
        children: Vec<EditorNode>,
    },
    /// Inline component
    InlineElement {
        tag: String,
        props: Attrs,
        children: Vec<EditorNode>,
        marks: Vec<Mark>,
    },
    Slot {
        name: String,
        props: Attrs,
        /// A default slot inserted by the forward pass
        synthetic: bool,
        children: Vec<EditorNode>,
    },
    CodeBlock {
        language: Option<String>,
        filename: Option<String>,
        meta: Option<String>,
        /// Raw source; authoritative over `children`
        code: Option<String>,
        children: Vec<EditorNode>,
    },
    Image {
        props: Attrs,
        marks: Vec<Mark>,
    },
    Video {
        props: Attrs,
        marks: Vec<Mark>,
    },
    /// A link whose content is more than marked text
    Link {
        href: String,
        target: Option<String>,
        rel: Option<String>,
        props: Attrs,
        children: Vec<EditorNode>,
        marks: Vec<Mark>,
    },
    SpanStyle {
        style: Option<String>,
        class: Option<String>,
        props: Attrs,
        children: Vec<EditorNode>,
        marks: Vec<Mark>,
    },
    Binding {
        value: Option<String>,
        default_value: Option<Value>,
        marks: Vec<Mark>,
    },
    Comment {
        text: String,
    },
    Emoji {
        name: String,
        glyph: String,
        marks: Vec<Mark>,
    },
    /// A node type this model does not know
    Unknown {
        kind: String,
        attrs: Attrs,
        children: Vec<EditorNode>,
    },
}

impl EditorDoc {
    pub fn new(content: Vec<EditorNode>) -> Self {
        Self { content }
    }

    /// Decode a document from JSON text
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let raw: RawNode = serde_json::from_str(json)?;
        EditorDoc::try_from(raw)
    }

    /// Decode a document from a JSON value
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        let raw: RawNode = serde_json::from_value(value)?;
        EditorDoc::try_from(raw)
    }

    pub fn to_value(&self) -> Result<Value, DocumentError> {
        Ok(serde_json::to_value(self)?)
    }

    /// The frontmatter pseudo-node, if present
    pub fn frontmatter(&self) -> Option<&EditorNode> {
        self.content
            .iter()
            .find(|n| matches!(n, EditorNode::Frontmatter { .. }))
    }
}

impl EditorNode {
    pub fn text(text: impl Into<String>) -> Self {
        EditorNode::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        EditorNode::Text {
            text: text.into(),
            marks,
        }
    }

    pub fn paragraph(children: Vec<EditorNode>) -> Self {
        EditorNode::Paragraph {
            synthetic: false,
            children,
        }
    }

    /// Wire `type` name
    pub fn type_name(&self) -> &str {
        match self {
            EditorNode::Frontmatter { .. } => "frontmatter",
            EditorNode::Paragraph { .. } => "paragraph",
            EditorNode::Heading { .. } => "heading",
            EditorNode::BulletList { .. } => "bulletList",
            EditorNode::OrderedList { .. } => "orderedList",
            EditorNode::ListItem { .. } => "listItem",
            EditorNode::Blockquote { .. } => "blockquote",
            EditorNode::HorizontalRule => "horizontalRule",
            EditorNode::HardBreak { .. } => "hardBreak",
            EditorNode::Text { .. } => "text",
            EditorNode::Element { .. } => "element",
            EditorNode::InlineElement { .. } => "inlineElement",
            EditorNode::Slot { .. } => "slot",
            EditorNode::CodeBlock { .. } => "codeBlock",
            EditorNode::Image { .. } => "image",
            EditorNode::Video { .. } => "video",
            EditorNode::Link { .. } => "link",
            EditorNode::SpanStyle { .. } => "spanStyle",
            EditorNode::Binding { .. } => "binding",
            EditorNode::Comment { .. } => "comment",
            EditorNode::Emoji { .. } => "emoji",
            EditorNode::Unknown { kind, .. } => kind,
        }
    }

    /// Whether the node lives inside a line of text
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            EditorNode::Text { .. }
                | EditorNode::HardBreak { .. }
                | EditorNode::InlineElement { .. }
                | EditorNode::Image { .. }
                | EditorNode::Video { .. }
                | EditorNode::Link { .. }
                | EditorNode::SpanStyle { .. }
                | EditorNode::Binding { .. }
                | EditorNode::Emoji { .. }
        )
    }

    pub fn children(&self) -> &[EditorNode] {
        match self {
            EditorNode::Paragraph { children, .. }
            | EditorNode::Heading { children, .. }
            | EditorNode::BulletList { children }
            | EditorNode::OrderedList { children, .. }
            | EditorNode::ListItem { children }
            | EditorNode::Blockquote { children }
            | EditorNode::Element { children, .. }
            | EditorNode::InlineElement { children, .. }
            | EditorNode::Slot { children, .. }
            | EditorNode::CodeBlock { children, .. }
            | EditorNode::Link { children, .. }
            | EditorNode::SpanStyle { children, .. }
            | EditorNode::Unknown { children, .. } => children,
            _ => &[],
        }
    }

    /// Concatenated text of all text leaves
    pub fn text_content(&self) -> String {
        match self {
            EditorNode::Text { text, .. } => text.clone(),
            EditorNode::Emoji { glyph, .. } => glyph.clone(),
            other => other.children().iter().map(EditorNode::text_content).collect(),
        }
    }
}

impl Marked for EditorNode {
    fn marks(&self) -> &[Mark] {
        match self {
            EditorNode::Text { marks, .. }
            | EditorNode::HardBreak { marks }
            | EditorNode::InlineElement { marks, .. }
            | EditorNode::Image { marks, .. }
            | EditorNode::Video { marks, .. }
            | EditorNode::Link { marks, .. }
            | EditorNode::SpanStyle { marks, .. }
            | EditorNode::Binding { marks, .. }
            | EditorNode::Emoji { marks, .. } => marks,
            _ => &[],
        }
    }
}

/// The untyped wire shape of a node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<RawNode>,
    #[serde(
        default,
        deserialize_with = "known_marks",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Marks this model has no encoding for are dropped, keeping the text
fn known_marks<'de, D>(deserializer: D) -> Result<Vec<Mark>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = Vec::<Value>::deserialize(deserializer)?;
    Ok(values
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<Mark>(value.clone()) {
            Ok(mark) => Some(mark),
            Err(e) => {
                warn!("Dropping unsupported mark {value}: {e}");
                None
            }
        })
        .collect())
}

impl TryFrom<RawNode> for EditorDoc {
    type Error = DocumentError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        if raw.kind != "doc" {
            return Err(DocumentError::NotADocument(raw.kind));
        }
        Ok(EditorDoc::new(nodes(raw.content)))
    }
}

impl From<EditorDoc> for RawNode {
    fn from(doc: EditorDoc) -> Self {
        RawNode {
            kind: "doc".to_string(),
            content: doc.content.into_iter().map(RawNode::from).collect(),
            ..RawNode::default()
        }
    }
}

fn nodes(content: Vec<RawNode>) -> Vec<EditorNode> {
    content.into_iter().map(EditorNode::from).collect()
}

fn take_string(attrs: &mut Attrs, key: &str) -> Option<String> {
    match attrs.remove(key)? {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn take_object(attrs: &mut Attrs, key: &str) -> Attrs {
    match attrs.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Attrs::new(),
    }
}

fn flag(attrs: &Attrs, key: &str) -> bool {
    attrs.get(key).and_then(Value::as_bool).unwrap_or(false)
}

impl From<RawNode> for EditorNode {
    fn from(raw: RawNode) -> Self {
        let RawNode {
            kind,
            mut attrs,
            content,
            marks,
            text,
        } = raw;

        match kind.as_str() {
            "frontmatter" => EditorNode::Frontmatter {
                data: take_object(&mut attrs, "frontmatter"),
                error: attrs
                    .remove("error")
                    .and_then(|v| serde_json::from_value(v).ok()),
                meta: take_object(&mut attrs, "meta"),
            },
            "paragraph" => EditorNode::Paragraph {
                synthetic: flag(&attrs, "synthetic"),
                children: nodes(content),
            },
            "heading" => EditorNode::Heading {
                level: attrs
                    .get("level")
                    .and_then(Value::as_u64)
                    .map_or(1, |l| l.clamp(1, 6) as u8),
                id: take_string(&mut attrs, "id").unwrap_or_default(),
                children: nodes(content),
            },
            "bulletList" => EditorNode::BulletList {
                children: nodes(content),
            },
            "orderedList" => EditorNode::OrderedList {
                start: attrs.get("start").and_then(Value::as_u64).unwrap_or(1),
                children: nodes(content),
            },
            "listItem" => EditorNode::ListItem {
                children: nodes(content),
            },
            "blockquote" => EditorNode::Blockquote {
                children: nodes(content),
            },
            "horizontalRule" => EditorNode::HorizontalRule,
            "hardBreak" => EditorNode::HardBreak { marks },
            "text" => EditorNode::Text {
                text: text.unwrap_or_default(),
                marks,
            },
            "element" => EditorNode::Element {
                tag: take_string(&mut attrs, "tag").unwrap_or_else(|| "div".to_string()),
                props: take_object(&mut attrs, "props"),
                children: nodes(content),
            },
            "inlineElement" => EditorNode::InlineElement {
                tag: take_string(&mut attrs, "tag").unwrap_or_else(|| "span".to_string()),
                props: take_object(&mut attrs, "props"),
                children: nodes(content),
                marks,
            },
            "slot" => EditorNode::Slot {
                name: take_string(&mut attrs, "name").unwrap_or_else(|| "default".to_string()),
                props: take_object(&mut attrs, "props"),
                synthetic: flag(&attrs, "synthetic"),
                children: nodes(content),
            },
            "codeBlock" => EditorNode::CodeBlock {
                language: take_string(&mut attrs, "language"),
                filename: take_string(&mut attrs, "filename"),
                meta: take_string(&mut attrs, "meta"),
                code: take_string(&mut attrs, "code"),
                children: nodes(content),
            },
            "image" => EditorNode::Image {
                props: attrs,
                marks,
            },
            "video" => EditorNode::Video {
                props: attrs,
                marks,
            },
            "link" => EditorNode::Link {
                href: take_string(&mut attrs, "href").unwrap_or_default(),
                target: take_string(&mut attrs, "target"),
                rel: take_string(&mut attrs, "rel"),
                props: take_object(&mut attrs, "props"),
                children: nodes(content),
                marks,
            },
            "spanStyle" => EditorNode::SpanStyle {
                style: take_string(&mut attrs, "style"),
                class: take_string(&mut attrs, "class"),
                props: take_object(&mut attrs, "props"),
                children: nodes(content),
                marks,
            },
            "binding" => EditorNode::Binding {
                value: take_string(&mut attrs, "value"),
                default_value: attrs.remove("defaultValue").filter(|v| !v.is_null()),
                marks,
            },
            "comment" => EditorNode::Comment {
                text: take_string(&mut attrs, "text").unwrap_or_default(),
            },
            "emoji" => EditorNode::Emoji {
                name: take_string(&mut attrs, "name").unwrap_or_default(),
                glyph: take_string(&mut attrs, "glyph").unwrap_or_default(),
                marks,
            },
            _ => EditorNode::Unknown {
                kind,
                attrs,
                children: nodes(content),
            },
        }
    }
}

fn put(attrs: &mut Attrs, key: &str, value: impl Into<Value>) {
    attrs.insert(key.to_string(), value.into());
}

fn put_some(attrs: &mut Attrs, key: &str, value: Option<impl Into<Value>>) {
    if let Some(value) = value {
        put(attrs, key, value);
    }
}

fn put_object(attrs: &mut Attrs, key: &str, value: Attrs) {
    if !value.is_empty() {
        put(attrs, key, Value::Object(value));
    }
}

fn raw(kind: &str, attrs: Attrs, children: Vec<EditorNode>, marks: Vec<Mark>) -> RawNode {
    RawNode {
        kind: kind.to_string(),
        attrs,
        content: children.into_iter().map(RawNode::from).collect(),
        marks,
        text: None,
    }
}

impl From<EditorNode> for RawNode {
    fn from(node: EditorNode) -> Self {
        let kind = node.type_name().to_string();
        let mut attrs = Attrs::new();

        match node {
            EditorNode::Frontmatter { data, error, meta } => {
                put(&mut attrs, "frontmatter", Value::Object(data));
                if let Some(error) = error
                    && let Ok(value) = serde_json::to_value(error)
                {
                    put(&mut attrs, "error", value);
                }
                put_object(&mut attrs, "meta", meta);
                raw(&kind, attrs, Vec::new(), Vec::new())
            }
            EditorNode::Paragraph {
                synthetic,
                children,
            } => {
                if synthetic {
                    put(&mut attrs, "synthetic", true);
                }
                raw(&kind, attrs, children, Vec::new())
            }
            EditorNode::Heading {
                level,
                id,
                children,
            } => {
                put(&mut attrs, "level", level);
                put(&mut attrs, "id", id);
                raw(&kind, attrs, children, Vec::new())
            }
            EditorNode::OrderedList { start, children } => {
                put(&mut attrs, "start", start);
                raw(&kind, attrs, children, Vec::new())
            }
            EditorNode::BulletList { children }
            | EditorNode::ListItem { children }
            | EditorNode::Blockquote { children } => raw(&kind, attrs, children, Vec::new()),
            EditorNode::HorizontalRule => raw(&kind, attrs, Vec::new(), Vec::new()),
            EditorNode::HardBreak { marks } => raw(&kind, attrs, Vec::new(), marks),
            EditorNode::Text { text, marks } => RawNode {
                kind,
                marks,
                text: Some(text),
                ..RawNode::default()
            },
            EditorNode::Element {
                tag,
                props,
                children,
            } => {
                put(&mut attrs, "tag", tag);
                put_object(&mut attrs, "props", props);
                raw(&kind, attrs, children, Vec::new())
            }
            EditorNode::InlineElement {
                tag,
                props,
                children,
                marks,
            } => {
                put(&mut attrs, "tag", tag);
                put_object(&mut attrs, "props", props);
                raw(&kind, attrs, children, marks)
            }
            EditorNode::Slot {
                name,
                props,
                synthetic,
                children,
            } => {
                put(&mut attrs, "name", name);
                put_object(&mut attrs, "props", props);
                if synthetic {
                    put(&mut attrs, "synthetic", true);
                }
                raw(&kind, attrs, children, Vec::new())
            }
            EditorNode::CodeBlock {
                language,
                filename,
                meta,
                code,
                children,
            } => {
                put_some(&mut attrs, "language", language);
                put_some(&mut attrs, "filename", filename);
                put_some(&mut attrs, "meta", meta);
                put_some(&mut attrs, "code", code);
                raw(&kind, attrs, children, Vec::new())
            }
            EditorNode::Image { props, marks } | EditorNode::Video { props, marks } => {
                raw(&kind, props, Vec::new(), marks)
            }
            EditorNode::Link {
                href,
                target,
                rel,
                props,
                children,
                marks,
            } => {
                put(&mut attrs, "href", href);
                put_some(&mut attrs, "target", target);
                put_some(&mut attrs, "rel", rel);
                put_object(&mut attrs, "props", props);
                raw(&kind, attrs, children, marks)
            }
            EditorNode::SpanStyle {
                style,
                class,
                props,
                children,
                marks,
            } => {
                put_some(&mut attrs, "style", style);
                put_some(&mut attrs, "class", class);
                put_object(&mut attrs, "props", props);
                raw(&kind, attrs, children, marks)
            }
            EditorNode::Binding {
                value,
                default_value,
                marks,
            } => {
                put_some(&mut attrs, "value", value);
                put_some(&mut attrs, "defaultValue", default_value);
                raw(&kind, attrs, Vec::new(), marks)
            }
            EditorNode::Comment { text } => {
                put(&mut attrs, "text", text);
                raw(&kind, attrs, Vec::new(), Vec::new())
            }
            EditorNode::Emoji { name, glyph, marks } => {
                put(&mut attrs, "name", name);
                put(&mut attrs, "glyph", glyph);
                raw(&kind, attrs, Vec::new(), marks)
            }
            EditorNode::Unknown {
                attrs, children, ..
            } => raw(&kind, attrs, children, Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marks::MarkType;
    use serde_json::json;

    #[test]
    fn test_document_json() {
        let doc = EditorDoc::from_value(json!({
            "type": "doc",
            "content": [
                {"type": "frontmatter", "attrs": {"frontmatter": {"title": "T"}}},
                {"type": "heading", "attrs": {"level": 2, "id": "t"}, "content": [
                    {"type": "text", "text": "T", "marks": [{"type": "bold"}]}
                ]}
            ]
        }))
        .unwrap();

        assert_eq!(doc.content.len(), 2);
        let EditorNode::Heading { level, children, .. } = &doc.content[1] else {
            panic!("Expected heading");
        };
        assert_eq!(*level, 2);
        assert_eq!(
            children[0],
            EditorNode::marked_text("T", vec![Mark::new(MarkType::Bold)])
        );
    }

    #[test]
    fn test_wire_shape() {
        let doc = EditorDoc::new(vec![EditorNode::Paragraph {
            synthetic: true,
            children: vec![
                EditorNode::text("a"),
                EditorNode::HardBreak { marks: vec![] },
            ],
        }]);
        assert_eq!(
            doc.to_value().unwrap(),
            json!({
                "type": "doc",
                "content": [{
                    "type": "paragraph",
                    "attrs": {"synthetic": true},
                    "content": [{"type": "text", "text": "a"}, {"type": "hardBreak"}]
                }]
            })
        );
    }

    #[test]
    fn test_serde_roundtrip() {
        let doc = EditorDoc::new(vec![
            EditorNode::Frontmatter {
                data: Attrs::new(),
                error: Some(FrontmatterError {
                    message: "bad".to_string(),
                    raw: json!("oops"),
                }),
                meta: Attrs::new(),
            },
            EditorNode::CodeBlock {
                language: Some("rust".to_string()),
                filename: None,
                meta: None,
                code: Some("fn main() {}".to_string()),
                children: vec![EditorNode::text("fn main() {}")],
            },
            EditorNode::Binding {
                value: Some("$doc.x".to_string()),
                default_value: Some(json!(3)),
                marks: vec![],
            },
        ]);

        let json = serde_json::to_string(&doc).unwrap();
        let parsed = EditorDoc::from_json(&json).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn test_unknown_type_is_kept() {
        let doc = EditorDoc::from_value(json!({
            "type": "doc",
            "content": [{"type": "mathBlock", "attrs": {"tex": "x^2"}}]
        }))
        .unwrap();
        assert!(matches!(&doc.content[0], EditorNode::Unknown { kind, .. } if kind == "mathBlock"));
        assert_eq!(
            doc.to_value().unwrap()["content"][0],
            json!({"type": "mathBlock", "attrs": {"tex": "x^2"}})
        );
    }

    #[test]
    fn test_unsupported_marks_are_dropped() {
        let doc = EditorDoc::from_json(
            r#"{"type": "doc", "content": [{"type": "paragraph", "content": [
                {"type": "text", "text": "hi", "marks": [{"type": "underline"}, {"type": "bold"}]}
            ]}]}"#,
        )
        .unwrap();
        assert_eq!(
            doc.content,
            vec![EditorNode::paragraph(vec![EditorNode::marked_text(
                "hi",
                vec![Mark::new(MarkType::Bold)]
            )])]
        );
    }

    #[test]
    fn test_not_a_document() {
        let err = EditorDoc::from_json(r#"{"type": "paragraph"}"#).unwrap_err();
        assert!(matches!(err, DocumentError::NotADocument(ref kind) if kind == "paragraph"));
        assert!(matches!(
            EditorDoc::from_json("[1, 2]"),
            Err(DocumentError::Json(_))
        ));
    }
}
