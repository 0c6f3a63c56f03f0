//! Markup tree to editor document conversion
//!
//! Builds the editor's typed tree from a parsed markup tree. Mark elements
//! (`strong`, `em`, `del`, `code`, `a`) dissolve into marks on text nodes;
//! everything else becomes a typed node. Wrappers the editor needs but the
//! markup does not have (paragraphs around bare inline content, default
//! slots around bare component content) are flagged `synthetic` so the
//! reverse pass can take them out again.

use crate::dispatch::TagKind;
use crate::emoji::{TextPiece, split_shortcodes};
use crate::links;
use crate::marks::{Mark, MarkType, compose, group_by_signature};
use crate::model::{EditorDoc, EditorNode, FrontmatterError};
use crate::slug::SlugRegistry;
use mdc_ast::{Attrs, Element, MarkupNode, MarkupTree, is_inline_at, slot_name, value_kind};
use serde_json::Value;
use tracing::{debug, warn};

/// Video flags written as presence-only attributes
pub(crate) const VIDEO_FLAGS: &[&str] = &["controls", "autoplay", "loop", "muted"];

/// Options for markup to editor conversion
#[derive(Debug, Clone)]
pub struct ForwardOptions {
    /// Replace `:shortcode:` text with emoji nodes
    pub resolve_emoji: bool,
}

impl Default for ForwardOptions {
    fn default() -> Self {
        Self {
            resolve_emoji: true,
        }
    }
}

/// Convert a markup tree to an editor document
pub fn markup_to_editor(tree: &MarkupTree) -> EditorDoc {
    markup_to_editor_with_options(tree, &ForwardOptions::default())
}

/// Convert a markup tree to an editor document with options
pub fn markup_to_editor_with_options(tree: &MarkupTree, options: &ForwardOptions) -> EditorDoc {
    let mut converter = Forward::new(options);
    converter.convert_tree(tree)
}

/// Forward converter state, one per pass
struct Forward<'a> {
    options: &'a ForwardOptions,
    slugs: SlugRegistry,
}

impl<'a> Forward<'a> {
    fn new(options: &'a ForwardOptions) -> Self {
        Self {
            options,
            slugs: SlugRegistry::new(),
        }
    }

    fn convert_tree(&mut self, tree: &MarkupTree) -> EditorDoc {
        let mut content = vec![frontmatter_node(tree)];
        content.extend(self.convert_blocks(&tree.nodes));
        debug!(nodes = content.len(), "Converted markup tree to editor document");
        EditorDoc::new(content)
    }

    /// Convert block content. Runs of inline nodes get a synthetic paragraph.
    fn convert_blocks(&mut self, nodes: &[MarkupNode]) -> Vec<EditorNode> {
        let mut out = Vec::new();
        let mut run_start: Option<usize> = None;

        for (i, node) in nodes.iter().enumerate() {
            if is_inline_at(nodes, i) {
                run_start.get_or_insert(i);
                continue;
            }
            if let Some(start) = run_start.take() {
                self.push_inline_run(&nodes[start..i], &mut out);
            }
            if let Some(block) = self.convert_block(node) {
                out.push(block);
            }
        }
        if let Some(start) = run_start {
            self.push_inline_run(&nodes[start..], &mut out);
        }

        out
    }

    fn push_inline_run(&mut self, run: &[MarkupNode], out: &mut Vec<EditorNode>) {
        // Whitespace between blocks is layout, not content
        if run
            .iter()
            .all(|n| matches!(n, MarkupNode::Text(t) if t.trim().is_empty()))
        {
            return;
        }
        out.push(EditorNode::Paragraph {
            synthetic: true,
            children: self.convert_inline_content(run),
        });
    }

    fn convert_block(&mut self, node: &MarkupNode) -> Option<EditorNode> {
        let el = match node {
            MarkupNode::Element(el) => el,
            MarkupNode::Comment(text) => return Some(EditorNode::Comment { text: text.clone() }),
            MarkupNode::Text(text) => return Some(EditorNode::text(text.clone())),
        };

        let block = match TagKind::classify(&el.tag) {
            TagKind::Paragraph => EditorNode::Paragraph {
                synthetic: false,
                children: self.convert_inline_content(&el.children),
            },
            TagKind::Heading(level) => EditorNode::Heading {
                level,
                id: self.slugs.issue(&el.text_content()),
                children: self.convert_inline_content(&el.children),
            },
            TagKind::BulletList => EditorNode::BulletList {
                children: self.convert_list_items(&el.children),
            },
            TagKind::OrderedList => EditorNode::OrderedList {
                start: el.attrs.get("start").and_then(Value::as_u64).unwrap_or(1),
                children: self.convert_list_items(&el.children),
            },
            TagKind::ListItem => EditorNode::ListItem {
                children: self.convert_blocks(&el.children),
            },
            TagKind::Blockquote => EditorNode::Blockquote {
                children: self.convert_blocks(&el.children),
            },
            TagKind::HorizontalRule => EditorNode::HorizontalRule,
            TagKind::CodeBlock => code_block(el),
            TagKind::Template => self.convert_slot(el),
            TagKind::Html => EditorNode::Element {
                tag: el.tag.clone(),
                props: el.attrs.clone(),
                children: vec![EditorNode::text(el.text_content())],
            },
            TagKind::Style => return None,
            TagKind::Component => self.convert_component(el),
            // Inline kinds only reach here when placed on their own
            TagKind::LineBreak
            | TagKind::Image
            | TagKind::Video
            | TagKind::Span
            | TagKind::Binding
            | TagKind::Mark(_) => EditorNode::Paragraph {
                synthetic: true,
                children: self.convert_inline_content(std::slice::from_ref(node)),
            },
        };
        Some(block)
    }

    fn convert_list_items(&mut self, children: &[MarkupNode]) -> Vec<EditorNode> {
        children
            .iter()
            .filter_map(|child| match child {
                MarkupNode::Element(li) if li.tag == "li" => Some(EditorNode::ListItem {
                    children: self.convert_blocks(&li.children),
                }),
                MarkupNode::Text(t) if t.trim().is_empty() => None,
                other => Some(EditorNode::ListItem {
                    children: self.convert_blocks(std::slice::from_ref(other)),
                }),
            })
            .collect()
    }

    /// A block component. Explicit `template` slots map one to one; bare
    /// children are gathered into one synthetic default slot placed where the
    /// first of them was.
    fn convert_component(&mut self, el: &Element) -> EditorNode {
        let mut children = Vec::new();
        let mut bare: Vec<MarkupNode> = Vec::new();
        let mut default_at: Option<usize> = None;

        for child in &el.children {
            match child.as_element() {
                Some(template) if slot_name(template).is_some() => {
                    children.push(self.convert_slot(template));
                }
                _ => {
                    default_at.get_or_insert(children.len());
                    bare.push(child.clone());
                }
            }
        }

        if let Some(at) = default_at {
            let slot = EditorNode::Slot {
                name: "default".to_string(),
                props: Attrs::new(),
                synthetic: true,
                children: self.convert_blocks(&bare),
            };
            children.insert(at, slot);
        }

        EditorNode::Element {
            tag: el.tag.clone(),
            props: el.attrs.clone(),
            children,
        }
    }

    fn convert_slot(&mut self, template: &Element) -> EditorNode {
        let name = slot_name(template).unwrap_or("default").to_string();
        let props = template
            .attrs
            .iter()
            .filter(|(key, _)| !is_slot_key(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        EditorNode::Slot {
            name,
            props,
            synthetic: false,
            children: self.convert_blocks(&template.children),
        }
    }

    /// Inline content of a paragraph-like node, with runs of identically
    /// marked text merged
    fn convert_inline_content(&mut self, nodes: &[MarkupNode]) -> Vec<EditorNode> {
        let mut out = Vec::new();
        for node in nodes {
            self.convert_inline(node, &[], &mut out);
        }
        merge_text_runs(out)
    }

    fn convert_inline(&mut self, node: &MarkupNode, marks: &[Mark], out: &mut Vec<EditorNode>) {
        match node {
            MarkupNode::Text(text) => self.push_text(text, marks, out),
            MarkupNode::Comment(text) => out.push(EditorNode::Comment { text: text.clone() }),
            MarkupNode::Element(el) => self.convert_inline_element(el, marks, out),
        }
    }

    fn convert_inline_element(&mut self, el: &Element, marks: &[Mark], out: &mut Vec<EditorNode>) {
        match TagKind::classify(&el.tag) {
            TagKind::Mark(kind) => self.decode_mark(el, kind, marks, out),
            TagKind::LineBreak => out.push(EditorNode::HardBreak {
                marks: marks.to_vec(),
            }),
            TagKind::Image => out.push(EditorNode::Image {
                props: el.attrs.clone(),
                marks: marks.to_vec(),
            }),
            TagKind::Video => out.push(EditorNode::Video {
                props: video_props(&el.attrs),
                marks: marks.to_vec(),
            }),
            TagKind::Span => {
                let mut props = el.attrs.clone();
                out.push(EditorNode::SpanStyle {
                    style: take_str(&mut props, "style"),
                    class: take_str(&mut props, "class"),
                    props,
                    children: self.convert_inline_content(&el.children),
                    marks: marks.to_vec(),
                });
            }
            TagKind::Binding => out.push(EditorNode::Binding {
                value: el.attr_str("value").map(str::to_string),
                default_value: el.attrs.get("defaultValue").cloned(),
                marks: marks.to_vec(),
            }),
            TagKind::Style => {}
            TagKind::Component | TagKind::Template | TagKind::Html => {
                out.push(EditorNode::InlineElement {
                    tag: el.tag.clone(),
                    props: el.attrs.clone(),
                    children: self.convert_inline_content(&el.children),
                    marks: marks.to_vec(),
                });
            }
            // Block content inside a line
            TagKind::Paragraph
            | TagKind::Heading(_)
            | TagKind::BulletList
            | TagKind::OrderedList
            | TagKind::ListItem
            | TagKind::Blockquote
            | TagKind::HorizontalRule
            | TagKind::CodeBlock => {
                let node = MarkupNode::Element(el.clone());
                if let Some(block) = self.convert_block(&node) {
                    out.push(block);
                }
            }
        }
    }

    /// Dissolve a mark element into marks on the nodes it contains
    fn decode_mark(&mut self, el: &Element, kind: MarkType, marks: &[Mark], out: &mut Vec<EditorNode>) {
        match kind {
            MarkType::Code => {
                // Highlighter decoration is dropped; only the language stays
                let mut attrs = Attrs::new();
                if let Some(language) = el.attrs.get("language") {
                    attrs.insert("language".to_string(), language.clone());
                }
                let text = el.text_content();
                if !text.is_empty() {
                    out.push(EditorNode::marked_text(
                        text,
                        compose(marks, Mark::with_attrs(MarkType::Code, attrs)),
                    ));
                }
            }
            MarkType::Link if !is_mark_only(&el.children) => {
                let mut attrs = links::editor_attrs(el.attrs.clone());
                out.push(EditorNode::Link {
                    href: take_str(&mut attrs, "href").unwrap_or_default(),
                    target: take_str(&mut attrs, "target"),
                    rel: take_str(&mut attrs, "rel"),
                    props: attrs,
                    children: self.convert_inline_content(&el.children),
                    marks: marks.to_vec(),
                });
            }
            MarkType::Link => {
                let mark = Mark::with_attrs(MarkType::Link, links::editor_attrs(el.attrs.clone()));
                let marks = compose(marks, mark);
                for child in &el.children {
                    self.convert_inline(child, &marks, out);
                }
            }
            MarkType::Bold | MarkType::Italic | MarkType::Strike => {
                let marks = compose(marks, Mark::with_attrs(kind, el.attrs.clone()));
                for child in &el.children {
                    self.convert_inline(child, &marks, out);
                }
            }
        }
    }

    /// Text, split around emoji shortcodes unless it is code
    fn push_text(&self, text: &str, marks: &[Mark], out: &mut Vec<EditorNode>) {
        if text.is_empty() {
            return;
        }
        let in_code = marks.iter().any(|m| m.kind == MarkType::Code);
        if !self.options.resolve_emoji || in_code {
            out.push(EditorNode::marked_text(text, marks.to_vec()));
            return;
        }

        for piece in split_shortcodes(text) {
            out.push(match piece {
                TextPiece::Plain(plain) => EditorNode::marked_text(plain, marks.to_vec()),
                TextPiece::Emoji { name, glyph } => EditorNode::Emoji {
                    name: name.to_string(),
                    glyph: glyph.to_string(),
                    marks: marks.to_vec(),
                },
            });
        }
    }
}

fn frontmatter_node(tree: &MarkupTree) -> EditorNode {
    let (data, error) = match &tree.frontmatter {
        Value::Object(map) => (map.clone(), None),
        Value::Null => (Attrs::new(), None),
        other => {
            let message = format!(
                "Frontmatter must be a key-value mapping, found {}",
                value_kind(other)
            );
            warn!("{}", message);
            (
                Attrs::new(),
                Some(FrontmatterError {
                    message,
                    raw: other.clone(),
                }),
            )
        }
    };
    EditorNode::Frontmatter {
        data,
        error,
        meta: tree.meta.clone(),
    }
}

fn code_block(el: &Element) -> EditorNode {
    // The raw source attribute survives highlighting; decorated children may not
    let code = el
        .attr_str("code")
        .map(str::to_string)
        .unwrap_or_else(|| el.text_content());
    let attr = |key: &str| el.attr_str(key).filter(|v| !v.is_empty()).map(str::to_string);

    EditorNode::CodeBlock {
        language: attr("language"),
        filename: attr("filename"),
        meta: attr("meta"),
        children: if code.is_empty() {
            Vec::new()
        } else {
            vec![EditorNode::text(code.clone())]
        },
        code: Some(code),
    }
}

/// Normalise video flags to booleans
fn video_props(attrs: &Attrs) -> Attrs {
    attrs
        .iter()
        .map(|(key, value)| {
            let value = if VIDEO_FLAGS.contains(&key.as_str()) {
                Value::Bool(match value {
                    Value::Bool(b) => *b,
                    Value::String(s) => s != "false",
                    Value::Null => false,
                    _ => true,
                })
            } else {
                value.clone()
            };
            (key.clone(), value)
        })
        .collect()
}

/// Whether a link holds only text and mark elements
fn is_mark_only(children: &[MarkupNode]) -> bool {
    children.iter().all(|child| match child {
        MarkupNode::Text(_) => true,
        MarkupNode::Comment(_) => false,
        MarkupNode::Element(el) => {
            matches!(
                TagKind::classify(&el.tag),
                TagKind::Mark(kind) if kind != MarkType::Link
            ) && is_mark_only(&el.children)
        }
    })
}

fn is_slot_key(key: &str) -> bool {
    key.starts_with("v-slot:") || key.starts_with('#')
}

fn take_str(attrs: &mut Attrs, key: &str) -> Option<String> {
    match attrs.remove(key)? {
        Value::String(s) => Some(s),
        other => {
            attrs.insert(key.to_string(), other);
            None
        }
    }
}

/// Merge adjacent text nodes with identical marks
fn merge_text_runs(nodes: Vec<EditorNode>) -> Vec<EditorNode> {
    let mut out = Vec::with_capacity(nodes.len());
    for group in group_by_signature(nodes) {
        for node in group.items {
            if let (
                EditorNode::Text { text, .. },
                Some(EditorNode::Text {
                    text: last,
                    marks: last_marks,
                }),
            ) = (&node, out.last_mut())
                && *last_marks == group.marks
            {
                last.push_str(text);
                continue;
            }
            out.push(node);
        }
    }
    out
}

#[cfg(test)]
mod tests;
