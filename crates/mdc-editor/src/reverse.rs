//! Editor document to markup tree conversion
//!
//! The inverse of [`crate::forward`]. Synthetic wrappers are unwrapped,
//! marks are folded back into the fewest nesting elements, and code blocks
//! are rebuilt from their raw source so decoration can never leak back into
//! the markup.

use crate::forward::VIDEO_FLAGS;
use crate::highlight::{HighlightThemes, SyntaxHighlighter};
use crate::links;
use crate::marks::{Mark, MarkType, Marked, group_by_outer_mark, group_by_signature};
use crate::model::{EditorDoc, EditorNode};
use crate::slug::SlugRegistry;
use mdc_ast::{Attrs, MarkupNode, MarkupTree, is_inline_at};
use serde_json::Value;
use tracing::{debug, warn};

/// Options for editor to markup conversion
#[derive(Debug, Clone, Default)]
pub struct ReverseOptions<'a> {
    /// Decorate code blocks after conversion
    pub highlighter: Option<&'a SyntaxHighlighter>,
    pub themes: HighlightThemes,
}

/// Convert an editor document to a markup tree
pub fn editor_to_markup(doc: &EditorDoc) -> MarkupTree {
    editor_to_markup_with_options(doc, &ReverseOptions::default())
}

/// Convert an editor document to a markup tree with options
pub fn editor_to_markup_with_options(doc: &EditorDoc, options: &ReverseOptions<'_>) -> MarkupTree {
    let mut converter = Reverse::new();
    let tree = converter.convert_doc(doc);
    match options.highlighter {
        Some(highlighter) => highlighter.highlight(&tree, &options.themes),
        None => tree,
    }
}

/// An inline node waiting to be wrapped in its mark elements
struct Run {
    marks: Vec<Mark>,
    node: MarkupNode,
}

impl Marked for Run {
    fn marks(&self) -> &[Mark] {
        &self.marks
    }
}

struct Reverse {
    slugs: SlugRegistry,
}

impl Reverse {
    fn new() -> Self {
        Self {
            slugs: SlugRegistry::new(),
        }
    }

    fn convert_doc(&mut self, doc: &EditorDoc) -> MarkupTree {
        let mut tree = MarkupTree::new(self.convert_blocks(&doc.content));

        if let Some(EditorNode::Frontmatter { data, error, meta }) = doc.frontmatter() {
            tree.frontmatter = match error {
                // Hand back what the author wrote
                Some(error) => error.raw.clone(),
                None => Value::Object(data.clone()),
            };
            tree.meta = meta.clone();
        }

        debug!(nodes = tree.nodes.len(), "Converted editor document to markup tree");
        tree
    }

    fn convert_blocks(&mut self, nodes: &[EditorNode]) -> Vec<MarkupNode> {
        let mut out: Vec<MarkupNode> = Vec::new();
        let mut run: Vec<&EditorNode> = Vec::new();

        for node in nodes {
            if node.is_inline() {
                run.push(node);
                continue;
            }
            if !run.is_empty() {
                out.extend(self.convert_inlines(&run));
                run.clear();
            }
            self.convert_block(node, &mut out);
        }
        if !run.is_empty() {
            out.extend(self.convert_inlines(&run));
        }

        out
    }

    fn convert_block(&mut self, node: &EditorNode, out: &mut Vec<MarkupNode>) {
        let block = match node {
            EditorNode::Frontmatter { .. } => return,
            EditorNode::Paragraph {
                synthetic,
                children,
            } => {
                let inlines = self.convert_inlines(&children.iter().collect::<Vec<_>>());
                let follows_inline = !out.is_empty() && is_inline_at(out, out.len() - 1);
                if *synthetic && !follows_inline {
                    out.extend(inlines);
                    return;
                }
                MarkupNode::element("p", Attrs::new(), inlines)
            }
            EditorNode::Heading {
                level, children, ..
            } => {
                let children = self.convert_inlines(&children.iter().collect::<Vec<_>>());
                let text: String = children.iter().map(MarkupNode::text_content).collect();
                let mut attrs = Attrs::new();
                attrs.insert("id".to_string(), Value::String(self.slugs.issue(&text)));
                MarkupNode::element(format!("h{level}"), attrs, children)
            }
            EditorNode::BulletList { children } => {
                MarkupNode::element("ul", Attrs::new(), self.convert_blocks(children))
            }
            EditorNode::OrderedList { start, children } => {
                let mut attrs = Attrs::new();
                if *start != 1 {
                    attrs.insert("start".to_string(), Value::from(*start));
                }
                MarkupNode::element("ol", attrs, self.convert_blocks(children))
            }
            EditorNode::ListItem { children } => {
                MarkupNode::element("li", Attrs::new(), self.convert_blocks(children))
            }
            EditorNode::Blockquote { children } => {
                MarkupNode::element("blockquote", Attrs::new(), self.convert_blocks(children))
            }
            EditorNode::HorizontalRule => MarkupNode::element("hr", Attrs::new(), Vec::new()),
            EditorNode::CodeBlock {
                language,
                filename,
                meta,
                code,
                children,
            } => code_block(
                language.as_deref(),
                filename.as_deref(),
                meta.as_deref(),
                code.as_deref(),
                children,
            ),
            EditorNode::Element {
                tag,
                props,
                children,
            } => MarkupNode::element(tag.as_str(), props.clone(), self.convert_blocks(children)),
            EditorNode::Slot {
                synthetic: true,
                children,
                ..
            } => {
                out.extend(self.convert_blocks(children));
                return;
            }
            EditorNode::Slot {
                name,
                props,
                children,
                ..
            } => {
                let mut attrs = Attrs::new();
                attrs.insert(format!("v-slot:{name}"), Value::String(String::new()));
                attrs.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
                MarkupNode::element("template", attrs, self.convert_blocks(children))
            }
            EditorNode::Comment { text } => MarkupNode::comment(text.as_str()),
            EditorNode::Unknown { kind, .. } => {
                warn!(kind = kind.as_str(), "Unknown editor node, writing a placeholder");
                MarkupNode::element("p", Attrs::new(), vec![unknown_marker(kind)])
            }
            inline => {
                out.extend(self.convert_inlines(&[inline]));
                return;
            }
        };
        out.push(block);
    }

    /// Convert a run of inline nodes, folding marks back into elements
    fn convert_inlines(&mut self, nodes: &[&EditorNode]) -> Vec<MarkupNode> {
        let mut runs = Vec::with_capacity(nodes.len());
        for node in nodes {
            self.collect_run(node, &mut runs);
        }
        merge_split_marks(nest(coalesce(runs)))
    }

    fn collect_run(&mut self, node: &EditorNode, runs: &mut Vec<Run>) {
        let marks = node.marks().to_vec();
        let node = match node {
            EditorNode::Text { text, .. } => MarkupNode::text(text.as_str()),
            EditorNode::Emoji { name, .. } => MarkupNode::text(format!(":{name}:")),
            EditorNode::HardBreak { .. } => MarkupNode::element("br", Attrs::new(), Vec::new()),
            EditorNode::Image { props, .. } => MarkupNode::element("img", image_attrs(props), Vec::new()),
            EditorNode::Video { props, .. } => MarkupNode::element("video", video_attrs(props), Vec::new()),
            EditorNode::Link {
                href,
                target,
                rel,
                props,
                children,
                ..
            } => {
                let mut attrs = Attrs::new();
                attrs.insert("href".to_string(), Value::String(href.clone()));
                put_some(&mut attrs, "target", target.as_deref());
                put_some(&mut attrs, "rel", rel.as_deref());
                attrs.extend(props.iter().map(|(k, v)| (k.clone(), v.clone())));
                let children = self.convert_inlines(&children.iter().collect::<Vec<_>>());
                MarkupNode::element("a", links::markup_attrs(attrs), children)
            }
            EditorNode::SpanStyle {
                style,
                class,
                props,
                children,
                ..
            } => {
                let mut attrs = props.clone();
                put_some(&mut attrs, "style", style.as_deref());
                put_some(&mut attrs, "class", class.as_deref());
                let children = self.convert_inlines(&children.iter().collect::<Vec<_>>());
                MarkupNode::element("span", attrs, children)
            }
            EditorNode::Binding {
                value,
                default_value,
                ..
            } => {
                let mut attrs = Attrs::new();
                put_some(&mut attrs, "value", value.as_deref());
                if let Some(default) = default_value {
                    attrs.insert("defaultValue".to_string(), default.clone());
                }
                MarkupNode::element("binding", attrs, Vec::new())
            }
            EditorNode::InlineElement {
                tag,
                props,
                children,
                ..
            } => {
                let children = self.convert_inlines(&children.iter().collect::<Vec<_>>());
                MarkupNode::element(tag.as_str(), props.clone(), children)
            }
            EditorNode::Comment { text } => MarkupNode::comment(text.as_str()),
            EditorNode::Unknown { kind, .. } => {
                warn!(kind = kind.as_str(), "Unknown editor node, writing a placeholder");
                unknown_marker(kind)
            }
            block => {
                // Block content where a line was expected
                let mut converted = Vec::new();
                self.convert_block(block, &mut converted);
                runs.extend(converted.into_iter().map(|node| Run {
                    marks: Vec::new(),
                    node,
                }));
                return;
            }
        };
        runs.push(Run { marks, node });
    }
}

/// Merge adjacent text runs carrying the same marks
fn coalesce(runs: Vec<Run>) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::with_capacity(runs.len());
    for group in group_by_signature(runs) {
        for run in group.items {
            if let (
                MarkupNode::Text(text),
                Some(Run {
                    node: MarkupNode::Text(last),
                    marks,
                }),
            ) = (&run.node, out.last_mut())
                && *marks == group.marks
            {
                last.push_str(text);
                continue;
            }
            out.push(run);
        }
    }
    out
}

/// Wrap runs in mark elements, outermost mark first, one element per run
/// of items sharing that mark
fn nest(runs: Vec<Run>) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    for (outer, items) in group_by_outer_mark(runs) {
        match outer {
            None => out.extend(items.into_iter().map(|run| run.node)),
            Some(mark) => {
                let inner = items
                    .into_iter()
                    .map(|mut run| {
                        run.marks.pop();
                        run
                    })
                    .collect();
                out.push(mark_element(&mark, nest(inner)));
            }
        }
    }
    out
}

fn mark_element(mark: &Mark, children: Vec<MarkupNode>) -> MarkupNode {
    let attrs = match mark.kind {
        MarkType::Link => links::markup_attrs(mark.attrs.clone()),
        _ => mark.attrs.clone(),
    };
    MarkupNode::element(mark.kind.tag(), attrs, children)
}

/// Join `<x>a</x> <x>b</x>` into `<x>a b</x>` for formatting elements with
/// identical attributes
fn merge_split_marks(nodes: Vec<MarkupNode>) -> Vec<MarkupNode> {
    let mut out: Vec<MarkupNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        out.push(node);
        let n = out.len();
        if n < 3 || !is_single_space(&out[n - 2]) || !can_merge(&out[n - 3], &out[n - 1]) {
            continue;
        }
        let (Some(MarkupNode::Element(right)), Some(space)) = (out.pop(), out.pop()) else {
            continue;
        };
        if let Some(MarkupNode::Element(left)) = out.last_mut() {
            let mut children = std::mem::take(&mut left.children);
            children.push(space);
            children.extend(right.children);
            left.children = merge_texts(children);
        }
    }
    out
}

fn is_single_space(node: &MarkupNode) -> bool {
    matches!(node, MarkupNode::Text(t) if t == " ")
}

fn can_merge(left: &MarkupNode, right: &MarkupNode) -> bool {
    match (left, right) {
        (MarkupNode::Element(l), MarkupNode::Element(r)) => {
            l.tag == r.tag
                && l.attrs == r.attrs
                && matches!(l.tag.as_str(), "strong" | "em" | "del" | "a")
        }
        _ => false,
    }
}

fn merge_texts(nodes: Vec<MarkupNode>) -> Vec<MarkupNode> {
    let mut out: Vec<MarkupNode> = Vec::with_capacity(nodes.len());
    for node in nodes {
        if let (MarkupNode::Text(text), Some(MarkupNode::Text(last))) = (&node, out.last_mut()) {
            last.push_str(text);
            continue;
        }
        out.push(node);
    }
    out
}

fn code_block(
    language: Option<&str>,
    filename: Option<&str>,
    meta: Option<&str>,
    code: Option<&str>,
    children: &[EditorNode],
) -> MarkupNode {
    // The raw source wins over whatever the children were decorated with
    let code = code
        .map(str::to_string)
        .unwrap_or_else(|| children.iter().map(EditorNode::text_content).collect());

    let mut attrs = Attrs::new();
    put_some(&mut attrs, "language", language);
    put_some(&mut attrs, "filename", filename);
    put_some(&mut attrs, "meta", meta);
    attrs.insert("code".to_string(), Value::String(code.clone()));

    let mut code_attrs = Attrs::new();
    code_attrs.insert("__ignoreMap".to_string(), Value::String(String::new()));
    let inner = MarkupNode::element("code", code_attrs, vec![MarkupNode::text(code)]);
    MarkupNode::element("pre", attrs, vec![inner])
}

fn image_attrs(props: &Attrs) -> Attrs {
    props
        .iter()
        .filter(|(_, value)| is_meaningful(value))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Video flags are written only when set
fn video_attrs(props: &Attrs) -> Attrs {
    props
        .iter()
        .filter(|(key, value)| {
            if VIDEO_FLAGS.contains(&key.as_str()) {
                value.as_bool().unwrap_or(false)
            } else {
                is_meaningful(value)
            }
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Null, `false` and empty strings carry nothing worth writing
fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => false,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn unknown_marker(kind: &str) -> MarkupNode {
    MarkupNode::text(format!("Unknown node: {kind}"))
}

fn put_some(attrs: &mut Attrs, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        attrs.insert(key.to_string(), Value::String(value.to_string()));
    }
}
