//! Markdown chunk parsing
//!
//! Drives pulldown-cmark over a chunk of plain markdown and folds the event
//! stream into markup nodes with a frame stack. Inline MDC syntax is applied
//! to each element's children when the element closes.

use crate::inline;
use mdc_ast::{Attrs, MarkupNode};
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser as CmarkParser, Tag};
use serde_json::Value;

/// Parse markdown into block nodes
pub fn parse_blocks(source: &str) -> Vec<MarkupNode> {
    let mut builder = TreeBuilder::new();
    for event in CmarkParser::new_ext(source, Options::ENABLE_STRIKETHROUGH) {
        builder.event(event);
    }
    builder.finish()
}

#[derive(Debug)]
enum FrameKind {
    Element,
    CodeBlock { info: String },
    Image,
    HtmlBlock,
    /// Children are spliced into the parent
    Transparent,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    tag: String,
    attrs: Attrs,
    children: Vec<MarkupNode>,
}

impl Frame {
    fn new(kind: FrameKind, tag: &str, attrs: Attrs) -> Self {
        Self {
            kind,
            tag: tag.to_string(),
            attrs,
            children: Vec::new(),
        }
    }
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::new(FrameKind::Transparent, "", Attrs::new())],
        }
    }

    fn finish(mut self) -> Vec<MarkupNode> {
        while self.stack.len() > 1 {
            self.close();
        }
        self.stack
            .pop()
            .map(|root| inline::apply(root.children))
            .unwrap_or_default()
    }

    fn push(&mut self, node: MarkupNode) {
        if let Some(frame) = self.stack.last_mut() {
            append_node(&mut frame.children, node);
        }
    }

    fn open(&mut self, kind: FrameKind, tag: &str, attrs: Attrs) {
        self.stack.push(Frame::new(kind, tag, attrs));
    }

    fn open_element(&mut self, tag: &str) {
        self.open(FrameKind::Element, tag, Attrs::new());
    }

    fn close(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame.kind {
            FrameKind::Element => {
                let children = inline::apply(frame.children);
                self.push(MarkupNode::element(frame.tag, frame.attrs, children));
            }
            FrameKind::CodeBlock { info } => {
                let code = concat_text(&frame.children);
                self.push(code_block(&info, code));
            }
            FrameKind::Image => {
                let mut attrs = frame.attrs;
                let alt: String = frame.children.iter().map(MarkupNode::text_content).collect();
                let title = attrs.remove("title");
                attrs.insert("alt".to_string(), Value::String(alt));
                if let Some(title) = title {
                    attrs.insert("title".to_string(), title);
                }
                self.push(MarkupNode::element("img", attrs, Vec::new()));
            }
            FrameKind::HtmlBlock => {
                let raw = concat_text(&frame.children);
                self.push(html_node(raw.trim_end_matches('\n')));
            }
            FrameKind::Transparent => {
                for child in frame.children {
                    self.push(child);
                }
            }
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.close(),
            Event::Text(text) => self.push(MarkupNode::text(text.as_ref())),
            Event::Code(code) => self.push(MarkupNode::element(
                "code",
                Attrs::new(),
                vec![MarkupNode::text(code.as_ref())],
            )),
            Event::Html(raw) => self.push(MarkupNode::text(raw.as_ref())),
            Event::InlineHtml(raw) => self.push(html_inline(raw.as_ref())),
            Event::SoftBreak => self.push(MarkupNode::text("\n")),
            Event::HardBreak => self.push(MarkupNode::element("br", Attrs::new(), Vec::new())),
            Event::Rule => self.push(MarkupNode::element("hr", Attrs::new(), Vec::new())),
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.open_element("p"),
            Tag::Heading { level, .. } => self.open_element(&format!("h{}", level as usize)),
            Tag::BlockQuote(_) => self.open_element("blockquote"),
            Tag::List(Some(start)) => {
                let mut attrs = Attrs::new();
                if start != 1 {
                    attrs.insert("start".to_string(), Value::from(start));
                }
                self.open(FrameKind::Element, "ol", attrs);
            }
            Tag::List(None) => self.open_element("ul"),
            Tag::Item => self.open_element("li"),
            Tag::Emphasis => self.open_element("em"),
            Tag::Strong => self.open_element("strong"),
            Tag::Strikethrough => self.open_element("del"),
            Tag::Link {
                dest_url, title, ..
            } => {
                let mut attrs = Attrs::new();
                attrs.insert("href".to_string(), Value::String(dest_url.to_string()));
                if !title.is_empty() {
                    attrs.insert("title".to_string(), Value::String(title.to_string()));
                }
                self.open(FrameKind::Element, "a", attrs);
            }
            Tag::Image {
                dest_url, title, ..
            } => {
                let mut attrs = Attrs::new();
                attrs.insert("src".to_string(), Value::String(dest_url.to_string()));
                if !title.is_empty() {
                    attrs.insert("title".to_string(), Value::String(title.to_string()));
                }
                self.open(FrameKind::Image, "img", attrs);
            }
            Tag::CodeBlock(kind) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => info.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.open(FrameKind::CodeBlock { info }, "pre", Attrs::new());
            }
            Tag::HtmlBlock => self.open(FrameKind::HtmlBlock, "html", Attrs::new()),
            _ => self.open(FrameKind::Transparent, "", Attrs::new()),
        }
    }
}

/// Append a node, merging adjacent text
pub(crate) fn append_node(children: &mut Vec<MarkupNode>, node: MarkupNode) {
    if let MarkupNode::Text(text) = &node {
        if text.is_empty() {
            return;
        }
        if let Some(MarkupNode::Text(last)) = children.last_mut() {
            last.push_str(text);
            return;
        }
    }
    children.push(node);
}

fn concat_text(nodes: &[MarkupNode]) -> String {
    nodes
        .iter()
        .filter_map(|n| match n {
            MarkupNode::Text(s) => Some(s.as_str()),
            _ => None,
        })
        .collect()
}

/// Build a `pre` element from a fence info string and its code.
///
/// The info string is `language [filename] meta...`.
fn code_block(info: &str, mut code: String) -> MarkupNode {
    if code.ends_with('\n') {
        code.pop();
    }

    let (language, filename, meta) = parse_info(info);
    let mut attrs = Attrs::new();
    if let Some(language) = language {
        attrs.insert("language".to_string(), Value::String(language));
    }
    if let Some(filename) = filename {
        attrs.insert("filename".to_string(), Value::String(filename));
    }
    if let Some(meta) = meta {
        attrs.insert("meta".to_string(), Value::String(meta));
    }
    attrs.insert("code".to_string(), Value::String(code.clone()));

    let mut code_attrs = Attrs::new();
    code_attrs.insert("__ignoreMap".to_string(), Value::String(String::new()));
    let inner = MarkupNode::element("code", code_attrs, vec![MarkupNode::text(code)]);

    MarkupNode::element("pre", attrs, vec![inner])
}

fn parse_info(info: &str) -> (Option<String>, Option<String>, Option<String>) {
    let info = info.trim();
    if info.is_empty() {
        return (None, None, None);
    }

    let (language, mut rest) = if info.starts_with('[') {
        (None, info)
    } else {
        let end = info
            .find(|c: char| c.is_whitespace() || c == '[' || c == '{')
            .unwrap_or(info.len());
        (Some(info[..end].to_string()), info[end..].trim_start())
    };

    let mut filename = None;
    if let Some(after) = rest.strip_prefix('[')
        && let Some(close) = after.find(']')
    {
        filename = Some(after[..close].to_string());
        rest = after[close + 1..].trim_start();
    }

    let meta = (!rest.is_empty()).then(|| rest.to_string());
    (language, filename, meta)
}

fn comment_text(raw: &str) -> Option<&str> {
    raw.trim()
        .strip_prefix("<!--")
        .and_then(|s| s.strip_suffix("-->"))
}

fn html_node(raw: &str) -> MarkupNode {
    match comment_text(raw) {
        Some(text) => MarkupNode::comment(text),
        None => MarkupNode::element("html", Attrs::new(), vec![MarkupNode::text(raw)]),
    }
}

fn html_inline(raw: &str) -> MarkupNode {
    match comment_text(raw) {
        Some(text) => MarkupNode::comment(text),
        None => MarkupNode::text(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn wire(nodes: &[MarkupNode]) -> Value {
        Value::Array(nodes.iter().map(MarkupNode::to_wire).collect())
    }

    #[test]
    fn test_nested_emphasis() {
        let nodes = parse_blocks("*y **x***");
        assert_eq!(
            wire(&nodes),
            json!([["p", {}, ["em", {}, "y ", ["strong", {}, "x"]]]])
        );
    }

    #[test]
    fn test_headings_and_breaks() {
        let nodes = parse_blocks("## Title\n\nline one\nline two  \nthree");
        assert_eq!(
            wire(&nodes),
            json!([
                ["h2", {}, "Title"],
                ["p", {}, "line one\nline two", ["br", {}], "three"]
            ])
        );
    }

    #[test]
    fn test_lists() {
        let nodes = parse_blocks("3. a\n4. b\n\n- x\n  - y");
        assert_eq!(
            wire(&nodes),
            json!([
                ["ol", {"start": 3}, ["li", {}, "a"], ["li", {}, "b"]],
                ["ul", {}, ["li", {}, "x", ["ul", {}, ["li", {}, "y"]]]]
            ])
        );
    }

    #[test]
    fn test_code_block_keeps_whitespace() {
        let nodes = parse_blocks("```ts [app.ts] {1,3}\nif (a) {\n\treturn  1;\n}\n```");
        assert_eq!(
            wire(&nodes),
            json!([[
                "pre",
                {
                    "language": "ts",
                    "filename": "app.ts",
                    "meta": "{1,3}",
                    "code": "if (a) {\n\treturn  1;\n}"
                },
                ["code", {"__ignoreMap": ""}, "if (a) {\n\treturn  1;\n}"]
            ]])
        );
    }

    #[test]
    fn test_links_and_images() {
        let nodes = parse_blocks("[a](/x \"T\") ![cat **pic**](c.png)");
        assert_eq!(
            wire(&nodes),
            json!([[
                "p",
                {},
                ["a", {"href": "/x", "title": "T"}, "a"],
                " ",
                ["img", {"src": "c.png", "alt": "cat pic"}]
            ]])
        );
    }

    #[test]
    fn test_comments_and_html() {
        let nodes = parse_blocks("<!-- note -->\n\n<div>raw</div>");
        assert_eq!(
            wire(&nodes),
            json!([[null, {}, " note "], ["html", {}, "<div>raw</div>"]])
        );
    }

    #[test]
    fn test_info_string() {
        assert_eq!(parse_info(""), (None, None, None));
        assert_eq!(parse_info("rust"), (Some("rust".to_string()), None, None));
        assert_eq!(
            parse_info("[only.txt]"),
            (None, Some("only.txt".to_string()), None)
        );
    }
}
