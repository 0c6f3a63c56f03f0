//! Markup tree to markdown writer
//!
//! Renders a [`MarkupTree`] back into markdown with component syntax.

use crate::node::{Attrs, Element, MarkupNode, MarkupTree, is_inline_at};
use serde_json::Value;

/// Options for the markdown writer
#[derive(Debug, Clone, Default)]
pub struct WriterOptions {
    /// Do not write the YAML frontmatter block
    pub skip_frontmatter: bool,
}

/// Convert a markup tree to markdown
pub fn tree_to_markdown(tree: &MarkupTree, options: &WriterOptions) -> String {
    let writer = Writer::new(options);
    writer.write_tree(tree)
}

/// Markdown writer state
struct Writer<'a> {
    options: &'a WriterOptions,
}

impl<'a> Writer<'a> {
    fn new(options: &'a WriterOptions) -> Self {
        Self { options }
    }

    fn write_tree(&self, tree: &MarkupTree) -> String {
        let mut output = String::new();

        if !self.options.skip_frontmatter {
            output.push_str(&write_frontmatter(&tree.frontmatter));
        }

        let body = self.write_blocks(&tree.nodes, 0, "\n\n");
        if !body.is_empty() {
            output.push_str(&body);
            output.push('\n');
        }

        output
    }

    /// Write a sequence of block-level nodes. Consecutive inline nodes are
    /// written together as one paragraph line.
    fn write_blocks(&self, nodes: &[MarkupNode], depth: usize, separator: &str) -> String {
        let mut parts: Vec<String> = Vec::new();
        let mut run_start: Option<usize> = None;

        for (i, node) in nodes.iter().enumerate() {
            if is_inline_at(nodes, i) {
                run_start.get_or_insert(i);
                continue;
            }
            if let Some(start) = run_start.take() {
                parts.push(self.write_inlines(&nodes[start..i]));
            }
            if let Some(block) = self.write_block(node, depth) {
                parts.push(block);
            }
        }
        if let Some(start) = run_start {
            parts.push(self.write_inlines(&nodes[start..]));
        }

        parts.join(separator)
    }

    fn write_block(&self, node: &MarkupNode, depth: usize) -> Option<String> {
        let el = match node {
            MarkupNode::Element(el) => el,
            MarkupNode::Comment(text) => return Some(format!("<!--{text}-->")),
            MarkupNode::Text(text) => return Some(text.clone()),
        };

        let block = match el.tag.as_str() {
            "p" => self.write_inlines(&el.children),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.write_heading(el),
            "hr" => "---".to_string(),
            "blockquote" => self.write_blockquote(el, depth),
            "ul" | "ol" => self.write_list(el, depth),
            "pre" => write_code(el),
            "html" => el.text_content(),
            // Presentation only (highlighter CSS)
            "style" => return None,
            _ => self.write_component(el, depth),
        };
        Some(block)
    }

    fn write_heading(&self, el: &Element) -> String {
        let level = el.tag[1..].parse::<usize>().unwrap_or(1);
        format!("{} {}", "#".repeat(level), self.write_inlines(&el.children))
    }

    fn write_blockquote(&self, el: &Element, depth: usize) -> String {
        let inner = self.write_blocks(&el.children, depth, "\n\n");
        inner
            .lines()
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {line}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn write_list(&self, el: &Element, depth: usize) -> String {
        let ordered = el.tag == "ol";
        let mut num = el.attrs.get("start").and_then(Value::as_u64).unwrap_or(1);

        // A list is loose when any of its items holds a paragraph
        let loose = el.children.iter().any(|item| {
            item.as_element().is_some_and(|li| {
                li.children
                    .iter()
                    .any(|c| c.as_element().is_some_and(|c| c.tag == "p"))
            })
        });
        let item_separator = if loose { "\n\n" } else { "\n" };

        let mut items = Vec::new();
        for child in &el.children {
            let marker = if ordered {
                let marker = format!("{num}. ");
                num += 1;
                marker
            } else {
                "- ".to_string()
            };

            let content = match child {
                MarkupNode::Element(li) if li.tag == "li" => {
                    self.write_blocks(&li.children, depth, item_separator)
                }
                other => self.write_blocks(std::slice::from_ref(other), depth, item_separator),
            };
            items.push(format!("{marker}{}", indent_continuation(&content, marker.len())));
        }

        items.join(item_separator)
    }

    fn write_component(&self, el: &Element, depth: usize) -> String {
        let colons = ":".repeat(depth + 2);
        let mut output = format!("{colons}{}{}", el.tag, format_attrs(&el.attrs, &[]));

        let mut segments = Vec::new();
        let mut run: Vec<MarkupNode> = Vec::new();
        for child in &el.children {
            match child.as_element().and_then(slot_name) {
                Some(name) => {
                    if !run.is_empty() {
                        segments.push(self.write_blocks(&run, depth + 1, "\n\n"));
                        run.clear();
                    }
                    let template = child.as_element().map(|t| t.children.as_slice());
                    let body = self.write_blocks(template.unwrap_or_default(), depth + 1, "\n\n");
                    if body.is_empty() {
                        segments.push(format!("#{name}"));
                    } else {
                        segments.push(format!("#{name}\n{body}"));
                    }
                }
                None => run.push(child.clone()),
            }
        }
        if !run.is_empty() {
            segments.push(self.write_blocks(&run, depth + 1, "\n\n"));
        }

        for segment in segments.iter().filter(|s| !s.is_empty()) {
            output.push('\n');
            output.push_str(segment);
        }
        output.push('\n');
        output.push_str(&colons);
        output
    }

    fn write_inlines(&self, nodes: &[MarkupNode]) -> String {
        let mut output = String::new();
        for node in nodes {
            self.write_inline(node, &mut output);
        }
        output
    }

    fn write_inline(&self, node: &MarkupNode, output: &mut String) {
        let el = match node {
            MarkupNode::Text(text) => {
                output.push_str(text);
                return;
            }
            MarkupNode::Comment(text) => {
                output.push_str(&format!("<!--{text}-->"));
                return;
            }
            MarkupNode::Element(el) => el,
        };

        match el.tag.as_str() {
            "strong" => self.write_delimited(el, "**", output),
            "em" => self.write_delimited(el, "*", output),
            "del" => self.write_delimited(el, "~~", output),
            "code" => {
                write_inline_code(&el.text_content(), output);
                output.push_str(&format_attrs(&el.attrs, &["class", "style"]));
            }
            "a" => {
                output.push('[');
                output.push_str(&self.write_inlines(&el.children));
                output.push_str("](");
                output.push_str(el.attr_str("href").unwrap_or_default());
                if let Some(title) = el.attr_str("title") {
                    output.push_str(&format!(" \"{}\"", title.replace('"', "\\\"")));
                }
                output.push(')');
                output.push_str(&format_attrs(&el.attrs, &["href", "title"]));
            }
            "img" => {
                output.push_str("![");
                output.push_str(el.attr_str("alt").unwrap_or_default());
                output.push_str("](");
                output.push_str(el.attr_str("src").unwrap_or_default());
                if let Some(title) = el.attr_str("title") {
                    output.push_str(&format!(" \"{}\"", title.replace('"', "\\\"")));
                }
                output.push(')');
                output.push_str(&format_attrs(&el.attrs, &["src", "alt", "title"]));
            }
            "br" => output.push_str("\\\n"),
            "span" => {
                output.push('[');
                output.push_str(&self.write_inlines(&el.children));
                output.push(']');
                let attrs = format_attrs(&el.attrs, &[]);
                output.push_str(if attrs.is_empty() { "{}" } else { &attrs });
            }
            "binding" => {
                let value = el.attr_str("value").unwrap_or_default();
                match el.attrs.get("defaultValue") {
                    Some(Value::String(default)) => {
                        output.push_str(&format!("{{{{ {value} || '{default}' }}}}"))
                    }
                    Some(Value::Number(default)) => {
                        output.push_str(&format!("{{{{ {value} || {default} }}}}"))
                    }
                    _ => output.push_str(&format!("{{{{ {value} }}}}")),
                }
            }
            "p" => output.push_str(&self.write_inlines(&el.children)),
            "style" => {}
            tag => {
                output.push(':');
                output.push_str(tag);
                if !el.children.is_empty() {
                    output.push('[');
                    output.push_str(&self.write_inlines(&el.children));
                    output.push(']');
                }
                let attrs = format_attrs(&el.attrs, &[]);
                if attrs.is_empty() && el.children.is_empty() {
                    output.push_str("{}");
                } else {
                    output.push_str(&attrs);
                }
            }
        }
    }

    fn write_delimited(&self, el: &Element, delimiter: &str, output: &mut String) {
        output.push_str(delimiter);
        output.push_str(&self.write_inlines(&el.children));
        output.push_str(delimiter);
        output.push_str(&format_attrs(&el.attrs, &[]));
    }
}

fn write_frontmatter(frontmatter: &Value) -> String {
    let yaml = match frontmatter {
        Value::Null => return String::new(),
        Value::Object(map) if map.is_empty() => return String::new(),
        // Kept verbatim by the parser because it was not a mapping
        Value::String(raw) => format!("{}\n", raw.trim_end_matches('\n')),
        other => match serde_yaml::to_string(other) {
            Ok(yaml) => yaml,
            Err(_) => return String::new(),
        },
    };
    format!("---\n{yaml}---\n\n")
}

fn write_code(el: &Element) -> String {
    let code = el
        .attr_str("code")
        .map(str::to_string)
        .unwrap_or_else(|| el.text_content());

    let fence = "`".repeat(calculate_fence_length(&code));
    let mut info = Vec::new();
    if let Some(language) = el.attr_str("language").filter(|l| !l.is_empty()) {
        info.push(language.to_string());
    }
    if let Some(filename) = el.attr_str("filename").filter(|f| !f.is_empty()) {
        info.push(format!("[{filename}]"));
    }
    if let Some(meta) = el.attr_str("meta").filter(|m| !m.is_empty()) {
        info.push(meta.to_string());
    }

    let mut output = format!("{fence}{}\n", info.join(" "));
    if !code.is_empty() {
        output.push_str(&code);
        output.push('\n');
    }
    output.push_str(&fence);
    output
}

fn write_inline_code(value: &str, output: &mut String) {
    // Add space before if the previous character is a backtick
    // This prevents `foo``bar` which CommonMark parses as a single code span
    if output.ends_with('`') {
        output.push(' ');
    }

    if value.contains('`') {
        output.push_str("`` ");
        output.push_str(value);
        output.push_str(" ``");
    } else {
        output.push('`');
        output.push_str(value);
        output.push('`');
    }
}

/// Indent every line after the first, leaving blank lines empty
fn indent_continuation(content: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    content
        .split('\n')
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Slot name of a `template` element (`v-slot:name` or `#name` attribute)
pub fn slot_name(el: &Element) -> Option<&str> {
    if el.tag != "template" {
        return None;
    }
    el.attrs.keys().find_map(|key| {
        key.strip_prefix("v-slot:")
            .or_else(|| key.strip_prefix('#'))
            .filter(|name| !name.is_empty())
    })
}

/// Format attributes in `{#id .class key="value" flag}` syntax.
///
/// Keys listed in `skip`, internal `__` keys and nulls are left out. Returns
/// an empty string when nothing remains.
pub fn format_attrs(attrs: &Attrs, skip: &[&str]) -> String {
    let mut parts = Vec::new();

    for (key, value) in attrs {
        if skip.contains(&key.as_str()) || key.starts_with("__") {
            continue;
        }
        match (key.as_str(), value) {
            ("id", Value::String(id)) if !id.is_empty() && !id.contains(char::is_whitespace) => {
                parts.push(format!("#{id}"));
            }
            ("class", Value::String(class)) if !class.trim().is_empty() => {
                parts.extend(class.split_whitespace().map(|c| format!(".{c}")));
            }
            (_, Value::Null) => {}
            (_, Value::Bool(true)) => parts.push(key.clone()),
            (_, Value::Bool(false)) => parts.push(format!("{key}=false")),
            (_, Value::Number(n)) => parts.push(format!("{key}={n}")),
            (_, Value::String(s)) => parts.push(format!("{key}=\"{}\"", s.replace('"', "\\\""))),
            (_, other) => parts.push(format!(":{key}='{other}'")),
        }
    }

    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(" "))
    }
}

/// Fence length: longer than any backtick run in the content, at least 3
fn calculate_fence_length(content: &str) -> usize {
    let mut max_run = 0;
    let mut current = 0;
    for ch in content.chars() {
        if ch == '`' {
            current += 1;
            max_run = max_run.max(current);
        } else {
            current = 0;
        }
    }
    (max_run + 1).max(3)
}
