//! MDC document parser
//!
//! Recursive descent over the line tokens: markdown lines are collected into
//! chunks for the markdown parser, component fences open and close nested
//! elements, and `#slot` lines start named `template` children.

use crate::attributes::{AttributeError, parse_attributes};
use crate::frontmatter::{decode_frontmatter, split_frontmatter};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::markdown::parse_blocks;
use mdc_ast::{Attrs, MarkupNode, MarkupTree};
use serde_json::{Map, Value};
use thiserror::Error;

/// Parser errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Component ::{name} opened at line {line} is never closed")]
    UnclosedComponent { name: String, line: usize },

    #[error("Invalid attributes for ::{name} at line {line}: {source}")]
    InvalidAttributes {
        name: String,
        line: usize,
        source: AttributeError,
    },
}

/// Parse result type
pub type ParseResult<T> = Result<T, ParseError>;

/// Nodes being collected for a component or slot body
#[derive(Default)]
struct Body {
    nodes: Vec<MarkupNode>,
    pending: Vec<String>,
}

impl Body {
    fn line(&mut self, raw: &str) {
        self.pending.push(raw.to_string());
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let chunk = self.pending.join("\n");
        self.pending.clear();
        self.nodes.extend(parse_blocks(&chunk));
    }

    fn push(&mut self, node: MarkupNode) {
        self.flush();
        self.nodes.push(node);
    }

    fn finish(mut self) -> Vec<MarkupNode> {
        self.flush();
        self.nodes
    }
}

/// MDC document parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    frontmatter: Value,
}

impl Parser {
    /// Create a new parser from source text
    pub fn new(source: &str) -> Self {
        let (yaml, body) = split_frontmatter(source);
        Self {
            tokens: Lexer::tokenize(body),
            pos: 0,
            frontmatter: yaml.map_or_else(|| Value::Object(Map::new()), decode_frontmatter),
        }
    }

    /// Parse the entire document
    pub fn parse(&mut self) -> ParseResult<MarkupTree> {
        let mut body = Body::default();

        while let Some(token) = self.advance() {
            match token.kind {
                TokenKind::ComponentOpen { name, attrs, .. } => {
                    let node = self.parse_component(name, attrs.as_deref(), token.line)?;
                    body.push(node);
                }
                // Stray closers and slot markers are plain text outside components
                _ => body.line(&token.raw),
            }
        }

        let mut tree = MarkupTree::new(body.finish());
        tree.frontmatter = std::mem::take(&mut self.frontmatter);
        Ok(tree)
    }

    fn parse_component(
        &mut self,
        name: String,
        attrs: Option<&str>,
        line: usize,
    ) -> ParseResult<MarkupNode> {
        let attrs = match attrs {
            Some(block) => {
                parse_attributes(block).map_err(|source| ParseError::InvalidAttributes {
                    name: name.clone(),
                    line,
                    source,
                })?
            }
            None => Attrs::new(),
        };

        let mut children = Body::default();
        let mut slot: Option<(String, Body)> = None;

        loop {
            let Some(token) = self.advance() else {
                return Err(ParseError::UnclosedComponent { name, line });
            };

            match token.kind {
                TokenKind::Markdown => match &mut slot {
                    Some((_, body)) => body.line(&token.raw),
                    None => children.line(&token.raw),
                },
                TokenKind::ComponentOpen {
                    name: child_name,
                    attrs: child_attrs,
                    ..
                } => {
                    let node = self.parse_component(child_name, child_attrs.as_deref(), token.line)?;
                    match &mut slot {
                        Some((_, body)) => body.push(node),
                        None => children.push(node),
                    }
                }
                TokenKind::Slot(slot_name) => {
                    if let Some((prev, body)) = slot.take() {
                        children.push(slot_template(prev, body));
                    }
                    slot = Some((slot_name, Body::default()));
                }
                TokenKind::ComponentClose { .. } => {
                    if let Some((prev, body)) = slot.take() {
                        children.push(slot_template(prev, body));
                    }
                    break;
                }
            }
        }

        Ok(MarkupNode::element(name, attrs, children.finish()))
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned()?;
        self.pos += 1;
        Some(token)
    }
}

fn slot_template(name: String, body: Body) -> MarkupNode {
    let mut attrs = Attrs::new();
    attrs.insert(format!("v-slot:{}", name), Value::String(String::new()));
    MarkupNode::element("template", attrs, body.finish())
}

/// Convenience function to parse MDC source
pub fn parse(source: &str) -> ParseResult<MarkupTree> {
    let mut parser = Parser::new(source);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wire(tree: &MarkupTree) -> Value {
        Value::Array(tree.nodes.iter().map(MarkupNode::to_wire).collect())
    }

    #[test]
    fn test_empty_document() {
        let tree = parse("").unwrap();
        assert!(tree.nodes.is_empty());
        assert_eq!(tree.frontmatter, json!({}));
    }

    #[test]
    fn test_component_with_slot() {
        let tree = parse("::alert{type=\"info\"}\nHello **world**\n#title\nThe title\n::").unwrap();
        assert_eq!(
            wire(&tree),
            json!([[
                "alert",
                {"type": "info"},
                ["p", {}, "Hello ", ["strong", {}, "world"]],
                ["template", {"v-slot:title": ""}, ["p", {}, "The title"]]
            ]])
        );
    }

    #[test]
    fn test_nested_components() {
        let tree = parse("::grid\n:::card\nOne\n:::\n:::card\nTwo\n:::\n::\n\nAfter").unwrap();
        assert_eq!(
            wire(&tree),
            json!([
                [
                    "grid",
                    {},
                    ["card", {}, ["p", {}, "One"]],
                    ["card", {}, ["p", {}, "Two"]]
                ],
                ["p", {}, "After"]
            ])
        );
    }

    #[test]
    fn test_frontmatter() {
        let tree = parse("---\ntitle: Demo\ndraft: true\n---\n\n# Demo\n").unwrap();
        assert_eq!(tree.frontmatter, json!({"title": "Demo", "draft": true}));
        assert_eq!(wire(&tree), json!([["h1", {}, "Demo"]]));
    }

    #[test]
    fn test_scalar_frontmatter_is_kept_raw() {
        let tree = parse("---\nhello\n---\nBody").unwrap();
        assert_eq!(tree.frontmatter, json!("hello"));
    }

    #[test]
    fn test_unclosed_component() {
        let err = parse("Intro\n\n::alert\nBody\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnclosedComponent { ref name, line: 3 } if name == "alert"
        ));
        assert_eq!(
            err.to_string(),
            "Component ::alert opened at line 3 is never closed"
        );
    }

    #[test]
    fn test_invalid_attributes() {
        let err = parse("::alert{title=\"open}\n::").unwrap_err();
        assert!(matches!(err, ParseError::InvalidAttributes { line: 1, .. }));
    }

    #[test]
    fn test_component_fence_inside_code_block() {
        let tree = parse("```md\n::alert\n```").unwrap();
        let pre = tree.nodes[0].as_element().unwrap();
        assert_eq!(pre.tag, "pre");
        assert_eq!(pre.attr_str("code"), Some("::alert"));
    }

    #[test]
    fn test_stray_closer_is_text() {
        let tree = parse("::\n#note").unwrap();
        assert_eq!(wire(&tree), json!([["p", {}, "::\n#note"]]));
    }
}
