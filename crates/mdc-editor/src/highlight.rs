//! Syntax highlighting post-processor
//!
//! Decorates `pre` code blocks, and inline `code` carrying a `language`, with
//! presentation-only token spans. The `code` attribute stays the source of
//! truth: every pass strips earlier decoration and rebuilds the spans from
//! it, so highlighting twice gives the same tree as highlighting once.
//! Tokenizer or theme failures leave the code undecorated.

use mdc_ast::{Attrs, Element, MarkupNode, MarkupTree};
use serde_json::Value;
use std::collections::BTreeMap;
use syntect::easy::ScopeRegionIterator;
use syntect::highlighting::{Color, Highlighter, Theme, ThemeSet};
use syntect::parsing::{ParseState, ParsingError, ScopeError, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use thiserror::Error;
use tracing::warn;

/// Class marking a decorated block
pub const HIGHLIGHT_CLASS: &str = "mdc-highlight";

#[derive(Debug, Error)]
pub enum HighlightError {
    #[error("Unknown highlight theme `{0}`")]
    UnknownTheme(String),

    #[error("Failed to tokenize code: {0}")]
    Parse(#[from] ParsingError),

    #[error("Invalid scope operation: {0}")]
    Scope(#[from] ScopeError),
}

/// Theme selection: one default theme plus named variants (e.g. `dark`)
/// exposed as CSS custom properties
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightThemes {
    pub default: String,
    pub variants: BTreeMap<String, String>,
}

impl Default for HighlightThemes {
    fn default() -> Self {
        Self {
            default: "InspiredGitHub".to_string(),
            variants: BTreeMap::new(),
        }
    }
}

impl HighlightThemes {
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            default: default.into(),
            variants: BTreeMap::new(),
        }
    }

    pub fn with_variant(mut self, name: impl Into<String>, theme: impl Into<String>) -> Self {
        self.variants.insert(name.into(), theme.into());
        self
    }
}

struct ResolvedThemes<'a> {
    default: &'a Theme,
    variants: Vec<(&'a str, &'a Theme)>,
}

/// One highlighted token
#[derive(Debug, Clone, PartialEq)]
struct Token {
    style: String,
    text: String,
}

#[derive(Debug, Default)]
struct Line {
    tokens: Vec<Token>,
    newline: bool,
}

/// Syntect-backed highlighter.
///
/// Loading the syntax and theme sets is expensive; build one and share it by
/// reference across conversions.
#[derive(Debug)]
pub struct SyntaxHighlighter {
    syntaxes: SyntaxSet,
    themes: ThemeSet,
}

impl Default for SyntaxHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntaxHighlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            themes: ThemeSet::load_defaults(),
        }
    }

    pub fn has_theme(&self, name: &str) -> bool {
        self.themes.themes.contains_key(name)
    }

    pub fn theme_names(&self) -> impl Iterator<Item = &str> {
        self.themes.themes.keys().map(String::as_str)
    }

    /// Decorate every code block of the tree
    pub fn highlight(&self, tree: &MarkupTree, themes: &HighlightThemes) -> MarkupTree {
        let resolved = match self.resolve(themes) {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                warn!("{}; code blocks are left undecorated", e);
                None
            }
        };

        let mut nodes: Vec<MarkupNode> = tree
            .nodes
            .iter()
            .filter(|node| !is_style(node))
            .map(|node| self.decorate(node, resolved.as_ref()))
            .collect();

        if let Some(resolved) = &resolved
            && !resolved.variants.is_empty()
        {
            nodes.push(MarkupNode::element(
                "style",
                Attrs::new(),
                vec![MarkupNode::text(variant_css(&resolved.variants))],
            ));
        }

        MarkupTree {
            nodes,
            frontmatter: tree.frontmatter.clone(),
            meta: tree.meta.clone(),
        }
    }

    fn resolve<'a>(&'a self, themes: &'a HighlightThemes) -> Result<ResolvedThemes<'a>, HighlightError> {
        let lookup = |name: &str| {
            self.themes
                .themes
                .get(name)
                .ok_or_else(|| HighlightError::UnknownTheme(name.to_string()))
        };

        let default = lookup(&themes.default)?;
        let variants = themes
            .variants
            .iter()
            .map(|(variant, theme)| Ok((variant.as_str(), lookup(theme)?)))
            .collect::<Result<Vec<_>, HighlightError>>()?;
        Ok(ResolvedThemes { default, variants })
    }

    fn decorate(&self, node: &MarkupNode, themes: Option<&ResolvedThemes<'_>>) -> MarkupNode {
        let MarkupNode::Element(el) = node else {
            return node.clone();
        };
        match el.tag.as_str() {
            "pre" => self.decorate_block(el, themes),
            "code" if el.attrs.contains_key("language") => self.decorate_inline(el, themes),
            _ => MarkupNode::Element(Element {
                tag: el.tag.clone(),
                attrs: el.attrs.clone(),
                children: el
                    .children
                    .iter()
                    .map(|child| self.decorate(child, themes))
                    .collect(),
            }),
        }
    }

    fn decorate_block(&self, el: &Element, themes: Option<&ResolvedThemes<'_>>) -> MarkupNode {
        let code = el
            .attr_str("code")
            .map(str::to_string)
            .unwrap_or_else(|| el.text_content());
        let mut attrs = strip_decoration(&el.attrs);
        if !attrs.contains_key("code") {
            attrs.insert("code".to_string(), Value::String(code.clone()));
        }

        let language = el.attr_str("language").filter(|l| !l.is_empty());
        let body = match (themes, language) {
            (Some(themes), Some(language)) => match self.tokenize(&code, language, themes) {
                Ok(lines) => {
                    add_class(&mut attrs);
                    line_nodes(lines)
                }
                Err(e) => {
                    warn!(language, "Failed to highlight code block: {}", e);
                    vec![MarkupNode::text(code)]
                }
            },
            _ => vec![MarkupNode::text(code)],
        };

        let mut code_attrs = Attrs::new();
        code_attrs.insert("__ignoreMap".to_string(), Value::String(String::new()));
        MarkupNode::element(
            "pre",
            attrs,
            vec![MarkupNode::element("code", code_attrs, body)],
        )
    }

    fn decorate_inline(&self, el: &Element, themes: Option<&ResolvedThemes<'_>>) -> MarkupNode {
        let code = el.text_content();
        let mut attrs = strip_decoration(&el.attrs);
        let language = el.attr_str("language").unwrap_or_default();

        let children = match themes.map(|t| self.tokenize(&code, language, t)) {
            Some(Ok(lines)) => {
                add_class(&mut attrs);
                lines
                    .into_iter()
                    .flat_map(|line| {
                        let mut nodes: Vec<MarkupNode> =
                            line.tokens.into_iter().map(token_node).collect();
                        if line.newline {
                            nodes.push(MarkupNode::text("\n"));
                        }
                        nodes
                    })
                    .collect()
            }
            Some(Err(e)) => {
                warn!(language, "Failed to highlight inline code: {}", e);
                vec![MarkupNode::text(code)]
            }
            None => vec![MarkupNode::text(code)],
        };

        MarkupNode::element("code", attrs, children)
    }

    fn find_syntax(&self, language: &str) -> &SyntaxReference {
        self.syntaxes
            .find_syntax_by_token(language)
            .or_else(|| self.syntaxes.find_syntax_by_extension(language))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    fn tokenize(
        &self,
        code: &str,
        language: &str,
        themes: &ResolvedThemes<'_>,
    ) -> Result<Vec<Line>, HighlightError> {
        let mut state = ParseState::new(self.find_syntax(language));
        let mut stack = ScopeStack::new();
        let default = Highlighter::new(themes.default);
        let variants: Vec<(&str, Highlighter<'_>)> = themes
            .variants
            .iter()
            .map(|(name, theme)| (*name, Highlighter::new(theme)))
            .collect();

        let mut lines = Vec::new();
        for raw in LinesWithEndings::from(code) {
            let ops = state.parse_line(raw, &self.syntaxes)?;
            let body_len = raw.strip_suffix('\n').map_or(raw.len(), str::len);
            let mut line = Line {
                tokens: Vec::new(),
                newline: body_len < raw.len(),
            };

            let mut pos = 0;
            for (text, op) in ScopeRegionIterator::new(&ops, raw) {
                stack.apply(op)?;
                let start = pos;
                pos += text.len();
                let end = pos.min(body_len);
                if start >= end {
                    continue;
                }

                let scopes = stack.as_slice();
                let mut style = format!("color:{}", hex(default.style_for_stack(scopes).foreground));
                for (name, highlighter) in &variants {
                    let color = hex(highlighter.style_for_stack(scopes).foreground);
                    style.push_str(&format!(";--mdc-{name}:{color}"));
                }
                push_token(&mut line.tokens, style, &raw[start..end]);
            }
            lines.push(line);
        }
        Ok(lines)
    }
}

fn push_token(tokens: &mut Vec<Token>, style: String, text: &str) {
    match tokens.last_mut() {
        Some(last) if last.style == style => last.text.push_str(text),
        _ => tokens.push(Token {
            style,
            text: text.to_string(),
        }),
    }
}

fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn token_node(token: Token) -> MarkupNode {
    let mut attrs = Attrs::new();
    attrs.insert("style".to_string(), Value::String(token.style));
    MarkupNode::element("span", attrs, vec![MarkupNode::text(token.text)])
}

fn line_nodes(lines: Vec<Line>) -> Vec<MarkupNode> {
    let mut nodes = Vec::new();
    for line in lines {
        let mut attrs = Attrs::new();
        attrs.insert("class".to_string(), Value::String("line".to_string()));
        let tokens = line.tokens.into_iter().map(token_node).collect();
        nodes.push(MarkupNode::element("span", attrs, tokens));
        if line.newline {
            nodes.push(MarkupNode::text("\n"));
        }
    }
    nodes
}

fn variant_css(variants: &[(&str, &Theme)]) -> String {
    variants
        .iter()
        .map(|(name, _)| {
            format!("html.{name} .{HIGHLIGHT_CLASS} span {{ color: var(--mdc-{name}) !important; }}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_style(node: &MarkupNode) -> bool {
    node.as_element().is_some_and(|el| el.tag == "style")
}

/// Attributes without the highlight class token and inline style
fn strip_decoration(attrs: &Attrs) -> Attrs {
    let mut out = Attrs::new();
    for (key, value) in attrs {
        match (key.as_str(), value) {
            ("style", _) => {}
            ("class", Value::String(class)) => {
                let kept: Vec<&str> = class
                    .split_whitespace()
                    .filter(|c| *c != HIGHLIGHT_CLASS)
                    .collect();
                if !kept.is_empty() {
                    out.insert(key.clone(), Value::String(kept.join(" ")));
                }
            }
            _ => {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

fn add_class(attrs: &mut Attrs) {
    let class = match attrs.get("class").and_then(Value::as_str) {
        Some(existing) => format!("{existing} {HIGHLIGHT_CLASS}"),
        None => HIGHLIGHT_CLASS.to_string(),
    };
    attrs.insert("class".to_string(), Value::String(class));
}
