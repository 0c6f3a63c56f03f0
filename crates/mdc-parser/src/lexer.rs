//! MDC line lexer
//!
//! Splits a document body into lines and classifies the ones that open or
//! close block components and the `#slot` markers inside them. Everything
//! else is markdown and is handed to the markdown parser in chunks. Lines
//! inside fenced code blocks are always markdown.

use regex::Regex;
use std::sync::OnceLock;

/// A classified line of the document body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The line as written, without its line ending
    pub raw: String,
    /// Line number (1-indexed)
    pub line: usize,
}

/// The kind of token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A markdown line
    Markdown,
    /// `::name{attrs}` opening a block component
    ComponentOpen {
        depth: usize,
        name: String,
        attrs: Option<String>,
    },
    /// A line made only of colons
    ComponentClose { depth: usize },
    /// `#name` on a line of its own
    Slot(String),
}

fn open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(:{2,})([A-Za-z][\w-]*)\s*(\{.*\})?\s*$").expect("valid component regex")
    })
}

fn close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(:{2,})\s*$").expect("valid close regex"))
}

fn slot_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^#([A-Za-z][\w-]*)\s*$").expect("valid slot regex"))
}

/// An open code fence: marker character and length
#[derive(Debug, Clone, Copy)]
struct Fence {
    marker: char,
    len: usize,
}

/// Lexer over the lines of a document body
pub struct Lexer<'a> {
    lines: std::str::Lines<'a>,
    line: usize,
    fence: Option<Fence>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input
    pub fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines(),
            line: 0,
            fence: None,
        }
    }

    /// Tokenize the whole input
    pub fn tokenize(input: &'a str) -> Vec<Token> {
        Lexer::new(input).collect()
    }

    fn classify(&mut self, raw: &str) -> TokenKind {
        if let Some(fence) = self.fence {
            if closes_fence(raw, fence) {
                self.fence = None;
            }
            return TokenKind::Markdown;
        }

        if let Some(fence) = opens_fence(raw) {
            self.fence = Some(fence);
            return TokenKind::Markdown;
        }

        if let Some(caps) = open_re().captures(raw) {
            return TokenKind::ComponentOpen {
                depth: caps[1].len(),
                name: caps[2].to_string(),
                attrs: caps.get(3).map(|m| m.as_str().to_string()),
            };
        }

        if let Some(caps) = close_re().captures(raw) {
            return TokenKind::ComponentClose {
                depth: caps[1].len(),
            };
        }

        if let Some(caps) = slot_re().captures(raw) {
            return TokenKind::Slot(caps[1].to_string());
        }

        TokenKind::Markdown
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let raw = self.lines.next()?;
        self.line += 1;
        let kind = self.classify(raw);
        Some(Token {
            kind,
            raw: raw.to_string(),
            line: self.line,
        })
    }
}

/// Up to three spaces of indentation, then three or more backticks or tildes
fn opens_fence(line: &str) -> Option<Fence> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    if indent > 3 {
        return None;
    }
    let rest = &line[indent..];
    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    // Backtick fences may not carry backticks in their info string
    if marker == '`' && rest[len..].contains('`') {
        return None;
    }
    Some(Fence { marker, len })
}

fn closes_fence(line: &str, fence: Fence) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return false;
    }
    let len = trimmed.chars().take_while(|c| *c == fence.marker).count();
    len >= fence.len && trimmed[len * fence.marker.len_utf8()..].trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::tokenize(input).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_component_lines() {
        let tokens = kinds("::alert{type=\"info\"}\nHello\n#title\nTitle\n::");
        assert_eq!(
            tokens,
            vec![
                TokenKind::ComponentOpen {
                    depth: 2,
                    name: "alert".to_string(),
                    attrs: Some("{type=\"info\"}".to_string()),
                },
                TokenKind::Markdown,
                TokenKind::Slot("title".to_string()),
                TokenKind::Markdown,
                TokenKind::ComponentClose { depth: 2 },
            ]
        );
    }

    #[test]
    fn test_nested_depth() {
        let tokens = kinds(":::card\n::::\n");
        assert_eq!(
            tokens,
            vec![
                TokenKind::ComponentOpen {
                    depth: 3,
                    name: "card".to_string(),
                    attrs: None,
                },
                TokenKind::ComponentClose { depth: 4 },
            ]
        );
    }

    #[test]
    fn test_fenced_code_is_markdown() {
        let tokens = kinds("```md\n::alert\n#title\n```\n::alert\n::");
        assert_eq!(tokens[1], TokenKind::Markdown);
        assert_eq!(tokens[2], TokenKind::Markdown);
        assert_eq!(tokens[3], TokenKind::Markdown);
        assert!(matches!(tokens[4], TokenKind::ComponentOpen { .. }));
    }

    #[test]
    fn test_longer_fence_needs_longer_close() {
        let tokens = kinds("````\n```\n::x\n````\n::x");
        assert_eq!(tokens[2], TokenKind::Markdown);
        assert!(matches!(tokens[4], TokenKind::ComponentOpen { .. }));
    }

    #[test]
    fn test_inline_colon_is_markdown() {
        assert_eq!(kinds("Note: ::not-a-block"), vec![TokenKind::Markdown]);
        assert_eq!(kinds("# Heading"), vec![TokenKind::Markdown]);
    }

    #[test]
    fn test_line_numbers() {
        let tokens = Lexer::tokenize("a\r\n::b\r\n::");
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].raw, "::b");
    }
}
