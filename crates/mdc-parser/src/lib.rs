//! mdc-parser: Parser for markdown with MDC component syntax
//!
//! This crate provides:
//! - YAML frontmatter extraction
//! - A line lexer for block component fences and slots
//! - Markdown parsing (via pulldown-cmark) into the compact markup tree
//! - Inline component, span, binding and attribute syntax
//!
//! # Example
//!
//! ```
//! use mdc_parser::parse;
//!
//! let source = "---\ntitle: Demo\n---\n\n::alert{type=\"info\"}\nHello\n::\n";
//!
//! let tree = parse(source).unwrap();
//! assert_eq!(tree.nodes.len(), 1);
//! assert_eq!(tree.frontmatter["title"], "Demo");
//! ```

pub mod attributes;
pub mod frontmatter;
pub mod inline;
pub mod lexer;
pub mod markdown;
pub mod parser;

// Re-export main types for convenient access
pub use attributes::{AttributeError, parse_attributes};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseError, ParseResult, Parser, parse};
