//! mdc-editor: conversion between MDC markup trees and editor documents
//!
//! This crate provides:
//! - The typed editor document model and its JSON wire form
//! - Forward (markup to editor) and reverse (editor to markup) converters
//! - The mark algebra shared by both directions
//! - Syntax highlighting of code blocks, heading slugs and a word diff
//!
//! ## Example
//!
//! ```rust
//! use mdc_editor::{editor_to_markup, markup_to_editor};
//! use mdc_ast::MarkupTree;
//! use serde_json::json;
//!
//! let tree = MarkupTree::from_wire(json!({
//!     "nodes": [["p", {}, ["em", {}, "y ", ["strong", {}, "x"]]]]
//! })).unwrap();
//!
//! let doc = markup_to_editor(&tree);
//! let back = editor_to_markup(&doc);
//! assert_eq!(back.nodes, tree.nodes);
//! ```

pub mod diff;
pub mod dispatch;
pub mod emoji;
pub mod forward;
pub mod highlight;
pub mod links;
pub mod marks;
pub mod model;
pub mod reverse;
pub mod slug;

pub use diff::{DiffOptions, DiffSpan, SpanKind, word_diff, word_diff_with_options};
pub use dispatch::TagKind;
pub use forward::{ForwardOptions, markup_to_editor, markup_to_editor_with_options};
pub use highlight::{HighlightError, HighlightThemes, SyntaxHighlighter};
pub use marks::{Mark, MarkGroup, MarkType, Marked, compose, group_by_outer_mark, group_by_signature};
pub use model::{DocumentError, EditorDoc, EditorNode, FrontmatterError};
pub use reverse::{ReverseOptions, editor_to_markup, editor_to_markup_with_options};
pub use slug::{SlugRegistry, slugify};
