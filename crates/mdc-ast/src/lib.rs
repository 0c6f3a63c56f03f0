//! mdc-ast: markup AST types and markdown writer for MDC documents
//!
//! This crate provides:
//! - The compact markup tree (elements, text, comments) and its tuple wire format
//! - Serialization of a markup tree back to markdown with component syntax
//!
//! ## Example
//!
//! ```rust
//! use mdc_ast::{MarkupTree, WriterOptions, tree_to_markdown};
//! use serde_json::json;
//!
//! let tree = MarkupTree::from_wire(json!({
//!     "nodes": [["h1", {}, "Hello"], ["p", {}, "World"]]
//! })).unwrap();
//!
//! let md = tree_to_markdown(&tree, &WriterOptions::default());
//! assert_eq!(md, "# Hello\n\nWorld\n");
//! ```

pub mod node;
pub mod writer;

pub use node::{
    Attrs, Element, INLINE_TAGS, MarkupNode, MarkupTree, WireError, is_inline_at, value_kind,
};
pub use writer::{WriterOptions, format_attrs, slot_name, tree_to_markdown};
