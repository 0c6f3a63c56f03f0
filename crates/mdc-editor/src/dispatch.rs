//! Tag dispatch
//!
//! Every markup tag is classified into one closed set of kinds before
//! conversion, so both converters match exhaustively over [`TagKind`]
//! instead of looking tags up in a table. Tags nobody knows are
//! [`TagKind::Component`] and convert to a generic element.

use crate::marks::MarkType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Paragraph,
    Heading(u8),
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    HorizontalRule,
    LineBreak,
    CodeBlock,
    Image,
    Video,
    Template,
    Span,
    Binding,
    Mark(MarkType),
    /// Raw HTML block kept as text
    Html,
    /// Highlighter stylesheet; presentation only
    Style,
    /// Custom component or any unrecognised tag
    Component,
}

impl TagKind {
    pub fn classify(tag: &str) -> Self {
        if let Some(mark) = MarkType::from_tag(tag) {
            return TagKind::Mark(mark);
        }
        match tag {
            "p" => TagKind::Paragraph,
            "h1" => TagKind::Heading(1),
            "h2" => TagKind::Heading(2),
            "h3" => TagKind::Heading(3),
            "h4" => TagKind::Heading(4),
            "h5" => TagKind::Heading(5),
            "h6" => TagKind::Heading(6),
            "ul" => TagKind::BulletList,
            "ol" => TagKind::OrderedList,
            "li" => TagKind::ListItem,
            "blockquote" => TagKind::Blockquote,
            "hr" => TagKind::HorizontalRule,
            "br" => TagKind::LineBreak,
            "pre" => TagKind::CodeBlock,
            "img" => TagKind::Image,
            "video" => TagKind::Video,
            "template" => TagKind::Template,
            "span" => TagKind::Span,
            "binding" => TagKind::Binding,
            "html" => TagKind::Html,
            "style" => TagKind::Style,
            _ => TagKind::Component,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(TagKind::classify("h3"), TagKind::Heading(3));
        assert_eq!(TagKind::classify("em"), TagKind::Mark(MarkType::Italic));
        assert_eq!(TagKind::classify("a"), TagKind::Mark(MarkType::Link));
        assert_eq!(TagKind::classify("pre"), TagKind::CodeBlock);
        assert_eq!(TagKind::classify("h7"), TagKind::Component);
        assert_eq!(TagKind::classify("alert"), TagKind::Component);
    }
}
