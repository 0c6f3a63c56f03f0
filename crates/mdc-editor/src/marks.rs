//! Mark algebra
//!
//! Character-level formatting lives on text nodes as an ordered list of
//! marks. The list reads inside out: the innermost mark comes first and the
//! outermost last, which is the order marks are composed in while the
//! forward pass descends through nested mark elements.

use mdc_ast::Attrs;
use serde::{Deserialize, Serialize};

/// The formatting a mark applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkType {
    Bold,
    Italic,
    Strike,
    Code,
    Link,
}

impl MarkType {
    /// The markup tag this mark encodes as
    pub fn tag(self) -> &'static str {
        match self {
            MarkType::Bold => "strong",
            MarkType::Italic => "em",
            MarkType::Strike => "del",
            MarkType::Code => "code",
            MarkType::Link => "a",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "strong" => Some(MarkType::Bold),
            "em" => Some(MarkType::Italic),
            "del" => Some(MarkType::Strike),
            "code" => Some(MarkType::Code),
            "a" => Some(MarkType::Link),
            _ => None,
        }
    }
}

/// A mark with its attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: MarkType,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(kind: MarkType) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attrs(kind: MarkType, attrs: Attrs) -> Self {
        Self { kind, attrs }
    }
}

/// Anything that carries a mark list
pub trait Marked {
    fn marks(&self) -> &[Mark];
}

/// Add `mark` beneath the marks accumulated so far.
///
/// `accumulated` holds the marks of the enclosing elements, so the new mark
/// is the innermost one and goes first.
pub fn compose(accumulated: &[Mark], mark: Mark) -> Vec<Mark> {
    let mut marks = Vec::with_capacity(accumulated.len() + 1);
    marks.push(mark);
    marks.extend_from_slice(accumulated);
    marks
}

/// A maximal run of items with the same marks
#[derive(Debug, Clone, PartialEq)]
pub struct MarkGroup<T> {
    pub marks: Vec<Mark>,
    pub items: Vec<T>,
}

/// Partition items into maximal runs sharing an identical mark list.
///
/// Comparison is deep and order sensitive: `[Bold, Italic]` and
/// `[Italic, Bold]` are different signatures.
pub fn group_by_signature<T: Marked>(items: impl IntoIterator<Item = T>) -> Vec<MarkGroup<T>> {
    let mut groups: Vec<MarkGroup<T>> = Vec::new();
    for item in items {
        match groups.last_mut() {
            Some(group) if group.marks.as_slice() == item.marks() => group.items.push(item),
            _ => groups.push(MarkGroup {
                marks: item.marks().to_vec(),
                items: vec![item],
            }),
        }
    }
    groups
}

/// Partition items into maximal runs sharing the same outermost mark.
///
/// Items without marks form runs keyed by `None`.
pub fn group_by_outer_mark<T: Marked>(
    items: impl IntoIterator<Item = T>,
) -> Vec<(Option<Mark>, Vec<T>)> {
    let mut groups: Vec<(Option<Mark>, Vec<T>)> = Vec::new();
    for item in items {
        let outer = item.marks().last();
        match groups.last_mut() {
            Some((key, run)) if key.as_ref() == outer => run.push(item),
            _ => groups.push((outer.cloned(), vec![item])),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str, Vec<Mark>);

    impl Marked for Item {
        fn marks(&self) -> &[Mark] {
            &self.1
        }
    }

    fn bold() -> Mark {
        Mark::new(MarkType::Bold)
    }

    fn italic() -> Mark {
        Mark::new(MarkType::Italic)
    }

    #[test]
    fn test_compose_puts_inner_mark_first() {
        let outer = compose(&[], italic());
        let inner = compose(&outer, bold());
        assert_eq!(inner, vec![bold(), italic()]);
    }

    #[test]
    fn test_group_by_signature() {
        let items = vec![
            Item("a", vec![bold()]),
            Item("b", vec![bold()]),
            Item(" ", vec![]),
            Item("c", vec![bold(), italic()]),
            Item("d", vec![italic(), bold()]),
        ];
        let groups = group_by_signature(items);
        let shape: Vec<(usize, usize)> = groups
            .iter()
            .map(|g| (g.marks.len(), g.items.len()))
            .collect();
        assert_eq!(shape, vec![(1, 2), (0, 1), (2, 1), (2, 1)]);
    }

    #[test]
    fn test_group_by_signature_compares_attrs() {
        let mut first = Attrs::new();
        first.insert("href".to_string(), "/a".into());
        let mut second = Attrs::new();
        second.insert("href".to_string(), "/b".into());
        let items = vec![
            Item("x", vec![Mark::with_attrs(MarkType::Link, first.clone())]),
            Item("y", vec![Mark::with_attrs(MarkType::Link, first)]),
            Item("z", vec![Mark::with_attrs(MarkType::Link, second)]),
        ];
        assert_eq!(group_by_signature(items).len(), 2);
    }

    #[test]
    fn test_group_by_outer_mark() {
        let items = vec![
            Item("y ", vec![italic()]),
            Item("x", vec![bold(), italic()]),
            Item("!", vec![]),
        ];
        let groups = group_by_outer_mark(items);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, Some(italic()));
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[1].0, None);
    }

    #[test]
    fn test_tags() {
        for kind in [
            MarkType::Bold,
            MarkType::Italic,
            MarkType::Strike,
            MarkType::Code,
            MarkType::Link,
        ] {
            assert_eq!(MarkType::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(MarkType::from_tag("span"), None);
    }
}
