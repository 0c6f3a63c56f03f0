use super::*;
use crate::marks::Marked;
use mdc_parser::parse;
use serde_json::json;

fn convert(source: &str) -> Vec<EditorNode> {
    let tree = parse(source).unwrap();
    let doc = markup_to_editor(&tree);
    // Skip the frontmatter pseudo-node
    doc.content.into_iter().skip(1).collect()
}

fn bold() -> Mark {
    Mark::new(MarkType::Bold)
}

fn italic() -> Mark {
    Mark::new(MarkType::Italic)
}

#[test]
fn test_frontmatter_node_comes_first() {
    let tree = parse("---\ntitle: Demo\n---\n\nHello\n").unwrap();
    let doc = markup_to_editor(&tree);

    match &doc.content[0] {
        EditorNode::Frontmatter { data, error, .. } => {
            assert_eq!(data.get("title"), Some(&json!("Demo")));
            assert!(error.is_none());
        }
        other => panic!("Expected frontmatter, got {other:?}"),
    }
    assert_eq!(doc.content.len(), 2);
}

#[test]
fn test_scalar_frontmatter_is_flagged() {
    let mut tree = MarkupTree::default();
    tree.frontmatter = json!("just a sentence");
    let doc = markup_to_editor(&tree);

    match &doc.content[0] {
        EditorNode::Frontmatter { data, error, .. } => {
            assert!(data.is_empty());
            let error = error.as_ref().unwrap();
            assert!(error.message.contains("found string"));
            assert_eq!(error.raw, json!("just a sentence"));
        }
        other => panic!("Expected frontmatter, got {other:?}"),
    }
}

#[test]
fn test_bold_becomes_a_mark() {
    let nodes = convert("**x**\n");
    assert_eq!(
        nodes,
        vec![EditorNode::paragraph(vec![EditorNode::marked_text(
            "x",
            vec![bold()]
        )])]
    );
}

#[test]
fn test_nested_marks_are_innermost_first() {
    let nodes = convert("*y **x***\n");
    assert_eq!(
        nodes[0].children(),
        &[
            EditorNode::marked_text("y ", vec![italic()]),
            EditorNode::marked_text("x", vec![bold(), italic()]),
        ]
    );
}

#[test]
fn test_inline_code_keeps_only_language() {
    let tree = MarkupTree::from_wire(json!({
        "nodes": [["p", {}, ["code", {"language": "rust", "class": "mdc-highlight"},
            ["span", {"style": "color:#000"}, "let"], " x"]]]
    }))
    .unwrap();
    let doc = markup_to_editor(&tree);

    let mut attrs = Attrs::new();
    attrs.insert("language".to_string(), json!("rust"));
    assert_eq!(
        doc.content[1].children(),
        &[EditorNode::marked_text(
            "let x",
            vec![Mark::with_attrs(MarkType::Code, attrs)]
        )]
    );
}

#[test]
fn test_external_link_gets_default_target() {
    let nodes = convert("[site](https://example.com)\n");
    let marks = nodes[0].children()[0].marks();

    assert_eq!(marks.len(), 1);
    assert_eq!(marks[0].kind, MarkType::Link);
    assert_eq!(marks[0].attrs.get("target"), Some(&json!("_blank")));
    assert_eq!(
        marks[0].attrs.get("rel"),
        Some(&json!("noopener noreferrer nofollow"))
    );
}

#[test]
fn test_relative_link_is_untouched() {
    let nodes = convert("[docs](/guide)\n");
    let marks = nodes[0].children()[0].marks();

    assert_eq!(marks[0].attrs.get("href"), Some(&json!("/guide")));
    assert!(!marks[0].attrs.contains_key("target"));
}

#[test]
fn test_link_around_image_is_a_node() {
    let nodes = convert("[![logo](/logo.png)](https://example.com)\n");

    match &nodes[0].children()[0] {
        EditorNode::Link {
            href,
            target,
            children,
            ..
        } => {
            assert_eq!(href, "https://example.com");
            assert_eq!(target.as_deref(), Some("_blank"));
            assert!(matches!(children[0], EditorNode::Image { .. }));
        }
        other => panic!("Expected a link node, got {other:?}"),
    }
}

#[test]
fn test_duplicate_headings_get_unique_ids() {
    let nodes = convert("# Intro\n\n## Intro\n\n### Intro\n");
    let ids: Vec<_> = nodes
        .iter()
        .map(|n| match n {
            EditorNode::Heading { id, .. } => id.as_str(),
            _ => "",
        })
        .collect();
    assert_eq!(ids, ["intro", "intro-1", "intro-2"]);
}

#[test]
fn test_code_block_keeps_whitespace() {
    let nodes = convert("```rust [main.rs]\nfn main() {\n\tlet  x = 1;\n}\n```\n");
    assert_eq!(
        nodes[0],
        EditorNode::CodeBlock {
            language: Some("rust".to_string()),
            filename: Some("main.rs".to_string()),
            meta: None,
            code: Some("fn main() {\n\tlet  x = 1;\n}".to_string()),
            children: vec![EditorNode::text("fn main() {\n\tlet  x = 1;\n}")],
        }
    );
}

#[test]
fn test_component_bare_content_gets_synthetic_slot() {
    let nodes = convert("::alert{type=\"info\"}\nBody text\n#footer\nBye\n::\n");

    let EditorNode::Element {
        tag,
        props,
        children,
    } = &nodes[0]
    else {
        panic!("Expected an element, got {:?}", nodes[0]);
    };
    assert_eq!(tag, "alert");
    assert_eq!(props.get("type"), Some(&json!("info")));
    assert_eq!(children.len(), 2);
    assert!(matches!(
        &children[0],
        EditorNode::Slot { name, synthetic: true, .. } if name == "default"
    ));
    assert!(matches!(
        &children[1],
        EditorNode::Slot { name, synthetic: false, .. } if name == "footer"
    ));
}

#[test]
fn test_empty_component_has_no_slot() {
    let nodes = convert("::divider\n::\n");
    assert_eq!(
        nodes,
        vec![EditorNode::Element {
            tag: "divider".to_string(),
            props: Attrs::new(),
            children: vec![],
        }]
    );
}

#[test]
fn test_bare_inline_content_gets_synthetic_paragraph() {
    let tree = MarkupTree::from_wire(json!({
        "nodes": ["loose ", ["strong", {}, "text"]]
    }))
    .unwrap();
    let doc = markup_to_editor(&tree);

    assert_eq!(
        doc.content[1],
        EditorNode::Paragraph {
            synthetic: true,
            children: vec![
                EditorNode::text("loose "),
                EditorNode::marked_text("text", vec![bold()]),
            ],
        }
    );
}

#[test]
fn test_emoji_shortcodes() {
    let nodes = convert("Nice :smile: work\n");
    let children = nodes[0].children();

    assert_eq!(children.len(), 3);
    assert_eq!(children[0], EditorNode::text("Nice "));
    assert!(matches!(&children[1], EditorNode::Emoji { name, .. } if name == "smile"));
    assert_eq!(children[2], EditorNode::text(" work"));
}

#[test]
fn test_emoji_not_resolved_in_code() {
    let nodes = convert("`:smile:`\n");
    assert_eq!(nodes[0].children()[0].text_content(), ":smile:");
}

#[test]
fn test_emoji_resolution_can_be_disabled() {
    let tree = parse("Nice :smile:\n").unwrap();
    let options = ForwardOptions {
        resolve_emoji: false,
    };
    let doc = markup_to_editor_with_options(&tree, &options);
    assert_eq!(
        doc.content[1].children(),
        &[EditorNode::text("Nice :smile:")]
    );
}

#[test]
fn test_inline_component_and_binding() {
    let nodes = convert("Hi {{ name || 'friend' }} :badge[New]{color=\"green\"}\n");
    let children = nodes[0].children();

    assert!(matches!(
        &children[1],
        EditorNode::Binding { value: Some(v), default_value: Some(d), .. }
            if v == "name" && d == &json!("friend")
    ));
    match &children[3] {
        EditorNode::InlineElement {
            tag,
            props,
            children,
            ..
        } => {
            assert_eq!(tag, "badge");
            assert_eq!(props.get("color"), Some(&json!("green")));
            assert_eq!(children, &[EditorNode::text("New")]);
        }
        other => panic!("Expected an inline element, got {other:?}"),
    }
}

#[test]
fn test_video_flags_are_booleans() {
    let tree = MarkupTree::from_wire(json!({
        "nodes": [["p", {}, ["video", {"src": "/a.mp4", "controls": "", "muted": "false"}]]]
    }))
    .unwrap();
    let doc = markup_to_editor(&tree);

    let EditorNode::Video { props, .. } = &doc.content[1].children()[0] else {
        panic!("Expected a video");
    };
    assert_eq!(props.get("controls"), Some(&json!(true)));
    assert_eq!(props.get("muted"), Some(&json!(false)));
    assert_eq!(props.get("src"), Some(&json!("/a.mp4")));
}

#[test]
fn test_style_elements_are_dropped() {
    let tree = MarkupTree::from_wire(json!({
        "nodes": [["p", {}, "a"], ["style", {}, "html.dark {}"]]
    }))
    .unwrap();
    let doc = markup_to_editor(&tree);
    assert_eq!(doc.content.len(), 2);
}
