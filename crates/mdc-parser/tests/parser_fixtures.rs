//! Fixture tests for the MDC parser
//!
//! These tests parse markdown fixture files and compare the resulting
//! markup tree with its expected wire form.

use std::fs;
use std::path::PathBuf;

use mdc_parser::parse;
use serde_json::{Value, json};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn parse_fixture(name: &str) -> Value {
    let path = fixtures_dir().join(format!("{}.md", name));
    let source = fs::read_to_string(&path).expect("Failed to read fixture file");
    let tree = parse(&source).expect("Failed to parse fixture");
    serde_json::to_value(&tree).expect("Failed to serialize tree")
}

#[test]
fn components() {
    assert_eq!(
        parse_fixture("components"),
        json!({
            "nodes": [
                ["h1", {}, "Components"],
                [
                    "alert",
                    {"type": "warning", "class": "wide"},
                    ["p", {}, "Careful with ", ["strong", {}, "bold"], " moves."],
                    ["template", {"v-slot:title": ""}, ["p", {}, "Heads up"]]
                ],
                ["card-grid", {}, ["card", {"cols": [1, 2]}, ["p", {}, "First"]]]
            ],
            "frontmatter": {"title": "Components"},
            "meta": {}
        })
    );
}

#[test]
fn inline() {
    let tree = parse_fixture("inline");
    assert_eq!(
        tree["nodes"],
        json!([
            [
                "p",
                {},
                "Status ",
                ["badge", {"color": "amber"}, ["strong", {}, "beta"]],
                " for ",
                ["binding", {"value": "$doc.user", "defaultValue": "guest"}],
                "."
            ],
            [
                "p",
                {},
                "Visit ",
                ["a", {"href": "https://mdc.dev/docs", "target": "_blank"}, "docs"],
                " or ",
                ["a", {"href": "/settings"}, "settings"],
                "."
            ],
            [
                "p",
                {},
                ["span", {"style": "color:red"}, "warm"],
                " text with ",
                ["code", {"lang": "ts"}, "code"],
                " and ",
                ["del", {}, "old"],
                "."
            ]
        ])
    );
}

#[test]
fn code() {
    let tree = parse_fixture("code");
    let code = "def main():\n\tprint(\"tab\")\n    print(\"spaces\")";
    assert_eq!(
        tree["nodes"],
        json!([
            [
                "pre",
                {"language": "python", "filename": "main.py", "code": code},
                ["code", {"__ignoreMap": ""}, code]
            ],
            [
                "pre",
                {"code": "indented"},
                ["code", {"__ignoreMap": ""}, "indented"]
            ]
        ])
    );
}

#[test]
fn writer_round_trip() {
    for name in ["components", "inline", "code"] {
        let path = fixtures_dir().join(format!("{}.md", name));
        let source = fs::read_to_string(&path).expect("Failed to read fixture file");
        let tree = parse(&source).expect("Failed to parse fixture");
        let markdown = mdc_ast::tree_to_markdown(&tree, &mdc_ast::WriterOptions::default());
        let reparsed = parse(&markdown).expect("Failed to parse written markdown");
        assert_eq!(reparsed.nodes, tree.nodes, "round trip of {}", name);
    }
}
