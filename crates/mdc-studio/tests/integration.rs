//! Integration tests for the mdc-studio CLI

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;
use tempfile::TempDir;

const PAGE: &str = "---
title: Guide
---

# Getting started

Install with *care* and **speed** :rocket:

::alert{type=\"info\"}
Read the [docs](https://example.com/docs) first.
#footer
Thanks
::

```rust [main.rs]
fn main() {
\tprintln!(\"hi\");
}
```
";

fn mdc_studio(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mdc-studio"))
        .args(args)
        .current_dir(cwd)
        .output()
        .expect("Failed to run mdc-studio")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "mdc-studio failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("stdout is not UTF-8")
}

fn workspace() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("page.md"), PAGE).expect("Failed to write fixture");
    dir
}

#[test]
fn test_open_writes_editor_document() {
    let dir = workspace();
    let json = stdout(&mdc_studio(&["open", "page.md"], dir.path()));
    let doc: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(doc["type"], "doc");
    let content = doc["content"].as_array().unwrap();
    assert_eq!(content[0]["type"], "frontmatter");
    assert_eq!(content[0]["attrs"]["frontmatter"]["title"], "Guide");
    assert_eq!(content[1]["type"], "heading");
    assert_eq!(content[1]["attrs"]["id"], "getting-started");
    assert!(json.contains("\"emoji\""));
}

#[test]
fn test_open_then_save_round_trips() {
    let dir = workspace();
    stdout(&mdc_studio(&["open", "page.md", "-o", "page.json", "-q"], dir.path()));
    stdout(&mdc_studio(&["save", "page.json", "-o", "out/page.md", "-q"], dir.path()));

    let saved = fs::read_to_string(dir.path().join("out/page.md")).unwrap();
    assert_eq!(saved, PAGE);
}

#[test]
fn test_save_ast_with_highlighting_keeps_code() {
    let dir = workspace();
    stdout(&mdc_studio(&["open", "page.md", "-o", "page.json", "-q"], dir.path()));
    let json = stdout(&mdc_studio(&["save", "page.json", "--ast", "--highlight"], dir.path()));
    let tree: Value = serde_json::from_str(&json).unwrap();

    let pre = tree["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .find(|node| node[0] == "pre")
        .unwrap();
    assert_eq!(pre[1]["code"], "fn main() {\n\tprintln!(\"hi\");\n}");
    assert_eq!(pre[1]["class"], "mdc-highlight");
}

#[test]
fn test_save_without_frontmatter() {
    let dir = workspace();
    stdout(&mdc_studio(&["open", "page.md", "-o", "page.json", "-q"], dir.path()));
    let markdown = stdout(&mdc_studio(&["save", "page.json", "--no-frontmatter"], dir.path()));
    assert!(markdown.starts_with("# Getting started\n"));
}

#[test]
fn test_check_directory() {
    let dir = workspace();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(dir.path().join("nested/other.md"), "- one\n- two\n").unwrap();

    let output = mdc_studio(&["check", ".", "-r", "-j", "2"], dir.path());
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Checked 2 files, 0 failed"), "{stderr}");
}

#[test]
fn test_check_reports_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.md"), "::alert\nnever closed\n").unwrap();

    let output = mdc_studio(&["check", "broken.md"], dir.path());
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("never closed"), "{stderr}");
}

#[test]
fn test_diff_spans() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), "the quick fox").unwrap();
    fs::write(dir.path().join("b.txt"), "the slow fox").unwrap();

    let json = stdout(&mdc_studio(&["diff", "a.txt", "b.txt"], dir.path()));
    let spans: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(
        spans,
        serde_json::json!([
            {"type": "unchanged", "text": "the "},
            {"type": "added", "text": "slow"},
            {"type": "unchanged", "text": " fox"}
        ])
    );
}

#[test]
fn test_config_disables_emoji() {
    let dir = workspace();
    fs::write(dir.path().join("_mdc-studio.toml"), "[editor]\nemoji = false\n").unwrap();

    let json = stdout(&mdc_studio(&["open", "page.md"], dir.path()));
    assert!(!json.contains("\"emoji\""));
    assert!(json.contains(":rocket:"));
}

#[test]
fn test_init_and_schema() {
    let dir = tempfile::tempdir().unwrap();
    stdout(&mdc_studio(&["init", "-q"], dir.path()));

    let written = fs::read_to_string(dir.path().join("_mdc-studio.toml")).unwrap();
    assert!(written.starts_with("#:schema"));
    assert!(written.contains("[highlight]"));

    // A second init refuses to overwrite
    assert!(!mdc_studio(&["init"], dir.path()).status.success());

    let schema = stdout(&mdc_studio(&["schema"], dir.path()));
    assert!(schema.contains("HighlightConfig"));
}
