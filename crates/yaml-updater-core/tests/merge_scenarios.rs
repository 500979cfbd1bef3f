/*
 * merge_scenarios.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * End-to-end merge scenarios: parse, merge, render, re-parse, validate.
 */

use pretty_assertions::assert_eq;
use std::path::Path;
use yaml_updater_core::{
    Document, Error, MergeSummary, YamlPath, merge, parse_document, parse_structure, render,
    validate,
};

fn fixture_path(name: &str) -> std::path::PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir).join("test-fixtures").join(name)
}

fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

/// Merge `update` into `current`, then validate the rendered result the way
/// the update pipeline does.
fn merge_and_validate(mut current: Document, update: &str) -> (String, MergeSummary) {
    let update = parse_document(update, "update.yml").unwrap();
    let summary = merge(&mut current.comments, &update.comments);
    let text = render(&current.comments, "\n");

    let reparsed = parse_structure(&text).unwrap();
    validate(&reparsed, Some(&current.structure), &update.structure)
        .unwrap_or_else(|err| panic!("validation failed: {}\n{}", err, text));
    (text, summary)
}

fn merge_texts(current: &str, update: &str) -> (String, MergeSummary) {
    merge_and_validate(parse_document(current, "config.yml").unwrap(), update)
}

#[test]
fn test_fixture_merge() {
    let (text, summary) = merge_texts(&load_fixture("current.yml"), &load_fixture("update.yml"));
    assert_eq!(text, load_fixture("expected.yml"));
    assert!(summary.unmatched.is_empty());
}

#[test]
fn test_documented_example() {
    let (text, _) = merge_texts(
        "server:\n  port: 8080 # prod\n",
        "server:\n    port: 9090\n    host: localhost\n",
    );
    assert_eq!(text, "server:\n    port: 8080 # prod\n    host: localhost\n");
}

#[test]
fn test_identity_round_trip_of_fixtures() {
    for name in ["current.yml", "update.yml", "expected.yml"] {
        let content = load_fixture(name);
        let doc = parse_document(&content, name).unwrap();
        assert_eq!(render(&doc.comments, "\n"), content, "{}", name);
    }
}

#[test]
fn test_self_merge_is_idempotent() {
    let content = load_fixture("current.yml");
    let (text, summary) = merge_texts(&content, &content);
    assert_eq!(text, content);
    assert!(summary.unmatched.is_empty());

    let before = parse_structure(&content).unwrap().leaf_paths();
    let after = parse_structure(&text).unwrap().leaf_paths();
    assert_eq!(before, after);
}

#[test]
fn test_indentation_is_rebased() {
    let current = "\
app:
  name: demo
  description: a long
    plain value
  notes: >
    folded
    text
  items:
    - id: 1
      label: one
";
    let update = "\
app:
    name: x
    description: y
    notes: z
    items:
        - id: 1
          label: one
";
    let (text, summary) = merge_texts(current, update);
    assert!(summary.unmatched.is_empty());
    assert_eq!(
        text,
        "\
app:
    name: demo
    description: a long
      plain value
    notes: >
      folded
      text
    items:
        - id: 1
          label: one
"
    );
}

#[test]
fn test_ambiguous_list_items_stay_as_they_were() {
    let current = "\
workers:
  - pool: default
    size: 1
  - pool: default
    size: 1
";
    let update = "\
workers:
  - pool: default
    size: 1
    queue: main
";
    let (text, summary) = merge_texts(current, update);
    assert_eq!(text, current);
    assert_eq!(
        summary.unmatched,
        vec![YamlPath::new("workers[0]"), YamlPath::new("workers[1]")]
    );
}

#[test]
fn test_deleted_property_takes_update_value() {
    let mut current = parse_document("server:\n  port: 8080\n  host: a\n", "config.yml").unwrap();
    assert!(current.delete("server/port"));
    let (text, _) = merge_and_validate(current, "server:\n  port: 9090\n  host: b\n");
    assert_eq!(text, "server:\n  port: 9090\n  host: a\n");
}

#[test]
fn test_first_install_copies_update() {
    let update = "# template\na: 1\nlist:\n  - x: 1\n";
    let (text, _) = merge_texts("", update);
    assert_eq!(text, update);
}

#[test]
fn test_crlf_documents_render_with_crlf() {
    let current = parse_document("a: 1\r\nb: 2\r\n", "config.yml").unwrap();
    let update = parse_document("a: 0\r\nc: 3\r\n", "update.yml").unwrap();
    let mut merged = current.comments.clone();
    merge(&mut merged, &update.comments);
    assert_eq!(render(&merged, "\r\n"), "a: 1\r\nb: 2\r\nc: 3\r\n");
}

#[test]
fn test_corrupted_merge_is_caught() {
    let old = parse_structure("a: 1\nb: 2\n").unwrap();
    let new = parse_structure("a: 5\n").unwrap();
    let broken = parse_structure("a: 5\n").unwrap();
    let err = validate(&broken, Some(&old), &new).unwrap_err();
    assert!(matches!(err, Error::Validation { ref path, .. } if path == "a"));
}

#[test]
fn test_merge_key_alias_follows_extended_anchor() {
    let current = "base: &base\n  x: 1\nservice:\n  <<: *base\n  y: 2\n";
    let update = "base: &base\n  x: 0\n  z: 3\nservice:\n  <<: *base\n  y: 0\n";
    let (text, summary) = merge_texts(current, update);
    assert_eq!(
        text,
        "base: &base\n  x: 1\n  z: 3\nservice:\n  <<: *base\n  y: 2\n"
    );
    assert!(summary.unmatched.is_empty());
}

#[test]
fn test_later_documents_of_current_file_survive() {
    let (text, _) = merge_texts("a: 1\n---\nb: 2\n", "a: 2\nc: 3\n# end\n");
    assert_eq!(text, "a: 1\nc: 3\n# end\n---\nb: 2\n");
}
