/*
 * comments/writer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Serialization of comment trees back to text.
 */

use std::collections::HashMap;

use crate::tree::{CommentData, NodeId, YamlTree};

/// Render a comment tree, terminating every line with `separator`.
pub fn render(tree: &YamlTree, separator: &str) -> String {
    let mut out = String::new();
    for line in render_lines(tree) {
        out.push_str(&line);
        out.push_str(separator);
    }
    out
}

pub fn render_lines(tree: &YamlTree) -> Vec<String> {
    render_with_positions(tree).0
}

/// Render a comment tree, also returning the 1-based output line of every
/// node that owns a line (comment-only nodes have none).
pub fn render_with_positions(tree: &YamlTree) -> (Vec<String>, HashMap<NodeId, usize>) {
    let mut writer = Writer {
        tree,
        lines: Vec::new(),
        positions: HashMap::new(),
    };
    for child in tree.children(tree.root()) {
        writer.write_node(*child);
    }
    (writer.lines, writer.positions)
}

struct Writer<'a> {
    tree: &'a YamlTree,
    lines: Vec<String>,
    positions: HashMap<NodeId, usize>,
}

impl Writer<'_> {
    fn write_node(&mut self, id: NodeId) {
        let tree = self.tree;
        let node = tree.node(id);
        let Some(data) = node.comments() else {
            return;
        };
        self.lines.extend(data.top_comment.iter().cloned());
        if node.is_comment_only() {
            return;
        }

        let pad = " ".repeat(node.padding);
        let children = tree.children(id);

        if node.list_item_with_property {
            if let Some(&first) = children.first() {
                let first_node = tree.node(first);
                if let (Some(key), Some(first_data)) = (&first_node.key, first_node.comments()) {
                    // nothing may sit between the dash and the inline property
                    self.lines.extend(first_data.top_comment.iter().cloned());
                    let gap = first_node
                        .padding
                        .saturating_sub(node.padding + 1)
                        .max(1);
                    self.mark(id);
                    self.mark(first);
                    self.lines.push(format!(
                        "{}-{}{}",
                        pad,
                        " ".repeat(gap),
                        property_line(key, first_data)
                    ));
                    self.lines.extend(first_data.value.iter().skip(1).cloned());
                    for child in tree.children(first) {
                        self.write_node(*child);
                    }
                    for child in &children[1..] {
                        self.write_node(*child);
                    }
                    return;
                }
            }
        }

        self.mark(id);
        if node.list_item {
            let first = data.value.first().map(String::as_str).unwrap_or_default();
            self.lines.push(format!("{}-{}", pad, first));
        } else if let Some(key) = &node.key {
            self.lines.push(format!("{}{}", pad, property_line(key, data)));
        }
        self.lines.extend(data.value.iter().skip(1).cloned());
        for child in children {
            self.write_node(*child);
        }
    }

    fn mark(&mut self, id: NodeId) {
        self.positions.insert(id, self.lines.len() + 1);
    }
}

fn property_line(key: &str, data: &CommentData) -> String {
    format!(
        "{}:{}",
        data.source_key.as_deref().unwrap_or(key),
        data.value.first().map(String::as_str).unwrap_or_default()
    )
}
