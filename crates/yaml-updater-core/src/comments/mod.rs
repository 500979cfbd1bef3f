/*
 * comments/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Line-oriented parser that keeps comments, blank lines and formatting.
 */

//! Comment-preserving parser.
//!
//! Reads a document line by line and builds a [`YamlTree`] with
//! [`Payload::Comments`] nodes. Nothing is decoded: values keep their raw
//! text, comments and blank lines attach to the following node, and the
//! original key spelling is kept. Rendering the tree with
//! [`render`] reproduces the input line for line.
//!
//! Structure is recovered purely from indentation, so the result is later
//! cross-checked against the YAML engine (see [`crate::cross_check`]).

pub(crate) mod scan;
mod writer;

pub use writer::{render, render_lines, render_with_positions};

use std::mem;

use tracing::trace;

use crate::diagnostic::render_snippet;
use crate::error::{Error, Result};
use crate::tree::{CommentData, Node, NodeId, Payload, YamlTree};

use scan::{LineAction, ScanState, classify, is_list_dash, leading_whitespace, parse_property};

/// Parse `content` into a comment tree.
pub fn parse_comments(content: &str) -> Result<YamlTree> {
    parse_comments_named(content, "<input>")
}

/// Parse `content`, naming it `source_name` in syntax error excerpts.
pub fn parse_comments_named(content: &str, source_name: &str) -> Result<YamlTree> {
    let mut reader = CommentReader::new(content, source_name);
    for line in content.lines() {
        reader.read_line(line)?;
    }
    Ok(reader.finish())
}

struct CommentReader<'a> {
    content: &'a str,
    source_name: &'a str,
    tree: YamlTree,
    state: ScanState,
    /// Comment and blank lines waiting for the next node.
    pending: Vec<String>,
    /// Most recently created node; indentation lookups start here.
    last: Option<NodeId>,
    line_num: usize,
    /// Index into `pending` where a second document started; everything
    /// from there on is kept verbatim.
    trailing_document: Option<usize>,
}

impl<'a> CommentReader<'a> {
    fn new(content: &'a str, source_name: &'a str) -> Self {
        Self {
            content,
            source_name,
            tree: YamlTree::new_comments(),
            state: ScanState::Scanning,
            pending: Vec::new(),
            last: None,
            line_num: 0,
            trailing_document: None,
        }
    }

    fn read_line(&mut self, line: &str) -> Result<()> {
        self.line_num += 1;
        if self.trailing_document.is_some() {
            self.pending.push(line.to_string());
            return Ok(());
        }

        let padding = leading_whitespace(line);
        let body = &line[padding..];
        let action = classify(&self.state, padding, body);
        trace!(line = self.line_num, ?action, "classified line");

        let state = mem::replace(&mut self.state, ScanState::Scanning);
        match action {
            LineAction::Comment => {
                self.pending.push(line.to_string());
                self.state = state.after(action, line);
            }
            LineAction::Continue => {
                self.continue_value(&state, line);
                self.state = state.after(action, line);
            }
            LineAction::Marker => {
                if !self.tree.is_empty() {
                    trace!(line = self.line_num, "second document, keeping rest verbatim");
                    self.trailing_document = Some(self.pending.len());
                }
                self.pending.push(line.to_string());
            }
            LineAction::ListItem => self.read_list_item(padding, body)?,
            LineAction::Property => self.read_property(padding, body),
            LineAction::Invalid => {
                return Err(self.syntax_error(
                    padding + 1,
                    "expected a property, a list item or a comment",
                ));
            }
        }
        Ok(())
    }

    fn continue_value(&mut self, state: &ScanState, line: &str) {
        let Some(owner) = state.owner() else {
            return;
        };
        let pending = mem::take(&mut self.pending);
        if let Some(data) = self.tree.node_mut(owner).comments_mut() {
            data.value.extend(pending);
            data.value.push(line.to_string());
        }
    }

    fn read_property(&mut self, padding: usize, body: &str) {
        let Some(prop) = parse_property(body) else {
            return;
        };
        let parent = self.find_parent(padding, false);
        let top_comment = mem::take(&mut self.pending);
        let raw = prop.value;
        let id = self.add_property(parent, padding, prop, top_comment);
        self.state = ScanState::for_value(id, padding, raw);
    }

    fn add_property(
        &mut self,
        parent: NodeId,
        padding: usize,
        prop: scan::PropertyLine<'_>,
        top_comment: Vec<String>,
    ) -> NodeId {
        let mut node = Node::new(
            padding,
            self.line_num,
            Payload::Comments(CommentData {
                value: vec![prop.value.to_string()],
                top_comment,
                source_key: Some(prop.source_key.to_string()),
                ..CommentData::default()
            }),
        );
        node.key = Some(prop.key);
        let id = self.tree.add_child(parent, node);
        self.last = Some(id);
        id
    }

    fn read_list_item(&mut self, padding: usize, body: &str) -> Result<()> {
        let rest = &body[1..];
        let gap = leading_whitespace(rest);
        let after = &rest[gap..];
        if is_list_dash(after) {
            return Err(self.syntax_error(
                padding + 2 + gap,
                "nested sequences on one line are not supported",
            ));
        }
        let parent = self.find_parent(padding, true);
        let top_comment = mem::take(&mut self.pending);

        match parse_property(after) {
            Some(prop) => {
                let mut wrapper = Node::new(
                    padding,
                    self.line_num,
                    Payload::Comments(CommentData {
                        top_comment,
                        ..CommentData::default()
                    }),
                );
                wrapper.list_item = true;
                wrapper.list_item_with_property = true;
                let wrapper = self.tree.add_child(parent, wrapper);

                let child_padding = padding + 1 + gap;
                let raw = prop.value;
                let id = self.add_property(wrapper, child_padding, prop, Vec::new());
                self.state = ScanState::for_value(id, child_padding, raw);
            }
            None => {
                let mut item = Node::new(
                    padding,
                    self.line_num,
                    Payload::Comments(CommentData {
                        value: vec![rest.to_string()],
                        top_comment,
                        ..CommentData::default()
                    }),
                );
                item.list_item = true;
                let id = self.tree.add_child(parent, item);
                self.last = Some(id);
                self.state = ScanState::for_value(id, padding, rest);
            }
        }
        Ok(())
    }

    /// Nearest preceding node indented less than `padding`.
    ///
    /// A list item at the same indentation as a value-less property whose
    /// children are all list items belongs to that property (indentless
    /// sequence).
    fn find_parent(&self, padding: usize, list_item: bool) -> NodeId {
        let root = self.tree.root();
        let mut current = self.last;
        while let Some(id) = current {
            if id == root {
                break;
            }
            let node = self.tree.node(id);
            if node.padding < padding {
                return id;
            }
            if list_item
                && node.padding == padding
                && node.is_property()
                && !node.has_scalar_value()
                && self
                    .tree
                    .children(id)
                    .iter()
                    .all(|c| self.tree.node(*c).list_item)
            {
                return id;
            }
            current = node.parent();
        }
        root
    }

    fn syntax_error(&self, column: usize, message: &str) -> Error {
        let message = message.to_string();
        Error::Syntax {
            line: self.line_num,
            column,
            snippet: render_snippet(
                self.source_name,
                self.content,
                self.line_num,
                column,
                &message,
            ),
            message,
        }
    }

    fn finish(mut self) -> YamlTree {
        let first_line = self.line_num + 1 - self.pending.len();
        let split = self.trailing_document.unwrap_or(self.pending.len());
        let document = self.pending.split_off(split);
        let comment = mem::take(&mut self.pending);
        self.add_trailing(first_line, comment, false);
        self.add_trailing(first_line + split, document, true);
        self.tree
    }

    fn add_trailing(&mut self, line_num: usize, lines: Vec<String>, trailing_document: bool) {
        if lines.is_empty() {
            return;
        }
        let node = Node::new(
            0,
            line_num,
            Payload::Comments(CommentData {
                top_comment: lines,
                trailing_document,
                ..CommentData::default()
            }),
        );
        let root = self.tree.root();
        self.tree.add_child(root, node);
    }
}
