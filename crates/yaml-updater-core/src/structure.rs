/*
 * structure.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Structural oracle: a line tree built from YAML engine events.
 */

//! Structural oracle parser.
//!
//! Drives the yaml-rust2 event parser and builds a [`YamlTree`] with
//! [`Payload::Structure`] nodes in the same shape the comment parser
//! produces. Values are decoded by the engine, so this tree is the
//! authority on what the document means; it carries no formatting.
//!
//! Shape mapping:
//!
//! - block mappings and block sequences become nodes with children
//! - scalars, aliases and flow collections become leaves holding a
//!   decoded [`Yaml`] value; alias leaves are flagged, since their value
//!   follows whatever the anchor holds
//! - a block mapping that starts on its sequence item's dash line becomes a
//!   wrapper with `list_item_with_property` set
//!
//! Only the first document is read.

use std::collections::HashMap;

use tracing::trace;
use yaml_rust2::Yaml;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::{Marker, TScalarStyle};
use yaml_rust2::yaml::Hash;

use crate::error::{Error, Result};
use crate::tree::{Node, NodeId, Payload, StructureData, YamlTree};

/// Parse `content` with the YAML engine into an oracle tree.
///
/// # Errors
///
/// Returns [`Error::Structure`] if the engine rejects the document, if the
/// root is a scalar, or if a mapping uses a non-scalar key.
pub fn parse_structure(content: &str) -> Result<YamlTree> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = StructureBuilder::new(content);
    // false = first document only
    parser.load(&mut builder, false)?;
    builder.finish()
}

struct StructureBuilder {
    chars: Vec<char>,
    /// Char index of the first character of every line.
    line_starts: Vec<usize>,
    tree: YamlTree,
    stack: Vec<Frame>,
    anchors: HashMap<usize, Yaml>,
    error: Option<Error>,
}

/// A container being built.
enum Frame {
    /// Block mapping; `pending_key` holds a key waiting for its value.
    Mapping {
        node: NodeId,
        anchor: usize,
        pending_key: Option<PendingKey>,
    },
    /// Block sequence; items are indented at `padding` (the dash column).
    Sequence {
        node: NodeId,
        anchor: usize,
        padding: usize,
    },
    /// Flow collection, collected into a single value.
    Flow(FlowFrame),
}

struct PendingKey {
    name: String,
    pos: usize,
}

struct FlowFrame {
    start: usize,
    anchor: usize,
    kind: FlowKind,
}

enum FlowKind {
    Sequence(Vec<Yaml>),
    Mapping { hash: Hash, key: Option<Yaml> },
}

impl FlowFrame {
    fn push(&mut self, value: Yaml) {
        match &mut self.kind {
            FlowKind::Sequence(items) => items.push(value),
            FlowKind::Mapping { hash, key } => match key.take() {
                None => *key = Some(value),
                Some(k) => {
                    hash.insert(k, value);
                }
            },
        }
    }

    fn finish(self) -> Yaml {
        match self.kind {
            FlowKind::Sequence(items) => Yaml::Array(items),
            FlowKind::Mapping { mut hash, key } => {
                if let Some(k) = key {
                    hash.insert(k, Yaml::Null);
                }
                Yaml::Hash(hash)
            }
        }
    }
}

impl StructureBuilder {
    fn new(content: &str) -> Self {
        let chars: Vec<char> = content.chars().collect();
        let mut line_starts = vec![0];
        line_starts.extend(
            chars
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == '\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            chars,
            line_starts,
            tree: YamlTree::new_structure(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            error: None,
        }
    }

    fn finish(self) -> Result<YamlTree> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.tree),
        }
    }

    /// 1-based line and 0-based column of a char index.
    fn position(&self, pos: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|start| *start <= pos);
        let col = pos - self.line_starts[line.saturating_sub(1)];
        (line, col)
    }

    fn fail(&mut self, message: &str, pos: usize) {
        let (line, _) = self.position(pos);
        self.error = Some(Error::Structure {
            message: message.to_string(),
            line: Some(line),
        });
    }

    /// Whether only blanks separate `pos` from a preceding dash on its line.
    fn follows_dash(&self, pos: usize) -> bool {
        let mut i = pos;
        while i > 0 {
            i -= 1;
            match self.chars.get(i) {
                Some(' ' | '\t') => continue,
                Some('-') => return true,
                _ => return false,
            }
        }
        false
    }

    fn expecting_key(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Frame::Mapping {
                pending_key: None,
                ..
            })
        )
    }

    /// Create the node for the next value slot of the innermost block container.
    fn attach(&mut self, pos: usize, value: Option<Yaml>, same_line_mapping: bool) -> Option<NodeId> {
        let (line, col) = self.position(pos);
        let null_value = value.as_ref().is_none_or(Yaml::is_null);
        let payload = Payload::Structure(StructureData {
            value,
            alias: false,
        });
        match self.stack.last_mut() {
            Some(Frame::Mapping {
                node, pending_key, ..
            }) => {
                let parent = *node;
                let key = pending_key.take()?;
                let (key_line, key_col) = self.position(key.pos);
                let mut child = Node::new(key_col, key_line, payload);
                child.key = Some(key.name);
                Some(self.tree.add_child(parent, child))
            }
            Some(Frame::Sequence { node, padding, .. }) => {
                let parent = *node;
                let mut child = Node::new(*padding, line, payload);
                child.list_item = true;
                child.list_item_with_property = same_line_mapping;
                Some(self.tree.add_child(parent, child))
            }
            Some(Frame::Flow(_)) => None,
            None => {
                if !null_value {
                    trace!(line, col, "scalar document root");
                    self.fail("document root must be a mapping or a sequence", pos);
                }
                None
            }
        }
    }

    /// Deliver a complete leaf value (scalar, alias or flow collection).
    fn leaf(&mut self, value: Yaml, pos: usize, alias: bool) {
        if let Some(Frame::Flow(flow)) = self.stack.last_mut() {
            flow.push(value);
            return;
        }
        if self.expecting_key() {
            self.fail("mapping keys must be scalars", pos);
            return;
        }
        let Some(id) = self.attach(pos, Some(value), false) else {
            return;
        };
        if let Payload::Structure(data) = &mut self.tree.node_mut(id).payload {
            data.alias = alias;
        }
    }

    fn start_collection(&mut self, mapping: bool, anchor: usize, pos: usize) {
        let in_flow = matches!(self.stack.last(), Some(Frame::Flow(_)));
        if in_flow || matches!(self.chars.get(pos), Some('[' | '{')) {
            let kind = if mapping {
                FlowKind::Mapping {
                    hash: Hash::new(),
                    key: None,
                }
            } else {
                FlowKind::Sequence(Vec::new())
            };
            self.stack.push(Frame::Flow(FlowFrame {
                start: pos,
                anchor,
                kind,
            }));
            return;
        }

        let node = if self.stack.is_empty() {
            self.tree.root()
        } else if self.expecting_key() {
            self.fail("mapping keys must be scalars", pos);
            return;
        } else {
            let same_line = mapping && self.follows_dash(pos);
            match self.attach(pos, None, same_line) {
                Some(node) => node,
                None => return,
            }
        };

        let frame = if mapping {
            Frame::Mapping {
                node,
                anchor,
                pending_key: None,
            }
        } else {
            Frame::Sequence {
                node,
                anchor,
                padding: self.position(pos).1,
            }
        };
        self.stack.push(frame);
    }

    fn end_collection(&mut self) {
        match self.stack.pop() {
            Some(Frame::Flow(flow)) => {
                let (start, anchor) = (flow.start, flow.anchor);
                let value = flow.finish();
                if anchor > 0 {
                    self.anchors.insert(anchor, value.clone());
                }
                self.leaf(value, start, false);
            }
            Some(Frame::Mapping { node, anchor, .. } | Frame::Sequence { node, anchor, .. }) => {
                if anchor > 0 {
                    let value = self.tree.to_yaml(node);
                    self.anchors.insert(anchor, value);
                }
            }
            None => {}
        }
    }
}

fn scalar_value(text: String, style: TScalarStyle) -> Yaml {
    match style {
        TScalarStyle::Plain => Yaml::from_str(&text),
        _ => Yaml::String(text),
    }
}

impl MarkedEventReceiver for StructureBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.error.is_some() {
            return;
        }
        let pos = marker.index();
        match ev {
            Event::Scalar(text, style, anchor, _tag) => {
                if let Some(Frame::Mapping {
                    pending_key: pending @ None,
                    ..
                }) = self.stack.last_mut()
                {
                    *pending = Some(PendingKey { name: text, pos });
                    return;
                }
                let value = scalar_value(text, style);
                if anchor > 0 {
                    self.anchors.insert(anchor, value.clone());
                }
                self.leaf(value, pos, false);
            }
            Event::Alias(anchor) => {
                let value = self.anchors.get(&anchor).cloned().unwrap_or(Yaml::Null);
                self.leaf(value, pos, true);
            }
            Event::SequenceStart(anchor, _tag) => self.start_collection(false, anchor, pos),
            Event::MappingStart(anchor, _tag) => self.start_collection(true, anchor, pos),
            Event::SequenceEnd | Event::MappingEnd => self.end_collection(),
            _ => {}
        }
    }
}
